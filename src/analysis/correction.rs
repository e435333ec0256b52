//! Multiple comparison correction
//!
//! Adjusts the p-values of every test in a report as one family, then
//! re-derives the significance flag and bucket at α = 0.05.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::result::{SignificanceLevel, StatTestResult};

/// Significance threshold applied to adjusted p-values.
pub const CORRECTED_ALPHA: f64 = 0.05;

/// Correction procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    /// `min(p · n, 1)`; family-wise error rate
    Bonferroni,
    /// Step-down Holm-Bonferroni; family-wise error rate
    Holm,
    /// Benjamini-Hochberg step-up; false discovery rate
    #[serde(alias = "fdr")]
    BenjaminiHochberg,
}

impl std::fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bonferroni => write!(f, "bonferroni"),
            Self::Holm => write!(f, "holm"),
            Self::BenjaminiHochberg => write!(f, "benjamini_hochberg"),
        }
    }
}

/// Adjust `p_values` with `method`; output order matches input order.
///
/// Non-finite inputs are treated as 1.
///
/// ## Example
///
/// ```rust
/// use factorlab::analysis::correction::{adjust_p_values, CorrectionMethod};
///
/// let adjusted = adjust_p_values(&[0.01, 0.04, 0.03, 0.005], CorrectionMethod::Bonferroni);
/// assert!((adjusted[0] - 0.04).abs() < 1e-12);
/// assert!((adjusted[1] - 0.16).abs() < 1e-12);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn adjust_p_values(p_values: &[f64], method: CorrectionMethod) -> Vec<f64> {
    let p: Vec<f64> = p_values
        .iter()
        .map(|&v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 1.0 })
        .collect();
    let n = p.len();
    if n == 0 {
        return Vec::new();
    }
    let n_f = n as f64;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        p[i].partial_cmp(&p[j])
            .unwrap_or(Ordering::Equal)
            .then(i.cmp(&j))
    });

    let mut adjusted = vec![1.0; n];
    match method {
        CorrectionMethod::Bonferroni => {
            for (slot, value) in adjusted.iter_mut().zip(&p) {
                *slot = (value * n_f).min(1.0);
            }
        }
        CorrectionMethod::Holm => {
            // running maximum keeps adjusted values monotone in rank
            let mut running = 0.0_f64;
            for (rank, &idx) in order.iter().enumerate() {
                let value = (p[idx] * (n - rank) as f64).min(1.0);
                running = running.max(value);
                adjusted[idx] = running;
            }
        }
        CorrectionMethod::BenjaminiHochberg => {
            let mut next = p[order[n - 1]];
            adjusted[order[n - 1]] = next;
            for rank in (0..n - 1).rev() {
                let idx = order[rank];
                next = (p[idx] * n_f / (rank + 1) as f64).min(next);
                adjusted[idx] = next;
            }
        }
    }
    adjusted
}

/// Adjust every result in place and re-derive significance at [`CORRECTED_ALPHA`].
pub fn apply_correction(results: &mut [&mut StatTestResult], method: CorrectionMethod) {
    let raw: Vec<f64> = results.iter().map(|r| r.p_value).collect();
    let adjusted = adjust_p_values(&raw, method);

    for (result, p_adj) in results.iter_mut().zip(adjusted) {
        result.adjusted_p_value = Some(p_adj);
        result.has_significant_relationship = p_adj < CORRECTED_ALPHA;
        result.significance = SignificanceLevel::from_p_value(p_adj, CORRECTED_ALPHA);
    }
}
