//! One-way ANOVA for numeric response variables
//!
//! ```text
//! SS_total   = Σ (x − x̄)²
//! SS_between = Σ nᵢ (x̄ᵢ − x̄)²
//! SS_within  = Σ nᵢ σᵢ²   (= SS_total − SS_between)
//! F          = (SS_between / (k − 1)) / (SS_within / (N − k))
//! η²         = SS_between / SS_total
//! ```
//!
//! The p-value comes from the cube-root normal approximation in
//! [`super::distribution::f_p_value`].

use serde::{Deserialize, Serialize};

use super::distribution::f_p_value;
use super::result::{
    DescriptiveTable, GroupStats, SignificanceLevel, StatTestResult, TestKind,
};

/// Sums of squares below this are treated as zero variance.
const VARIANCE_EPSILON: f64 = 1e-12;

/// Full one-way ANOVA decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anova {
    /// Levels with at least one observation, in input order
    pub groups: Vec<GroupStats>,
    /// Total observations
    pub n: usize,
    /// Mean over all observations
    pub grand_mean: f64,
    /// Total sum of squares
    pub ss_total: f64,
    /// Between-group sum of squares
    pub ss_between: f64,
    /// Within-group sum of squares
    pub ss_within: f64,
    /// k − 1
    pub df_between: usize,
    /// N − k
    pub df_within: usize,
    /// F statistic (0 when degenerate)
    pub f: f64,
    /// Approximate p-value (1 when degenerate)
    pub p_value: f64,
    /// Effect size η²
    pub eta_squared: f64,
    /// True when the test could not be carried out
    pub degenerate: bool,
}

impl Anova {
    /// Group with the highest mean.
    #[must_use]
    pub fn highest(&self) -> Option<&GroupStats> {
        self.groups.iter().max_by(|a, b| a.mean.total_cmp(&b.mean))
    }

    /// Group with the lowest mean.
    #[must_use]
    pub fn lowest(&self) -> Option<&GroupStats> {
        self.groups.iter().min_by(|a, b| a.mean.total_cmp(&b.mean))
    }
}

/// Run a one-way ANOVA over `(level, observations)` groups.
///
/// Empty groups are ignored. Fewer than two populated groups, no residual
/// degrees of freedom, zero total variance or zero within-group variance
/// all yield a degenerate result with `p_value = 1`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn one_way_anova(groups: &[(String, Vec<f64>)]) -> Anova {
    let groups: Vec<(&str, &[f64])> = groups
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(level, values)| (level.as_str(), values.as_slice()))
        .collect();

    let n: usize = groups.iter().map(|(_, values)| values.len()).sum();
    let grand_mean = if n == 0 {
        0.0
    } else {
        groups
            .iter()
            .flat_map(|(_, values)| values.iter())
            .sum::<f64>()
            / n as f64
    };

    let stats: Vec<GroupStats> = groups
        .iter()
        .map(|(level, values)| {
            let count = values.len();
            let mean = values.iter().sum::<f64>() / count as f64;
            let variance = if is_constant(values) {
                0.0
            } else {
                values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64
            };
            GroupStats {
                level: (*level).to_string(),
                count,
                mean,
                variance,
            }
        })
        .collect();

    let ss_total: f64 = groups
        .iter()
        .flat_map(|(_, values)| values.iter())
        .map(|x| (x - grand_mean).powi(2))
        .sum();
    let ss_between: f64 = stats
        .iter()
        .map(|g| g.count as f64 * (g.mean - grand_mean).powi(2))
        .sum();
    // pooled from the group variances; SS_total − SS_between cancels badly
    // at large magnitudes
    let ss_within: f64 = stats.iter().map(|g| g.count as f64 * g.variance).sum();

    let k = stats.len();
    let df_between = k.saturating_sub(1);
    let df_within = n.saturating_sub(k);

    let eta_squared = if ss_total > VARIANCE_EPSILON {
        (ss_between / ss_total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let degenerate = df_between == 0
        || df_within == 0
        || ss_total <= VARIANCE_EPSILON
        || ss_within <= VARIANCE_EPSILON;

    let (f, p_value) = if degenerate {
        (0.0, 1.0)
    } else {
        let ms_between = ss_between / df_between as f64;
        let ms_within = ss_within / df_within as f64;
        let f = ms_between / ms_within;
        (f, f_p_value(f, df_between, df_within))
    };

    Anova {
        groups: stats,
        n,
        grand_mean,
        ss_total,
        ss_between,
        ss_within,
        df_between,
        df_within,
        f,
        p_value,
        eta_squared,
        degenerate,
    }
}

/// Every observation equal, so the group variance is exactly zero.
#[allow(clippy::float_cmp)]
fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

/// Turn an ANOVA into a significance claim for `variable` × `factor`.
#[must_use]
pub fn anova_result(variable: &str, factor: &str, anova: Anova, threshold: f64) -> StatTestResult {
    let significance = SignificanceLevel::from_p_value(anova.p_value, threshold);
    let significant = anova.p_value < threshold;

    let summary = match (significant, anova.highest(), anova.lowest()) {
        (true, Some(high), Some(low)) => format!(
            "{factor} has a significant effect on {variable} (p = {:.4}, η² = {:.2}): \
             '{}' has the highest mean ({:.2}) and '{}' the lowest ({:.2}).",
            anova.p_value, anova.eta_squared, high.level, high.mean, low.level, low.mean
        ),
        _ if anova.degenerate => format!(
            "No significant relationship between {factor} and {variable} \
             (insufficient levels or variance to test)."
        ),
        _ => format!(
            "No significant relationship between {factor} and {variable} (p = {:.4}).",
            anova.p_value
        ),
    };

    StatTestResult {
        variable: variable.to_string(),
        factor: factor.to_string(),
        test: TestKind::Anova,
        statistic: anova.f,
        df: anova.df_between,
        df_denominator: Some(anova.df_within),
        sample_size: anova.n,
        p_value: anova.p_value,
        adjusted_p_value: None,
        effect_size: anova.eta_squared,
        significance,
        has_significant_relationship: significant,
        descriptive: DescriptiveTable::Groups {
            groups: anova.groups,
        },
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(data: &[(&str, &[f64])]) -> Vec<(String, Vec<f64>)> {
        data.iter()
            .map(|(l, v)| ((*l).to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn test_hand_computed_two_groups() {
        let anova = one_way_anova(&groups(&[("A", &[1.0, 2.0, 3.0]), ("B", &[4.0, 5.0, 6.0])]));

        assert!((anova.grand_mean - 3.5).abs() < 1e-12);
        assert!((anova.ss_total - 17.5).abs() < 1e-9);
        assert!((anova.ss_between - 13.5).abs() < 1e-9);
        assert!((anova.ss_within - 4.0).abs() < 1e-9);
        assert_eq!((anova.df_between, anova.df_within), (1, 4));
        assert!((anova.f - 13.5).abs() < 1e-9);
        assert!((anova.eta_squared - 13.5 / 17.5).abs() < 1e-12);
        assert!((anova.groups[0].variance - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(anova.highest().unwrap().level, "B");
        assert_eq!(anova.lowest().unwrap().level, "A");
    }

    #[test]
    fn test_result_names_extremes() {
        let anova = one_way_anova(&groups(&[("A", &[1.0, 2.0, 3.0]), ("B", &[4.0, 5.0, 6.0])]));
        let result = anova_result("score", "tone", anova, 0.05);

        assert!(result.has_significant_relationship);
        assert_eq!(result.significance, SignificanceLevel::Low);
        assert!(result.summary.contains("'B' has the highest mean"));
        assert!(result.summary.contains("'A' the lowest"));
    }

    #[test]
    fn test_single_level_is_degenerate() {
        let anova = one_way_anova(&groups(&[("A", &[1.0, 5.0, 9.0])]));
        assert!(anova.degenerate);
        assert!((anova.p_value - 1.0).abs() < f64::EPSILON);
        assert!(!anova.f.is_nan());
    }

    #[test]
    fn test_zero_variance_is_degenerate() {
        let anova = one_way_anova(&groups(&[("A", &[2.0, 2.0]), ("B", &[2.0, 2.0])]));
        assert!(anova.degenerate);
        assert!(anova.eta_squared.abs() < f64::EPSILON);
        let result = anova_result("v", "f", anova, 0.05);
        assert_eq!(result.significance, SignificanceLevel::None);
    }

    #[test]
    fn test_zero_within_variance_is_degenerate() {
        let anova = one_way_anova(&groups(&[("A", &[1.0, 1.0]), ("B", &[3.0, 3.0])]));
        assert!(anova.degenerate);
        assert!((anova.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_constant_groups_at_large_magnitude_are_degenerate() {
        let anova = one_way_anova(&groups(&[
            ("A", &[123_456_789.3; 3]),
            ("B", &[223_456_789.7; 3]),
        ]));
        assert!(anova.ss_within.abs() < f64::EPSILON, "ss_within = {}", anova.ss_within);
        assert!(anova.degenerate);
        assert!((anova.p_value - 1.0).abs() < f64::EPSILON);
        assert!(anova.f.abs() < f64::EPSILON);

        let result = anova_result("v", "f", anova, 0.05);
        assert_eq!(result.significance, SignificanceLevel::None);
        assert!(!result.has_significant_relationship);
    }

    #[test]
    fn test_small_spread_at_large_magnitude_is_tested() {
        let anova = one_way_anova(&groups(&[
            ("A", &[1e8, 1e8 + 1.0, 1e8 + 2.0]),
            ("B", &[2e8, 2e8 + 1.0, 2e8 + 2.0]),
        ]));
        assert!(!anova.degenerate);
        assert!((anova.ss_within - 4.0).abs() < 1e-6);
        assert!(anova.p_value < 0.001);
    }

    #[test]
    fn test_empty_groups_ignored() {
        let anova = one_way_anova(&groups(&[("A", &[]), ("B", &[])]));
        assert_eq!(anova.n, 0);
        assert!(anova.degenerate);
        assert!(anova.groups.is_empty());
    }
}
