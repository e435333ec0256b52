//! Chi-squared test of independence for categorical response variables

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::distribution::chi_squared_p_value;
use super::result::{
    ContingencyTable, DescriptiveTable, SignificanceLevel, StatTestResult, TestKind,
};

/// Cell with the largest absolute standardized residual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualCell {
    /// Factor level (row)
    pub level: String,
    /// Category (column)
    pub category: String,
    /// Observed count
    pub observed: usize,
    /// Expected count under independence
    pub expected: f64,
    /// (observed − expected) / sqrt(expected)
    pub residual: f64,
}

/// Chi-squared decomposition of a contingency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChiSquared {
    /// Observed counts with margins
    pub table: ContingencyTable,
    /// χ² statistic
    pub statistic: f64,
    /// (rows − 1)(columns − 1)
    pub df: usize,
    /// Approximate p-value (1 when degenerate)
    pub p_value: f64,
    /// Effect size
    pub cramers_v: f64,
    /// Most surprising cell, if any cell has a positive expected count
    pub strongest: Option<ResidualCell>,
    /// True when the test could not be carried out
    pub degenerate: bool,
}

/// Build a contingency table from `(level, category)` observations.
///
/// Rows follow `levels` order, keeping only levels with data; columns are
/// the observed categories in sorted order.
#[must_use]
pub fn contingency_table(levels: &[String], observations: &[(String, String)]) -> ContingencyTable {
    let categories: Vec<String> = observations
        .iter()
        .map(|(_, c)| c.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let column_of: FxHashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let mut counts: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    for (level, category) in observations {
        let row = counts
            .entry(level.as_str())
            .or_insert_with(|| vec![0; categories.len()]);
        row[column_of[category.as_str()]] += 1;
    }

    let mut table = ContingencyTable {
        categories,
        ..ContingencyTable::default()
    };
    for level in levels {
        if let Some(row) = counts.remove(level.as_str()) {
            table.levels.push(level.clone());
            table.counts.push(row);
        }
    }

    table.row_totals = table.counts.iter().map(|row| row.iter().sum()).collect();
    table.column_totals = (0..table.categories.len())
        .map(|c| table.counts.iter().map(|row| row[c]).sum())
        .collect();
    table.grand_total = table.row_totals.iter().sum();
    table
}

/// Run the chi-squared test on `table`.
///
/// A table with a single row or a single column has `df = 0` and yields a
/// degenerate result with `p_value = 1` and `cramers_v = 0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn chi_squared_test(table: ContingencyTable) -> ChiSquared {
    let rows = table.levels.len();
    let columns = table.categories.len();

    let mut statistic = 0.0;
    let mut strongest: Option<ResidualCell> = None;
    for (r, row) in table.counts.iter().enumerate() {
        for (c, &observed) in row.iter().enumerate() {
            let expected = table.expected(r, c);
            if expected <= 0.0 {
                continue;
            }
            let diff = observed as f64 - expected;
            statistic += diff * diff / expected;

            let residual = diff / expected.sqrt();
            if strongest
                .as_ref()
                .map_or(true, |s| residual.abs() > s.residual.abs())
            {
                strongest = Some(ResidualCell {
                    level: table.levels[r].clone(),
                    category: table.categories[c].clone(),
                    observed,
                    expected,
                    residual,
                });
            }
        }
    }

    let df = rows.saturating_sub(1) * columns.saturating_sub(1);
    let min_dim = rows.saturating_sub(1).min(columns.saturating_sub(1));
    let degenerate = df == 0 || table.grand_total == 0;

    let (p_value, cramers_v) = if degenerate {
        (1.0, 0.0)
    } else {
        let v = (statistic / (table.grand_total as f64 * min_dim as f64)).sqrt();
        (chi_squared_p_value(statistic, df), v.clamp(0.0, 1.0))
    };

    ChiSquared {
        table,
        statistic: if degenerate { 0.0 } else { statistic },
        df,
        p_value,
        cramers_v,
        strongest,
        degenerate,
    }
}

/// Turn a chi-squared test into a significance claim for `variable` × `factor`.
#[must_use]
pub fn chi_squared_result(
    variable: &str,
    factor: &str,
    test: ChiSquared,
    threshold: f64,
) -> StatTestResult {
    let significance = SignificanceLevel::from_p_value(test.p_value, threshold);
    let significant = test.p_value < threshold;

    let summary = match (&test.strongest, significant) {
        (Some(cell), true) => {
            let direction = if cell.residual > 0.0 {
                "more likely"
            } else {
                "less likely"
            };
            format!(
                "{factor} is associated with {variable} (p = {:.4}, Cramér's V = {:.2}): \
                 '{}' is {direction} when {factor} is '{}' ({} observed vs {:.1} expected).",
                test.p_value, test.cramers_v, cell.category, cell.level, cell.observed, cell.expected
            )
        }
        _ if test.degenerate => format!(
            "No significant relationship between {factor} and {variable} \
             (a single level or category cannot be tested)."
        ),
        _ => format!(
            "No significant relationship between {factor} and {variable} (p = {:.4}).",
            test.p_value
        ),
    };

    StatTestResult {
        variable: variable.to_string(),
        factor: factor.to_string(),
        test: TestKind::ChiSquared,
        statistic: test.statistic,
        df: test.df,
        df_denominator: None,
        sample_size: test.table.grand_total,
        p_value: test.p_value,
        adjusted_p_value: None,
        effect_size: test.cramers_v,
        significance,
        has_significant_relationship: significant,
        descriptive: DescriptiveTable::Contingency { table: test.table },
        summary,
    }
}
