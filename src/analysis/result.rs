//! Significance test results

use serde::{Deserialize, Serialize};

/// Coarse significance bucket derived from a p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignificanceLevel {
    /// p ≥ threshold
    None,
    /// p < threshold
    Low,
    /// p < 0.01
    Medium,
    /// p < 0.001
    High,
}

impl SignificanceLevel {
    /// Bucket `p_value` against `threshold` (0.05 by default).
    #[must_use]
    pub fn from_p_value(p_value: f64, threshold: f64) -> Self {
        if p_value < 0.001 {
            Self::High
        } else if p_value < 0.01 {
            Self::Medium
        } else if p_value < threshold {
            Self::Low
        } else {
            Self::None
        }
    }
}

impl std::fmt::Display for SignificanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Which test produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// One-way ANOVA on a numeric variable
    Anova,
    /// Chi-squared test of independence on a categorical variable
    ChiSquared,
}

/// Per-level summary of a numeric variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Factor level
    pub level: String,
    /// Observations
    pub count: usize,
    /// Mean
    pub mean: f64,
    /// Population (uncorrected) variance
    pub variance: f64,
}

/// Level × category counts of a categorical variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    /// Row labels (factor levels)
    pub levels: Vec<String>,
    /// Column labels (categories)
    pub categories: Vec<String>,
    /// `counts[row][column]`
    pub counts: Vec<Vec<usize>>,
    /// Row sums
    pub row_totals: Vec<usize>,
    /// Column sums
    pub column_totals: Vec<usize>,
    /// Total observations
    pub grand_total: usize,
}

impl ContingencyTable {
    /// Expected count of a cell under independence.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn expected(&self, row: usize, column: usize) -> f64 {
        if self.grand_total == 0 {
            return 0.0;
        }
        self.row_totals[row] as f64 * self.column_totals[column] as f64
            / self.grand_total as f64
    }
}

/// Descriptive statistics backing a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DescriptiveTable {
    /// Group means for ANOVA
    Groups {
        /// One entry per level with data
        groups: Vec<GroupStats>,
    },
    /// Counts for chi-squared
    Contingency {
        /// The table
        table: ContingencyTable,
    },
}

/// One factor × response variable significance claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatTestResult {
    /// Response variable tested
    pub variable: String,
    /// Factor tested
    pub factor: String,
    /// Test used
    pub test: TestKind,
    /// F or chi-squared statistic
    pub statistic: f64,
    /// Numerator df (ANOVA) or df (chi-squared)
    pub df: usize,
    /// Denominator df (ANOVA only)
    pub df_denominator: Option<usize>,
    /// Observations used
    pub sample_size: usize,
    /// Raw p-value
    pub p_value: f64,
    /// p-value after multiple comparison correction
    pub adjusted_p_value: Option<f64>,
    /// η² (ANOVA) or Cramér's V (chi-squared)
    pub effect_size: f64,
    /// Bucket of the effective p-value
    pub significance: SignificanceLevel,
    /// Whether the effective p-value is below the threshold
    pub has_significant_relationship: bool,
    /// Supporting statistics
    pub descriptive: DescriptiveTable,
    /// Plain-language description of the relationship
    pub summary: String,
}

impl StatTestResult {
    /// Adjusted p-value if corrected, raw p-value otherwise.
    #[must_use]
    pub fn effective_p_value(&self) -> f64 {
        self.adjusted_p_value.unwrap_or(self.p_value)
    }
}
