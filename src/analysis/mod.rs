//! Statistical Analysis Engine
//!
//! Tests every response variable against every factor:
//!
//! - Numeric variables (every value a finite number): one-way ANOVA
//! - Everything else: chi-squared test of independence
//!
//! When enabled, the model that produced a result is tested as one more
//! factor named [`MODEL_FACTOR`].
//!
//! p-values use closed-form normal approximations of the F and chi-squared
//! tails (see [`distribution`]); they are accurate to roughly two
//! significant digits around the usual thresholds.

pub mod anova;
pub mod chi_squared;
pub mod correction;
pub mod distribution;
pub mod result;

pub use anova::{anova_result, one_way_anova, Anova};
pub use chi_squared::{chi_squared_result, chi_squared_test, contingency_table, ChiSquared};
pub use correction::{adjust_p_values, apply_correction, CorrectionMethod, CORRECTED_ALPHA};
pub use result::{
    ContingencyTable, DescriptiveTable, GroupStats, SignificanceLevel, StatTestResult, TestKind,
};

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ExperimentConfig;
use crate::execution::{AnalysisData, ExecutionResult};
use crate::scoring::MetricValue;

/// Name of the implicit factor that distinguishes models.
pub const MODEL_FACTOR: &str = "model";

/// Every significance claim of an experiment, keyed `variable → factor`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Test results by response variable, then factor
    pub tests: BTreeMap<String, BTreeMap<String, StatTestResult>>,
    /// Correction applied to the whole family, if any
    pub correction: Option<CorrectionMethod>,
}

impl AnalysisReport {
    /// Result for one variable × factor pair.
    #[must_use]
    pub fn get(&self, variable: &str, factor: &str) -> Option<&StatTestResult> {
        self.tests.get(variable)?.get(factor)
    }

    /// All results, ordered by variable then factor.
    pub fn iter(&self) -> impl Iterator<Item = &StatTestResult> {
        self.tests.values().flat_map(BTreeMap::values)
    }

    /// Number of tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tests.values().map(BTreeMap::len).sum()
    }

    /// True when no test was run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Results flagged significant.
    #[must_use]
    pub fn significant(&self) -> Vec<&StatTestResult> {
        self.iter()
            .filter(|r| r.has_significant_relationship)
            .collect()
    }

    /// Correct every result in the report as one family.
    pub fn correct(&mut self, method: CorrectionMethod) {
        let mut results: Vec<&mut StatTestResult> = self
            .tests
            .values_mut()
            .flat_map(BTreeMap::values_mut)
            .collect();
        apply_correction(&mut results, method);
        self.correction = Some(method);
    }
}

/// Analyze a scored run.
#[must_use]
pub fn analyze(data: &AnalysisData) -> AnalysisReport {
    analyze_results(&data.results, &data.config)
}

/// Analyze `results` against the factors of `config`.
///
/// Only successful results carrying a value for a variable take part in
/// that variable's tests. If the configuration names a correction method
/// it is applied before returning.
#[must_use]
pub fn analyze_results(results: &[ExecutionResult], config: &ExperimentConfig) -> AnalysisReport {
    let threshold = config.analysis.significance_threshold;
    let factors = factor_levels(config);
    let mut report = AnalysisReport::default();

    for variable in &config.response_variables {
        let name = variable.name();
        let observations: Vec<(&ExecutionResult, &MetricValue)> = results
            .iter()
            .filter(|r| r.is_success())
            .filter_map(|r| r.value(name).map(|v| (r, v)))
            .collect();
        let numeric = observations.iter().all(|(_, v)| v.is_number());
        debug!(variable = name, observations = observations.len(), numeric, "analyzing variable");

        let mut by_factor = BTreeMap::new();
        for (factor, levels) in &factors {
            let result = if numeric {
                let mut groups: FxHashMap<String, Vec<f64>> = FxHashMap::default();
                for (r, value) in &observations {
                    if let (Some(level), Some(x)) = (level_of(r, factor), value.as_number()) {
                        groups.entry(level).or_default().push(x);
                    }
                }
                let ordered: Vec<(String, Vec<f64>)> = levels
                    .iter()
                    .filter_map(|l| groups.remove(l).map(|values| (l.clone(), values)))
                    .collect();
                anova_result(name, factor, one_way_anova(&ordered), threshold)
            } else {
                let pairs: Vec<(String, String)> = observations
                    .iter()
                    .filter_map(|(r, value)| level_of(r, factor).map(|l| (l, value.label())))
                    .collect();
                let table = contingency_table(levels, &pairs);
                chi_squared_result(name, factor, chi_squared_test(table), threshold)
            };
            by_factor.insert(factor.clone(), result);
        }
        report.tests.insert(name.to_string(), by_factor);
    }

    if let Some(method) = config.analysis.correction {
        report.correct(method);
    }
    info!(
        tests = report.len(),
        significant = report.significant().len(),
        "analysis finished"
    );
    report
}

/// Factors to test with their levels in declared order.
fn factor_levels(config: &ExperimentConfig) -> Vec<(String, Vec<String>)> {
    let mut factors: Vec<(String, Vec<String>)> = config
        .factors
        .iter()
        .map(|f| {
            (
                f.name().to_string(),
                f.levels().iter().map(|l| l.name().to_string()).collect(),
            )
        })
        .collect();
    if config.analysis.include_model_factor {
        factors.push((
            MODEL_FACTOR.to_string(),
            config.models.iter().map(|m| m.name().to_string()).collect(),
        ));
    }
    factors
}

fn level_of(result: &ExecutionResult, factor: &str) -> Option<String> {
    if let Some(level) = result.combination().level_for(factor) {
        return Some(level.name().to_string());
    }
    (factor == MODEL_FACTOR).then(|| result.model().to_string())
}
