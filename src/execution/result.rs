//! Trial results and the data handed to analysis

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::progress::ModelProgress;
use crate::config::ExperimentConfig;
use crate::design::Combination;
use crate::scoring::MetricValue;

/// Rough prompt/response token estimate used for cost reporting.
const CHARS_PER_TOKEN: usize = 4;

/// One completed (or permanently failed) trial.
///
/// Trial fields never change after creation. Response variable values
/// are filled in exactly once by the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    model: String,
    combination: Combination,
    covariate_index: usize,
    prompt: String,
    response_text: String,
    success: bool,
    error: Option<String>,
    attempts: u32,
    completed_at: DateTime<Utc>,
    values: BTreeMap<String, MetricValue>,
}

impl ExecutionResult {
    /// Successful trial.
    #[must_use]
    pub fn success(
        model: impl Into<String>,
        combination: Combination,
        covariate_index: usize,
        prompt: impl Into<String>,
        response_text: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            combination,
            covariate_index,
            prompt: prompt.into(),
            response_text: response_text.into(),
            success: true,
            error: None,
            attempts: 1,
            completed_at: Utc::now(),
            values: BTreeMap::new(),
        }
    }

    /// Trial that exhausted its attempts or hit a non-retryable error.
    #[must_use]
    pub fn failure(
        model: impl Into<String>,
        combination: Combination,
        covariate_index: usize,
        prompt: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            combination,
            covariate_index,
            prompt: prompt.into(),
            response_text: String::new(),
            success: false,
            error: Some(error.into()),
            attempts: 1,
            completed_at: Utc::now(),
            values: BTreeMap::new(),
        }
    }

    /// Record how many attempts the trial used.
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Attach a response variable value (used when assembling results by hand).
    #[must_use]
    pub fn with_value(mut self, variable: impl Into<String>, value: MetricValue) -> Self {
        self.values.insert(variable.into(), value);
        self
    }

    /// Model that produced the trial.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Factor/level assignment of the trial.
    #[must_use]
    pub const fn combination(&self) -> &Combination {
        &self.combination
    }

    /// Index of the covariate used.
    #[must_use]
    pub const fn covariate_index(&self) -> usize {
        self.covariate_index
    }

    /// Prompt sent to the model.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Raw response text (empty for failed trials).
    #[must_use]
    pub fn response_text(&self) -> &str {
        &self.response_text
    }

    /// Whether the trial produced a response.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Last provider error for failed trials.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Attempts used, first call included.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// When the trial resolved.
    #[must_use]
    pub const fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Computed response variable values.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, MetricValue> {
        &self.values
    }

    /// Value of one response variable.
    #[must_use]
    pub fn value(&self, variable: &str) -> Option<&MetricValue> {
        self.values.get(variable)
    }

    pub(crate) fn set_value(&mut self, variable: &str, value: MetricValue) {
        self.values.entry(variable.to_string()).or_insert(value);
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisData {
    /// Configuration the run used
    pub config: ExperimentConfig,
    /// Trial results, grouped by model in configuration order
    pub results: Vec<ExecutionResult>,
    /// Final per-model progress, in configuration order
    pub progress: Vec<ModelProgress>,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Whether the run stopped on a cancellation request
    pub cancelled: bool,
}

impl AnalysisData {
    /// Successful results only.
    pub fn successful(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    /// Completed share of all trial slots, 0.0..=1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let total: usize = self.progress.iter().map(ModelProgress::total).sum();
        if total == 0 {
            return 0.0;
        }
        let completed: usize = self.progress.iter().map(ModelProgress::completed).sum();
        completed as f64 / total as f64
    }

    /// Estimated spend in USD for models with pricing metadata.
    ///
    /// Tokens are approximated as one per four characters of prompt and
    /// response text.
    #[must_use]
    pub fn estimated_cost(&self) -> f64 {
        self.successful()
            .filter_map(|result| {
                let pricing = self
                    .config
                    .models
                    .iter()
                    .find(|m| m.name() == result.model())?
                    .pricing()?;
                Some(pricing.cost(
                    result.prompt().len().div_ceil(CHARS_PER_TOKEN),
                    result.response_text().len().div_ceil(CHARS_PER_TOKEN),
                ))
            })
            .sum()
    }
}
