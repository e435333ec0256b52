//! Experiment configuration
//!
//! Everything a run needs is plain data: models, factors, covariates,
//! response variables, the prompt template and the execution/analysis
//! tunables. Configurations round-trip through JSON.
//!
//! ```rust
//! use factorlab::config::{ExperimentConfig, Model};
//! use factorlab::design::{Factor, Level};
//!
//! let config = ExperimentConfig::builder()
//!     .model(Model::new("gpt-4o", "openai"))
//!     .factor(Factor::new("tone", vec![Level::new("formal", "Answer formally.")]))
//!     .covariate("What is a monad?")
//!     .build();
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.total_trials(), 1);
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::correction::CorrectionMethod;
use crate::design::Factor;
use crate::scoring::ResponseVariable;
use crate::{Error, Result};

/// Pricing metadata in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Cost per million prompt tokens
    pub input_per_million: f64,
    /// Cost per million completion tokens
    pub output_per_million: f64,
}

impl ModelPricing {
    /// Cost of a single call with the given token counts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, input_tokens: usize, output_tokens: usize) -> f64 {
        (input_tokens as f64 * self.input_per_million
            + output_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

/// A backend target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    name: String,
    provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pricing: Option<ModelPricing>,
}

impl Model {
    /// Create a model served by `provider`.
    #[must_use]
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            pricing: None,
        }
    }

    /// Attach pricing metadata.
    #[must_use]
    pub const fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Model name as sent to the provider.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provider id used to resolve the generator.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Pricing metadata, if known.
    #[must_use]
    pub const fn pricing(&self) -> Option<ModelPricing> {
        self.pricing
    }
}

/// How level prompts and the covariate are assembled into one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptTemplate {
    /// Non-empty level prompts followed by the covariate, joined by `separator`.
    Concatenate {
        /// Text placed between parts
        separator: String,
    },
    /// Substitutes `{levels}` (level prompts joined by newlines) and `{covariate}`.
    Template {
        /// Template text
        template: String,
    },
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::Concatenate {
            separator: "\n\n".to_string(),
        }
    }
}

impl PromptTemplate {
    /// Build the prompt for one trial.
    #[must_use]
    pub fn build(&self, level_prompts: &[&str], covariate: &str) -> String {
        match self {
            Self::Concatenate { separator } => level_prompts
                .iter()
                .copied()
                .chain(std::iter::once(covariate))
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(separator),
            Self::Template { template } => template
                .replace("{levels}", &level_prompts.join("\n"))
                .replace("{covariate}", covariate),
        }
    }
}

/// Retry, backoff, circuit breaker and progress tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Attempts per trial, first call included
    pub max_attempts: u32,
    /// First rate-limit backoff; doubles on every retry of the same trial
    pub initial_backoff_ms: u64,
    /// Disable a model once this many errors were recorded
    pub max_total_errors: u32,
    /// Disable a model once this many errors happened in a row
    pub max_consecutive_errors: u32,
    /// Case-insensitive substrings marking an error as rate-limit-like
    pub rate_limit_markers: Vec<String>,
    /// Emit progress every N trial events (disablement and completion always emit)
    pub progress_every: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 10_000,
            max_total_errors: 10,
            max_consecutive_errors: 5,
            rate_limit_markers: ["rate", "limit", "capacity", "too many"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            progress_every: 1,
        }
    }
}

/// Analysis tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// p-value below which a raw result counts as significant
    pub significance_threshold: f64,
    /// Treat the model as an implicit factor
    pub include_model_factor: bool,
    /// Multiple comparison correction applied after testing
    pub correction: Option<CorrectionMethod>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            significance_threshold: 0.05,
            include_model_factor: true,
            correction: None,
        }
    }
}

/// Complete description of one experiment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Backends to run against
    pub models: Vec<Model>,
    /// Factors crossed into combinations
    #[serde(default)]
    pub factors: Vec<Factor>,
    /// Free-text payloads crossed with every combination
    #[serde(default)]
    pub covariates: Vec<String>,
    /// Scoring functions applied to every response
    #[serde(default)]
    pub response_variables: Vec<ResponseVariable>,
    /// Prompt assembly
    #[serde(default)]
    pub prompt_template: PromptTemplate,
    /// Execution tunables
    #[serde(default)]
    pub execution: ExecutionSettings,
    /// Analysis tunables
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

impl ExperimentConfig {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> ExperimentConfigBuilder {
        ExperimentConfigBuilder::default()
    }

    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document does not match the schema.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Json`]
    /// if it cannot be parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Covariates actually crossed with combinations.
    ///
    /// An empty covariate list behaves as a single empty covariate.
    #[must_use]
    pub fn effective_covariates(&self) -> Vec<String> {
        if self.covariates.is_empty() {
            vec![String::new()]
        } else {
            self.covariates.clone()
        }
    }

    /// Number of combinations the design expands to.
    #[must_use]
    pub fn combination_count(&self) -> usize {
        self.factors.iter().map(|f| f.levels().len()).product()
    }

    /// Trial slots per model.
    #[must_use]
    pub fn trials_per_model(&self) -> usize {
        self.combination_count() * self.effective_covariates().len()
    }

    /// Trial slots across all models.
    #[must_use]
    pub fn total_trials(&self) -> usize {
        self.models.len() * self.trials_per_model()
    }

    /// Check every configuration-level requirement.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] for missing models, duplicate names or
    ///   unusable tunables
    /// - [`Error::InvalidDesign`] for factors that cannot form a design
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(Error::InvalidConfig("no models configured".to_string()));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.name().trim().is_empty() {
                return Err(Error::InvalidConfig("model with empty name".to_string()));
            }
            if !seen.insert(model.name()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate model '{}'",
                    model.name()
                )));
            }
        }

        let mut factor_names = HashSet::new();
        for factor in &self.factors {
            if factor.name().trim().is_empty() {
                return Err(Error::InvalidDesign("factor with empty name".to_string()));
            }
            if factor.levels().is_empty() {
                return Err(Error::InvalidDesign(format!(
                    "factor '{}' has no levels",
                    factor.name()
                )));
            }
            if !factor_names.insert(factor.name()) {
                return Err(Error::InvalidDesign(format!(
                    "duplicate factor '{}'",
                    factor.name()
                )));
            }
        }
        if self.analysis.include_model_factor && factor_names.contains(crate::analysis::MODEL_FACTOR)
        {
            return Err(Error::InvalidDesign(format!(
                "factor name '{}' is reserved for the implicit model factor",
                crate::analysis::MODEL_FACTOR
            )));
        }

        let mut variable_names = HashSet::new();
        for variable in &self.response_variables {
            if !variable_names.insert(variable.name()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate response variable '{}'",
                    variable.name()
                )));
            }
        }

        if self.execution.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "execution.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.execution.progress_every == 0 {
            return Err(Error::InvalidConfig(
                "execution.progress_every must be at least 1".to_string(),
            ));
        }
        let threshold = self.analysis.significance_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "analysis.significance_threshold must be in (0, 1), got {threshold}"
            )));
        }

        Ok(())
    }
}

/// Builder for [`ExperimentConfig`].
#[derive(Debug, Default)]
pub struct ExperimentConfigBuilder {
    config: ExperimentConfig,
}

impl ExperimentConfigBuilder {
    /// Add a model.
    #[must_use]
    pub fn model(mut self, model: Model) -> Self {
        self.config.models.push(model);
        self
    }

    /// Add a factor.
    #[must_use]
    pub fn factor(mut self, factor: Factor) -> Self {
        self.config.factors.push(factor);
        self
    }

    /// Add a covariate.
    #[must_use]
    pub fn covariate(mut self, covariate: impl Into<String>) -> Self {
        self.config.covariates.push(covariate.into());
        self
    }

    /// Add a response variable.
    #[must_use]
    pub fn response_variable(mut self, variable: ResponseVariable) -> Self {
        self.config.response_variables.push(variable);
        self
    }

    /// Set the prompt template.
    #[must_use]
    pub fn prompt_template(mut self, template: PromptTemplate) -> Self {
        self.config.prompt_template = template;
        self
    }

    /// Set execution tunables.
    #[must_use]
    pub fn execution(mut self, settings: ExecutionSettings) -> Self {
        self.config.execution = settings;
        self
    }

    /// Set analysis tunables.
    #[must_use]
    pub fn analysis(mut self, settings: AnalysisSettings) -> Self {
        self.config.analysis = settings;
        self
    }

    /// Build the configuration (validation happens at run start).
    #[must_use]
    pub fn build(self) -> ExperimentConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Level;

    fn two_level(name: &str) -> Factor {
        Factor::new(
            name,
            vec![Level::new("a", "level a"), Level::new("b", "level b")],
        )
    }

    #[test]
    fn test_concatenate_skips_empty_parts() {
        let template = PromptTemplate::default();
        assert_eq!(template.build(&["one", "", "two"], ""), "one\n\ntwo");
        assert_eq!(template.build(&[], "cov"), "cov");
    }

    #[test]
    fn test_template_placeholders() {
        let template = PromptTemplate::Template {
            template: "{levels}\n---\n{covariate}".to_string(),
        };
        assert_eq!(template.build(&["x", "y"], "text"), "x\ny\n---\ntext");
    }

    #[test]
    fn test_trial_counts() {
        let config = ExperimentConfig::builder()
            .model(Model::new("m1", "p"))
            .model(Model::new("m2", "p"))
            .factor(two_level("f1"))
            .factor(two_level("f2"))
            .covariate("c1")
            .covariate("c2")
            .covariate("c3")
            .build();

        assert_eq!(config.combination_count(), 4);
        assert_eq!(config.trials_per_model(), 12);
        assert_eq!(config.total_trials(), 24);
    }

    #[test]
    fn test_empty_covariates_behave_as_one() {
        let config = ExperimentConfig::builder()
            .model(Model::new("m", "p"))
            .build();
        assert_eq!(config.effective_covariates(), vec![String::new()]);
        assert_eq!(config.total_trials(), 1);
    }

    #[test]
    fn test_validate_rejects_missing_models() {
        let config = ExperimentConfig::default();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_empty_factor() {
        let config = ExperimentConfig::builder()
            .model(Model::new("m", "p"))
            .factor(Factor::new("empty", vec![]))
            .build();
        assert!(matches!(config.validate(), Err(Error::InvalidDesign(_))));
    }

    #[test]
    fn test_validate_rejects_reserved_factor_name() {
        let config = ExperimentConfig::builder()
            .model(Model::new("m", "p"))
            .factor(two_level("model"))
            .build();
        assert!(matches!(config.validate(), Err(Error::InvalidDesign(_))));
    }

    #[test]
    fn test_json_defaults() {
        let config = ExperimentConfig::from_json_str(
            r#"{ "models": [{ "name": "m", "provider": "echo" }] }"#,
        )
        .unwrap();

        assert_eq!(config.execution.max_attempts, 3);
        assert_eq!(config.execution.initial_backoff_ms, 10_000);
        assert_eq!(config.execution.max_total_errors, 10);
        assert_eq!(config.execution.max_consecutive_errors, 5);
        assert!((config.analysis.significance_threshold - 0.05).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pricing_cost() {
        let pricing = ModelPricing {
            input_per_million: 2.0,
            output_per_million: 8.0,
        };
        assert!((pricing.cost(1_000_000, 500_000) - 6.0).abs() < 1e-9);
    }
}
