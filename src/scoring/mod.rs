//! Response variables and the calculator that scores responses
//!
//! A response variable is data: a name, a [`ScoringFunction`] from a fixed
//! catalogue, and optional static configuration. Local functions are
//! computed in-process; external functions are delegated to an
//! [`ExternalScorer`] (typically another model call).
//!
//! | Function | Kind | Result |
//! |---|---|---|
//! | `word_count` | local | numeric |
//! | `character_count` | local | numeric |
//! | `sentence_count` | local | numeric |
//! | `keyword_count` | local | numeric |
//! | `contains_keyword` | local | categorical (`yes`/`no`) |
//! | `length_bucket` | local | categorical (`short`/`medium`/`long`) |
//! | `sentiment` | external | categorical |
//! | `rating` | external | numeric |
//! | `classification` | external | categorical |

mod calculator;
mod local;

pub use calculator::{ResponseVariableCalculator, ScoringSummary};

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Categorical sentinel substituted when a value cannot be computed.
pub const CATEGORY_SENTINEL: &str = "error";

/// Whether a variable yields numbers or categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// Numeric values
    Numeric,
    /// Category labels
    Categorical,
}

/// Where a scoring function is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringKind {
    /// In-process, synchronous
    Local,
    /// Needs an external call
    External,
}

/// Catalogue of scoring functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum ScoringFunction {
    /// Whitespace-separated words
    WordCount,
    /// Unicode scalar values
    CharacterCount,
    /// Runs of text terminated by `.`, `!` or `?`
    SentenceCount,
    /// Case-insensitive occurrences of `keyword`
    KeywordCount {
        /// Text to count
        keyword: String,
    },
    /// `yes` if `keyword` occurs (case-insensitive), else `no`
    ContainsKeyword {
        /// Text to look for
        keyword: String,
    },
    /// Word count bucketed into `short` (≤ `short_max`), `long` (≥ `long_min`) or `medium`
    LengthBucket {
        /// Largest word count still considered short
        short_max: usize,
        /// Smallest word count considered long
        long_min: usize,
    },
    /// Sentiment label from an external classifier
    Sentiment,
    /// Numeric rating of the response against `criteria`
    Rating {
        /// What the rater should judge
        criteria: String,
    },
    /// One of `labels`, chosen by an external classifier
    Classification {
        /// Allowed labels
        labels: Vec<String>,
    },
}

impl ScoringFunction {
    /// Where the function runs.
    #[must_use]
    pub const fn kind(&self) -> ScoringKind {
        match self {
            Self::Sentiment | Self::Rating { .. } | Self::Classification { .. } => {
                ScoringKind::External
            }
            _ => ScoringKind::Local,
        }
    }

    /// What the function yields.
    #[must_use]
    pub const fn result_type(&self) -> ResultType {
        match self {
            Self::WordCount
            | Self::CharacterCount
            | Self::SentenceCount
            | Self::KeywordCount { .. }
            | Self::Rating { .. } => ResultType::Numeric,
            Self::ContainsKeyword { .. }
            | Self::LengthBucket { .. }
            | Self::Sentiment
            | Self::Classification { .. } => ResultType::Categorical,
        }
    }

    /// Whether the function needs an external call.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self.kind(), ScoringKind::External)
    }
}

/// A scoring function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseVariable {
    name: String,
    #[serde(flatten)]
    function: ScoringFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    config: Option<serde_json::Value>,
}

impl ResponseVariable {
    /// Create a variable computed by `function`.
    #[must_use]
    pub fn new(name: impl Into<String>, function: ScoringFunction) -> Self {
        Self {
            name: name.into(),
            function,
            config: None,
        }
    }

    /// Attach static configuration passed to external scorers.
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scoring function.
    #[must_use]
    pub const fn function(&self) -> &ScoringFunction {
        &self.function
    }

    /// Static configuration.
    #[must_use]
    pub const fn config(&self) -> Option<&serde_json::Value> {
        self.config.as_ref()
    }

    /// Value used in place of a failed computation.
    #[must_use]
    pub fn sentinel(&self) -> MetricValue {
        MetricValue::sentinel(self.function.result_type())
    }
}

/// A computed response variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Numeric value
    Number(f64),
    /// Category label
    Category(String),
}

impl MetricValue {
    /// Sentinel for `result_type`: `0` or [`CATEGORY_SENTINEL`].
    #[must_use]
    pub fn sentinel(result_type: ResultType) -> Self {
        match result_type {
            ResultType::Numeric => Self::Number(0.0),
            ResultType::Categorical => Self::Category(CATEGORY_SENTINEL.to_string()),
        }
    }

    /// Numeric value, if this is one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Category(_) => None,
        }
    }

    /// Whether this is a finite number.
    #[must_use]
    pub fn is_number(&self) -> bool {
        self.as_number().is_some_and(f64::is_finite)
    }

    /// Category label; numbers render as text.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Category(c) => write!(f, "{c}"),
        }
    }
}

/// Backend for scoring functions that need an external call.
pub trait ExternalScorer: Send + Sync {
    /// Score `response_text` with `function`.
    ///
    /// Failures are allowed; the calculator replaces them with a sentinel.
    fn score(
        &self,
        function: &ScoringFunction,
        response_text: &str,
        config: Option<&serde_json::Value>,
    ) -> impl Future<Output = Result<MetricValue>> + Send;
}

/// Scorer for runs without external variables; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExternalScorer;

impl ExternalScorer for NoExternalScorer {
    async fn score(
        &self,
        _function: &ScoringFunction,
        _response_text: &str,
        _config: Option<&serde_json::Value>,
    ) -> Result<MetricValue> {
        Err(Error::Other("no external scorer configured".to_string()))
    }
}
