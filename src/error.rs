//! Error types for factorlab
//!
//! Only configuration-level problems surface as errors. Trial failures,
//! scoring failures and statistical degeneracy are recovered locally and
//! reported through result data and progress instead.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// factorlab error types
#[derive(Error, Debug)]
pub enum Error {
    /// Experiment configuration is unusable
    #[error("Invalid configuration: {0}\nFix the experiment configuration before starting a run.")]
    InvalidConfig(String),

    /// Factor/level definitions cannot produce a design
    #[error("Malformed design: {0}")]
    InvalidDesign(String),

    /// A model names a provider with no registered generator
    #[error("No provider registered for '{provider}' (model '{model}')\nRegister a generator for this provider id or remove the model.")]
    ProviderNotFound {
        /// Model name from the configuration
        model: String,
        /// Provider id the model asked for
        provider: String,
    },

    /// A scoring function could not produce a value
    #[error("Scoring failed for '{variable}': {message}")]
    Scoring {
        /// Response variable name
        variable: String,
        /// Failure detail
        message: String,
    },

    /// A model task panicked or was aborted by the runtime
    #[error("Execution task failed: {0}")]
    TaskFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
