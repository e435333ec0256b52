//! # factorlab: Factorial Prompt Experiments
//!
//! **Version**: 0.1.0
//!
//! factorlab measures how prompt design choices affect model responses.
//! Every combination of factor levels is crossed with every covariate and
//! sent to every configured model; responses are scored into response
//! variables and each variable is tested against each factor.
//!
//! ## Pipeline
//!
//! 1. [`design`]: full factorial combinations of factor levels
//! 2. [`execution`]: one task per model with retry, backoff, circuit
//!    breaker, progress reporting and cancellation
//! 3. [`scoring`]: local and external response variables
//! 4. [`analysis`]: one-way ANOVA or chi-squared per variable × factor,
//!    plus Bonferroni, Holm or Benjamini-Hochberg correction
//!
//! [`pipeline::Experiment`] chains all four.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use factorlab::config::ExperimentConfig;
//! use factorlab::execution::NoopProgressSink;
//! use factorlab::pipeline::Experiment;
//! use factorlab::provider::{EchoGenerator, ProviderRegistry};
//!
//! # async fn example() -> factorlab::Result<()> {
//! let config = ExperimentConfig::from_path("experiment.json")?;
//!
//! let mut registry = ProviderRegistry::new();
//! registry.register("echo", EchoGenerator::new());
//!
//! let outcome = Experiment::new(registry)
//!     .run(&config, Arc::new(NoopProgressSink))
//!     .await?;
//! for result in outcome.report.significant() {
//!     println!("{}", result.summary);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod analysis;
pub mod config;
pub mod design;
pub mod error;
pub mod execution;
pub mod pipeline;
pub mod provider;
pub mod scoring;

pub use error::{Error, Result};
