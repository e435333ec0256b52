//! End-to-end experiment pipeline: execution, scoring, analysis, correction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{analyze, AnalysisReport};
use crate::config::ExperimentConfig;
use crate::execution::{AnalysisData, CancellationSignal, Orchestrator, ProgressSink};
use crate::provider::{ProviderRegistry, ResponseGenerator};
use crate::scoring::{ExternalScorer, NoExternalScorer, ResponseVariableCalculator, ScoringSummary};
use crate::Result;

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    /// Scored execution results
    pub data: AnalysisData,
    /// Per-variable scoring counters
    pub scoring: ScoringSummary,
    /// Significance tests, corrected if configured
    pub report: AnalysisReport,
}

/// Runs a configured experiment from first request to final report.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use factorlab::config::{ExperimentConfig, Model};
/// use factorlab::design::{Factor, Level};
/// use factorlab::execution::NoopProgressSink;
/// use factorlab::pipeline::Experiment;
/// use factorlab::provider::{EchoGenerator, ProviderRegistry};
/// use factorlab::scoring::{ResponseVariable, ScoringFunction};
///
/// # async fn example() -> factorlab::Result<()> {
/// let mut registry = ProviderRegistry::new();
/// registry.register("echo", EchoGenerator::new());
///
/// let config = ExperimentConfig::builder()
///     .model(Model::new("echo-1", "echo"))
///     .factor(Factor::new("length", vec![
///         Level::new("short", "Answer briefly."),
///         Level::new("long", "Answer in detail, with examples."),
///     ]))
///     .covariate("What is ownership?")
///     .response_variable(ResponseVariable::new("words", ScoringFunction::WordCount))
///     .build();
///
/// let outcome = Experiment::new(registry)
///     .run(&config, Arc::new(NoopProgressSink))
///     .await?;
/// assert!(outcome.report.get("words", "length").is_some());
/// # Ok(())
/// # }
/// ```
pub struct Experiment<G, S = NoExternalScorer> {
    orchestrator: Orchestrator<G>,
    calculator: ResponseVariableCalculator<S>,
}

impl<G: ResponseGenerator + 'static> Experiment<G, NoExternalScorer> {
    /// Pipeline scoring local variables only.
    #[must_use]
    pub fn new(registry: ProviderRegistry<G>) -> Self {
        Self {
            orchestrator: Orchestrator::new(registry),
            calculator: ResponseVariableCalculator::local_only(),
        }
    }
}

impl<G: ResponseGenerator + 'static, S: ExternalScorer> Experiment<G, S> {
    /// Pipeline delegating external variables to `scorer`.
    #[must_use]
    pub fn with_scorer(registry: ProviderRegistry<G>, scorer: S) -> Self {
        Self {
            orchestrator: Orchestrator::new(registry),
            calculator: ResponseVariableCalculator::new(scorer),
        }
    }

    /// Handle for cancelling the execution stage.
    #[must_use]
    pub fn cancellation(&self) -> CancellationSignal {
        self.orchestrator.cancellation()
    }

    /// Execute, score and analyze `config`.
    ///
    /// A cancelled run is still scored and analyzed over the results
    /// recorded before cancellation.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's configuration errors; nothing after
    /// execution fails.
    pub async fn run(
        &self,
        config: &ExperimentConfig,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<ExperimentOutcome> {
        let mut data = self.orchestrator.run(config, Arc::clone(&sink)).await?;
        let scoring = self.calculator.score(&mut data, sink.as_ref()).await;
        let report = analyze(&data);

        info!(
            results = data.results.len(),
            success_rate = data.success_rate(),
            significant = report.significant().len(),
            cancelled = data.cancelled,
            "experiment finished"
        );

        Ok(ExperimentOutcome {
            data,
            scoring,
            report,
        })
    }
}
