//! Execution Orchestrator
//!
//! Drives every (covariate × combination) trial against every configured
//! model.
//!
//! ## Scheduling
//!
//! - One tokio task per model; models run concurrently
//! - Inside a task trials run strictly in sequence, one request in flight
//! - Backoff sleeps suspend only the sleeping model's task
//!
//! ## Resilience
//!
//! - Up to `max_attempts` calls per trial
//! - Rate-limit-like errors back off exponentially and retry
//! - Any other error fails the trial immediately
//! - The circuit breaker disables a model after too many errors and fails
//!   its remaining slots in bulk without further calls
//!
//! Per-trial failures never fail the run; only configuration problems do.

mod cancel;
mod progress;
mod result;
mod retry;

pub use cancel::CancellationSignal;
pub use progress::{
    ChannelProgressSink, ErrorRecord, ModelProgress, NoopProgressSink, ProgressSink,
    ProgressSnapshot, ProgressStage, ScoringProgress,
};
pub use result::{AnalysisData, ExecutionResult};
pub use retry::{backoff_delay, is_rate_limited};

use std::sync::Arc;

use chrono::Utc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{ExecutionSettings, ExperimentConfig, Model};
use crate::design::{generate_combinations, trial_slots, Combination};
use crate::provider::{GenerationOutcome, ProviderRegistry, ResponseGenerator};
use crate::{Error, Result};
use progress::ProgressTracker;

/// A trial slot with its prompt already assembled.
#[derive(Debug)]
struct PlannedTrial {
    combination_index: usize,
    covariate_index: usize,
    prompt: String,
}

/// Trial order shared by every model task.
#[derive(Debug)]
struct TrialPlan {
    combinations: Vec<Combination>,
    trials: Vec<PlannedTrial>,
}

impl TrialPlan {
    fn build(config: &ExperimentConfig) -> Self {
        let combinations = generate_combinations(&config.factors);
        let covariates = config.effective_covariates();
        let trials = trial_slots(combinations.len(), covariates.len())
            .into_iter()
            .map(|slot| {
                let combination = &combinations[slot.combination_index];
                PlannedTrial {
                    combination_index: slot.combination_index,
                    covariate_index: slot.covariate_index,
                    prompt: config
                        .prompt_template
                        .build(&combination.level_prompts(), &covariates[slot.covariate_index]),
                }
            })
            .collect();
        Self {
            combinations,
            trials,
        }
    }
}

/// What one model task hands back.
struct ModelOutcome {
    progress: ModelProgress,
    results: Vec<ExecutionResult>,
    cancelled: bool,
}

/// Runs experiments against the generators in a [`ProviderRegistry`].
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use factorlab::config::{ExperimentConfig, Model};
/// use factorlab::execution::{NoopProgressSink, Orchestrator};
/// use factorlab::provider::{EchoGenerator, ProviderRegistry};
///
/// # async fn example() -> factorlab::Result<()> {
/// let mut registry = ProviderRegistry::new();
/// registry.register("echo", EchoGenerator::new());
///
/// let config = ExperimentConfig::builder()
///     .model(Model::new("echo-1", "echo"))
///     .covariate("Explain borrowing.")
///     .build();
///
/// let data = Orchestrator::new(registry)
///     .run(&config, Arc::new(NoopProgressSink))
///     .await?;
/// assert_eq!(data.results.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator<G> {
    registry: Arc<ProviderRegistry<G>>,
    cancellation: CancellationSignal,
}

impl<G: ResponseGenerator + 'static> Orchestrator<G> {
    /// Create an orchestrator over `registry`.
    #[must_use]
    pub fn new(registry: ProviderRegistry<G>) -> Self {
        Self {
            registry: Arc::new(registry),
            cancellation: CancellationSignal::new(),
        }
    }

    /// Use an externally owned cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, signal: CancellationSignal) -> Self {
        self.cancellation = signal;
        self
    }

    /// Handle for cancelling runs of this orchestrator.
    #[must_use]
    pub fn cancellation(&self) -> CancellationSignal {
        self.cancellation.clone()
    }

    /// Execute every trial of `config` and collect the results.
    ///
    /// `sink` is called synchronously after every observable state change.
    /// Cancellation stops all models before their next attempt or sleep;
    /// results recorded until then are kept and `cancelled` is set.
    ///
    /// # Errors
    ///
    /// Fails before any call is made if the configuration is invalid or a
    /// model's provider is not registered. Trial failures never fail the run.
    pub async fn run(
        &self,
        config: &ExperimentConfig,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<AnalysisData> {
        config.validate()?;
        let generators = config
            .models
            .iter()
            .map(|model| self.registry.resolve(model))
            .collect::<Result<Vec<_>>>()?;

        let started_at = Utc::now();
        let plan = Arc::new(TrialPlan::build(config));
        let per_model = plan.trials.len();
        info!(
            models = config.models.len(),
            combinations = plan.combinations.len(),
            trials = per_model * config.models.len(),
            "starting experiment run"
        );

        let tracker = Arc::new(ProgressTracker::new(
            config
                .models
                .iter()
                .map(|m| ModelProgress::new(m.name(), per_model))
                .collect(),
            sink,
        ));
        tracker.emit();

        let handles: Vec<_> = config
            .models
            .iter()
            .zip(generators)
            .map(|(model, generator)| {
                let span = info_span!("model", model = %model.name(), provider = %model.provider());
                let task = ModelTask {
                    model: model.clone(),
                    generator,
                    plan: Arc::clone(&plan),
                    settings: config.execution.clone(),
                    tracker: Arc::clone(&tracker),
                    cancellation: self.cancellation.clone(),
                };
                tokio::spawn(task.run().instrument(span))
            })
            .collect();

        let mut results = Vec::with_capacity(per_model * config.models.len());
        let mut progress = Vec::with_capacity(config.models.len());
        let mut cancelled = false;
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        for handle in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // dropped handles detach; stop the other models explicitly
                    aborts.iter().for_each(AbortHandle::abort);
                    return Err(Error::TaskFailed(e.to_string()));
                }
            };
            results.extend(outcome.results);
            progress.push(outcome.progress);
            cancelled |= outcome.cancelled;
        }

        info!(
            completed = progress.iter().map(ModelProgress::completed).sum::<usize>(),
            failed = progress.iter().map(ModelProgress::failed).sum::<usize>(),
            cancelled,
            "experiment run finished"
        );

        Ok(AnalysisData {
            config: config.clone(),
            results,
            progress,
            started_at,
            finished_at: Utc::now(),
            cancelled,
        })
    }
}

/// Sequential trial loop for one model.
struct ModelTask<G> {
    model: Model,
    generator: Arc<G>,
    plan: Arc<TrialPlan>,
    settings: ExecutionSettings,
    tracker: Arc<ProgressTracker>,
    cancellation: CancellationSignal,
}

impl<G: ResponseGenerator> ModelTask<G> {
    async fn run(self) -> ModelOutcome {
        let mut progress = ModelProgress::new(self.model.name(), self.plan.trials.len());
        let mut results = Vec::new();
        let mut events = 0usize;
        let mut unreported = false;
        let mut cancelled = false;

        'trials: for trial in &self.plan.trials {
            let combination = &self.plan.combinations[trial.combination_index];
            let mut attempt = 0u32;

            loop {
                if self.cancellation.is_cancelled() {
                    cancelled = true;
                    break 'trials;
                }
                attempt += 1;

                let GenerationOutcome {
                    response_text,
                    error,
                } = self.generator.generate(&self.model, &trial.prompt).await;
                let Some(message) = error else {
                    debug!(attempt, covariate = trial.covariate_index, "trial completed");
                    progress.record_success();
                    results.push(
                        ExecutionResult::success(
                            self.model.name(),
                            combination.clone(),
                            trial.covariate_index,
                            trial.prompt.clone(),
                            response_text,
                        )
                        .with_attempts(attempt),
                    );
                    self.tracker.publish(&progress, 1, 0);
                    unreported = self.report(&mut events);
                    continue 'trials;
                };

                let rate_limited = is_rate_limited(&message, &self.settings.rate_limit_markers);
                warn!(attempt, rate_limited, error = %message, "provider returned an error");
                progress.record_error(message.clone(), rate_limited);

                if progress.breaker_tripped(&self.settings) {
                    let bulk = progress.disable();
                    warn!(
                        errors = progress.error_count(),
                        consecutive = progress.consecutive_error_count(),
                        skipped = bulk,
                        "circuit breaker open, disabling model"
                    );
                    self.tracker.publish(&progress, 0, bulk);
                    self.tracker.emit();
                    unreported = false;
                    break 'trials;
                }

                if rate_limited && attempt < self.settings.max_attempts {
                    if self.cancellation.is_cancelled() {
                        cancelled = true;
                        break 'trials;
                    }
                    let delay = backoff_delay(&self.settings, attempt - 1);
                    debug!(?delay, "rate limited, backing off");
                    if !self.cancellation.sleep(delay).await {
                        cancelled = true;
                        break 'trials;
                    }
                    continue;
                }

                progress.record_failure();
                results.push(
                    ExecutionResult::failure(
                        self.model.name(),
                        combination.clone(),
                        trial.covariate_index,
                        trial.prompt.clone(),
                        message,
                    )
                    .with_attempts(attempt),
                );
                self.tracker.publish(&progress, 0, 1);
                unreported = self.report(&mut events);
                continue 'trials;
            }
        }

        if unreported {
            self.tracker.emit();
        }
        if cancelled {
            info!(remaining = progress.remaining(), "model stopped by cancellation");
        } else {
            info!(
                completed = progress.completed(),
                failed = progress.failed(),
                disabled = progress.is_disabled(),
                "model finished"
            );
        }

        ModelOutcome {
            progress,
            results,
            cancelled,
        }
    }

    /// Count a trial event and emit if due; returns whether it is still unreported.
    fn report(&self, events: &mut usize) -> bool {
        *events += 1;
        if *events % self.settings.progress_every == 0 {
            self.tracker.emit();
            false
        } else {
            true
        }
    }
}
