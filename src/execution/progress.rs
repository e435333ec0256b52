//! Run progress: per-model state, snapshots and observers
//!
//! ## Ownership
//!
//! ```text
//! model task ──owns──> ModelProgress ──publish──> ProgressTracker
//!                                                   ├── DashMap<model, ModelProgress>
//!                                                   ├── AtomicUsize completed / failed
//!                                                   └── ProgressSink (observer)
//! ```
//!
//! Each model task is the only writer of its own [`ModelProgress`]; it
//! publishes a copy after every state change. The aggregate counters are
//! atomics, so the tracker is eventually consistent with the per-model
//! events, and events of one model arrive in trial order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::ExecutionSettings;

/// One provider error observed for a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Provider message
    pub message: String,
    /// When the error was observed
    pub timestamp: DateTime<Utc>,
    /// Whether the message was classified as rate-limit-like
    pub rate_limited: bool,
}

/// Running state for one backend during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProgress {
    model: String,
    total: usize,
    completed: usize,
    failed: usize,
    errors: Vec<ErrorRecord>,
    error_count: u32,
    consecutive_error_count: u32,
    disabled: bool,
}

impl ModelProgress {
    /// Fresh progress for a model with `total` trial slots.
    #[must_use]
    pub fn new(model: impl Into<String>, total: usize) -> Self {
        Self {
            model: model.into(),
            total,
            completed: 0,
            failed: 0,
            errors: Vec::new(),
            error_count: 0,
            consecutive_error_count: 0,
            disabled: false,
        }
    }

    /// Model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Trial slots assigned to this model.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Trials that produced a response.
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// Trials that failed, including slots failed in bulk on disablement.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Slots not yet resolved.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total - self.completed - self.failed
    }

    /// Every error observed, in order.
    #[must_use]
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Errors observed since the start of the run.
    #[must_use]
    pub const fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Errors observed since the last success.
    #[must_use]
    pub const fn consecutive_error_count(&self) -> u32 {
        self.consecutive_error_count
    }

    /// Whether the circuit breaker disabled this model.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// All slots resolved.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Resolved share of slots, 0..=100.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed + self.failed) as f64 * 100.0 / self.total as f64
    }

    pub(crate) fn record_success(&mut self) {
        self.consecutive_error_count = 0;
        self.completed += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>, rate_limited: bool) {
        self.errors.push(ErrorRecord {
            message: message.into(),
            timestamp: Utc::now(),
            rate_limited,
        });
        self.error_count += 1;
        self.consecutive_error_count += 1;
    }

    /// Circuit breaker condition.
    #[must_use]
    pub const fn breaker_tripped(&self, settings: &ExecutionSettings) -> bool {
        self.error_count >= settings.max_total_errors
            || self.consecutive_error_count >= settings.max_consecutive_errors
    }

    /// Disable the model and fail every remaining slot; returns how many.
    pub(crate) fn disable(&mut self) -> usize {
        let remaining = self.remaining();
        self.failed += remaining;
        self.disabled = true;
        remaining
    }
}

/// Pipeline stage a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStage {
    /// Trials are being executed
    Execution,
    /// External response variables are being computed
    ResponseVariableScoring,
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execution => write!(f, "execution"),
            Self::ResponseVariableScoring => write!(f, "response-variable-scoring"),
        }
    }
}

/// Counters for the response variable currently being scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringProgress {
    /// Variable being computed
    pub variable: String,
    /// Results to score
    pub total: usize,
    /// Values computed
    pub completed: usize,
    /// Values replaced by a sentinel
    pub failed: usize,
}

/// Immutable view of the run at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Current stage
    pub stage: ProgressStage,
    /// Trial slots across all models
    pub total: usize,
    /// Completed trials across all models
    pub completed: usize,
    /// Failed trials across all models
    pub failed: usize,
    /// Per-model state, keyed by model name
    pub models: BTreeMap<String, ModelProgress>,
    /// Scoring counters (scoring stage only)
    pub scoring: Option<ScoringProgress>,
}

impl ProgressSnapshot {
    /// Resolved share of all trial slots, 0..=100.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed + self.failed) as f64 * 100.0 / self.total as f64
    }
}

/// Observer notified synchronously after every state change.
pub trait ProgressSink: Send + Sync {
    /// Receive a snapshot.
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressSnapshot) + Send + Sync,
{
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self(snapshot);
    }
}

/// Sink that discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_progress(&self, _snapshot: &ProgressSnapshot) {}
}

/// Sink forwarding snapshots into an unbounded tokio channel.
///
/// Snapshots are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    sender: mpsc::UnboundedSender<ProgressSnapshot>,
}

impl ChannelProgressSink {
    /// Create a sink and the receiver consuming it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressSnapshot>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        let _ = self.sender.send(snapshot.clone());
    }
}

/// Aggregates per-model progress published by concurrent model tasks.
pub(crate) struct ProgressTracker {
    models: DashMap<String, ModelProgress>,
    total: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressTracker {
    pub(crate) fn new(initial: Vec<ModelProgress>, sink: Arc<dyn ProgressSink>) -> Self {
        let total = initial.iter().map(ModelProgress::total).sum();
        let models = DashMap::with_capacity(initial.len());
        for progress in initial {
            models.insert(progress.model().to_string(), progress);
        }
        Self {
            models,
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            sink,
        }
    }

    /// Publish a model's state along with the counter deltas it caused.
    pub(crate) fn publish(&self, progress: &ModelProgress, completed: usize, failed: usize) {
        self.models
            .insert(progress.model().to_string(), progress.clone());
        self.completed.fetch_add(completed, Ordering::SeqCst);
        self.failed.fetch_add(failed, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> ProgressSnapshot {
        let models = self
            .models
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        ProgressSnapshot {
            stage: ProgressStage::Execution,
            total: self.total,
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            models,
            scoring: None,
        }
    }

    pub(crate) fn emit(&self) {
        self.sink.on_progress(&self.snapshot());
    }
}
