//! Offline generator that answers without any network call.
//!
//! Useful for dry runs of a design and for tests: the response is a
//! deterministic function of the model name and the prompt.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{GenerationOutcome, ResponseGenerator};
use crate::config::Model;

/// Deterministic echo backend.
#[derive(Debug, Default)]
pub struct EchoGenerator {
    calls: AtomicUsize,
}

impl EchoGenerator {
    /// Create an echo generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `generate` calls served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResponseGenerator for EchoGenerator {
    async fn generate(&self, model: &Model, prompt: &str) -> GenerationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        GenerationOutcome::success(format!("[{}] {prompt}", model.name()))
    }
}
