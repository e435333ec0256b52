//! Response generation backends
//!
//! The orchestrator talks to backends only through [`ResponseGenerator`].
//! Vendor adapters (HTTP clients per provider) live outside this crate and
//! are injected through a [`ProviderRegistry`] keyed by provider id.
//!
//! # Example
//!
//! ```rust
//! use factorlab::config::Model;
//! use factorlab::provider::{EchoGenerator, ProviderRegistry, ResponseGenerator};
//!
//! # async fn example() -> factorlab::Result<()> {
//! let mut registry = ProviderRegistry::new();
//! registry.register("echo", EchoGenerator::new());
//!
//! let model = Model::new("echo-1", "echo");
//! let generator = registry.resolve(&model)?;
//! let outcome = generator.generate(&model, "hello").await;
//! assert!(outcome.is_success());
//! # Ok(())
//! # }
//! ```

mod echo;

pub use echo::EchoGenerator;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Model;
use crate::{Error, Result};

/// Result of one generation call.
///
/// Ordinary failures (HTTP errors, refusals, rate limits) travel in `error`
/// instead of a panic or an `Err`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// Generated text (empty on failure)
    pub response_text: String,
    /// Provider error message, if the call failed
    pub error: Option<String>,
}

impl GenerationOutcome {
    /// Successful outcome.
    #[must_use]
    pub fn success(response_text: impl Into<String>) -> Self {
        Self {
            response_text: response_text.into(),
            error: None,
        }
    }

    /// Failed outcome carrying the provider's message.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            response_text: String::new(),
            error: Some(error.into()),
        }
    }

    /// True when no error was reported.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A backend able to answer prompts for the models it serves.
pub trait ResponseGenerator: Send + Sync {
    /// Generate a response for `prompt` with `model`.
    ///
    /// Must not panic for ordinary failures; report them in
    /// [`GenerationOutcome::error`]. Timeouts are the implementation's
    /// responsibility.
    fn generate(
        &self,
        model: &Model,
        prompt: &str,
    ) -> impl Future<Output = GenerationOutcome> + Send;
}

/// Generators keyed by provider id.
#[derive(Debug)]
pub struct ProviderRegistry<G> {
    providers: HashMap<String, Arc<G>>,
}

impl<G: ResponseGenerator> ProviderRegistry<G> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register (or replace) the generator for `provider`.
    pub fn register(&mut self, provider: impl Into<String>, generator: G) {
        self.providers.insert(provider.into(), Arc::new(generator));
    }

    /// Register a generator that is already shared elsewhere.
    pub fn register_shared(&mut self, provider: impl Into<String>, generator: Arc<G>) {
        self.providers.insert(provider.into(), generator);
    }

    /// Whether a generator exists for `provider`.
    #[must_use]
    pub fn contains(&self, provider: &str) -> bool {
        self.providers.contains_key(provider)
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Look up the generator serving `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] if the model's provider id is
    /// not registered.
    pub fn resolve(&self, model: &Model) -> Result<Arc<G>> {
        self.providers
            .get(model.provider())
            .cloned()
            .ok_or_else(|| Error::ProviderNotFound {
                model: model.name().to_string(),
                provider: model.provider().to_string(),
            })
    }
}

impl<G: ResponseGenerator> Default for ProviderRegistry<G> {
    fn default() -> Self {
        Self::new()
    }
}
