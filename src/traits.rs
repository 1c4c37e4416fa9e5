//! Core inference capability traits.
//!
//! The language model is consumed as an opaque capability: given a prompt
//! and sampling options it returns generated text, asynchronously and
//! fallibly. Loading the model is a separate concern handled by a
//! [`ModelLoader`], driven once by the
//! [`ReadinessGate`](crate::model::ReadinessGate).

use std::sync::Arc;

use async_trait::async_trait;

use crate::{GenerateOptions, Result};

/// A loaded text generation model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generator name for logging/debugging.
    fn name(&self) -> &str;

    /// Generate a continuation of `prompt`.
    ///
    /// Returns only the newly generated text (never the prompt itself).
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String>;
}

/// Produces a ready [`TextGenerator`].
///
/// Called at most once per load attempt; a failed load may be retried by
/// a later caller.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn TextGenerator>>;
}
