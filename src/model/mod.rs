//! Local model server access.
//!
//! The agent talks to the model through the [`ModelClient`] trait, so tests
//! can substitute a mock and other servers could be added later. The only
//! implementation is [`OllamaClient`].

mod ollama;

pub use ollama::OllamaClient;

use crate::config::ModelConfig;
use async_trait::async_trait;
use serde::Serialize;

/// One completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Model name, `name:tag`
    pub model: String,
    /// User prompt
    pub prompt: String,
    /// Optional system prompt
    pub system: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Build a request using the configured model settings.
    #[must_use]
    pub fn from_config(config: &ModelConfig, prompt: impl Into<String>) -> Self {
        Self {
            model: config.name.clone(),
            prompt: prompt.into(),
            system: None,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Attach a system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A text generation backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one non-streaming completion and return the generated text.
    ///
    /// # Errors
    ///
    /// - `ModelUnavailable` if the server cannot be reached
    /// - `ModelTimeout` if it does not answer in time
    /// - `ModelResponse` for error statuses or undecodable bodies
    async fn generate(&self, request: GenerationRequest) -> crate::Result<String>;

    /// Whether the server answers at all.
    async fn health_check(&self) -> bool;

    /// Names of the models the server has locally.
    ///
    /// # Errors
    ///
    /// Same as [`ModelClient::generate`].
    async fn list_models(&self) -> crate::Result<Vec<String>>;

    /// The server this client talks to.
    fn host(&self) -> String;
}
