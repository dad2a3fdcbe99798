//! Ollama HTTP client.

use crate::config::ModelConfig;
use crate::error::{Result, TfAgentError};
use crate::model::{GenerationRequest, ModelClient};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for the Ollama REST API.
///
/// Every request carries the configured timeout. Failed requests are
/// reported, never retried.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct GeneratePayload<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a client from the model configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("tfagent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| crate::err!(Internal {
                message: format!("Failed to create HTTP client: {e}"),
            }))?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    /// Map a transport failure onto the model error variants.
    fn request_error(&self, error: &reqwest::Error) -> TfAgentError {
        if error.is_timeout() {
            crate::err!(ModelTimeout {
                host: self.host.clone(),
                timeout_secs: self.timeout_secs,
            })
        } else if error.is_connect() || error.is_request() {
            crate::err!(ModelUnavailable {
                host: self.host.clone(),
                message: error.to_string(),
            })
        } else {
            crate::err!(ModelResponse {
                status: error.status().map(|s| s.as_u16()),
                message: error.to_string(),
            })
        }
    }

    /// Turn a non-success status into `ModelResponse`, keeping the body.
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(host = %self.host, status = status.as_u16(), "Model server returned an error");
        Err(crate::err!(ModelResponse {
            status: Some(status.as_u16()),
            message: if body.is_empty() { status.to_string() } else { body },
        }))
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let payload = GeneratePayload {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        tracing::debug!(
            host = %self.host,
            model = %request.model,
            prompt_bytes = request.prompt.len(),
            "Sending generation request"
        );
        let started = std::time::Instant::now();

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;
        let response = self.check_status(response).await?;

        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.request_error(&e)
            } else {
                crate::err!(ModelResponse {
                    status: None,
                    message: format!("Failed to decode generation response: {e}"),
                })
            }
        })?;

        tracing::info!(
            model = %request.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_bytes = body.response.len(),
            "Generation complete"
        );
        Ok(body.response)
    }

    async fn health_check(&self) -> bool {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(host = %self.host, error = %e, "Health check failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;
        let response = self.check_status(response).await?;

        let tags: TagsResponse = response.json().await.map_err(|e| crate::err!(ModelResponse {
            status: None,
            message: format!("Failed to decode model list: {e}"),
        }))?;

        let models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        tracing::debug!(host = %self.host, count = models.len(), "Listed models");
        Ok(models)
    }

    fn host(&self) -> String {
        self.host.clone()
    }
}
