//! Client for a local text-generation server.
//!
//! Speaks the HuggingFace text-generation-inference wire format:
//!
//! - `POST {base}/generate` with `{"inputs": ..., "parameters": {...}}`,
//!   answered by `{"generated_text": ...}` (TGI) or
//!   `[{"generated_text": ...}]` (pipeline-style servers)
//! - `GET {base}/health`, `200` once the model is loaded
//!
//! See: <https://huggingface.github.io/text-generation-inference/>

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::retry::{RetryConfig, RetryingGenerator};
use crate::traits::{ModelLoader, TextGenerator};
use crate::{GenerateOptions, MuninError, Result};

/// Default base URL for a local text-generation server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Client for a text-generation server.
#[derive(Clone)]
pub struct TgiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl TgiClient {
    /// Create a client for `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MuninError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server has a model loaded.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| MuninError::Http(e.to_string()))?;
        handle_response_errors(&response)
    }

    /// Generate a continuation of `prompt`.
    pub async fn generate_text(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let url = format!("{}/generate", self.base_url);

        let response = self
            .authorized(self.http.post(&url))
            .json(&GenerateRequest {
                inputs: prompt,
                parameters: options,
            })
            .send()
            .await
            .map_err(|e| MuninError::Http(e.to_string()))?;

        handle_response_errors(&response)?;

        let body: GenerateResponseBody = response
            .json()
            .await
            .map_err(|e| MuninError::Http(e.to_string()))?;

        let text = match body {
            GenerateResponseBody::Single(output) => Some(output.generated_text),
            GenerateResponseBody::Batch(outputs) => {
                outputs.into_iter().next().map(|o| o.generated_text)
            }
        }
        .ok_or(MuninError::EmptyResponse)?;

        debug!(prompt_chars = prompt.len(), output_chars = text.len(), "generated text");
        Ok(text)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }
}

/// Check response status and map to appropriate error.
fn handle_response_errors(response: &reqwest::Response) -> Result<()> {
    let status = response.status();

    if status.is_success() {
        return Ok(());
    }

    match status.as_u16() {
        401 | 403 => Err(MuninError::AuthenticationFailed),
        404 => Err(MuninError::ModelNotFound(response.url().path().to_string())),
        429 => {
            // Try to parse retry-after header
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(MuninError::RateLimited { retry_after })
        }
        503 => Err(MuninError::Api {
            status: 503,
            message: "Model is loading, please retry".to_string(),
        }),
        code => Err(MuninError::Api {
            status: code,
            message: format!("text-generation server error: {status}"),
        }),
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerateOptions,
}

#[derive(Deserialize)]
struct GeneratedOutput {
    generated_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenerateResponseBody {
    Single(GeneratedOutput),
    Batch(Vec<GeneratedOutput>),
}

#[async_trait]
impl TextGenerator for TgiClient {
    fn name(&self) -> &str {
        "tgi"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        self.generate_text(prompt, options).await
    }
}

/// Loads a [`TgiClient`] once the server reports healthy.
///
/// The returned generator is wrapped in a [`RetryingGenerator`] unless
/// retries are disabled.
pub struct TgiLoader {
    client: TgiClient,
    retry: RetryConfig,
}

impl TgiLoader {
    pub fn new(client: TgiClient) -> Self {
        Self {
            client,
            retry: RetryConfig::default(),
        }
    }

    /// Set retry behaviour for generation calls.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }
}

#[async_trait]
impl ModelLoader for TgiLoader {
    async fn load(&self) -> Result<Arc<dyn TextGenerator>> {
        self.client.health().await?;
        let client: Arc<dyn TextGenerator> = Arc::new(self.client.clone());
        if self.retry.max_attempts <= 1 {
            return Ok(client);
        }
        Ok(Arc::new(RetryingGenerator::new(client, self.retry.clone())))
    }
}
