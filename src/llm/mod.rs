//! Language-model completion client.
//!
//! Completions power the summary, tag, and chat-answer steps. The pipeline
//! falls back to fixed placeholder responses when no provider credential is
//! configured; this module only covers the configured path. Requests are
//! non-streaming and pinned to temperature zero so repeated runs stay as
//! stable as the provider allows.

pub mod prompts;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while requesting completions.
#[derive(Debug, Error)]
pub enum CompletionClientError {
    /// Provider was unreachable.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for the assembled prompt.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionClientError>;
}

/// HTTP-backed completion client posting non-streaming generate requests.
pub struct HttpCompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpCompletionClient {
    /// Construct a client bound to the given provider endpoint and model.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("intelliarchive/llm")
            .build()
            .expect("Failed to construct reqwest::Client for completions");
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.0,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                CompletionClientError::ProviderUnavailable(format!(
                    "failed to reach provider at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CompletionClientError::ProviderUnavailable(format!(
                "provider endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionClientError::GenerationFailed(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|error| {
            CompletionClientError::InvalidResponse(format!(
                "failed to decode provider response: {error}"
            ))
        })?;

        if !body.done {
            return Err(CompletionClientError::InvalidResponse(
                "provider response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}
