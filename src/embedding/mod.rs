//! Embedding client abstraction and adapters.
//!
//! Vectors are produced by an HTTP provider and pass through a normalizing
//! wrapper before anything reaches the index: the wrapper coerces provider
//! output to plain finite `f32` lists and rejects vectors whose dimensionality
//! does not match configuration.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider returned a vector whose length does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured on the server.
        expected: usize,
        /// Dimension actually produced by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// HTTP-backed embedding client posting batch embed requests to the provider.
pub struct HttpEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpEmbeddingClient {
    /// Construct a client bound to the given provider endpoint and model.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("intelliarchive/embed")
            .build()
            .expect("Failed to construct reqwest::Client for embeddings");
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let expected = texts.len();
        tracing::debug!(model = %self.model, batch = expected, "Generating embeddings");

        let payload = json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::GenerationFailed(format!(
                    "failed to reach embedding provider at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "embedding provider returned {status}: {body}"
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::GenerationFailed(format!(
                "failed to decode embedding response: {error}"
            ))
        })?;

        if body.embeddings.len() != expected {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "embedding provider returned {} vectors for {} inputs",
                body.embeddings.len(),
                expected
            )));
        }

        Ok(body.embeddings)
    }
}

/// Wrapper enforcing a normalized numeric-vector contract around any embedding client.
///
/// Non-finite components are coerced to `0.0` and every vector is validated
/// against the configured dimension before it is handed to the index.
pub struct NormalizedEmbeddings<C> {
    inner: C,
    dimension: usize,
}

impl<C> NormalizedEmbeddings<C> {
    /// Wrap an embedding client, pinning the expected output dimension.
    pub fn new(inner: C, dimension: usize) -> Self {
        Self { inner, dimension }
    }
}

#[async_trait]
impl<C: EmbeddingClient> EmbeddingClient for NormalizedEmbeddings<C> {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let vectors = self.inner.generate_embeddings(texts).await?;

        let mut normalized = Vec::with_capacity(vectors.len());
        for mut vector in vectors {
            if vector.len() != self.dimension {
                return Err(EmbeddingClientError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
            for value in &mut vector {
                if !value.is_finite() {
                    *value = 0.0;
                }
            }
            normalized.push(vector);
        }

        Ok(normalized)
    }
}

/// Build the embedding client stack used by the processing pipeline.
pub fn build_embedding_client(
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
) -> Box<dyn EmbeddingClient + Send + Sync> {
    Box::new(NormalizedEmbeddings::new(
        HttpEmbeddingClient::new(base_url, api_key, model),
        dimension,
    ))
}
