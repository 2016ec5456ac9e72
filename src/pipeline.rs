//! Document processing and question answering pipeline.
//!
//! The service owns long-lived handles to the embedding client, completion
//! client, and Qdrant transport so the HTTP surface and background tasks reuse
//! the same components. Construct it once near process start and share it
//! through an `Arc`.
//!
//! Every AI step degrades gracefully: without a provider credential,
//! summarization returns a fixed placeholder, ingestion is skipped, and chat
//! returns a fixed error string. No missing credential ever fails a request.

use crate::{
    chunking::{ChunkingError, chunk_text},
    config::Config,
    embedding::{EmbeddingClient, EmbeddingClientError, build_embedding_client},
    llm::{
        CompletionClient, CompletionClientError, HttpCompletionClient,
        prompts::{answer_prompt, summary_prompt, tag_prompt, truncate_chars},
    },
    loader::{LoaderError, load_document},
    metrics::{ArchiveMetrics, MetricsSnapshot},
    qdrant::{
        ChunkInsert, QdrantError, QdrantService, build_source_filter, compute_chunk_hash,
        payload_source, payload_text,
    },
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// Summary returned when no provider credential is configured.
pub const PLACEHOLDER_SUMMARY: &str = "AI processing skipped (No API Key).";
/// Tag returned when no provider credential is configured.
pub const SENTINEL_TAG: &str = "Pending";
/// Chat answer returned when no provider credential is configured.
pub const NO_API_KEY_ANSWER: &str = "Error: No API Key set.";

/// Characters of document text kept as the task-result preview.
const PREVIEW_CHARS: usize = 200;

/// Errors emitted by the document processing pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// Document could not be loaded from storage.
    #[error("{0}")]
    Loader(#[from] LoaderError),
    /// Document loaded but contained no text.
    #[error("Empty document")]
    EmptyDocument,
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Completion provider failed to produce output.
    #[error("Failed to generate completion: {0}")]
    Completion(#[from] CompletionClientError),
    /// Qdrant interaction failed.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
}

/// Outcome of attempting to ingest one document into the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    /// Chunks were embedded and indexed.
    Indexed {
        /// Number of chunks written to the index.
        chunks: usize,
    },
    /// No provider credential configured; nothing was indexed.
    SkippedMissingCredential,
    /// The document was not found on disk; nothing was indexed.
    SkippedMissingFile,
}

/// Summary and document-type tag derived from a document's full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInsights {
    /// Fixed-length summary of the document.
    pub summary: String,
    /// Single-label document-type tag.
    pub tags: Vec<String>,
}

/// Connection and tuning parameters for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Provider credential; `None` enables the degraded placeholder paths.
    pub api_key: Option<String>,
    /// Base URL of the completion/embedding provider.
    pub llm_url: String,
    /// Completion model identifier.
    pub llm_model: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Dimensionality of produced vectors.
    pub embedding_dimension: usize,
    /// Qdrant endpoint.
    pub qdrant_url: String,
    /// Optional Qdrant API key.
    pub qdrant_api_key: Option<String>,
    /// Collection holding document chunks.
    pub collection: String,
    /// Character budget per chunk.
    pub chunk_size: usize,
    /// Characters of overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunks retrieved per chat query.
    pub retrieval_top_k: usize,
}

impl PipelineSettings {
    /// Derive pipeline settings from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.llm_api_key.clone(),
            llm_url: config.llm_url.clone(),
            llm_model: config.llm_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimension: config.embedding_dimension,
            qdrant_url: config.qdrant_url.clone(),
            qdrant_api_key: config.qdrant_api_key.clone(),
            collection: config.qdrant_collection_name.clone(),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            retrieval_top_k: config.retrieval_top_k,
        }
    }

    fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait ArchiveApi: Send + Sync {
    /// Run the full background job for one uploaded document: summarize, tag,
    /// and ingest, returning the task result payload.
    async fn process_document(&self, path: String) -> Result<Value, ProcessingError>;

    /// Answer a question scoped to a single uploaded document.
    async fn answer_question(&self, query: &str, source: &str) -> Result<String, ProcessingError>;

    /// Return the current processing counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Coordinates loading, chunking, embedding, summarization, and retrieval.
pub struct ArchiveService {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    completion_client: Box<dyn CompletionClient + Send + Sync>,
    qdrant_service: QdrantService,
    metrics: Arc<ArchiveMetrics>,
    settings: PipelineSettings,
}

impl ArchiveService {
    /// Build a new pipeline service from settings.
    pub fn new(settings: PipelineSettings) -> Result<Self, QdrantError> {
        tracing::info!(
            collection = %settings.collection,
            has_credential = settings.has_credential(),
            "Initializing archive pipeline"
        );
        let api_key = settings.api_key.clone().unwrap_or_default();
        let embedding_client = build_embedding_client(
            settings.llm_url.clone(),
            api_key.clone(),
            settings.embedding_model.clone(),
            settings.embedding_dimension,
        );
        let completion_client: Box<dyn CompletionClient + Send + Sync> = Box::new(
            HttpCompletionClient::new(settings.llm_url.clone(), api_key, settings.llm_model.clone()),
        );
        let qdrant_service =
            QdrantService::new(&settings.qdrant_url, settings.qdrant_api_key.clone())?;

        Ok(Self {
            embedding_client,
            completion_client,
            qdrant_service,
            metrics: Arc::new(ArchiveMetrics::new()),
            settings,
        })
    }

    /// Chunk, embed, and index a document into the vector store.
    ///
    /// `preloaded` skips re-reading the file when the caller already holds the
    /// full text. A missing file and a missing credential are both logged
    /// no-ops, never errors.
    pub async fn ingest_document(
        &self,
        path: &str,
        preloaded: Option<&str>,
    ) -> Result<IngestStatus, ProcessingError> {
        let text = match preloaded {
            Some(text) => text.to_string(),
            None => match load_document(path) {
                Ok(text) => text,
                Err(LoaderError::NotFound(_)) => {
                    tracing::info!(path, "File not found; skipping ingestion");
                    return Ok(IngestStatus::SkippedMissingFile);
                }
                Err(error) => return Err(error.into()),
            },
        };

        if !self.settings.has_credential() {
            tracing::info!(path, "Skipping ingestion: no API key configured");
            return Ok(IngestStatus::SkippedMissingCredential);
        }

        let chunks = chunk_text(&text, self.settings.chunk_size, self.settings.chunk_overlap)?;
        if chunks.is_empty() {
            tracing::debug!(path, "Document produced no chunks");
            return Ok(IngestStatus::Indexed { chunks: 0 });
        }

        let embeddings = self.embedding_client.generate_embeddings(chunks.clone()).await?;
        debug_assert_eq!(chunks.len(), embeddings.len());

        let inserts: Vec<ChunkInsert> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (text, vector))| ChunkInsert {
                chunk_hash: compute_chunk_hash(&text),
                text,
                chunk_index,
                vector,
            })
            .collect();

        self.ensure_collection().await?;
        let indexed = self
            .qdrant_service
            .index_chunks(&self.settings.collection, path, inserts)
            .await?;

        self.metrics.record_document(indexed as u64);
        tracing::info!(path, chunks = indexed, "Document indexed");
        Ok(IngestStatus::Indexed { chunks: indexed })
    }

    /// Produce a fixed-length summary and a single document-type tag.
    ///
    /// Without a credential this short-circuits to the placeholder summary and
    /// sentinel tag instead of calling the provider.
    pub async fn summarize_and_tag(
        &self,
        full_text: &str,
    ) -> Result<DocumentInsights, ProcessingError> {
        if !self.settings.has_credential() {
            tracing::info!("Skipping summarization: no API key configured");
            return Ok(DocumentInsights {
                summary: PLACEHOLDER_SUMMARY.to_string(),
                tags: vec![SENTINEL_TAG.to_string()],
            });
        }

        let summary = self
            .completion_client
            .complete(&summary_prompt(full_text))
            .await?;
        let tag = self
            .completion_client
            .complete(&tag_prompt(full_text))
            .await?;

        Ok(DocumentInsights {
            summary,
            tags: vec![tag.trim().to_string()],
        })
    }

    /// Answer a question using only chunks retrieved from the target document.
    pub async fn answer_question(
        &self,
        query: &str,
        source: &str,
    ) -> Result<String, ProcessingError> {
        if !self.settings.has_credential() {
            return Ok(NO_API_KEY_ANSWER.to_string());
        }

        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![query.to_string()])
            .await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| EmbeddingClientError::GenerationFailed("no vectors returned".into()))?;

        let filter = build_source_filter(source);
        let hits = self
            .qdrant_service
            .search_points(
                &self.settings.collection,
                vector,
                filter,
                self.settings.retrieval_top_k,
            )
            .await?;

        for hit in &hits {
            if let Some(hit_source) = hit.payload.as_ref().and_then(payload_source)
                && hit_source != source
            {
                tracing::warn!(expected = source, got = %hit_source, "Chunk outside requested source");
            }
        }

        let context: Vec<String> = hits
            .iter()
            .filter_map(|hit| hit.payload.as_ref().and_then(payload_text))
            .collect();
        tracing::debug!(source, retrieved = context.len(), "Retrieved context chunks");

        let answer = self
            .completion_client
            .complete(&answer_prompt(&context, query))
            .await?;
        self.metrics.record_question();
        Ok(answer)
    }

    /// Run the full background job for one uploaded document.
    ///
    /// Loads once, summarizes and tags, then ingests using the already loaded
    /// text. An ingestion failure is logged but does not fail the job; the
    /// summary and preview are still returned.
    pub async fn process_document(&self, path: &str) -> Result<Value, ProcessingError> {
        let full_text = load_document(path)?;
        if full_text.trim().is_empty() {
            return Err(ProcessingError::EmptyDocument);
        }

        let insights = self.summarize_and_tag(&full_text).await?;

        if let Err(error) = self.ingest_document(path, Some(&full_text)).await {
            tracing::error!(path, error = %error, "Ingestion failed");
        }

        Ok(json!({
            "summary": insights.summary,
            "tags": insights.tags,
            "text_preview": truncate_chars(&full_text, PREVIEW_CHARS),
        }))
    }

    /// Ensure the chunk collection and its payload indexes exist.
    async fn ensure_collection(&self) -> Result<(), QdrantError> {
        self.qdrant_service
            .create_collection_if_not_exists(
                &self.settings.collection,
                self.settings.embedding_dimension as u64,
            )
            .await?;
        self.qdrant_service
            .ensure_payload_indexes(&self.settings.collection)
            .await?;
        Ok(())
    }

    /// Return the current processing metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl ArchiveApi for ArchiveService {
    async fn process_document(&self, path: String) -> Result<Value, ProcessingError> {
        ArchiveService::process_document(self, &path).await
    }

    async fn answer_question(&self, query: &str, source: &str) -> Result<String, ProcessingError> {
        ArchiveService::answer_question(self, query, source).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ArchiveService::metrics_snapshot(self)
    }
}
