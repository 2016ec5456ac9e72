#![deny(missing_docs)]

//! Core library for the IntelliArchive backend.

/// HTTP routing and REST handlers.
pub mod api;
/// Deterministic character-window chunking.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Language-model completion client and prompt templates.
pub mod llm;
/// Format-aware document text loading.
pub mod loader;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document processing and question answering pipeline.
pub mod pipeline;
/// Qdrant vector store integration.
pub mod qdrant;
/// In-process asynchronous task tracking.
pub mod tasks;
