//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use filters::{build_source_filter, payload_source, payload_text};
pub use payload::compute_chunk_hash;
pub use types::{ChunkInsert, QdrantError, ScoredPoint};
