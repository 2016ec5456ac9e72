//! Deterministic character-window chunking.
//!
//! Documents are split into fixed-size windows with a sliding overlap so that
//! text spanning a boundary stays visible to retrieval. Sizes are counted in
//! Unicode scalar values and windows always land on character boundaries, so
//! splitting the same text with the same parameters yields identical chunks.

use thiserror::Error;

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunking was configured with an impossible window size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Split text into overlapping character windows.
///
/// - `chunk_size` is a hard upper bound on characters per chunk.
/// - `overlap` characters from the end of each chunk are repeated at the start
///   of the next; it is clamped below `chunk_size` so the split always advances.
///
/// Returns an empty vector when the input is all whitespace.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let effective_overlap = overlap.min(chunk_size - 1);
    let step = chunk_size - effective_overlap;

    // Byte offset of every character boundary, with the end sentinel.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    boundaries.push(text.len());
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
