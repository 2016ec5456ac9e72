//! Filter helpers for document-scoped Qdrant search queries.

use serde_json::{Map, Value, json};

/// Compose the filter restricting search to chunks of a single source document.
///
/// Returns `None` when the source is blank, in which case the search would be
/// unscoped; callers treat that as a programming error upstream.
pub fn build_source_filter(source: &str) -> Option<Value> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(json!({
        "must": [
            {
                "key": "source",
                "match": { "value": trimmed }
            }
        ]
    }))
}

/// Extract the stored chunk text from a search payload.
pub fn payload_text(payload: &Map<String, Value>) -> Option<String> {
    match payload.get("text") {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// Extract the stored source path from a search payload.
pub fn payload_source(payload: &Map<String, Value>) -> Option<String> {
    match payload.get("source") {
        Some(Value::String(source)) if !source.trim().is_empty() => Some(source.clone()),
        _ => None,
    }
}
