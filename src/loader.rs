//! Format-aware document loading.
//!
//! The loader picks an extraction strategy from the file extension: PDFs go
//! through `pdf-extract`, everything else is read as UTF-8 text. Loading never
//! mutates the stored file; callers receive the derived full text.

use std::path::Path;
use thiserror::Error;

/// Errors raised while turning a stored file into text.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The file does not exist at the given path.
    #[error("File not found: {0}")]
    NotFound(String),
    /// The file exists but could not be read.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    /// PDF text extraction failed.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Load the full text of a document, dispatching on the file extension.
pub fn load_document(path: &str) -> Result<String, LoaderError> {
    if !Path::new(path).exists() {
        return Err(LoaderError::NotFound(path.to_string()));
    }

    if has_extension(path, "pdf") {
        load_pdf(path)
    } else {
        load_text(path)
    }
}

fn has_extension(path: &str, extension: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

fn load_text(path: &str) -> Result<String, LoaderError> {
    let bytes = std::fs::read(path)?;
    // Tolerate invalid UTF-8 rather than failing the whole upload.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn load_pdf(path: &str) -> Result<String, LoaderError> {
    let bytes = std::fs::read(path)?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|error| LoaderError::Pdf(error.to_string()))
}
