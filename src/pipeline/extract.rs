//! Coding-standard extraction: uploaded PDF bytes → plain text.
//!
//! ## Why spawn_blocking?
//!
//! `pdf-extract` is synchronous and CPU-bound; a large standard can take
//! hundreds of milliseconds to decode. Running it on the blocking pool keeps
//! the Tokio workers free for other requests. A panic inside the parser (it
//! has a few on malformed input) surfaces as a `JoinError`, which is treated
//! like any other extraction failure.
//!
//! ## Failure policy
//!
//! A missing, mis-named, unreadable, or text-less document never fails the
//! request. Every failure is logged at WARN and the request continues with an
//! empty standard, exactly as if no document had been sent.

use crate::error::ExtractionError;
use tracing::{debug, warn};

/// Only files whose name ends with this suffix are parsed.
pub const PDF_EXTENSION: &str = ".pdf";

/// An uploaded file as received from the form.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Client-supplied filename, if any.
    pub file_name: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            bytes: bytes.into(),
        }
    }

    /// `true` when the filename carries the PDF suffix.
    pub fn is_pdf(&self) -> bool {
        self.file_name
            .as_deref()
            .is_some_and(|name| name.ends_with(PDF_EXTENSION))
    }
}

/// Extract the coding standard from an optional upload.
///
/// Returns the trimmed text, or an empty string when there is no usable
/// document. Never returns an error.
pub async fn extract_standard(file: Option<UploadedFile>) -> String {
    let Some(file) = file else {
        return String::new();
    };
    if !file.is_pdf() {
        debug!(
            "Ignoring upload {:?}: not a {} file",
            file.file_name, PDF_EXTENSION
        );
        return String::new();
    }

    match extract_pdf_text(file).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Coding standard ignored: {}", e);
            String::new()
        }
    }
}

/// Parse a PDF upload on the blocking pool.
pub async fn extract_pdf_text(file: UploadedFile) -> Result<String, ExtractionError> {
    let file_name = file.file_name.clone().unwrap_or_default();
    let name_for_task = file_name.clone();

    tokio::task::spawn_blocking(move || extract_pdf_text_blocking(&name_for_task, &file.bytes))
        .await
        .map_err(|e| ExtractionError::Aborted {
            file_name,
            detail: e.to_string(),
        })?
}

/// Blocking implementation of text extraction.
fn extract_pdf_text_blocking(file_name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Unreadable {
        file_name: file_name.to_string(),
        detail: format!("{:?}", e),
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractionError::Empty {
            file_name: file_name.to_string(),
        });
    }

    debug!("Extracted {} chars from '{}'", text.len(), file_name);
    Ok(text.to_string())
}
