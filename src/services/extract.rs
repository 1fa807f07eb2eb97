//! Text extraction from uploaded documents.
//!
//! Extraction never fails: unreadable input degrades to empty text, which
//! ingests as zero chunks.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

/// How an upload is decoded, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PDF; text is pulled out with `pdf-extract`.
    Pdf,
    /// Anything else is decoded as UTF-8 text.
    Text,
}

impl DocumentKind {
    /// Picks the kind from the filename's extension, case-insensitively.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let is_pdf = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf { Self::Pdf } else { Self::Text }
    }
}

/// Extracts plain text from an uploaded file.
///
/// PDFs are trimmed; text files are decoded lossily and returned as-is.
#[must_use]
pub fn extract_text(filename: &str, bytes: &[u8]) -> String {
    match DocumentKind::from_filename(filename) {
        DocumentKind::Pdf => extract_pdf(filename, bytes),
        DocumentKind::Text => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn extract_pdf(filename: &str, bytes: &[u8]) -> String {
    // The extractor panics on some malformed files.
    let result = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));

    match result {
        Ok(Ok(text)) => text.trim().to_string(),
        Ok(Err(e)) => {
            tracing::warn!(filename, error = %e, "PDF extraction failed");
            metrics::counter!("extract_failures_total", "kind" => "pdf").increment(1);
            String::new()
        },
        Err(_) => {
            tracing::warn!(filename, "PDF extraction panicked");
            metrics::counter!("extract_failures_total", "kind" => "pdf").increment(1);
            String::new()
        },
    }
}
