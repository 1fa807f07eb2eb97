//! Ingestion and collection maintenance results.

use serde::{Deserialize, Serialize};

/// Result of ingesting one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    /// The uploaded file name (also the chunks' `source`).
    pub filename: String,
    /// Number of chunks upserted; zero for empty or unreadable documents.
    pub chunk_count: usize,
    /// Collection the chunks were written to.
    pub collection_name: String,
}

impl IngestResult {
    /// Result for a document that produced no chunks.
    #[must_use]
    pub fn empty(filename: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            chunk_count: 0,
            collection_name: collection_name.into(),
        }
    }
}

/// Size of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Collection name.
    pub collection: String,
    /// Number of stored chunks.
    pub count: usize,
}

/// Outcome of resetting a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOutcome {
    /// Collection name.
    pub collection: String,
    /// Chunk count before the reset.
    pub before: usize,
    /// Chunk count after the reset.
    pub after: usize,
}
