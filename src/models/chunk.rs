//! Document chunk types and identifiers.

use serde::{Deserialize, Serialize};

/// Free-form chunk metadata, stored alongside each vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A slice of a source document with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Identifier, `doc_{source}_{index}`.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Metadata stored with the chunk (at least `source`).
    pub metadata: Metadata,
    /// The embedding vector.
    pub embedding: Vec<f32>,
}

impl DocumentChunk {
    /// Creates a chunk for position `index` of `source`.
    #[must_use]
    pub fn new(source: &str, index: usize, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk_id(source, index),
            text: text.into(),
            metadata: source_metadata(source),
            embedding,
        }
    }

    /// Returns the embedding dimensionality.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// Builds the deterministic chunk id for `index` within `source`.
///
/// Ids are only unique per source: re-ingesting a source reuses them, so
/// upserts overwrite the previous chunks at the same positions.
#[must_use]
pub fn chunk_id(source: &str, index: usize) -> String {
    format!("doc_{source}_{index}")
}

/// Builds the `{source: <name>}` metadata attached to ingested chunks.
#[must_use]
pub fn source_metadata(source: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(
        "source".to_string(),
        serde_json::Value::String(source.to_string()),
    );
    metadata
}
