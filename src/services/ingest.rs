//! Document ingestion service.
//!
//! bytes → text → chunks → embeddings → vector upsert.

use super::chunker::Chunker;
use super::extract::extract_text;
use crate::Result;
use crate::embedding::{Embedder, ensure_batch_len};
use crate::models::{DocumentChunk, IngestResult};
use crate::storage::VectorStore;
use std::sync::Arc;
use std::time::Instant;

/// Service that turns uploaded documents into stored chunks.
pub struct IngestService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunker: Chunker,
    collection: String,
}

impl IngestService {
    /// Creates an ingest service writing to `collection`.
    #[must_use]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chunker: Chunker,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker,
            collection: collection.into(),
        }
    }

    /// Returns the target collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ingests one uploaded document.
    ///
    /// Chunk ids are `doc_{filename}_{index}`, so re-ingesting a file
    /// overwrites its earlier chunks index by index. Documents without text
    /// store nothing and never reach the embedder.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the vector upsert fails.
    pub fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<IngestResult> {
        let span = tracing::info_span!(
            "ingest",
            filename = filename,
            collection = %self.collection,
            chunks = tracing::field::Empty
        );
        let _enter = span.enter();
        let start = Instant::now();

        let text = extract_text(filename, bytes);
        let chunks = self.chunker.chunk(&text);
        span.record("chunks", chunks.len());
        if chunks.is_empty() {
            tracing::info!("Document produced no chunks");
            return Ok(IngestResult::empty(filename, &self.collection));
        }

        let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        ensure_batch_len(self.embedder.name(), texts.len(), embeddings.len())?;

        let chunks: Vec<DocumentChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| DocumentChunk::new(filename, i, text, embedding))
            .collect();

        let collection = self.store.collection(&self.collection)?;
        let stored = collection.upsert_chunks(&chunks)?;

        metrics::counter!("ingest_documents_total").increment(1);
        metrics::counter!("ingest_chunks_total").increment(stored as u64);
        metrics::histogram!("ingest_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::info!(chunks = stored, embedder = self.embedder.name(), "Ingested document");

        Ok(IngestResult {
            filename: filename.to_string(),
            chunk_count: stored,
            collection_name: self.collection.clone(),
        })
    }
}
