//! Vector collection traits.
//!
//! A [`VectorStore`] is a registry of named [`VectorCollection`]s. Each
//! collection stores `(id, document, metadata, embedding)` tuples and answers
//! cosine-similarity queries over them.
//!
//! # Implementor Notes
//!
//! - Methods take `&self` so stores can be shared as `Arc<dyn VectorStore>`;
//!   use interior mutability for state.
//! - Distances are `1 - cosine_similarity`, best match first.
//! - Entries whose embedding length differs from the query are skipped, not
//!   reported as errors.

use crate::Result;
use crate::models::{DocumentChunk, Metadata, QueryInclude, QueryResult};
use std::sync::Arc;

/// Added to each vector norm so zero vectors never divide by zero.
pub const NORM_EPSILON: f64 = 1e-9;

/// A named collection of embedded documents.
pub trait VectorCollection: Send + Sync {
    /// The collection name.
    fn name(&self) -> &str;

    /// Inserts or replaces entries by id.
    ///
    /// The four slices are zipped; extras beyond the shortest are dropped.
    /// Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn upsert(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
        embeddings: &[Vec<f32>],
    ) -> Result<usize>;

    /// Returns up to `top_k` entries ranked by cosine similarity, descending.
    ///
    /// Equal scores keep insertion order. Only the fields selected by
    /// `include` are filled in.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        include: QueryInclude,
    ) -> Result<QueryResult>;

    /// Returns the number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn count(&self) -> Result<usize>;

    /// Removes every entry and returns how many there were.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn reset(&self) -> Result<usize>;

    /// Inserts or replaces whole chunks by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn upsert_chunks(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        let mut ids = Vec::with_capacity(chunks.len());
        let mut documents = Vec::with_capacity(chunks.len());
        let mut metadatas = Vec::with_capacity(chunks.len());
        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            ids.push(chunk.id.clone());
            documents.push(chunk.text.clone());
            metadatas.push(chunk.metadata.clone());
            embeddings.push(chunk.embedding.clone());
        }
        self.upsert(&ids, &documents, &metadatas, &embeddings)
    }
}

/// A registry of vector collections.
pub trait VectorStore: Send + Sync {
    /// Backend name for logs and stats.
    fn backend(&self) -> &'static str;

    /// Returns the named collection, creating it on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the collection.
    fn collection(&self, name: &str) -> Result<Arc<dyn VectorCollection>>;

    /// Clears the named collection and returns its pre-reset count.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn reset_collection(&self, name: &str) -> Result<usize> {
        self.collection(name)?.reset()
    }
}

/// Cosine similarity with [`NORM_EPSILON`] added to each norm.
///
/// Computed in `f64`. Vectors of different length compare as `0.0`.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    dot / ((norm_a.sqrt() + NORM_EPSILON) * (norm_b.sqrt() + NORM_EPSILON))
}
