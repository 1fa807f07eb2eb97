//! Retrieval service.

use crate::embedding::Embedder;
use crate::models::{QueryInclude, Retrieved};
use crate::storage::VectorStore;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;

/// Service that finds the stored chunks closest to a query.
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl RetrievalService {
    /// Creates a retrieval service reading from `collection`.
    #[must_use]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
        }
    }

    /// Returns the top `top_k` chunks for `query`, best first.
    ///
    /// An empty result means nothing matched; failures are errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be embedded or the index query
    /// fails.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Retrieved> {
        let span = tracing::info_span!(
            "retrieve",
            collection = %self.collection,
            top_k,
            results = tracing::field::Empty
        );
        let _enter = span.enter();
        let start = Instant::now();

        let embedding = self
            .embedder
            .embed_batch(&[query])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::operation(
                    format!("{}_embed_batch", self.embedder.name()),
                    "no embedding returned for query",
                )
            })?;

        let collection = self.store.collection(&self.collection)?;
        let result = collection.query(&embedding, top_k, QueryInclude::all())?;
        span.record("results", result.len());

        metrics::counter!("retrieval_requests_total").increment(1);
        metrics::histogram!("retrieval_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);

        Ok(Retrieved::from(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::models::source_metadata;
    use crate::storage::MemoryVectorStore;

    struct Empty;

    impl Embedder for Empty {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn dimensions(&self) -> usize {
            0
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(Vec::new())
        }

        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(Vec::new())
        }
    }

    fn seeded_store() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        let embedder = HashEmbedder::new(8);
        let docs = ["alpha beta", "gamma delta", "epsilon"];
        let ids: Vec<String> = (0..docs.len()).map(|i| format!("id{i}")).collect();
        let documents: Vec<String> = docs.iter().map(|d| (*d).to_string()).collect();
        let metadatas: Vec<_> = docs.iter().map(|_| source_metadata("seed.txt")).collect();
        let embeddings: Vec<_> = docs.iter().map(|d| embedder.embed(d).unwrap()).collect();
        store
            .collection("documents")
            .unwrap()
            .upsert(&ids, &documents, &metadatas, &embeddings)
            .unwrap();
        store
    }

    #[test]
    fn test_exact_text_ranks_first() {
        let service = RetrievalService::new(
            Arc::new(HashEmbedder::new(8)),
            seeded_store(),
            "documents",
        );
        let retrieved = service.retrieve("gamma delta", 2).unwrap();
        assert_eq!(retrieved.documents.len(), 2);
        assert_eq!(retrieved.metadatas.len(), 2);
        assert_eq!(retrieved.documents[0], "gamma delta");
    }

    #[test]
    fn test_empty_collection_is_not_an_error() {
        let service = RetrievalService::new(
            Arc::new(HashEmbedder::new(8)),
            Arc::new(MemoryVectorStore::new()),
            "documents",
        );
        assert!(service.retrieve("anything", 5).unwrap().is_empty());
    }

    #[test]
    fn test_missing_query_embedding_is_error() {
        let service = RetrievalService::new(Arc::new(Empty), seeded_store(), "documents");
        let err = service.retrieve("q", 3).unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
    }
}
