//! In-memory vector store.
//!
//! Brute-force cosine search over entries kept in insertion order. Used when
//! no Chroma server is configured, and in tests.

use super::collection::{VectorCollection, VectorStore, cosine_similarity};
use crate::Result;
use crate::models::{Metadata, QueryInclude, QueryMatch, QueryResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Stored tuple.
#[derive(Debug, Clone)]
struct Entry {
    id: String,
    document: String,
    metadata: Metadata,
    embedding: Vec<f32>,
}

#[derive(Debug, Default)]
struct CollectionState {
    /// Entries in insertion order; replaced entries keep their slot.
    entries: Vec<Entry>,
    /// Id to position in `entries`.
    positions: HashMap<String, usize>,
}

/// A single in-memory collection.
///
/// All operations take one lock, so each upsert, query or reset is atomic
/// with respect to the others.
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    state: Mutex<CollectionState>,
}

impl MemoryCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(CollectionState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CollectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VectorCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn upsert(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        let mut state = self.lock();
        let mut written = 0;

        for (((id, document), metadata), embedding) in
            ids.iter().zip(documents).zip(metadatas).zip(embeddings)
        {
            let entry = Entry {
                id: id.clone(),
                document: document.clone(),
                metadata: metadata.clone(),
                embedding: embedding.clone(),
            };
            if let Some(&pos) = state.positions.get(id) {
                state.entries[pos] = entry;
            } else {
                let pos = state.entries.len();
                state.entries.push(entry);
                state.positions.insert(id.clone(), pos);
            }
            written += 1;
        }
        drop(state);

        metrics::counter!("vector_upserts_total", "backend" => "memory").increment(written as u64);
        Ok(written)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        include: QueryInclude,
    ) -> Result<QueryResult> {
        metrics::counter!("vector_queries_total", "backend" => "memory").increment(1);
        if top_k == 0 {
            return Ok(QueryResult::default());
        }

        let state = self.lock();
        let mut scored: Vec<(usize, f64)> = state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.embedding.len() == query_embedding.len())
            .map(|(i, e)| (i, cosine_similarity(query_embedding, &e.embedding)))
            .filter(|(_, score)| score.is_finite())
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        let matches = scored
            .into_iter()
            .map(|(i, score)| {
                let entry = &state.entries[i];
                QueryMatch {
                    id: entry.id.clone(),
                    document: include.documents.then(|| entry.document.clone()),
                    metadata: include.metadatas.then(|| entry.metadata.clone()),
                    distance: include.distances.then_some((1.0 - score) as f32),
                }
            })
            .collect();

        Ok(QueryResult { matches })
    }

    fn count(&self) -> Result<usize> {
        Ok(self.lock().entries.len())
    }

    fn reset(&self) -> Result<usize> {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.clear();
        state.positions.clear();
        drop(state);

        tracing::info!(collection = %self.name, removed = before, "Reset in-memory collection");
        Ok(before)
    }
}

/// Registry of in-memory collections.
///
/// Owned by the service container; collections live as long as the store.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    collections: Mutex<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryVectorStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of collections created so far, sorted.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl VectorStore for MemoryVectorStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn collection(&self, name: &str) -> Result<Arc<dyn VectorCollection>> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(collection = name, "Creating in-memory collection");
                Arc::new(MemoryCollection::new(name))
            })
            .clone();
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::source_metadata;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    fn metas(n: usize) -> Vec<Metadata> {
        (0..n).map(|i| source_metadata(&format!("s{i}"))).collect()
    }

    #[test]
    fn test_ranking_matches_hand_computed_order() {
        let c = MemoryCollection::new("t");
        c.upsert(
            &ids(&["x", "diag", "y"]),
            &ids(&["X axis", "diagonal", "Y axis"]),
            &metas(3),
            &[vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 1.0]],
        )
        .unwrap();

        // Query leans toward x: cos(x)=0.894, cos(diag)=0.949, cos(y)=0.447.
        let result = c.query(&[2.0, 1.0], 3, QueryInclude::all()).unwrap();
        assert_eq!(result.ids(), vec!["diag", "x", "y"]);

        let distances = result.distances();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert!((distances[0] - (1.0 - 3.0 / 10f32.sqrt())).abs() < 1e-5);

        let top2 = c.query(&[2.0, 1.0], 2, QueryInclude::all()).unwrap();
        assert_eq!(top2.len(), 2);
        assert_eq!(top2.ids(), vec!["diag", "x"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let c = MemoryCollection::new("t");
        c.upsert(
            &ids(&["b", "a", "c"]),
            &ids(&["1", "2", "3"]),
            &metas(3),
            &[vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]],
        )
        .unwrap();

        let result = c.query(&[1.0, 1.0], 3, QueryInclude::ids_only()).unwrap();
        assert_eq!(result.ids(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_dimension_mismatch_excluded() {
        let c = MemoryCollection::new("t");
        c.upsert(
            &ids(&["four", "eight"]),
            &ids(&["d4", "d8"]),
            &metas(2),
            &[vec![1.0; 4], vec![1.0; 8]],
        )
        .unwrap();

        let result = c.query(&[1.0; 4], 10, QueryInclude::all()).unwrap();
        assert_eq!(result.ids(), vec!["four"]);
    }

    #[test]
    fn test_non_finite_vectors_excluded() {
        let c = MemoryCollection::new("t");
        let names: Vec<String> = (0u8..64).map(|i| format!("v{i}")).collect();
        let embeddings: Vec<Vec<f32>> = (0u8..64)
            .map(|i| match i % 6 {
                0 => vec![f32::INFINITY, 1.0],
                3 => vec![f32::NAN, 0.0],
                _ => vec![1.0, f32::from(i) / 10.0],
            })
            .collect();
        c.upsert(&names, &names, &metas(64), &embeddings).unwrap();

        let result = c.query(&[1.0, 0.5], 5, QueryInclude::all()).unwrap();
        assert_eq!(result.len(), 5);
        assert!(result.distances().iter().all(|d| d.is_finite()));
        assert!(result.distances().windows(2).all(|w| w[0] <= w[1]));
        // v5 is [1.0, 0.5], identical in direction to the query.
        assert_eq!(result.ids()[0], "v5");

        // 11 infinite and 11 NaN entries drop out.
        let everything = c.query(&[1.0, 0.5], 64, QueryInclude::ids_only()).unwrap();
        assert_eq!(everything.len(), 42);
    }

    #[test]
    fn test_upsert_replaces_by_id_and_keeps_slot() {
        let c = MemoryCollection::new("t");
        c.upsert(
            &ids(&["a", "b"]),
            &ids(&["old a", "b"]),
            &metas(2),
            &[vec![1.0, 0.0], vec![1.0, 0.0]],
        )
        .unwrap();
        c.upsert(&ids(&["a"]), &ids(&["new a"]), &metas(1), &[vec![1.0, 0.0]])
            .unwrap();

        assert_eq!(c.count().unwrap(), 2);
        let result = c.query(&[1.0, 0.0], 2, QueryInclude::all()).unwrap();
        assert_eq!(result.ids(), vec!["a", "b"]);
        assert_eq!(result.documents(), vec!["new a", "b"]);
    }

    #[test]
    fn test_upsert_zips_to_shortest() {
        let c = MemoryCollection::new("t");
        let written = c
            .upsert(
                &ids(&["a", "b", "c"]),
                &ids(&["1", "2"]),
                &metas(3),
                &[vec![1.0], vec![2.0], vec![3.0]],
            )
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(c.count().unwrap(), 2);
    }

    #[test]
    fn test_include_filters_fields() {
        let c = MemoryCollection::new("t");
        c.upsert(&ids(&["a"]), &ids(&["doc"]), &metas(1), &[vec![1.0]])
            .unwrap();

        let only_docs = QueryInclude {
            documents: true,
            ..QueryInclude::ids_only()
        };
        let m = &c.query(&[1.0], 1, only_docs).unwrap().matches[0];
        assert_eq!(m.id, "a");
        assert_eq!(m.document.as_deref(), Some("doc"));
        assert!(m.metadata.is_none());
        assert!(m.distance.is_none());
    }

    #[test]
    fn test_top_k_zero_and_empty_collection() {
        let c = MemoryCollection::new("t");
        assert!(c.query(&[1.0], 5, QueryInclude::all()).unwrap().is_empty());

        c.upsert(&ids(&["a"]), &ids(&["doc"]), &metas(1), &[vec![1.0]])
            .unwrap();
        assert!(c.query(&[1.0], 0, QueryInclude::all()).unwrap().is_empty());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let c = MemoryCollection::new("t");
        c.upsert(
            &ids(&["a", "b"]),
            &ids(&["1", "2"]),
            &metas(2),
            &[vec![1.0], vec![2.0]],
        )
        .unwrap();

        assert_eq!(c.reset().unwrap(), 2);
        assert_eq!(c.count().unwrap(), 0);
        assert_eq!(c.reset().unwrap(), 0);

        // Ids are free again after a reset.
        c.upsert(&ids(&["a"]), &ids(&["again"]), &metas(1), &[vec![1.0]])
            .unwrap();
        assert_eq!(c.count().unwrap(), 1);
    }

    #[test]
    fn test_store_shares_collections_by_name() {
        let store = MemoryVectorStore::new();
        let first = store.collection("documents").unwrap();
        first
            .upsert(&ids(&["a"]), &ids(&["doc"]), &metas(1), &[vec![1.0]])
            .unwrap();

        let again = store.collection("documents").unwrap();
        assert_eq!(again.count().unwrap(), 1);

        let other = store.collection("other").unwrap();
        assert_eq!(other.count().unwrap(), 0);
        assert_eq!(store.collection_names(), vec!["documents", "other"]);

        assert_eq!(store.reset_collection("documents").unwrap(), 1);
        assert_eq!(first.count().unwrap(), 0);
    }
}
