//! Vector storage.
//!
//! Two interchangeable backends implement [`VectorStore`]:
//! - **Chroma**: a remote server over its v2 REST API
//! - **Memory**: brute-force cosine search, used when Chroma is not configured
//!   or does not answer its heartbeat
//!
//! [`open_vector_store`] picks between them at startup.

// Allow cast precision loss for distance and count conversions.
#![allow(clippy::cast_precision_loss)]
// Allow significant_drop_tightening - guards are dropped explicitly where it matters.
#![allow(clippy::significant_drop_tightening)]

mod chroma;
mod collection;
mod memory;

pub use chroma::{ChromaCollection, ChromaVectorStore};
pub use collection::{NORM_EPSILON, VectorCollection, VectorStore, cosine_similarity};
pub use memory::{MemoryCollection, MemoryVectorStore};

use crate::config::VectorConfig;
use std::sync::Arc;

/// Opens the configured vector store.
///
/// Uses Chroma when a host is set and its heartbeat succeeds; otherwise falls
/// back to a fresh in-memory store. Never fails.
#[must_use]
pub fn open_vector_store(config: &VectorConfig) -> Arc<dyn VectorStore> {
    if config.base_url().is_none() {
        tracing::info!("No Chroma host configured, using in-memory vector store");
        return Arc::new(MemoryVectorStore::new());
    }

    match ChromaVectorStore::new(config).and_then(|store| store.heartbeat().map(|()| store)) {
        Ok(store) => {
            tracing::info!(url = %store.base_url(), "Connected to Chroma");
            Arc::new(store)
        },
        Err(e) => {
            tracing::warn!(error = %e, "Chroma unavailable, falling back to in-memory vector store");
            metrics::counter!("vector_store_fallbacks_total").increment(1);
            Arc::new(MemoryVectorStore::new())
        },
    }
}
