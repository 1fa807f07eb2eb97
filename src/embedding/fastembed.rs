//! FastEmbed-based embedder.
//!
//! Provides semantic embeddings from an in-process ONNX model via fastembed-rs.
//! Without the `fastembed-embeddings` feature the type still exists, but
//! constructing it reports a configuration error so callers can fall back.

use super::Embedder;
use crate::{Error, Result};

/// Output dimensions shared by the supported local models.
const LOCAL_DIMENSIONS: usize = 384;

// ============================================================================
// Native FastEmbed Implementation (with feature)
// ============================================================================

#[cfg(feature = "fastembed-embeddings")]
mod native {
    use super::{Embedder, Error, LOCAL_DIMENSIONS, Result};
    use crate::embedding::ensure_batch_len;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::{Mutex, PoisonError};
    use std::time::Instant;

    /// Local ONNX embedder.
    ///
    /// The model is loaded when the embedder is constructed, so a missing or
    /// corrupt model surfaces while backends are being selected.
    pub struct FastEmbedEmbedder {
        model_name: String,
        model: Mutex<fastembed::TextEmbedding>,
    }

    impl FastEmbedEmbedder {
        /// Loads the named model.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Configuration`] for unknown model names and
        /// [`Error::OperationFailed`] if the model cannot be loaded.
        pub fn new(model_name: &str) -> Result<Self> {
            let model_id = resolve_model(model_name)?;

            tracing::info!(model = model_name, "Loading embedding model...");
            let start = Instant::now();

            let options =
                fastembed::InitOptions::new(model_id).with_show_download_progress(false);
            let model = fastembed::TextEmbedding::try_new(options)
                .map_err(|e| Error::operation("load_embedding_model", e.to_string()))?;

            tracing::info!(
                elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                model = model_name,
                "Embedding model loaded"
            );

            Ok(Self {
                model_name: model_name.to_string(),
                model: Mutex::new(model),
            })
        }

        /// Returns the model name.
        #[must_use]
        pub fn model_name(&self) -> &str {
            &self.model_name
        }

        fn run(&self, texts: Vec<String>, operation: &str) -> Result<Vec<Vec<f32>>> {
            let count = texts.len();
            // ONNX runtime can panic on malformed input; keep that inside this call.
            let result = catch_unwind(AssertUnwindSafe(|| {
                let mut model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
                model.embed(texts, None)
            }));

            let embeddings = result
                .map_err(|panic_info| {
                    let panic_msg = panic_info
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic_info.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        panic_message = %panic_msg,
                        batch_size = count,
                        "ONNX runtime panicked during embedding"
                    );
                    Error::operation(operation, format!("ONNX runtime panic: {panic_msg}"))
                })?
                .map_err(|e| Error::operation(operation, e.to_string()))?;

            ensure_batch_len("fastembed", count, embeddings.len())?;
            metrics::counter!("embedding_requests_total", "backend" => "fastembed", "status" => "success")
                .increment(1);
            Ok(embeddings)
        }
    }

    fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
                Ok(fastembed::EmbeddingModel::AllMiniLML6V2)
            },
            "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => {
                Ok(fastembed::EmbeddingModel::BGESmallENV15)
            },
            _ => Err(Error::configuration(
                "fastembed",
                format!("unsupported local embedding model '{name}'"),
            )),
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn name(&self) -> &'static str {
            "fastembed"
        }

        fn dimensions(&self) -> usize {
            LOCAL_DIMENSIONS
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.run(vec![text.to_string()], "embed")?
                .into_iter()
                .next()
                .ok_or_else(|| Error::operation("embed", "no embedding returned from model"))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let owned = texts.iter().map(|s| (*s).to_string()).collect();
            self.run(owned, "embed_batch")
        }
    }
}

// ============================================================================
// Unavailable Implementation (without feature)
// ============================================================================

#[cfg(not(feature = "fastembed-embeddings"))]
mod unavailable {
    use super::{Embedder, Error, LOCAL_DIMENSIONS, Result};

    /// Placeholder for the local ONNX embedder.
    ///
    /// This build was compiled without `fastembed-embeddings`, so the
    /// constructor always fails and the embedding methods are unreachable in
    /// practice.
    pub struct FastEmbedEmbedder {
        model_name: String,
    }

    impl FastEmbedEmbedder {
        /// Always fails: the local model backend is not compiled in.
        ///
        /// # Errors
        ///
        /// Always returns [`Error::Configuration`].
        pub fn new(model_name: &str) -> Result<Self> {
            Err(Error::configuration(
                "fastembed",
                format!(
                    "local model '{model_name}' requires building with the \
                     `fastembed-embeddings` feature"
                ),
            ))
        }

        /// Returns the model name.
        #[must_use]
        pub fn model_name(&self) -> &str {
            &self.model_name
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn name(&self) -> &'static str {
            "fastembed"
        }

        fn dimensions(&self) -> usize {
            LOCAL_DIMENSIONS
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::configuration(
                "fastembed",
                "built without the `fastembed-embeddings` feature",
            ))
        }
    }
}

#[cfg(feature = "fastembed-embeddings")]
pub use native::FastEmbedEmbedder;

#[cfg(not(feature = "fastembed-embeddings"))]
pub use unavailable::FastEmbedEmbedder;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "fastembed-embeddings"))]
    #[test]
    fn test_without_feature_is_configuration_error() {
        let err = FastEmbedEmbedder::new("all-MiniLM-L6-v2").err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("fastembed-embeddings"));
    }

    #[cfg(feature = "fastembed-embeddings")]
    #[test]
    fn test_unknown_model_is_configuration_error() {
        let err = FastEmbedEmbedder::new("no-such-model").err().unwrap();
        assert!(err.is_configuration());
    }
}
