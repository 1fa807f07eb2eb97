//! Embedding generation.
//!
//! Provides embeddings from a remote `OpenAI`-compatible API, an in-process
//! ONNX model (feature `fastembed-embeddings`), or a deterministic byte hash
//! that is always available.

mod fastembed;
mod hash;
mod openai;

pub use fastembed::FastEmbedEmbedder;
pub use hash::HashEmbedder;
pub use openai::OpenAiEmbedder;

use crate::{Error, Result};

/// Trait for embedding generators.
pub trait Embedder: Send + Sync {
    /// The backend name, used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generates embeddings for multiple texts.
    ///
    /// The output has the same length and order as `texts`.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Checks that a backend returned one embedding per input.
pub(crate) fn ensure_batch_len(backend: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        return Ok(());
    }
    Err(Error::operation(
        format!("{backend}_embed_batch"),
        format!("expected {expected} embeddings, got {actual}"),
    ))
}
