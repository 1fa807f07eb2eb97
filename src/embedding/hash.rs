//! Deterministic byte-hash embedder.

use super::Embedder;
use crate::Result;

/// Embedder that folds the UTF-8 bytes of a text into a fixed-size vector.
///
/// Byte `b` at index `i` adds to slot `i % dimensions`, modulo 1000. The
/// result carries no semantics, but texts sharing long byte runs at the same
/// offsets end up close under cosine similarity. Needs no model or network.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Default dimensions.
    pub const DEFAULT_DIMENSIONS: usize = 384;

    /// Creates an embedder with the given dimensions (zero is treated as one).
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn fold(&self, text: &str) -> Vec<f32> {
        let mut slots = vec![0u32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            let slot = &mut slots[i % self.dimensions];
            *slot = (*slot + u32::from(byte)) % 1000;
        }
        slots.into_iter().map(|v| v as f32).collect()
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.fold(text))
    }
}
