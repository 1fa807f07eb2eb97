//! Fixed-window text chunking.
//!
//! Windows are measured in characters (Unicode scalar values), so a chunk
//! never ends inside a multi-byte sequence. Consecutive windows share
//! `overlap` characters.

use crate::config::ChunkingConfig;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Splits text into fixed-size overlapping windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker {
    /// Creates a chunker. A size of zero is treated as one.
    #[must_use]
    pub const fn new(size: usize, overlap: usize) -> Self {
        Self {
            size: if size == 0 { 1 } else { size },
            overlap,
        }
    }

    /// Creates a chunker from the chunking configuration.
    #[must_use]
    pub const fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.size, config.overlap)
    }

    /// Window size in characters.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Overlap in characters.
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Returns the `(start, end)` character offsets of each window.
    ///
    /// Starts are strictly increasing and the last end equals the character
    /// count. Empty text has no windows.
    #[must_use]
    pub fn windows(&self, char_count: usize) -> Vec<(usize, usize)> {
        let mut windows = Vec::new();
        let mut start = 0;

        while start < char_count {
            let end = (start + self.size).min(char_count);
            windows.push((start, end));
            if end >= char_count {
                break;
            }
            // An overlap at or above the size would stall; always advance.
            start = end.saturating_sub(self.overlap).max(start + 1);
        }

        windows
    }

    /// Splits `text` into windows.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, including the end.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        self.windows(char_count)
            .into_iter()
            .map(|(start, end)| text[boundaries[start]..boundaries[end]].to_string())
            .collect()
    }
}

/// Splits `text` into windows of `chunk_size` characters overlapping by
/// `overlap`.
#[must_use]
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    Chunker::new(chunk_size, overlap).chunk(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_empty_text() {
        assert!(chunk("", 800, 100).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let text = "Apple revenue grew 10% year-over-year.";
        assert_eq!(chunk(text, 800, 100), vec![text.to_string()]);
    }

    #[test]
    fn test_overlapping_windows() {
        let chunks = chunk("abcdefghij", 4, 1);
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_exact_fit_has_no_trailing_chunk() {
        assert_eq!(chunk("abcdefgh", 4, 0), vec!["abcd", "efgh"]);
    }

    #[test]
    fn test_multibyte_characters_not_split() {
        let text = "€€€€€€";
        let chunks = chunk(text, 4, 2);
        assert_eq!(chunks, vec!["€€€€", "€€€€"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[test_case(3, 3; "overlap equals size")]
    #[test_case(3, 10; "overlap above size")]
    #[test_case(0, 0; "zero size")]
    fn test_degenerate_settings_make_progress(size: usize, overlap: usize) {
        let windows = Chunker::new(size, overlap).windows(20);
        assert!(windows.windows(2).all(|w| w[1].0 > w[0].0));
        assert_eq!(windows.last().map(|w| w.1), Some(20));
    }

    #[test]
    fn test_default_settings() {
        let chunker = Chunker::default();
        assert_eq!(chunker.size(), 800);
        assert_eq!(chunker.overlap(), 100);

        let text = "x".repeat(2_000);
        // ceil((2000 - 100) / 700) = 3
        assert_eq!(chunker.chunk(&text).len(), 3);
    }
}
