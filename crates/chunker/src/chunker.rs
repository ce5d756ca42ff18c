use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::normalize::{normalize_text, words};
use crate::types::{Chunk, Chunked};

/// Main chunker interface for splitting documents into word windows
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker, rejecting configurations that cannot be coerced
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk already-normalized text.
    ///
    /// A window of `chunk_size` words slides over the token sequence, advancing
    /// by `chunk_size - overlap` words, until the window start passes the last
    /// token. The final window may be shorter than `chunk_size`.
    #[must_use]
    pub fn chunk_str(&self, text: &str) -> Chunked {
        let (overlap, warning) = self.config.resolve();
        let mut warnings = Vec::new();
        if let Some(warning) = warning {
            log::warn!("{warning}");
            warnings.push(warning);
        }

        let tokens: Vec<&str> = words(text).collect();
        let chunk_size = self.config.chunk_size;
        let step = chunk_size - overlap;

        let mut chunks = Vec::with_capacity(tokens.len().div_ceil(step));
        let mut start = 0;
        while start < tokens.len() {
            let end = start.saturating_add(chunk_size).min(tokens.len());
            let joined = tokens[start..end].join(" ");
            if !joined.is_empty() {
                chunks.push(Chunk::new(chunks.len(), joined));
            }
            start = start.saturating_add(step);
        }

        log::debug!(
            "Chunked {} words into {} chunks (size {}, overlap {})",
            tokens.len(),
            chunks.len(),
            chunk_size,
            overlap
        );

        Chunked { chunks, warnings }
    }

    /// Normalize raw extracted text, then chunk it
    #[must_use]
    pub fn chunk_raw(&self, raw: &str) -> Chunked {
        self.chunk_str(&normalize_text(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkWarning;
    use pretty_assertions::assert_eq;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = Chunker::new(ChunkerConfig::new(5, 1)).unwrap();
        let out = chunker.chunk_str("");
        assert!(out.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_window_larger_than_text_yields_single_chunk() {
        let text = numbered_words(10);
        let chunker = Chunker::new(ChunkerConfig::new(500, 100)).unwrap();
        let out = chunker.chunk_str(&text);
        assert_eq!(out.texts(), vec![text]);
        assert_eq!(out.chunks[0].index, 0);
    }

    #[test]
    fn test_overlapping_windows() {
        let chunker = Chunker::new(ChunkerConfig::new(4, 2)).unwrap();
        let out = chunker.chunk_str("a b c d e f g");
        assert_eq!(
            out.texts(),
            vec!["a b c d", "c d e f", "e f g", "g"]
        );
        let indices: Vec<usize> = out.chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_oversized_overlap_is_coerced_with_warning() {
        let text = numbered_words(1200);
        let chunker = Chunker::new(ChunkerConfig::new(500, 600)).unwrap();
        let out = chunker.chunk_str(&text);

        assert_eq!(
            out.warnings,
            vec![ChunkWarning::OverlapCoerced {
                overlap: 600,
                chunk_size: 500
            }]
        );
        assert_eq!(out.len(), 3);
        assert_eq!(out.chunks[0].word_count(), 500);
        assert_eq!(out.chunks[1].word_count(), 500);
        assert_eq!(out.chunks[2].word_count(), 200);
        assert!(out.chunks[1].text.starts_with("w500 "));
    }

    #[test]
    fn test_chunk_raw_normalizes_first() {
        let chunker = Chunker::new(ChunkerConfig::new(3, 0)).unwrap();
        let out = chunker.chunk_raw("one\0two\n\nthree\tfour");
        assert_eq!(out.texts(), vec!["one two three", "four"]);
    }

    #[test]
    fn test_zero_chunk_size_is_an_error() {
        assert!(Chunker::new(ChunkerConfig::new(0, 0)).is_err());
    }
}
