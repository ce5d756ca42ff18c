use std::fmt;

use serde::{Deserialize, Serialize};

/// A contiguous word window of a source document, the unit of retrieval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in document order (0-based)
    pub index: usize,

    /// Window tokens joined by single spaces
    pub text: String,
}

impl Chunk {
    /// Create a new chunk
    #[must_use]
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Number of whitespace-delimited words in this chunk
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.text.split(' ').filter(|w| !w.is_empty()).count()
    }
}

/// Non-fatal signal raised while chunking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkWarning {
    /// The requested overlap did not fit the window and was replaced by 0
    OverlapCoerced { overlap: usize, chunk_size: usize },
}

impl fmt::Display for ChunkWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OverlapCoerced {
                overlap,
                chunk_size,
            } => write!(
                f,
                "Overlap ({overlap}) is greater than or equal to chunk size ({chunk_size}). Setting overlap to 0."
            ),
        }
    }
}

/// Output of a chunking pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunked {
    /// Chunks in document order
    pub chunks: Vec<Chunk>,

    /// Policy coercions applied to produce `chunks`
    pub warnings: Vec<ChunkWarning>,
}

impl Chunked {
    /// Chunk texts in document order
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.text.clone()).collect()
    }

    #[must_use]
    pub fn into_texts(self) -> Vec<String> {
        self.chunks.into_iter().map(|c| c.text).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(Chunk::new(0, "one two three").word_count(), 3);
        assert_eq!(Chunk::new(0, "").word_count(), 0);
    }

    #[test]
    fn test_warning_message_names_both_values() {
        let warning = ChunkWarning::OverlapCoerced {
            overlap: 600,
            chunk_size: 500,
        };
        let message = warning.to_string();
        assert!(message.contains("600"));
        assert!(message.contains("500"));
    }
}
