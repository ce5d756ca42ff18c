use serde::{Deserialize, Serialize};

use crate::error::{ChunkerError, Result};
use crate::types::ChunkWarning;

/// Default window size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default number of words shared by consecutive windows.
pub const DEFAULT_OVERLAP: usize = 100;

/// Configuration for word-window chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Words per chunk (hard limit, the last chunk may be shorter)
    pub chunk_size: usize,

    /// Words shared between consecutive chunks, must stay below `chunk_size`
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    #[must_use]
    pub const fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Validate configuration.
    ///
    /// Only a zero window is rejected. An overlap that does not fit the window
    /// is a recoverable policy violation, handled by [`ChunkerConfig::resolve`].
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }
        Ok(())
    }

    /// Returns the effective overlap, coercing it to 0 when it is not smaller
    /// than the window, together with the warning describing the coercion.
    #[must_use]
    pub fn resolve(&self) -> (usize, Option<ChunkWarning>) {
        if self.overlap >= self.chunk_size {
            let warning = ChunkWarning::OverlapCoerced {
                overlap: self.overlap,
                chunk_size: self.chunk_size,
            };
            return (0, Some(warning));
        }
        (self.overlap, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve(), (DEFAULT_OVERLAP, None));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = ChunkerConfig::new(0, 0);
        assert_eq!(
            config.validate(),
            Err(ChunkerError::InvalidConfig(
                "chunk_size must be > 0".to_string()
            ))
        );
    }

    #[test]
    fn test_overlap_equal_to_window_is_coerced() {
        let config = ChunkerConfig::new(200, 200);
        let (overlap, warning) = config.resolve();
        assert_eq!(overlap, 0);
        assert_eq!(
            warning,
            Some(ChunkWarning::OverlapCoerced {
                overlap: 200,
                chunk_size: 200
            })
        );
    }

    #[test]
    fn test_overlap_below_window_is_kept() {
        let config = ChunkerConfig::new(200, 199);
        assert_eq!(config.resolve(), (199, None));
    }
}
