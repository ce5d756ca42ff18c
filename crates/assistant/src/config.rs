use crate::error::{AssistantError, Result};
use docchat_chunker::{ChunkerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use docchat_generator::GeneratorConfig;
use docchat_vector_store::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.35;

/// Recommended ranges; values outside them are legal but unusual.
pub const CHUNK_SIZE_RANGE: RangeInclusive<usize> = 100..=1000;
pub const OVERLAP_RANGE: RangeInclusive<usize> = 0..=200;
pub const TOP_K_RANGE: RangeInclusive<usize> = 1..=10;

/// Retrieval parameters applied at build and query time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagParams {
    /// Words per chunk
    pub chunk_size: usize,

    /// Words shared between consecutive chunks; coerced to 0 when >= `chunk_size`
    pub overlap: usize,

    /// Number of chunks retrieved per question
    pub top_k: usize,

    /// Minimum top-hit score for answering from the documents
    pub relevance_threshold: f32,
}

impl Default for RagParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            top_k: DEFAULT_TOP_K,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
        }
    }
}

impl RagParams {
    /// Reject values that cannot be coerced into something usable.
    pub fn validate(&self) -> Result<()> {
        self.chunker_config().validate()?;
        if self.top_k == 0 {
            return Err(AssistantError::InvalidConfig("top_k must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(AssistantError::InvalidConfig(format!(
                "relevance_threshold must be within [0.0, 1.0], got {}",
                self.relevance_threshold
            )));
        }

        if !CHUNK_SIZE_RANGE.contains(&self.chunk_size) {
            log::debug!("chunk_size {} outside recommended {CHUNK_SIZE_RANGE:?}", self.chunk_size);
        }
        if !OVERLAP_RANGE.contains(&self.overlap) {
            log::debug!("overlap {} outside recommended {OVERLAP_RANGE:?}", self.overlap);
        }
        if !TOP_K_RANGE.contains(&self.top_k) {
            log::debug!("top_k {} outside recommended {TOP_K_RANGE:?}", self.top_k);
        }
        Ok(())
    }

    #[must_use]
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig::new(self.chunk_size, self.overlap)
    }
}

/// Everything needed to construct an [`crate::Assistant`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub rag: RagParams,
    pub embedding: EmbeddingConfig,
    pub generation: GeneratorConfig,
}

impl AssistantSettings {
    /// Fully offline settings: hashed embeddings and the extractive generator.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            rag: RagParams::default(),
            embedding: EmbeddingConfig::stub(),
            generation: GeneratorConfig::stub(),
        }
    }
}
