use docchat_chunker::Chunk;
use serde::{Deserialize, Serialize};

/// One retrieval hit: an indexed chunk and its inner-product similarity to the
/// query. Both vectors are unit length, so `score` is a cosine in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}

impl SearchResult {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}
