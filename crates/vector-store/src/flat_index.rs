use crate::embeddings::normalize;
use crate::error::{Result, VectorStoreError};
use docchat_chunker::Chunk;
use ndarray::{Array1, Array2};

/// Exact inner-product index over unit vectors.
///
/// Row `i` of the matrix is the embedding of `chunks[i]`; the two are built
/// together and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    chunks: Vec<Chunk>,
    vectors: Array2<f32>,
}

impl FlatIndex {
    /// Index with no rows of the given dimension
    #[must_use]
    pub fn empty(dimension: usize) -> Self {
        Self {
            chunks: Vec::new(),
            vectors: Array2::zeros((0, dimension)),
        }
    }

    /// Pair chunks with their embeddings, re-normalizing every vector.
    pub fn from_parts(dimension: usize, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(VectorStoreError::BatchMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let mut flat = Vec::with_capacity(vectors.len() * dimension);
        for (row, mut vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(VectorStoreError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if !is_finite(&vector) {
                return Err(VectorStoreError::EmbeddingError(format!(
                    "Non-finite value in embedding for chunk {row}"
                )));
            }
            normalize(&mut vector);
            flat.extend(vector);
        }

        let vectors = Array2::from_shape_vec((chunks.len(), dimension), flat)
            .map_err(|e| VectorStoreError::IndexError(format!("Matrix shape error: {e}")))?;

        Ok(Self { chunks, vectors })
    }

    /// Top-`k` rows by inner product with `query`, returned as
    /// `(row, score)` sorted by score descending. Equal scores keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension() {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension(),
                actual: query.len(),
            });
        }
        if !is_finite(query) {
            return Err(VectorStoreError::EmbeddingError(
                "Non-finite value in query embedding".to_string(),
            ));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = query.to_vec();
        normalize(&mut query);
        let scores = self.vectors.dot(&Array1::from_vec(query));

        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);

        Ok(ranked)
    }

    #[must_use]
    pub fn chunk(&self, row: usize) -> Option<&Chunk> {
        self.chunks.get(row)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    /// Get number of vectors in index
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|v| v.is_finite())
}
