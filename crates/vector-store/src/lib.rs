//! # DocChat Vector Store
//!
//! In-memory embedding index and similarity search for document chunks.
//!
//! ## Architecture
//!
//! ```text
//! chunk texts
//!     │
//!     ├──> Embed (ONNX Runtime or hashed stub)
//!     │      └─> unit vectors [384/768]
//!     │
//!     └──> FlatIndex (rows co-indexed with chunks)
//!            └─> exact top-k by inner product
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docchat_vector_store::{EmbeddingConfig, EmbeddingModel, VectorStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let model = EmbeddingModel::new(&EmbeddingConfig::default())?;
//!     let store = VectorStore::new(Arc::new(model));
//!
//!     store.build(vec!["Paris is the capital of France.".to_string()]).await?;
//!
//!     for hit in store.search("capital of France", 4).await? {
//!         println!("{:.3}: {}", hit.score, hit.chunk.text);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod paths;
mod store;
mod types;

pub use embeddings::{
    normalize, Embed, EmbeddingConfig, EmbeddingMode, EmbeddingModel, ModelSpec, Pooling,
    DEFAULT_MODEL_ID, EMBEDDING_MODEL_ENV, EMBEDDING_MODE_ENV,
};
pub use error::{Result, VectorStoreError};
pub use flat_index::FlatIndex;
pub use paths::{model_dir, MODEL_DIR_ENV};
pub use store::VectorStore;
pub use types::SearchResult;

// Re-export chunk type for convenience
pub use docchat_chunker::Chunk;
