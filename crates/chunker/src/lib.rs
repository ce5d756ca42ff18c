//! # DocChat Chunker
//!
//! Text cleanup and word-window chunking for retrieval.
//!
//! ## Architecture
//!
//! ```text
//! Extracted text (PDF / HTML / plain)
//!     │
//!     ├──> Normalizer
//!     │      └─> null bytes → spaces, whitespace runs → one space, trim
//!     │
//!     └──> Chunker
//!            ├─> split into word tokens
//!            ├─> slide a `chunk_size` window by `chunk_size - overlap`
//!            └─> emit Chunk[] in document order (+ coercion warnings)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use docchat_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::new(4, 1)).unwrap();
//! let out = chunker.chunk_raw("Paris is\n the  capital of France.");
//! assert_eq!(out.texts(), vec!["Paris is the capital", "capital of France."]);
//! ```

mod chunker;
mod config;
mod error;
mod normalize;
mod types;

pub use chunker::Chunker;
pub use config::{ChunkerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
pub use error::{ChunkerError, Result};
pub use normalize::{is_separator, normalize_text, words};
pub use types::{Chunk, ChunkWarning, Chunked};
