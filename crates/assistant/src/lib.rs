//! # DocChat Assistant
//!
//! Question answering over an in-memory knowledge base.
//!
//! ## Reply flow
//!
//! ```text
//! question
//!     │
//!     ├──> smalltalk::detect ──(match)──> canned reply
//!     │
//!     ├──> VectorStore::search(top_k)
//!     │
//!     ├──> gate::decide(top score >= threshold)
//!     │      ├─ yes ─> grounded answer from all retrieved chunks
//!     │      └─ no ──> general-knowledge answer (+ note)
//!     │
//!     └──> Reply { text, route }
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use docchat_assistant::{resources, AssistantSettings, SourceLabel};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let assistant = resources::shared(&AssistantSettings::default())?;
//!     let page = "Paris is the capital of France.".to_string();
//!     assistant
//!         .build_knowledge_base(SourceLabel::Url("https://example.com".into()), &[page])
//!         .await?;
//!
//!     let reply = assistant.respond("What is the capital of France?", true).await?;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

mod assistant;
mod config;
mod error;
pub mod gate;
pub mod resources;
pub mod smalltalk;
mod transcript;

pub use assistant::{
    Assistant, BuildReport, Reply, Route, SourceLabel, EMPTY_SOURCE_WARNING, NO_CONTEXT_NOTE,
};
pub use config::{
    AssistantSettings, RagParams, CHUNK_SIZE_RANGE, DEFAULT_RELEVANCE_THRESHOLD, DEFAULT_TOP_K,
    OVERLAP_RANGE, TOP_K_RANGE,
};
pub use error::{AssistantError, Result};
pub use transcript::{Role, Transcript, Turn};
