//! # DocChat Generator
//!
//! Text generation for grounded and context-free answers.
//!
//! The model itself is behind the [`Generate`] trait. Two backends ship:
//! [`OpenAiCompatible`] talks to any `/chat/completions` endpoint (OpenAI,
//! Ollama, llama.cpp, vLLM) and [`StubGenerator`] answers offline.
//! [`AnswerGenerator`] owns the prompt templates and output budgets.
//!
//! ```no_run
//! use docchat_generator::{AnswerGenerator, GeneratorConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let generator = AnswerGenerator::from_config(&GeneratorConfig::from_env()?)?;
//!     let answer = generator
//!         .generate_with_context("What is the capital?", &["Paris is the capital of France."])
//!         .await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

mod answer;
mod config;
mod error;
mod generate;
mod openai;
pub mod prompts;
mod stub;

pub use answer::AnswerGenerator;
pub use config::{
    GenerationMode, GeneratorConfig, GENERAL_MAX_NEW_TOKENS, GENERATION_MODE_ENV,
    GROUNDED_MAX_NEW_TOKENS, LLM_API_KEY_ENV, LLM_ENDPOINT_ENV, LLM_MODEL_ENV,
};
pub use error::{GeneratorError, Result};
pub use generate::{build_generator, Generate};
pub use openai::OpenAiCompatible;
pub use stub::{StubGenerator, STUB_GENERAL_REPLY};
