use crate::config::{GenerationMode, GeneratorConfig};
use crate::error::Result;
use crate::openai::OpenAiCompatible;
use crate::stub::StubGenerator;
use async_trait::async_trait;
use std::sync::Arc;

/// Text-to-text language model.
///
/// `deterministic` asks for greedy decoding; backends that cannot honor it
/// should decode as close to greedy as they allow.
#[async_trait]
pub trait Generate: Send + Sync {
    /// Short backend label for logs
    fn name(&self) -> &str;

    /// Continue `prompt` with at most `max_new_tokens` new tokens.
    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: usize,
        deterministic: bool,
    ) -> Result<String>;
}

/// Instantiate the backend selected by `config.mode`.
pub fn build_generator(config: &GeneratorConfig) -> Result<Arc<dyn Generate>> {
    config.validate()?;
    let generator: Arc<dyn Generate> = match config.mode {
        GenerationMode::Http => Arc::new(OpenAiCompatible::new(config)?),
        GenerationMode::Stub => Arc::new(StubGenerator),
    };
    log::debug!("Generation backend: {}", generator.name());
    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_stub_generator() {
        let generator = build_generator(&GeneratorConfig::stub()).unwrap();
        assert_eq!(generator.name(), "stub");
    }

    #[test]
    fn test_build_http_generator() {
        let generator = build_generator(&GeneratorConfig::default()).unwrap();
        assert_eq!(generator.name(), "openai-compatible");
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = GeneratorConfig {
            model: " ".to_string(),
            ..GeneratorConfig::default()
        };
        assert!(build_generator(&config).is_err());
    }
}
