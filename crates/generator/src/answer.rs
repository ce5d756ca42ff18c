use crate::config::{GeneratorConfig, GENERAL_MAX_NEW_TOKENS, GROUNDED_MAX_NEW_TOKENS};
use crate::error::Result;
use crate::generate::{build_generator, Generate};
use crate::prompts::{general_prompt, grounded_prompt};
use std::sync::Arc;

/// Grounded and context-free answering on top of a [`Generate`] backend.
///
/// Both paths decode deterministically; the grounded path gets the larger
/// output budget since it may have to enumerate items from the context.
#[derive(Clone)]
pub struct AnswerGenerator {
    backend: Arc<dyn Generate>,
    grounded_max_new_tokens: usize,
    general_max_new_tokens: usize,
}

impl AnswerGenerator {
    pub fn new(backend: Arc<dyn Generate>) -> Self {
        Self {
            backend,
            grounded_max_new_tokens: GROUNDED_MAX_NEW_TOKENS,
            general_max_new_tokens: GENERAL_MAX_NEW_TOKENS,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        Ok(Self::new(build_generator(config)?)
            .with_budgets(config.grounded_max_new_tokens, config.general_max_new_tokens))
    }

    #[must_use]
    pub fn with_budgets(mut self, grounded: usize, general: usize) -> Self {
        self.grounded_max_new_tokens = grounded;
        self.general_max_new_tokens = general;
        self
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Answer `question` using only `chunks`, given in retrieval order.
    pub async fn generate_with_context<S: AsRef<str> + Sync>(
        &self,
        question: &str,
        chunks: &[S],
    ) -> Result<String> {
        let prompt = grounded_prompt(question, chunks);
        log::debug!(
            "Grounded generation with {} passages ({} prompt chars)",
            chunks.len(),
            prompt.len()
        );
        let output = self
            .backend
            .generate(&prompt, self.grounded_max_new_tokens, true)
            .await?;
        Ok(output.trim().to_string())
    }

    /// Answer `question` from the model's general knowledge.
    pub async fn generate_without_context(&self, question: &str) -> Result<String> {
        let prompt = general_prompt(question);
        log::debug!("General-knowledge generation");
        let output = self
            .backend
            .generate(&prompt, self.general_max_new_tokens, true)
            .await?;
        Ok(output.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Records every call and answers with padded text.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, usize, bool)>>,
    }

    #[async_trait]
    impl Generate for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn generate(
            &self,
            prompt: &str,
            max_new_tokens: usize,
            deterministic: bool,
        ) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_new_tokens, deterministic));
            Ok("  \n answer text \n".to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl Generate for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _: &str, _: usize, _: bool) -> Result<String> {
            Err(GeneratorError::Provider("model unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_with_context_uses_grounded_budget() {
        let recorder = Arc::new(Recorder::default());
        let generator = AnswerGenerator::new(recorder.clone());

        let answer = generator
            .generate_with_context("Where?", &["alpha", "beta"])
            .await
            .unwrap();
        assert_eq!(answer, "answer text");

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (prompt, budget, deterministic) = &calls[0];
        assert!(prompt.contains("alpha\n\nbeta"));
        assert!(prompt.contains("Question: Where?"));
        assert_eq!(*budget, GROUNDED_MAX_NEW_TOKENS);
        assert!(*deterministic);
    }

    #[tokio::test]
    async fn test_without_context_uses_general_budget() {
        let recorder = Arc::new(Recorder::default());
        let generator = AnswerGenerator::new(recorder.clone());

        let answer = generator.generate_without_context("Why?").await.unwrap();
        assert_eq!(answer, "answer text");

        let calls = recorder.calls.lock().unwrap();
        let (prompt, budget, deterministic) = &calls[0];
        assert!(prompt.starts_with("Answer the following question based on your general knowledge."));
        assert!(!prompt.contains("Context:"));
        assert_eq!(*budget, GENERAL_MAX_NEW_TOKENS);
        assert!(*deterministic);
    }

    #[tokio::test]
    async fn test_custom_budgets() {
        let recorder = Arc::new(Recorder::default());
        let generator = AnswerGenerator::new(recorder.clone()).with_budgets(64, 32);
        generator.generate_with_context("q", &["c"]).await.unwrap();
        generator.generate_without_context("q").await.unwrap();

        let budgets: Vec<usize> = recorder.calls.lock().unwrap().iter().map(|c| c.1).collect();
        assert_eq!(budgets, vec![64, 32]);
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let generator = AnswerGenerator::new(Arc::new(Failing));
        assert!(generator.generate_without_context("q").await.is_err());
        assert!(generator.generate_with_context("q", &["c"]).await.is_err());
    }
}
