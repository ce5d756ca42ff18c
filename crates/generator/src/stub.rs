use crate::error::Result;
use crate::generate::Generate;
use crate::prompts::extract_context;
use async_trait::async_trait;

/// Reply given by [`StubGenerator`] to prompts without a context block.
pub const STUB_GENERAL_REPLY: &str =
    "I can only answer from loaded documents while running in offline mode.";

/// Offline generator for tests and air-gapped use.
///
/// Grounded prompts are answered with the first sentence of the first context
/// passage; anything else gets [`STUB_GENERAL_REPLY`]. Output is capped at
/// `max_new_tokens` whitespace-separated words.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubGenerator;

fn first_sentence(passage: &str) -> &str {
    let end = passage
        .char_indices()
        .find(|&(_, c)| matches!(c, '.' | '!' | '?'))
        .map_or(passage.len(), |(i, c)| i + c.len_utf8());
    passage[..end].trim()
}

fn cap_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Generate for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: usize,
        _deterministic: bool,
    ) -> Result<String> {
        let answer = extract_context(prompt)
            .and_then(|context| context.split("\n\n").map(str::trim).find(|p| !p.is_empty()))
            .map_or(STUB_GENERAL_REPLY, first_sentence);
        Ok(cap_words(answer, max_new_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::{general_prompt, grounded_prompt};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_grounded_prompt_echoes_first_sentence() {
        let prompt = grounded_prompt(
            "What is the capital of France?",
            &["Paris is the capital of France. It sits on the Seine.", "Rome is in Italy."],
        );
        let answer = StubGenerator.generate(&prompt, 250, true).await.unwrap();
        assert_eq!(answer, "Paris is the capital of France.");
    }

    #[tokio::test]
    async fn test_general_prompt_gets_fixed_reply() {
        let answer = StubGenerator
            .generate(&general_prompt("Why?"), 200, true)
            .await
            .unwrap();
        assert_eq!(answer, STUB_GENERAL_REPLY);
    }

    #[tokio::test]
    async fn test_output_capped_by_budget() {
        let prompt = grounded_prompt("q", &["one two three four five six"]);
        let answer = StubGenerator.generate(&prompt, 3, true).await.unwrap();
        assert_eq!(answer, "one two three");
    }

    #[test]
    fn test_first_sentence_without_terminator() {
        assert_eq!(first_sentence("  no period here "), "no period here");
        assert_eq!(first_sentence("Wow! More."), "Wow!");
    }
}
