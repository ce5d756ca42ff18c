//! Chat completions over any OpenAI-compatible HTTP API
//! (OpenAI, Ollama, llama.cpp server, vLLM, ...).

use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};
use crate::generate::Generate;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const CHAT_PATH: &str = "/chat/completions";
const SAMPLING_TEMPERATURE: f32 = 0.7;

pub struct OpenAiCompatible {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatible {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url = format!("{}{CHAT_PATH}", config.endpoint.trim_end_matches('/'));
        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_body(&self, prompt: &str, max_new_tokens: usize, deterministic: bool) -> Value {
        let temperature = if deterministic {
            0.0
        } else {
            SAMPLING_TEMPERATURE
        };
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": max_new_tokens,
            "temperature": temperature,
            "stream": false,
        })
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn completion_text(body: &Value) -> Result<String> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| GeneratorError::InvalidResponse("No choices in response".into()))?;
    choice["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| GeneratorError::InvalidResponse("Choice has no message content".into()))
}

#[async_trait]
impl Generate for OpenAiCompatible {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: usize,
        deterministic: bool,
    ) -> Result<String> {
        let body = self.request_body(prompt, max_new_tokens, deterministic);
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        log::debug!("POST {} (model {}, max_tokens {max_new_tokens})", self.url, self.model);
        let response = request
            .send()
            .await
            .map_err(|e| GeneratorError::Http(format!("connection failed ({}): {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Provider(format!("API error {status}: {text}")));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| GeneratorError::InvalidResponse(e.to_string()))?;
        completion_text(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn backend() -> OpenAiCompatible {
        OpenAiCompatible::new(&GeneratorConfig {
            endpoint: "http://127.0.0.1:9/v1/".to_string(),
            model: "tiny".to_string(),
            ..GeneratorConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_joins_chat_path() {
        assert_eq!(backend().url(), "http://127.0.0.1:9/v1/chat/completions");
    }

    #[test]
    fn test_request_body_greedy() {
        let body = backend().request_body("hello", 250, true);
        assert_eq!(body["model"], "tiny");
        assert_eq!(body["max_tokens"], 250);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_request_body_sampling() {
        let body = backend().request_body("hello", 200, false);
        assert!(body["temperature"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_completion_text() {
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": "Paris." } }] });
        assert_eq!(completion_text(&body).unwrap(), "Paris.");

        assert!(matches!(
            completion_text(&json!({ "choices": [] })),
            Err(GeneratorError::InvalidResponse(_))
        ));
        assert!(completion_text(&json!({ "choices": [{ "message": {} }] })).is_err());
    }
}
