use crate::error::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

pub const GENERATION_MODE_ENV: &str = "DOCCHAT_GENERATION_MODE";
pub const LLM_ENDPOINT_ENV: &str = "DOCCHAT_LLM_ENDPOINT";
pub const LLM_MODEL_ENV: &str = "DOCCHAT_LLM_MODEL";
pub const LLM_API_KEY_ENV: &str = "DOCCHAT_LLM_API_KEY";

/// Output budget for answers grounded in retrieved context.
pub const GROUNDED_MAX_NEW_TOKENS: usize = 250;

/// Output budget for answers from general knowledge.
pub const GENERAL_MAX_NEW_TOKENS: usize = 200;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// OpenAI-compatible chat completions endpoint
    #[default]
    Http,
    /// Offline extractive responder
    Stub,
}

impl FromStr for GenerationMode {
    type Err = GeneratorError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "stub" => Ok(Self::Stub),
            other => Err(GeneratorError::InvalidConfig(format!(
                "Unsupported generation mode '{other}' (expected 'http' or 'stub')"
            ))),
        }
    }
}

impl Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Stub => f.write_str("stub"),
        }
    }
}

/// Generation backend selection and decoding budgets
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub mode: GenerationMode,

    /// Base URL of an OpenAI-compatible API, e.g. `http://localhost:11434/v1`
    pub endpoint: String,

    /// Model name sent with every request
    pub model: String,

    /// Bearer token; requests are unauthenticated when unset
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    pub grounded_max_new_tokens: usize,

    pub general_max_new_tokens: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            endpoint: "http://localhost:11434/v1".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            timeout_secs: 120,
            grounded_max_new_tokens: GROUNDED_MAX_NEW_TOKENS,
            general_max_new_tokens: GENERAL_MAX_NEW_TOKENS,
        }
    }
}

impl GeneratorConfig {
    /// Defaults overridden by the `DOCCHAT_GENERATION_MODE` / `DOCCHAT_LLM_*` variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay any `DOCCHAT_GENERATION_MODE` / `DOCCHAT_LLM_*` variables that are set.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(GENERATION_MODE_ENV) {
            self.mode = raw.parse()?;
        }
        if let Ok(endpoint) = std::env::var(LLM_ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var(LLM_MODEL_ENV) {
            self.model = model;
        }
        if let Ok(key) = std::env::var(LLM_API_KEY_ENV) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn stub() -> Self {
        Self {
            mode: GenerationMode::Stub,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.grounded_max_new_tokens == 0 || self.general_max_new_tokens == 0 {
            return Err(GeneratorError::InvalidConfig(
                "max_new_tokens budgets must be > 0".to_string(),
            ));
        }
        if self.mode == GenerationMode::Http {
            if self.endpoint.trim().is_empty() {
                return Err(GeneratorError::InvalidConfig(
                    "endpoint must not be empty".to_string(),
                ));
            }
            if self.model.trim().is_empty() {
                return Err(GeneratorError::InvalidConfig(
                    "model must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
