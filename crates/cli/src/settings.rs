use anyhow::{Context as AnyhowContext, Result};
use docchat_assistant::{AssistantSettings, RagParams};
use docchat_generator::GeneratorConfig;
use docchat_vector_store::{
    EmbeddingConfig, EmbeddingMode, EMBEDDING_MODEL_ENV, EMBEDDING_MODE_ENV, MODEL_DIR_ENV,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "docchat.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Timeout for fetching a URL, in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
        }
    }
}

impl SourceSettings {
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Resolved configuration for one invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rag: RagParams,
    pub embedding: EmbeddingConfig,
    pub generation: GeneratorConfig,
    pub sources: SourceSettings,
}

/// Command-line values that override every other source
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub embed_mode: Option<EmbeddingMode>,
    pub embed_model: Option<String>,
    pub model_dir: Option<PathBuf>,
    pub gen_mode: Option<docchat_generator::GenerationMode>,
    pub llm_endpoint: Option<String>,
    pub llm_model: Option<String>,
    pub chunk_size: Option<usize>,
    pub overlap: Option<usize>,
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
}

impl Settings {
    /// Defaults, then the TOML file, then environment, then `overrides`.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut settings = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env()?;
        settings.apply_overrides(overrides);
        settings
            .assistant()
            .rag
            .validate()
            .context("Invalid retrieval parameters")?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings: Self =
            toml::from_str(&raw).with_context(|| format!("Invalid {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(EMBEDDING_MODE_ENV) {
            self.embedding.mode = raw
                .parse()
                .with_context(|| format!("Invalid {EMBEDDING_MODE_ENV}"))?;
        }
        if let Ok(model) = std::env::var(EMBEDDING_MODEL_ENV) {
            self.embedding.model = model;
        }
        if let Ok(dir) = std::env::var(MODEL_DIR_ENV) {
            self.embedding.model_dir = Some(PathBuf::from(dir));
        }
        self.generation
            .apply_env()
            .context("Invalid generation settings in environment")?;
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(mode) = overrides.embed_mode {
            self.embedding.mode = mode;
        }
        if let Some(model) = &overrides.embed_model {
            self.embedding.model.clone_from(model);
        }
        if let Some(dir) = &overrides.model_dir {
            self.embedding.model_dir = Some(dir.clone());
        }
        if let Some(mode) = overrides.gen_mode {
            self.generation.mode = mode;
        }
        if let Some(endpoint) = &overrides.llm_endpoint {
            self.generation.endpoint.clone_from(endpoint);
        }
        if let Some(model) = &overrides.llm_model {
            self.generation.model.clone_from(model);
        }
        if let Some(chunk_size) = overrides.chunk_size {
            self.rag.chunk_size = chunk_size;
        }
        if let Some(overlap) = overrides.overlap {
            self.rag.overlap = overlap;
        }
        if let Some(top_k) = overrides.top_k {
            self.rag.top_k = top_k;
        }
        if let Some(threshold) = overrides.threshold {
            self.rag.relevance_threshold = threshold;
        }
    }

    #[must_use]
    pub fn assistant(&self) -> AssistantSettings {
        AssistantSettings {
            rag: self.rag,
            embedding: self.embedding.clone(),
            generation: self.generation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_generator::GenerationMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_values_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docchat.toml");
        std::fs::write(
            &path,
            r#"
            [rag]
            chunk_size = 300
            top_k = 2

            [generation]
            mode = "stub"
            model = "from-file"

            [sources]
            fetch_timeout_secs = 5
            "#,
        )
        .unwrap();

        let mut settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.rag.chunk_size, 300);
        assert_eq!(settings.rag.overlap, 100);
        assert_eq!(settings.generation.mode, GenerationMode::Stub);
        assert_eq!(settings.sources.fetch_timeout(), Duration::from_secs(5));

        settings.apply_overrides(&Overrides {
            top_k: Some(7),
            llm_model: Some("from-flag".to_string()),
            embed_mode: Some(EmbeddingMode::Stub),
            ..Overrides::default()
        });
        assert_eq!(settings.rag.top_k, 7);
        assert_eq!(settings.rag.chunk_size, 300);
        assert_eq!(settings.generation.model, "from-flag");
        assert_eq!(settings.embedding.mode, EmbeddingMode::Stub);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[rag]\ntop_k = \"many\"\n").unwrap();
        let err = Settings::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }

    #[test]
    fn test_invalid_overrides_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "").unwrap();
        let overrides = Overrides {
            threshold: Some(1.5),
            ..Overrides::default()
        };
        assert!(Settings::load(Some(&path), &overrides).is_err());
    }
}
