use crate::config::{AssistantSettings, RagParams};
use crate::error::Result;
use crate::gate;
use crate::smalltalk;
use docchat_chunker::Chunker;
use docchat_generator::AnswerGenerator;
use docchat_vector_store::{Embed, EmbeddingModel, SearchResult, VectorStore};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Appended to answers that fell back to general knowledge while documents were loaded.
pub const NO_CONTEXT_NOTE: &str =
    "\n\n*(Note: No relevant context found in the source. Replying from general knowledge.)*";

/// Warning reported when a build produced no chunks.
pub const EMPTY_SOURCE_WARNING: &str =
    "No text could be extracted from the source. Knowledge base was not rebuilt.";

const URL_LABEL_CHARS: usize = 50;

/// Where the current knowledge base came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SourceLabel {
    Url(String),
    Files(usize),
}

impl Display for SourceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => {
                let head: String = url.chars().take(URL_LABEL_CHARS).collect();
                write!(f, "URL: {head}...")
            }
            Self::Files(count) => write!(f, "{count} file(s) uploaded"),
        }
    }
}

/// Outcome of [`Assistant::build_knowledge_base`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Chunks now indexed; 0 when the build was skipped
    pub chunks: usize,

    /// Active source after the build, if any knowledge base exists
    pub source: Option<String>,

    pub warnings: Vec<String>,
}

/// Which path produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Smalltalk,
    Grounded,
    GeneralKnowledge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub route: Route,
}

/// Retrieval-augmented question answering over one in-memory knowledge base.
///
/// The assistant holds no conversation state; callers own the transcript.
pub struct Assistant {
    store: VectorStore,
    generator: AnswerGenerator,
    params: RwLock<RagParams>,
    source: RwLock<Option<String>>,
}

impl Assistant {
    pub fn new(embedder: Arc<dyn Embed>, generator: AnswerGenerator, params: RagParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            store: VectorStore::new(embedder),
            generator,
            params: RwLock::new(params),
            source: RwLock::new(None),
        })
    }

    /// Load the embedding model and generation backend named by `settings`.
    pub fn from_settings(settings: &AssistantSettings) -> Result<Self> {
        let embedder = EmbeddingModel::new(&settings.embedding)?;
        let generator = AnswerGenerator::from_config(&settings.generation)?;
        log::info!(
            "Assistant ready (embeddings: {}, generation: {})",
            embedder.model_id(),
            generator.backend_name()
        );
        Self::new(Arc::new(embedder), generator, settings.rag)
    }

    pub async fn params(&self) -> RagParams {
        *self.params.read().await
    }

    /// Replace the retrieval parameters used by later builds and replies.
    pub async fn set_params(&self, params: RagParams) -> Result<()> {
        params.validate()?;
        *self.params.write().await = params;
        Ok(())
    }

    #[must_use]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Label of the source behind the current knowledge base
    pub async fn active_source(&self) -> Option<String> {
        self.source.read().await.clone()
    }

    pub async fn has_knowledge_base(&self) -> bool {
        self.store.is_built().await
    }

    /// Chunk every text with the current parameters and rebuild the index.
    ///
    /// When nothing survives chunking the existing knowledge base is kept and
    /// the report carries [`EMPTY_SOURCE_WARNING`].
    pub async fn build_knowledge_base(
        &self,
        label: SourceLabel,
        texts: &[String],
    ) -> Result<BuildReport> {
        let params = self.params().await;
        let chunker = Chunker::new(params.chunker_config())?;

        let mut chunks = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        for text in texts {
            let chunked = chunker.chunk_raw(text);
            for warning in chunked.warnings {
                let message = warning.to_string();
                if !warnings.contains(&message) {
                    warnings.push(message);
                }
            }
            chunks.extend(chunked.chunks.into_iter().map(|chunk| chunk.text));
        }

        if chunks.is_empty() {
            log::warn!("Source '{label}' produced no chunks; skipping build");
            warnings.push(EMPTY_SOURCE_WARNING.to_string());
            return Ok(BuildReport {
                chunks: 0,
                source: self.active_source().await,
                warnings,
            });
        }

        // The label guard spans the swap so the label always names the live index.
        let mut active = self.source.write().await;
        let total = self.store.build(chunks).await?;
        let source = label.to_string();
        *active = Some(source.clone());
        drop(active);
        log::info!("Knowledge base built from {source} ({total} chunks)");

        Ok(BuildReport {
            chunks: total,
            source: Some(source),
            warnings,
        })
    }

    /// Retrieve, gate, and generate. The flag is `true` when the answer was
    /// grounded in retrieved chunks.
    pub async fn answer(
        &self,
        question: &str,
        top_k: usize,
        relevance_threshold: f32,
    ) -> Result<(String, bool)> {
        let hits = self.store.search(question, top_k).await?;
        if let Some(top) = hits.first() {
            log::debug!("Top hit score {:.4} (threshold {relevance_threshold})", top.score);
        }

        if gate::decide(&hits, relevance_threshold) {
            let context: Vec<&str> = hits.iter().map(SearchResult::text).collect();
            let text = self.generator.generate_with_context(question, &context).await?;
            Ok((text, true))
        } else {
            log::debug!("No relevant context ({} hits); using general knowledge", hits.len());
            let text = self.generator.generate_without_context(question).await?;
            Ok((text, false))
        }
    }

    /// Reply to one user message.
    ///
    /// Smalltalk short-circuits everything. Otherwise the knowledge base is
    /// consulted when `use_rag` is set and one exists; a rejected context
    /// gets [`NO_CONTEXT_NOTE`] appended.
    pub async fn respond(&self, question: &str, use_rag: bool) -> Result<Reply> {
        if let Some(canned) = smalltalk::detect(question) {
            return Ok(Reply {
                text: canned.to_string(),
                route: Route::Smalltalk,
            });
        }

        if use_rag && self.has_knowledge_base().await {
            let params = self.params().await;
            let (text, used_context) = self
                .answer(question, params.top_k, params.relevance_threshold)
                .await?;
            return Ok(if used_context {
                Reply {
                    text,
                    route: Route::Grounded,
                }
            } else {
                Reply {
                    text: format!("{text}{NO_CONTEXT_NOTE}"),
                    route: Route::GeneralKnowledge,
                }
            });
        }

        let text = self.generator.generate_without_context(question).await?;
        Ok(Reply {
            text,
            route: Route::GeneralKnowledge,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_labels() {
        assert_eq!(
            SourceLabel::Url("https://example.com/a".into()).to_string(),
            "URL: https://example.com/a..."
        );
        let long = format!("https://example.com/{}", "x".repeat(80));
        let label = SourceLabel::Url(long.clone()).to_string();
        assert_eq!(label, format!("URL: {}...", &long[..50]));
        assert_eq!(SourceLabel::Files(3).to_string(), "3 file(s) uploaded");
    }

    #[test]
    fn test_url_label_counts_chars() {
        let url = "é".repeat(60);
        let label = SourceLabel::Url(url).to_string();
        assert_eq!(label.chars().filter(|c| *c == 'é').count(), 50);
    }
}
