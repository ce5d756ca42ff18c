use crate::embeddings::Embed;
use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::types::SearchResult;
use docchat_chunker::Chunk;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// In-memory knowledge base: chunks, their embeddings, and similarity search.
///
/// Every [`VectorStore::build`] replaces the whole index. Builds are
/// serialized, and the new index is swapped in only after every chunk has
/// been embedded, so searches never observe a half-built state and a failed
/// build leaves the previous index in place.
pub struct VectorStore {
    embedder: Arc<dyn Embed>,
    index: RwLock<Option<FlatIndex>>,
    build_lock: Mutex<()>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embed>) -> Self {
        log::debug!("Initializing VectorStore (dim {})", embedder.dimension());
        Self {
            embedder,
            index: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Rebuild the index from `chunks`, in order. Returns the number of indexed chunks.
    pub async fn build(&self, chunks: Vec<String>) -> Result<usize> {
        let _writer = self.build_lock.lock().await;
        let dimension = self.embedder.dimension();

        let index = if chunks.is_empty() {
            FlatIndex::empty(dimension)
        } else {
            log::info!("Embedding {} chunks", chunks.len());
            let vectors = self.embedder.embed_batch(&chunks).await?;
            if vectors.len() != chunks.len() {
                return Err(VectorStoreError::BatchMismatch {
                    expected: chunks.len(),
                    actual: vectors.len(),
                });
            }
            let chunks = chunks
                .into_iter()
                .enumerate()
                .map(|(i, text)| Chunk::new(i, text))
                .collect();
            FlatIndex::from_parts(dimension, chunks, vectors)?
        };

        let total = index.len();
        *self.index.write().await = Some(index);
        log::info!("Knowledge base rebuilt. Total chunks: {total}");
        Ok(total)
    }

    /// The `k` chunks most similar to `query`, best first.
    ///
    /// An unbuilt or empty index yields no hits without touching the embedder.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        log::debug!("Searching for: '{query}' (limit: {k})");
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let mut embedded = self.embedder.embed_batch(&[query.to_string()]).await?;
        let query_vector = embedded
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))?;

        let guard = self.index.read().await;
        let Some(index) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let results: Vec<SearchResult> = index
            .search(&query_vector, k)?
            .into_iter()
            .filter_map(|(row, score)| {
                index.chunk(row).map(|chunk| SearchResult {
                    chunk: chunk.clone(),
                    score,
                })
            })
            .collect();

        log::debug!("Found {} results", results.len());
        Ok(results)
    }

    /// Whether any build has completed, even one with zero chunks
    pub async fn is_built(&self) -> bool {
        self.index.read().await.is_some()
    }

    /// Get total number of chunks
    pub async fn len(&self) -> usize {
        self.index.read().await.as_ref().map_or(0, FlatIndex::len)
    }

    /// Check if store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of the indexed chunks in index order
    pub async fn chunks(&self) -> Vec<Chunk> {
        let guard = self.index.read().await;
        guard.as_ref().map_or_else(Vec::new, |index| {
            (0..index.len())
                .filter_map(|row| index.chunk(row).cloned())
                .collect()
        })
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingConfig, EmbeddingModel};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Embedder with hand-picked vectors and call accounting.
    struct FixtureEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl FixtureEmbedder {
        fn new(pairs: &[(&str, [f32; 2])]) -> Arc<Self> {
            Arc::new(Self {
                vectors: pairs
                    .iter()
                    .map(|(text, v)| ((*text).to_string(), v.to_vec()))
                    .collect(),
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Embed for FixtureEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(VectorStoreError::EmbeddingError("model offline".into()));
            }
            Ok(texts
                .iter()
                .map(|t| self.vectors.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
                .collect())
        }
    }

    fn fixture() -> Arc<FixtureEmbedder> {
        FixtureEmbedder::new(&[
            ("north", [0.0, 1.0]),
            ("east", [1.0, 0.0]),
            ("north-east", [1.0, 1.0]),
            ("query-north", [0.0, 2.0]),
        ])
    }

    #[tokio::test]
    async fn test_unbuilt_store_returns_no_hits_without_embedding() {
        let embedder = fixture();
        let store = VectorStore::new(embedder.clone());
        assert!(!store.is_built().await);
        assert!(store.search("query-north", 3).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_orders_by_score() {
        let embedder = fixture();
        let store = VectorStore::new(embedder.clone());
        let built = store
            .build(vec!["east".into(), "north-east".into(), "north".into()])
            .await
            .unwrap();
        assert_eq!(built, 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

        let hits = store.search("query-north", 2).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(SearchResult::text).collect();
        assert_eq!(texts, vec!["north", "north-east"]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!((hits[1].score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(hits[0].chunk.index, 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_content() {
        let store = VectorStore::new(fixture());
        store.build(vec!["east".into(), "north".into()]).await.unwrap();
        store.build(vec!["north-east".into()]).await.unwrap();

        assert_eq!(store.len().await, 1);
        let hits = store.search("query-north", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text(), "north-east");
        assert_eq!(hits[0].chunk.index, 0);
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_index() {
        let embedder = fixture();
        let store = VectorStore::new(embedder.clone());
        store.build(vec!["north".into()]).await.unwrap();

        embedder.fail.store(true, Ordering::SeqCst);
        assert!(store.build(vec!["east".into()]).await.is_err());
        embedder.fail.store(false, Ordering::SeqCst);

        let chunks = store.chunks().await;
        assert_eq!(chunks, vec![Chunk::new(0, "north")]);
        let hits = store.search("query-north", 1).await.unwrap();
        assert_eq!(hits[0].text(), "north");
    }

    #[tokio::test]
    async fn test_empty_build_is_built_but_empty() {
        let embedder = fixture();
        let store = VectorStore::new(embedder.clone());
        store.build(vec!["north".into()]).await.unwrap();
        assert_eq!(store.build(Vec::new()).await.unwrap(), 0);

        assert!(store.is_built().await);
        assert!(store.is_empty().await);
        assert!(store.search("query-north", 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_k_returns_nothing() {
        let store = VectorStore::new(fixture());
        store.build(vec!["north".into()]).await.unwrap();
        assert!(store.search("query-north", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stub_model_end_to_end() {
        let model = EmbeddingModel::new(&EmbeddingConfig::stub()).unwrap();
        let store = VectorStore::new(Arc::new(model));
        store
            .build(vec![
                "Paris is the capital of France.".into(),
                "The mitochondria is the powerhouse of the cell.".into(),
            ])
            .await
            .unwrap();

        let hits = store
            .search("What is the capital of France?", 2)
            .await
            .unwrap();
        assert_eq!(hits[0].text(), "Paris is the capital of France.");
        assert!(hits[0].score >= hits[1].score);
    }
}
