use crate::error::{Result, VectorStoreError};
use crate::paths::model_dir;
use async_trait::async_trait;
use docchat_chunker::words;
use ndarray::{Array, Axis, Dimension, Ix2, Ix3};
use once_cell::sync::OnceCell;
use ort::session::{builder::GraphOptimizationLevel, Input, Session, SessionInputs};
use ort::tensor::TensorElementType;
use ort::value::{DynTensor, Tensor};
use ort::Error as OrtError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tokio::task::spawn_blocking;

pub const EMBEDDING_MODE_ENV: &str = "DOCCHAT_EMBEDDING_MODE";
pub const EMBEDDING_MODEL_ENV: &str = "DOCCHAT_EMBEDDING_MODEL";
pub const DEFAULT_MODEL_ID: &str = "bge-base-en-v1.5";

/// Embedding capability consumed by the vector store.
///
/// Implementations must be deterministic for a given model and return one
/// vector of [`Embed::dimension`] floats per input text, in input order.
#[async_trait]
pub trait Embed: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// ONNX Runtime inference over a local model
    #[default]
    Fast,
    /// Deterministic hashed bag-of-words, no model files needed
    Stub,
}

impl FromStr for EmbeddingMode {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported embedding mode '{other}' (expected 'fast' or 'stub')"
            ))),
        }
    }
}

impl Display for EmbeddingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => f.write_str("fast"),
            Self::Stub => f.write_str("stub"),
        }
    }
}

/// How token states are reduced to one sentence vector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pooling {
    /// First token (`[CLS]`), used by the BGE family
    Cls,
    /// Attention-masked mean over tokens
    Mean,
}

/// Static description of a supported embedding model
#[derive(Clone, Debug)]
pub struct ModelSpec {
    pub id: &'static str,
    /// Hugging Face repository that hosts the ONNX export
    pub repo: &'static str,
    /// ONNX file path inside the repository
    pub onnx_file: &'static str,
    pub dimension: usize,
    pub max_length: usize,
    pub max_batch: usize,
    pub pooling: Pooling,
}

const MODEL_SPECS: &[ModelSpec] = &[
    ModelSpec {
        id: "bge-base-en-v1.5",
        repo: "BAAI/bge-base-en-v1.5",
        onnx_file: "onnx/model.onnx",
        dimension: 768,
        max_length: 512,
        max_batch: 16,
        pooling: Pooling::Cls,
    },
    ModelSpec {
        id: "bge-small-en-v1.5",
        repo: "BAAI/bge-small-en-v1.5",
        onnx_file: "onnx/model.onnx",
        dimension: 384,
        max_length: 512,
        max_batch: 32,
        pooling: Pooling::Cls,
    },
    ModelSpec {
        id: "all-minilm-l6-v2",
        repo: "sentence-transformers/all-MiniLM-L6-v2",
        onnx_file: "onnx/model.onnx",
        dimension: 384,
        max_length: 256,
        max_batch: 32,
        pooling: Pooling::Mean,
    },
];

impl ModelSpec {
    /// Looks up a model by id, accepting the short `bge-base` / `bge-small` aliases.
    pub fn find(model_id: &str) -> Result<&'static Self> {
        let wanted = match model_id.trim().to_ascii_lowercase().as_str() {
            "bge-base" => "bge-base-en-v1.5".to_string(),
            "bge-small" => "bge-small-en-v1.5".to_string(),
            "minilm" | "all-minilm" => "all-minilm-l6-v2".to_string(),
            other => other.to_string(),
        };
        MODEL_SPECS.iter().find(|spec| spec.id == wanted).ok_or_else(|| {
            let available = Self::all()
                .iter()
                .map(|spec| spec.id)
                .collect::<Vec<_>>()
                .join(", ");
            VectorStoreError::EmbeddingError(format!(
                "Unknown embedding model id '{model_id}'. Available: {available}"
            ))
        })
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        MODEL_SPECS
    }

    #[must_use]
    pub fn model_path(&self, model_dir: &Path) -> PathBuf {
        model_dir.join(self.id).join("model.onnx")
    }

    #[must_use]
    pub fn tokenizer_path(&self, model_dir: &Path) -> PathBuf {
        model_dir.join(self.id).join("tokenizer.json")
    }
}

/// Selection of embedding backend and model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub model: String,
    /// Overrides [`model_dir`] resolution when set
    pub model_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::default(),
            model: DEFAULT_MODEL_ID.to_string(),
            model_dir: None,
        }
    }
}

impl EmbeddingConfig {
    /// Defaults overridden by `DOCCHAT_EMBEDDING_MODE` / `DOCCHAT_EMBEDDING_MODEL`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(EMBEDDING_MODE_ENV) {
            config.mode = raw.parse()?;
        }
        if let Ok(raw) = std::env::var(EMBEDDING_MODEL_ENV) {
            config.model = raw;
        }
        Ok(config)
    }

    #[must_use]
    pub fn stub() -> Self {
        Self {
            mode: EmbeddingMode::Stub,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn resolved_model_dir(&self) -> PathBuf {
        self.model_dir.clone().unwrap_or_else(model_dir)
    }
}

struct OrtBackend {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    max_batch: usize,
    dimension: usize,
    pooling: Pooling,
}

#[derive(Clone)]
struct StubBackend {
    dimension: usize,
}

impl StubBackend {
    const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect()
    }
}

/// Loaded sessions keyed by model id and the directory they were read from.
type BackendKey = (&'static str, PathBuf);

static BACKENDS: OnceCell<Mutex<HashMap<BackendKey, Arc<OrtBackend>>>> = OnceCell::new();

fn backend_key(spec: &'static ModelSpec, model_dir: &Path) -> BackendKey {
    (spec.id, model_dir.to_path_buf())
}

impl OrtBackend {
    fn new(spec: &ModelSpec, model_dir: &Path) -> Result<Self> {
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }

        let model_path = spec.model_path(model_dir);
        let tokenizer_path = spec.tokenizer_path(model_dir);
        if !model_path.exists() || !tokenizer_path.exists() {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Model files for '{}' are missing. Expected ONNX at {} and tokenizer at {}. Run `docchat install-model --model {}` (or set DOCCHAT_MODEL_DIR, or use --embed-mode stub).",
                spec.id,
                model_path.display(),
                tokenizer_path.display(),
                spec.id,
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| VectorStoreError::EmbeddingError(format!("Tokenizer load failed: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: spec.max_length,
                ..TruncationParams::default()
            }))
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Tokenizer truncation failed: {e}"))
            })?;

        let session = Session::builder()
            .map_err(|e| to_embedding_error(&e))?
            .with_intra_threads(default_intra_threads())
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to set ORT intra threads: {e}"))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to set optimization level: {e}"))
            })?
            .commit_from_file(&model_path)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to load ONNX model: {e}"))
            })?;

        log::info!(
            "Loaded ONNX model '{}' (dim {}, max_length {}, batch {})",
            spec.id,
            spec.dimension,
            spec.max_length,
            spec.max_batch
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length: spec.max_length,
            max_batch: spec.max_batch,
            dimension: spec.dimension,
            pooling: spec.pooling,
        })
    }

    /// Returns the process-wide backend for `spec` in `model_dir`, loading it
    /// on first use.
    fn shared(spec: &'static ModelSpec, model_dir: &Path) -> Result<Arc<Self>> {
        let key = backend_key(spec, model_dir);
        let cache = BACKENDS.get_or_init(|| Mutex::new(HashMap::new()));
        let mut guard = cache
            .lock()
            .map_err(|_| VectorStoreError::EmbeddingError("Failed to lock backend cache".into()))?;
        if let Some(backend) = guard.get(&key) {
            return Ok(backend.clone());
        }
        // Held across the load so concurrent callers wait instead of loading twice.
        let backend = Arc::new(Self::new(spec, model_dir)?);
        guard.insert(key, backend.clone());
        Ok(backend)
    }

    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let encodings = self
                .tokenizer
                .encode_batch(batch.to_vec(), true)
                .map_err(|e| {
                    VectorStoreError::EmbeddingError(format!("Tokenization failed: {e}"))
                })?;

            if encodings.is_empty() {
                continue;
            }

            let seq_len = encodings[0].len();
            if seq_len > self.max_length {
                return Err(VectorStoreError::EmbeddingError(format!(
                    "Tokenized length {} exceeds max_length {}",
                    seq_len, self.max_length
                )));
            }
            if encodings.iter().any(|e| e.len() != seq_len) {
                return Err(VectorStoreError::EmbeddingError(
                    "Inconsistent sequence lengths after padding".to_string(),
                ));
            }
            let (ids, masks, type_ids, mask_rows) = build_flat_tensors(&encodings, seq_len);

            let ids_array = Array::from_shape_vec((batch.len(), seq_len), ids)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("IDs shape error: {e}")))?;
            let mask_array = Array::from_shape_vec((batch.len(), seq_len), masks)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Mask shape error: {e}")))?;
            let type_array = Array::from_shape_vec((batch.len(), seq_len), type_ids)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Types shape error: {e}")))?;
            let ids_shape = ids_array.raw_dim().into_dyn();

            let ids_tensor = Tensor::from_array(ids_array.into_dyn())
                .map_err(|e| to_embedding_error(&e))?
                .upcast();
            let mask_tensor = Tensor::from_array(mask_array.into_dyn())
                .map_err(|e| to_embedding_error(&e))?
                .upcast();
            let type_tensor = Tensor::from_array(type_array.into_dyn())
                .map_err(|e| to_embedding_error(&e))?
                .upcast();

            let array = {
                let mut session = self.session.lock().map_err(|_| {
                    VectorStoreError::EmbeddingError("Failed to lock ONNX session".into())
                })?;

                let mut available: HashMap<String, DynTensor> = HashMap::new();
                available.insert("input_ids".to_string(), ids_tensor);
                available.insert("attention_mask".to_string(), mask_tensor);
                available.insert("token_type_ids".to_string(), type_tensor);

                let mut feed: HashMap<String, DynTensor> = HashMap::new();
                for input in &session.inputs {
                    let key = input.name.clone();
                    if let Some(value) = available.get(&key) {
                        feed.insert(key, value.clone());
                    } else {
                        let zeros = zero_tensor(&ids_shape, input).map_err(|e| {
                            VectorStoreError::EmbeddingError(format!(
                                "Unsupported ONNX input '{key}': {e}"
                            ))
                        })?;
                        feed.insert(key, zeros);
                    }
                }

                let outputs = session.run(SessionInputs::from(feed)).map_err(|e| {
                    VectorStoreError::EmbeddingError(format!("ONNX forward failed: {e}"))
                })?;

                if outputs.len() == 0 {
                    return Err(VectorStoreError::EmbeddingError(
                        "ONNX returned no outputs".to_string(),
                    ));
                }

                let array = outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(|e| {
                        VectorStoreError::EmbeddingError(format!(
                            "Failed to decode ONNX output: {e}"
                        ))
                    })?
                    .to_owned();

                drop(outputs);
                drop(session);

                array
            };
            results.extend(embeddings_from_output(
                array,
                &mask_rows,
                self.dimension,
                self.pooling,
            )?);
        }

        Ok(results)
    }
}

fn default_intra_threads() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if cpus <= 4 {
        1
    } else if cpus <= 12 {
        2
    } else {
        4
    }
}

const fn ensure_dimension(vec: &[f32], expected: usize) -> Result<()> {
    if vec.len() != expected {
        return Err(VectorStoreError::InvalidDimension {
            expected,
            actual: vec.len(),
        });
    }
    Ok(())
}

fn embeddings_from_output(
    array: ndarray::ArrayD<f32>,
    mask_rows: &[Vec<i64>],
    expected_dimension: usize,
    pooling: Pooling,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::new();
    match array.ndim() {
        2 => {
            let embeddings = array
                .into_dimensionality::<Ix2>()
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Bad output shape: {e}")))?;
            out.reserve(embeddings.len_of(Axis(0)));
            for row in embeddings.outer_iter() {
                let mut emb = row.to_vec();
                ensure_dimension(&emb, expected_dimension)?;
                normalize(&mut emb);
                out.push(emb);
            }
        }
        3 => {
            let hidden = array
                .into_dimensionality::<Ix3>()
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Bad output shape: {e}")))?;
            out.reserve(hidden.len_of(Axis(0)));
            for (idx, sample) in hidden.outer_iter().enumerate() {
                let mut emb = match pooling {
                    Pooling::Cls => sample.row(0).to_vec(),
                    Pooling::Mean => {
                        let attn = mask_rows
                            .get(idx)
                            .cloned()
                            .unwrap_or_else(|| vec![1; sample.len_of(Axis(0))]);
                        mean_pool(sample.view(), &attn)
                    }
                };
                ensure_dimension(&emb, expected_dimension)?;
                normalize(&mut emb);
                out.push(emb);
            }
        }
        _ => {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Unexpected ONNX output dims: {:?}",
                array.shape()
            )));
        }
    }
    Ok(out)
}

fn mean_pool(sample: ndarray::ArrayView2<'_, f32>, mask: &[i64]) -> Vec<f32> {
    if sample.is_empty() {
        return vec![];
    }

    let hidden = sample.len_of(Axis(1));
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (token_idx, token) in sample.outer_iter().enumerate() {
        if *mask.get(token_idx).unwrap_or(&0) == 0 {
            continue;
        }
        count += 1.0;
        for (dim, value) in token.iter().enumerate() {
            sum[dim] += value;
        }
    }

    if count == 0.0 {
        return sum;
    }

    for value in &mut sum {
        *value /= count;
    }

    sum
}

fn build_flat_tensors(
    encodings: &[Encoding],
    seq_len: usize,
) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<Vec<i64>>) {
    let mut ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut masks = Vec::with_capacity(encodings.len() * seq_len);
    let mut type_ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut mask_rows = Vec::with_capacity(encodings.len());

    for encoding in encodings {
        let encoding_ids = encoding.get_ids();
        let encoding_masks = encoding.get_attention_mask();
        let encoding_types = encoding.get_type_ids();

        for idx in 0..seq_len {
            ids.push(i64::from(*encoding_ids.get(idx).unwrap_or(&0)));
            masks.push(i64::from(*encoding_masks.get(idx).unwrap_or(&0)));
            type_ids.push(i64::from(*encoding_types.get(idx).unwrap_or(&0)));
        }

        mask_rows.push(
            encoding_masks
                .iter()
                .take(seq_len)
                .map(|v| i64::from(*v))
                .collect(),
        );
    }

    (ids, masks, type_ids, mask_rows)
}

/// Scales `vec` to unit L2 length in place. A zero vector is left untouched.
pub fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

/// Feature-hashed bag of lower-cased alphanumeric tokens.
///
/// All components are non-negative, so two texts sharing a word always score
/// above zero and disjoint texts score exactly zero.
fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dimension];
    if dimension == 0 {
        return vec;
    }
    for word in words(text) {
        for token in word
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let lowered = token.to_lowercase();
            let bucket = (fnv1a_64(lowered.as_bytes()) % dimension as u64) as usize;
            vec[bucket] += 1.0;
        }
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn to_embedding_error(error: &OrtError) -> VectorStoreError {
    VectorStoreError::EmbeddingError(format!("{error}"))
}

fn zero_tensor(shape: &ndarray::IxDyn, input: &Input) -> Result<DynTensor> {
    let tensor = match &input.input_type {
        ort::value::ValueType::Tensor { ty, .. } => match ty {
            TensorElementType::Int64 => {
                Tensor::from_array(ndarray::Array::<i64, _>::zeros(shape.clone()))
                    .map_err(|e| to_embedding_error(&e))?
                    .upcast()
            }
            TensorElementType::Bool => {
                Tensor::from_array(ndarray::Array::from_elem(shape.clone(), false))
                    .map_err(|e| to_embedding_error(&e))?
                    .upcast()
            }
            TensorElementType::Float32 => {
                Tensor::from_array(ndarray::Array::<f32, _>::zeros(shape.clone()))
                    .map_err(|e| to_embedding_error(&e))?
                    .upcast()
            }
            other => {
                return Err(VectorStoreError::EmbeddingError(format!(
                    "Cannot synthesize zeros for tensor type {other:?} (input {})",
                    input.name
                )))
            }
        },
        other => {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported input type for zero init: {other:?}"
            )))
        }
    };
    Ok(tensor)
}

/// Sentence embedding model backed by ONNX Runtime or the offline stub
pub struct EmbeddingModel {
    backend: EmbeddingBackend,
    model_id: &'static str,
    dimension: usize,
}

enum EmbeddingBackend {
    Ort(Arc<OrtBackend>),
    Stub(StubBackend),
}

impl EmbeddingModel {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let spec = ModelSpec::find(&config.model)?;
        let backend = match config.mode {
            EmbeddingMode::Stub => EmbeddingBackend::Stub(StubBackend::new(spec.dimension)),
            EmbeddingMode::Fast => {
                let dir = config.resolved_model_dir();
                EmbeddingBackend::Ort(OrtBackend::shared(spec, &dir)?)
            }
        };
        log::debug!(
            "Embedding model '{}' ready ({} backend, dim {})",
            spec.id,
            config.mode,
            spec.dimension
        );
        Ok(Self {
            backend,
            model_id: spec.id,
            dimension: spec.dimension,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&EmbeddingConfig::from_env()?)
    }

    #[must_use]
    pub const fn model_id(&self) -> &'static str {
        self.model_id
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }

    #[must_use]
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

#[async_trait]
impl Embed for EmbeddingModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        match &self.backend {
            EmbeddingBackend::Stub(stub) => Ok(stub.embed_batch(texts)),
            EmbeddingBackend::Ort(backend) => {
                let backend = backend.clone();
                let owned = texts.to_vec();
                spawn_blocking(move || backend.embed_batch_blocking(&owned))
                    .await
                    .map_err(|e| VectorStoreError::EmbeddingError(format!("Join error: {e}")))?
            }
        }
    }
}
