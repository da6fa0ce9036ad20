// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! Runs a sentence-transformer checkpoint exported to ONNX.
//!
//! Features:
//! - Model and tokenizer download from the HuggingFace Hub (`hf-hub`)
//! - Optional GPU acceleration via CUDA (`cuda` feature) with CPU fallback
//! - Tokenizer truncation to the model's sequence limit
//! - Hidden dimension discovered from the graph at load time
//! - Pooling (mean, CLS or max) read from the repository, then L2 normalisation

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use hf_hub::api::sync::{Api, ApiBuilder, ApiRepo};
use ndarray::{Array2, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use super::pooling::{
    max_seq_length_from_file, PoolingMode, POOLING_CONFIG_FILE, SENTENCE_CONFIG_FILE,
};
use super::EmbeddingModel;
use crate::config::DEFAULT_MAX_SEQUENCE_LENGTH;

/// ONNX graph locations tried in order inside a Hub repository
const ONNX_MODEL_FILES: &[&str] = &["onnx/model.onnx", "model.onnx"];

const TOKENIZER_FILE: &str = "tokenizer.json";

const INTRA_THREADS: usize = 4;

/// Options for [`OnnxEmbeddingModel::from_pretrained`]
#[derive(Debug, Clone, Default)]
pub struct PretrainedOptions {
    /// Hub cache directory; the hf-hub default when `None`
    pub cache_dir: Option<PathBuf>,
    /// Tokens kept per text after truncation; when `None`, the repository's
    /// `sentence_bert_config.json` decides, then [`DEFAULT_MAX_SEQUENCE_LENGTH`]
    pub max_length: Option<usize>,
}

/// Files fetched from a Hub repository
#[derive(Debug)]
struct HubModelFiles {
    model: PathBuf,
    tokenizer: PathBuf,
    pooling_config: Option<PathBuf>,
    sentence_config: Option<PathBuf>,
}

/// ONNX-based sentence embedding model
///
/// All fields are wrapped in Arc for cheap cloning and thread-safe sharing.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    /// ONNX Runtime session (run() needs exclusive access)
    session: Arc<Mutex<Session>>,

    tokenizer: Arc<Tokenizer>,

    /// Model name (e.g., "intfloat/e5-large-v2")
    model_name: String,

    /// Hidden size reported by the validation inference
    dimension: usize,

    max_length: usize,

    /// Whether the graph declares a `token_type_ids` input
    uses_token_type_ids: bool,

    pooling: PoolingMode,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("max_length", &self.max_length)
            .field("uses_token_type_ids", &self.uses_token_type_ids)
            .field("pooling", &self.pooling)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Downloads (or reuses cached) model files from the HuggingFace Hub and loads them
    ///
    /// # Errors
    /// Returns error if the repository has no `tokenizer.json` or ONNX graph,
    /// the download fails, its pooling or sentence-transformers config is
    /// unusable, or loading fails (see [`Self::from_files`]).
    ///
    /// # Example
    /// ```ignore
    /// let model = OnnxEmbeddingModel::from_pretrained(
    ///     "intfloat/e5-large-v2",
    ///     PretrainedOptions::default(),
    /// ).await?;
    /// ```
    pub async fn from_pretrained(
        model_name: impl Into<String>,
        options: PretrainedOptions,
    ) -> Result<Self> {
        let model_name = model_name.into();

        tokio::task::spawn_blocking(move || {
            let files = download_model_files(&model_name, options.cache_dir.as_deref())?;

            let pooling = match &files.pooling_config {
                Some(path) => PoolingMode::from_config_file(path)?,
                None => PoolingMode::default(),
            };
            let repo_max_length = match &files.sentence_config {
                Some(path) => max_seq_length_from_file(path)?,
                None => None,
            };
            let max_length = resolve_max_length(options.max_length, repo_max_length);

            Self::load(model_name, &files.model, &files.tokenizer, max_length, pooling)
        })
        .await
        .context("Model loading task panicked")?
    }

    /// Loads a model from local ONNX and tokenizer files, with mean pooling
    ///
    /// Use [`Self::with_pooling`] for checkpoints that pool differently.
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or tokenizer file not found or invalid
    /// - ONNX Runtime initialization fails
    /// - Model output is not `[batch, seq_len, hidden]`
    pub async fn from_files<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
        max_length: usize,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref().to_path_buf();
        let tokenizer_path = tokenizer_path.as_ref().to_path_buf();

        tokio::task::spawn_blocking(move || {
            Self::load(
                model_name,
                &model_path,
                &tokenizer_path,
                max_length,
                PoolingMode::default(),
            )
        })
        .await
        .context("Model loading task panicked")?
    }

    /// Switches the pooling applied to token embeddings
    pub fn with_pooling(mut self, pooling: PoolingMode) -> Self {
        self.pooling = pooling;
        self
    }

    fn load(
        model_name: String,
        model_path: &Path,
        tokenizer_path: &Path,
        max_length: usize,
        pooling: PoolingMode,
    ) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }
        if max_length == 0 {
            anyhow::bail!("Maximum sequence length must be greater than 0");
        }

        info!("Initializing ONNX embedding model {}", model_name);
        let mut session = build_session(model_path)?;

        let uses_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure tokenizer truncation: {}", e))?;
        tokenizer.with_padding(None);

        // Validation inference also tells us the hidden size
        let test_encoding = tokenizer
            .encode("validation test", true)
            .map_err(|e| anyhow!("Tokenizer validation failed: {}", e))?;
        let dimension = run_pooled(&mut session, &test_encoding, uses_token_type_ids, pooling)
            .context("Validation inference failed")?
            .len();
        if dimension == 0 {
            anyhow::bail!("Model produced an empty embedding during validation");
        }

        info!(
            "✅ ONNX embedding model {} loaded ({} dimensions, {:?} pooling, max {} tokens)",
            model_name, dimension, pooling, max_length
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension,
            max_length,
            uses_token_type_ids,
            pooling,
        })
    }

    /// Generates an L2-normalised embedding for a single text
    ///
    /// Blocks the calling thread for the duration of the inference.
    pub fn embed_blocking(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        debug!(
            "Embedding {} tokens with {}",
            encoding.get_ids().len(),
            self.model_name
        );

        let mut session_guard = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
        let embedding = run_pooled(
            &mut session_guard,
            &encoding,
            self.uses_token_type_ids,
            self.pooling,
        )?;

        if embedding.len() != self.dimension {
            anyhow::bail!(
                "Unexpected embedding dimension: {} (expected {})",
                embedding.len(),
                self.dimension
            );
        }

        Ok(embedding)
    }

    /// Returns the output dimension of this model
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn pooling(&self) -> PoolingMode {
        self.pooling
    }
}

#[async_trait]
impl EmbeddingModel for OnnxEmbeddingModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.clone();
        let text = text.to_owned();
        tokio::task::spawn_blocking(move || model.embed_blocking(&text))
            .await
            .context("Embedding task panicked")?
    }
}

/// Explicit setting, then the repository's `max_seq_length`, then the default
fn resolve_max_length(requested: Option<usize>, from_repo: Option<usize>) -> usize {
    requested.or(from_repo).unwrap_or(DEFAULT_MAX_SEQUENCE_LENGTH)
}

fn download_model_files(model_name: &str, cache_dir: Option<&Path>) -> Result<HubModelFiles> {
    let api = match cache_dir {
        Some(dir) => ApiBuilder::new()
            .with_cache_dir(dir.to_path_buf())
            .build()
            .context("Failed to initialize HuggingFace Hub client")?,
        None => Api::new().context("Failed to initialize HuggingFace Hub client")?,
    };
    let repo = api.model(model_name.to_string());

    info!("Fetching {} from {}", TOKENIZER_FILE, model_name);
    let tokenizer = repo
        .get(TOKENIZER_FILE)
        .with_context(|| format!("Failed to download {} for {}", TOKENIZER_FILE, model_name))?;

    let pooling_config = fetch_optional(&repo, model_name, POOLING_CONFIG_FILE);
    let sentence_config = fetch_optional(&repo, model_name, SENTENCE_CONFIG_FILE);

    let mut last_error = None;
    for file in ONNX_MODEL_FILES {
        info!("Fetching {} from {}", file, model_name);
        match repo.get(file) {
            Ok(model) => {
                return Ok(HubModelFiles {
                    model,
                    tokenizer,
                    pooling_config,
                    sentence_config,
                });
            }
            Err(e) => {
                warn!("{} not available for {}: {}", file, model_name, e);
                last_error = Some(e);
            }
        }
    }

    Err(anyhow!(
        "No ONNX export found for {} (tried {:?}): {}",
        model_name,
        ONNX_MODEL_FILES,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Fetches a file that not every repository ships
fn fetch_optional(repo: &ApiRepo, model_name: &str, file: &str) -> Option<PathBuf> {
    match repo.get(file) {
        Ok(path) => Some(path),
        Err(e) => {
            info!("{} not available for {}, using defaults: {}", file, model_name, e);
            None
        }
    }
}

fn build_session(model_path: &Path) -> Result<Session> {
    #[cfg(feature = "cuda")]
    {
        info!("   Attempting CUDA execution provider...");
        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(INTRA_THREADS)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        match cuda_result {
            Ok(session) => {
                info!("✅ CUDA execution provider initialized");
                return Ok(session);
            }
            Err(e) => {
                warn!("⚠️  CUDA execution provider failed: {}", e);
                warn!("   Falling back to CPU execution provider");
            }
        }
    }

    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))
}

/// Runs one encoding through the session and pools the token embeddings
fn run_pooled(
    session: &mut Session,
    encoding: &Encoding,
    uses_token_type_ids: bool,
    pooling: PoolingMode,
) -> Result<Vec<f32>> {
    let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let attention_mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();
    let seq_len = input_ids.len();
    if seq_len == 0 {
        anyhow::bail!("Tokenizer produced no tokens");
    }

    let input_ids_array = Array2::from_shape_vec((1, seq_len), input_ids)
        .context("Failed to create input_ids array")?;
    let attention_mask_array = Array2::from_shape_vec((1, seq_len), attention_mask.clone())
        .context("Failed to create attention_mask array")?;

    let outputs = if uses_token_type_ids {
        let token_type_ids_array = Array2::from_shape_vec((1, seq_len), vec![0i64; seq_len])
            .context("Failed to create token_type_ids array")?;
        session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?
    } else {
        session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?
        ])?
    };

    // Index [0] rather than a name: exports disagree on the output name
    let output_array = outputs[0]
        .try_extract_array::<f32>()
        .context("Failed to extract output tensor")?;

    let shape = output_array.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] != seq_len {
        anyhow::bail!(
            "Model outputs unexpected dimensions: {:?} (expected [1, {}, hidden])",
            shape,
            seq_len
        );
    }

    let token_embeddings = output_array
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .context("Failed to view token embeddings as [seq_len, hidden]")?;

    let mut pooled = pooling.pool(token_embeddings, &attention_mask);
    l2_normalize(&mut pooled);
    Ok(pooled)
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
