// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sentence embeddings
//!
//! The rest of the service only sees the narrow [`EmbeddingModel`] interface.
//! [`OnnxEmbeddingModel`] implements it over ONNX Runtime, [`ModelAccessor`]
//! owns the single process-wide instance, and [`similarity`] turns two
//! embeddings into a clamped cosine score.

pub mod accessor;
pub mod onnx_model;
pub mod pooling;
pub mod similarity;

use anyhow::Result;
use async_trait::async_trait;

pub use accessor::{ModelAccessor, ModelLoader, OnnxModelLoader};
pub use onnx_model::{OnnxEmbeddingModel, PretrainedOptions};
pub use pooling::PoolingMode;
pub use similarity::{clamp_score, cosine_similarity, CosineScorer, SimilarityScorer};

/// Text -> vector
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Hub repository or local name the model was loaded as
    fn model_name(&self) -> &str;

    /// Embeds a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
