// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Cosine similarity between two texts

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::EmbeddingModel;

/// Scores how similar two texts are under a given model
#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    async fn score(&self, model: &dyn EmbeddingModel, text1: &str, text2: &str) -> Result<f64>;
}

/// Embeds both texts and returns their clamped cosine similarity
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineScorer;

#[async_trait]
impl SimilarityScorer for CosineScorer {
    async fn score(&self, model: &dyn EmbeddingModel, text1: &str, text2: &str) -> Result<f64> {
        let embedding1 = model.embed(text1).await.context("Failed to embed text1")?;
        let embedding2 = model.embed(text2).await.context("Failed to embed text2")?;

        let raw = cosine_similarity(&embedding1, &embedding2)?;
        debug!("Raw cosine similarity from {}: {}", model.model_name(), raw);
        clamp_score(raw)
    }
}

/// Dot product over the product of magnitudes
///
/// Accumulates in f64. Returns 0.0 when either vector has zero magnitude.
///
/// # Errors
/// Empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(anyhow!("Cannot compare empty embeddings"));
    }
    if a.len() != b.len() {
        return Err(anyhow!(
            "Embedding dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        ));
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b.iter()).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            (dot + x * y, norm_a + x * x, norm_b + y * y)
        },
    );

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / denominator)
}

/// Clamps a score into [-1.0, 1.0]
///
/// # Errors
/// NaN, which has no meaningful place in the range.
pub fn clamp_score(score: f64) -> Result<f64> {
    if score.is_nan() {
        return Err(anyhow!("Similarity score is NaN"));
    }
    Ok(score.clamp(-1.0, 1.0))
}
