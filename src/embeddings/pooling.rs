// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Token pooling for sentence-transformer checkpoints
//!
//! Hub repositories describe how token embeddings collapse into a sentence
//! vector in `1_Pooling/config.json`, and the truncation limit in
//! `sentence_bert_config.json`. Both files are optional; without them the
//! model uses mean pooling and the default sequence limit.

use anyhow::{bail, Context, Result};
use ndarray::ArrayView2;
use serde::Deserialize;
use std::path::Path;

pub const POOLING_CONFIG_FILE: &str = "1_Pooling/config.json";
pub const SENTENCE_CONFIG_FILE: &str = "sentence_bert_config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolingMode {
    /// Attention-masked average over tokens
    #[default]
    Mean,
    /// First token (`[CLS]`)
    Cls,
    /// Element-wise maximum over unmasked tokens
    Max,
}

#[derive(Debug, Deserialize)]
struct PoolingConfig {
    #[serde(default)]
    pooling_mode_cls_token: bool,
    #[serde(default)]
    pooling_mode_mean_tokens: bool,
    #[serde(default)]
    pooling_mode_max_tokens: bool,
    #[serde(default)]
    pooling_mode_mean_sqrt_len_tokens: bool,
    #[serde(default)]
    pooling_mode_weightedmean_tokens: bool,
    #[serde(default)]
    pooling_mode_lasttoken: bool,
}

#[derive(Debug, Deserialize)]
struct SentenceBertConfig {
    max_seq_length: Option<usize>,
}

impl PoolingMode {
    /// Selects the pooling mode from a `1_Pooling/config.json` document
    ///
    /// # Errors
    /// Returns error if the JSON is invalid, no mode is enabled, several
    /// modes are enabled at once, or the enabled mode is not supported.
    pub fn from_config_json(json: &str) -> Result<Self> {
        let config: PoolingConfig =
            serde_json::from_str(json).context("Invalid pooling config")?;

        if config.pooling_mode_weightedmean_tokens || config.pooling_mode_lasttoken {
            bail!("Unsupported pooling mode in config: {}", json.trim());
        }

        let mut modes = Vec::new();
        if config.pooling_mode_cls_token {
            modes.push(PoolingMode::Cls);
        }
        // sqrt-len scaling only changes the norm, which L2 normalisation removes
        if config.pooling_mode_mean_tokens || config.pooling_mode_mean_sqrt_len_tokens {
            modes.push(PoolingMode::Mean);
        }
        if config.pooling_mode_max_tokens {
            modes.push(PoolingMode::Max);
        }

        match modes.as_slice() {
            [mode] => Ok(*mode),
            [] => bail!("Pooling config enables no pooling mode"),
            _ => bail!("Combined pooling modes are not supported: {:?}", modes),
        }
    }

    pub fn from_config_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_config_json(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Collapses `[seq_len, hidden]` token embeddings into one `[hidden]` vector
    pub fn pool(self, token_embeddings: ArrayView2<f32>, attention_mask: &[i64]) -> Vec<f32> {
        let hidden_dim = token_embeddings.shape()[1];

        match self {
            PoolingMode::Cls => token_embeddings.row(0).to_vec(),
            PoolingMode::Mean => {
                let mut pooled = vec![0.0f32; hidden_dim];
                let mut sum_mask = 0.0f32;
                for (i, &mask) in attention_mask.iter().enumerate() {
                    let mask_value = mask as f32;
                    sum_mask += mask_value;
                    for (j, value) in pooled.iter_mut().enumerate() {
                        *value += token_embeddings[[i, j]] * mask_value;
                    }
                }
                for value in &mut pooled {
                    *value /= sum_mask.max(1e-9);
                }
                pooled
            }
            PoolingMode::Max => {
                let mut pooled = vec![f32::NEG_INFINITY; hidden_dim];
                for (i, &mask) in attention_mask.iter().enumerate() {
                    if mask == 0 {
                        continue;
                    }
                    for (j, value) in pooled.iter_mut().enumerate() {
                        *value = value.max(token_embeddings[[i, j]]);
                    }
                }
                for value in &mut pooled {
                    if !value.is_finite() {
                        *value = 0.0;
                    }
                }
                pooled
            }
        }
    }
}

/// Reads `max_seq_length` from a `sentence_bert_config.json` document
pub fn max_seq_length_from_json(json: &str) -> Result<Option<usize>> {
    let config: SentenceBertConfig =
        serde_json::from_str(json).context("Invalid sentence-transformers config")?;
    Ok(config.max_seq_length.filter(|&length| length > 0))
}

pub fn max_seq_length_from_file(path: &Path) -> Result<Option<usize>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    max_seq_length_from_json(&json).with_context(|| format!("Failed to parse {}", path.display()))
}
