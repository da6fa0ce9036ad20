// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// Response body for POST /cosine_similarity
///
/// # Example
/// ```json
/// { "cosine_similarity": 0.873 }
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimilarityResponse {
    /// Cosine similarity clamped to [-1.0, 1.0]
    pub cosine_similarity: f64,
}
