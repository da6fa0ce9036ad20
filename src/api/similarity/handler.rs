// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /cosine_similarity HTTP handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{debug, error, warn};

use crate::api::http_server::AppState;
use crate::api::similarity::{SimilarityRequest, SimilarityResponse};
use crate::api::ApiError;
use crate::embeddings::clamp_score;

pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Embedding model is unavailable.";
pub const INFERENCE_FAILED_MESSAGE: &str = "Could not compute cosine similarity.";

/// POST /cosine_similarity handler
///
/// # Request Body
/// ```json
/// { "text1": "hello world", "text2": "hello there" }
/// ```
///
/// # Response Body
/// ```json
/// { "cosine_similarity": 0.91 }
/// ```
///
/// # Errors
/// - 422: malformed body, empty text, or text over 2000 characters
/// - 503: the embedding model could not be constructed
/// - 502: embedding or comparison failed
pub async fn cosine_similarity_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimilarityRequest>, JsonRejection>,
) -> Result<Json<SimilarityResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected cosine similarity body: {}", rejection.body_text());
        ApiError::ValidationError {
            field: "body".to_string(),
            message: rejection.body_text(),
        }
    })?;

    let pair = request.validate().map_err(|e| {
        debug!("Invalid cosine similarity request: {}", e);
        e
    })?;

    let model = state.accessor.get().await.map_err(|e| {
        warn!("Embedding model unavailable: {:#}", e);
        ApiError::ModelUnavailable(MODEL_UNAVAILABLE_MESSAGE.to_string())
    })?;

    let score = state
        .scorer
        .score(model.as_ref(), &pair.text1, &pair.text2)
        .await
        .and_then(clamp_score)
        .map_err(|e| {
            error!("Cosine similarity failed: {:#}", e);
            ApiError::InferenceFailed(INFERENCE_FAILED_MESSAGE.to_string())
        })?;

    Ok(Json(SimilarityResponse {
        cosine_similarity: score,
    }))
}
