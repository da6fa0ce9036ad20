// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{http::Uri, Json};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::version::SERVICE_NAME;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            status: "ok".to_string(),
        }
    }
}

/// GET / and GET /health
///
/// Static payload; never touches the embedding model.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Fallback for unknown routes
pub async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
