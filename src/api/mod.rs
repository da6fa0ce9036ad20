// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod similarity;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::HealthResponse;
pub use http_server::{bind_listener, cors_layer, create_app, start_server, AppState};
pub use similarity::{cosine_similarity_handler, SimilarityRequest, SimilarityResponse, TextPair};
