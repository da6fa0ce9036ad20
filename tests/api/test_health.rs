// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health endpoint tests
//!
//! GET / and GET /health return the fixed status payload whether the model
//! is loaded, unloadable, or never requested.

use super::support::*;
use axum::http::StatusCode;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_health() {
    let state = state_with_model(Arc::new(LetterCountModel));
    let (status, body) = get(app(state), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"service": "freqle-api", "status": "ok"}));
}

#[tokio::test]
async fn test_root() {
    let state = state_with_model(Arc::new(LetterCountModel));
    let (status, body) = get(app(state), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"service": "freqle-api", "status": "ok"}));
}

#[tokio::test]
async fn test_health_ignores_model_state() {
    let loader = Arc::new(FailingLoader::default());
    let router = app(state_with_loader(loader.clone()));

    // Model construction fails, health still reports ok and never loads
    let (status, _) = post_json(
        router.clone(),
        "/cosine_similarity",
        json!({"text1": "a", "text2": "b"}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = get(router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"service": "freqle-api", "status": "ok"}));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let state = state_with_model(Arc::new(LetterCountModel));
    let (status, body) = get(app(state), "/v1/unknown").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
    assert!(body["message"].as_str().unwrap().contains("/v1/unknown"));
}
