// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers::{health_handler, not_found_handler};
use super::similarity::cosine_similarity_handler;
use crate::config::ServiceConfig;
use crate::embeddings::{CosineScorer, ModelAccessor, SimilarityScorer};

#[derive(Clone)]
pub struct AppState {
    pub accessor: Arc<ModelAccessor>,
    pub scorer: Arc<dyn SimilarityScorer>,
}

impl AppState {
    /// State scoring with [`CosineScorer`]
    pub fn new(accessor: Arc<ModelAccessor>) -> Self {
        Self {
            accessor,
            scorer: Arc::new(CosineScorer),
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }
}

pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/cosine_similarity", post(cosine_similarity_handler))
        .fallback(not_found_handler)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS restricted to `origins`, with credentials
///
/// Wildcards cannot be combined with credentials, so "all methods/headers"
/// is expressed by mirroring the preflight request.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            if origin == "*" {
                warn!("Ignoring wildcard CORS origin: not allowed with credentials");
                return None;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Binds `host:port`, resolving host names such as `localhost`
pub async fn bind_listener(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))
}

pub async fn start_server(config: &ServiceConfig, state: AppState) -> Result<()> {
    let origins = config.cors_origin_list();
    let app = create_app(state, &origins);

    let listener = bind_listener(&config.host, config.port).await?;
    let addr = listener
        .local_addr()
        .context("Failed to read bound address")?;

    info!("API server listening on {}", addr);
    info!("CORS origins: {:?}", origins);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
