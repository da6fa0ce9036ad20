// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use freqle_api::{
    api::{start_server, AppState},
    config::ServiceConfig,
    embeddings::{ModelAccessor, OnnxModelLoader},
    version,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Starting {}", version::get_version_string());
    info!("   Embedding model: {}", config.embedding_model_name);
    if let Some(dir) = &config.model_cache_dir {
        info!("   Model cache: {}", dir.display());
    }

    let loader = OnnxModelLoader::new(config.model_cache_dir.clone(), config.max_sequence_length);
    let accessor = Arc::new(ModelAccessor::new(
        config.embedding_model_name.clone(),
        Arc::new(loader),
    ));

    if config.preload_model {
        // Warm up in the background so /health answers while the model downloads
        let accessor = Arc::clone(&accessor);
        tokio::spawn(async move {
            match accessor.get().await {
                Ok(_) => info!("✅ Embedding model preloaded"),
                Err(e) => warn!(
                    "⚠️  Embedding model preload failed, first request will retry: {:#}",
                    e
                ),
            }
        });
    } else {
        info!("   Embedding model loads on first /cosine_similarity request");
    }

    start_server(&config, AppState::new(accessor)).await
}
