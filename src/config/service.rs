// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Service configuration
//!
//! Every setting can be passed as a command-line flag or through the
//! matching environment variable. A `.env` file in the working directory
//! is loaded before parsing.

use clap::Parser;
use std::path::PathBuf;

/// Default sentence-embedding checkpoint on the HuggingFace Hub
pub const DEFAULT_EMBEDDING_MODEL_NAME: &str = "intfloat/e5-large-v2";

/// Default comma-separated CORS origin list
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";

/// Truncation length when neither the flag nor the model repository sets one
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 512;

/// freqle API server
#[derive(Parser, Debug, Clone)]
#[command(name = "freqle-api")]
#[command(version)]
#[command(about = "Health check and cosine similarity over sentence embeddings", long_about = None)]
pub struct ServiceConfig {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP listener to
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// HuggingFace Hub repository of the embedding model
    #[arg(long, env = "EMBEDDING_MODEL_NAME", default_value = DEFAULT_EMBEDDING_MODEL_NAME)]
    pub embedding_model_name: String,

    /// Comma-separated list of origins allowed by CORS
    #[arg(long, env = "CORS_ORIGINS", default_value = DEFAULT_CORS_ORIGINS)]
    pub cors_origins: String,

    /// Directory used to cache downloaded model files
    #[arg(long, env = "MODEL_CACHE_DIR")]
    pub model_cache_dir: Option<PathBuf>,

    /// Maximum number of tokens fed to the model per text
    /// (defaults to the repository's `max_seq_length`, then 512)
    #[arg(long, env = "EMBEDDING_MAX_LENGTH")]
    pub max_sequence_length: Option<usize>,

    /// Load the embedding model at startup instead of on the first request
    #[arg(long, env = "PRELOAD_MODEL")]
    pub preload_model: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            embedding_model_name: DEFAULT_EMBEDDING_MODEL_NAME.to_string(),
            cors_origins: DEFAULT_CORS_ORIGINS.to_string(),
            model_cache_dir: None,
            max_sequence_length: None,
            preload_model: false,
        }
    }
}

impl ServiceConfig {
    /// Loads `.env` (if present) and parses flags and environment
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    /// Allowed CORS origins, parsed from `cors_origins`
    pub fn cors_origin_list(&self) -> Vec<String> {
        parse_origins(&self.cors_origins)
    }
}

/// Splits a comma-separated origin list, trimming entries and dropping empty ones
pub fn parse_origins(raw_origins: &str) -> Vec<String> {
    raw_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
