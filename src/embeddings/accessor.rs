// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Process-wide embedding model handle
//!
//! The model is expensive to build, so it is constructed on first use and
//! shared by every request afterwards. Construction runs behind a
//! [`tokio::sync::OnceCell`]: concurrent first callers wait for a single
//! in-flight construction instead of racing to build their own. A failed
//! construction leaves the cell empty, so the next caller tries again.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::{EmbeddingModel, OnnxEmbeddingModel, PretrainedOptions};

/// Builds an embedding model by name
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_name: &str) -> Result<Arc<dyn EmbeddingModel>>;
}

/// Loads ONNX exports from the HuggingFace Hub
#[derive(Debug, Clone, Default)]
pub struct OnnxModelLoader {
    options: PretrainedOptions,
}

impl OnnxModelLoader {
    pub fn new(cache_dir: Option<PathBuf>, max_length: Option<usize>) -> Self {
        Self {
            options: PretrainedOptions {
                cache_dir,
                max_length,
            },
        }
    }
}

#[async_trait]
impl ModelLoader for OnnxModelLoader {
    async fn load(&self, model_name: &str) -> Result<Arc<dyn EmbeddingModel>> {
        let model = OnnxEmbeddingModel::from_pretrained(model_name, self.options.clone()).await?;
        Ok(Arc::new(model))
    }
}

/// Lazily-built, never-refreshed embedding model handle
pub struct ModelAccessor {
    model_name: String,
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn EmbeddingModel>>,
}

impl std::fmt::Debug for ModelAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAccessor")
            .field("model_name", &self.model_name)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

impl ModelAccessor {
    pub fn new(model_name: impl Into<String>, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            model_name: model_name.into(),
            loader,
            model: OnceCell::new(),
        }
    }

    /// Returns the shared model, building it if no build has succeeded yet
    ///
    /// # Errors
    /// Returns the loader's error when construction fails. Nothing is
    /// cached in that case.
    pub async fn get(&self) -> Result<Arc<dyn EmbeddingModel>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                info!("Loading embedding model {}", self.model_name);
                match self.loader.load(&self.model_name).await {
                    Ok(model) => {
                        info!("✓ Embedding model {} ready", self.model_name);
                        Ok(model)
                    }
                    Err(e) => {
                        error!("✗ Failed to load embedding model {}: {:#}", self.model_name, e);
                        Err(e)
                    }
                }
            })
            .await?;

        Ok(Arc::clone(model))
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}
