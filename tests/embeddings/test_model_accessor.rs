// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model accessor tests
//!
//! These tests verify that the ModelAccessor:
//! - Constructs the model at most once under concurrent first use
//! - Hands every caller the same instance
//! - Does not cache construction failures
//! - Lets concurrent callers share one failed attempt rather than piling on

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use freqle_api::embeddings::{EmbeddingModel, ModelAccessor, ModelLoader};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

struct NamedModel(String);

#[async_trait]
impl EmbeddingModel for NamedModel {
    fn model_name(&self) -> &str {
        &self.0
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0])
    }
}

/// Slow loader that fails for its first `failures` calls
struct SlowLoader {
    calls: AtomicUsize,
    failures: usize,
    delay: Duration,
}

impl SlowLoader {
    fn new(failures: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures,
            delay: Duration::from_millis(50),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelLoader for SlowLoader {
    async fn load(&self, model_name: &str) -> Result<Arc<dyn EmbeddingModel>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if call < self.failures {
            return Err(anyhow!("load attempt {} failed", call + 1));
        }
        Ok(Arc::new(NamedModel(model_name.to_string())))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_constructs_once() {
    let loader = Arc::new(SlowLoader::new(0));
    let accessor = Arc::new(ModelAccessor::new("intfloat/e5-large-v2", loader.clone()));

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let accessor = Arc::clone(&accessor);
        tasks.spawn(async move { accessor.get().await.map_err(|e| e.to_string()) });
    }

    let mut models = Vec::new();
    while let Some(result) = tasks.join_next().await {
        models.push(result.unwrap().unwrap());
    }

    assert_eq!(loader.calls(), 1);
    assert_eq!(models.len(), 16);
    for model in &models {
        assert!(Arc::ptr_eq(model, &models[0]));
        assert_eq!(model.model_name(), "intfloat/e5-large-v2");
    }
}

#[tokio::test]
async fn test_failure_not_cached() {
    let loader = Arc::new(SlowLoader::new(2));
    let accessor = ModelAccessor::new("retry-model", loader.clone());

    let first = accessor.get().await.err().unwrap();
    assert!(first.to_string().contains("attempt 1"));
    let second = accessor.get().await.err().unwrap();
    assert!(second.to_string().contains("attempt 2"));
    assert!(!accessor.is_loaded());

    let model = accessor.get().await.unwrap();
    assert_eq!(model.model_name(), "retry-model");
    assert!(accessor.is_loaded());
    assert_eq!(loader.calls(), 3);

    // Loaded for good now
    accessor.get().await.unwrap();
    assert_eq!(loader.calls(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_serialize_failed_attempts() {
    // Every attempt fails; callers take turns instead of building in parallel
    let loader = Arc::new(SlowLoader::new(usize::MAX));
    let accessor = Arc::new(ModelAccessor::new("never", loader.clone()));

    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let accessor = Arc::clone(&accessor);
        tasks.spawn(async move { accessor.get().await.is_err() });
    }

    while let Some(result) = tasks.join_next().await {
        assert!(result.unwrap());
    }

    assert_eq!(loader.calls(), 4);
    assert!(!accessor.is_loaded());
}

#[test]
fn test_accessor_reports_model_name() {
    let accessor = ModelAccessor::new("sentence-transformers/all-MiniLM-L6-v2", Arc::new(SlowLoader::new(0)));
    assert_eq!(accessor.model_name(), "sentence-transformers/all-MiniLM-L6-v2");
    assert!(!accessor.is_loaded());
}
