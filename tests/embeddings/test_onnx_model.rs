// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX embedding model tests
//!
//! Tests that need real model files are #[ignore]d. Download the ONNX export
//! of all-MiniLM-L6-v2 to /workspace/models/all-MiniLM-L6-v2-onnx/ (or give
//! the Hub tests network access) and run with `--ignored`.

use freqle_api::embeddings::{
    cosine_similarity, CosineScorer, EmbeddingModel, ModelLoader, OnnxEmbeddingModel,
    OnnxModelLoader, PoolingMode, SimilarityScorer,
};

const MODEL_PATH: &str = "/workspace/models/all-MiniLM-L6-v2-onnx/model.onnx";
const TOKENIZER_PATH: &str = "/workspace/models/all-MiniLM-L6-v2-onnx/tokenizer.json";

#[tokio::test]
async fn test_missing_tokenizer_reported() {
    let model_path = std::env::current_exe().unwrap();
    let result = OnnxEmbeddingModel::from_files(
        "missing-tokenizer",
        model_path,
        std::path::PathBuf::from("/nonexistent/tokenizer.json"),
        512,
    )
    .await;

    let error = result.unwrap_err().to_string();
    assert!(error.contains("Tokenizer file not found"), "{}", error);
}

#[tokio::test]
async fn test_zero_max_length_rejected() {
    let path = std::env::current_exe().unwrap();
    let result = OnnxEmbeddingModel::from_files("zero", path.clone(), path, 0).await;

    let error = result.unwrap_err().to_string();
    assert!(error.contains("greater than 0"), "{}", error);
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_semantic_similarity_ordering() {
    let model = OnnxEmbeddingModel::from_files("all-MiniLM-L6-v2", MODEL_PATH, TOKENIZER_PATH, 256)
        .await
        .unwrap();
    assert_eq!(model.dimension(), 384);

    let scorer = CosineScorer;
    let same = scorer
        .score(&model, "The cat sat on the mat", "The cat sat on the mat")
        .await
        .unwrap();
    let related = scorer
        .score(&model, "The cat sat on the mat", "A kitten is resting on a rug")
        .await
        .unwrap();
    let unrelated = scorer
        .score(&model, "The cat sat on the mat", "Quarterly revenue rose by four percent")
        .await
        .unwrap();

    assert!((same - 1.0).abs() < 1e-4, "same = {}", same);
    assert!(related > unrelated, "related = {}, unrelated = {}", related, unrelated);
    for score in [same, related, unrelated] {
        assert!((-1.0..=1.0).contains(&score));
    }
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_long_text_truncated() {
    let model = OnnxEmbeddingModel::from_files("all-MiniLM-L6-v2", MODEL_PATH, TOKENIZER_PATH, 128)
        .await
        .unwrap();
    assert_eq!(model.max_length(), 128);

    let long_text = "word ".repeat(400);
    let embedding = model.embed(&long_text).await.unwrap();
    assert_eq!(embedding.len(), 384);
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_cls_pooling_changes_embedding() {
    let mean = OnnxEmbeddingModel::from_files("all-MiniLM-L6-v2", MODEL_PATH, TOKENIZER_PATH, 256)
        .await
        .unwrap();
    let cls = mean.clone().with_pooling(PoolingMode::Cls);
    assert_eq!(mean.pooling(), PoolingMode::Mean);
    assert_eq!(cls.pooling(), PoolingMode::Cls);

    let text = "The quick brown fox jumps over the lazy dog";
    let mean_embedding = mean.embed(text).await.unwrap();
    let cls_embedding = cls.embed(text).await.unwrap();

    assert_eq!(cls_embedding.len(), mean_embedding.len());
    let agreement = cosine_similarity(&mean_embedding, &cls_embedding).unwrap();
    assert!(agreement < 0.9999, "agreement = {}", agreement);
}

#[tokio::test]
#[ignore] // Needs network access to the HuggingFace Hub
async fn test_onnx_loader_from_hub() {
    let loader = OnnxModelLoader::new(None, None);
    let model = loader
        .load("sentence-transformers/all-MiniLM-L6-v2")
        .await
        .unwrap();

    assert_eq!(model.model_name(), "sentence-transformers/all-MiniLM-L6-v2");
    assert_eq!(model.embed("hello").await.unwrap().len(), 384);
}
