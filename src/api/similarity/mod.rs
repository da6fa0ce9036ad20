// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Cosine Similarity API Module
//!
//! This module provides the POST /cosine_similarity endpoint, which embeds
//! two texts with the shared sentence-embedding model and returns the cosine
//! similarity of the two vectors.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{
    cosine_similarity_handler, INFERENCE_FAILED_MESSAGE, MODEL_UNAVAILABLE_MESSAGE,
};
pub use request::{SimilarityRequest, TextPair, MAX_TEXT_CHARS};
pub use response::SimilarityResponse;
