// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod service;

pub use service::{
    parse_origins, ServiceConfig, DEFAULT_CORS_ORIGINS, DEFAULT_EMBEDDING_MODEL_NAME,
    DEFAULT_MAX_SEQUENCE_LENGTH,
};
