// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! SimilarityRequest type for POST /cosine_similarity

use crate::api::ApiError;
use serde::{Deserialize, Serialize};

/// Maximum characters per text, counted after trimming
pub const MAX_TEXT_CHARS: usize = 2000;

/// Request body for POST /cosine_similarity
///
/// # Example
/// ```json
/// {
///   "text1": "hello world",
///   "text2": "hello there"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityRequest {
    pub text1: String,
    pub text2: String,
}

/// Validated, trimmed pair of texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPair {
    pub text1: String,
    pub text2: String,
}

impl SimilarityRequest {
    /// Trims both texts and checks their lengths
    ///
    /// # Validation Rules
    /// 1. Each text is trimmed of leading and trailing whitespace
    /// 2. Trimmed text must not be empty
    /// 3. Trimmed text must be at most 2000 characters
    ///
    /// Fields are checked in order; the first failure is reported.
    pub fn validate(self) -> Result<TextPair, ApiError> {
        Ok(TextPair {
            text1: validate_text("text1", &self.text1)?,
            text2: validate_text("text2", &self.text2)?,
        })
    }
}

/// Unicode whitespace plus the ASCII file/group/record/unit separators
fn is_strippable(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

fn validate_text(field: &str, raw: &str) -> Result<String, ApiError> {
    let text = raw.trim_matches(is_strippable);

    if text.is_empty() {
        return Err(ApiError::ValidationError {
            field: field.to_string(),
            message: format!("{} cannot be empty or contain only whitespace", field),
        });
    }

    let char_count = text.chars().count();
    if char_count > MAX_TEXT_CHARS {
        return Err(ApiError::ValidationError {
            field: field.to_string(),
            message: format!(
                "{} cannot exceed {} characters (got {} characters)",
                field, MAX_TEXT_CHARS, char_count
            ),
        });
    }

    Ok(text.to_string())
}
