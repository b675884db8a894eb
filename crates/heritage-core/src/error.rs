// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Heritage OCR.

use thiserror::Error;

/// Top-level error type for all Heritage OCR operations.
///
/// An empty recognition result is not represented here: it is a
/// data condition carried by [`crate::OcrResult`], not a failure.
#[derive(Debug, Error)]
pub enum HeritageError {
    // -- Input errors --
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Recognition errors --
    #[error("{engine} recognition failed: {detail}")]
    RecognitionFailure { engine: String, detail: String },

    #[error("recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("failed to load recognition model: {0}")]
    ModelLoad(String),

    // -- Pipeline control --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("deadline exceeded before {stage}")]
    DeadlineExceeded { stage: String },

    #[error("processing cancelled before {stage}")]
    Cancelled { stage: String },

    // -- I/O and serialization --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HeritageError {
    /// Build a [`HeritageError::RecognitionFailure`] for the named engine.
    pub fn recognition(engine: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::RecognitionFailure {
            engine: engine.into(),
            detail: detail.to_string(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HeritageError>;
