// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for ocrsweep.

use thiserror::Error;

/// Top-level error type for all ocrsweep operations.
#[derive(Debug, Error)]
pub enum OcrSweepError {
    // -- Input errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Recognition errors --
    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OcrSweepError>;
