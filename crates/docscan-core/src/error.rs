// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docscan.

use thiserror::Error;

/// Top-level error type for all Docscan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Geometry errors --
    #[error("degenerate corner geometry: {0}")]
    DegenerateGeometry(String),

    #[error("viewport unavailable: {width}x{height} has no drawable area")]
    ViewportUnavailable { width: f64, height: f64 },

    #[error("image has zero width or height")]
    EmptyImage,

    #[error("invalid corner index {0} (expected 0..=3)")]
    InvalidCorner(usize),

    // -- Image errors --
    #[error("image decode failed: {0}")]
    ImageDecode(String),

    #[error("image encoding failed: {0}")]
    ImageEncode(String),

    // -- Background work --
    #[error("rectification task failed: {0}")]
    Worker(String),

    // -- Storage collaborators --
    #[error("storage error: {0}")]
    Storage(String),

    #[error("record not found: {table}/{key}")]
    RecordNotFound { table: String, key: String },

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
