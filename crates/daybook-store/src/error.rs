//! Store error types.

use thiserror::Error;

/// Errors that can occur while persisting or importing store data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend read/write failure.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Backend refused the write because it is full.
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Import file parsed but does not describe store data.
    #[error("Invalid import file: {0}")]
    InvalidImport(String),

    /// Import file declares a format version we do not understand.
    #[error("Unsupported export version: {0}")]
    UnsupportedVersion(String),
}

impl StoreError {
    pub fn invalid_import(msg: impl Into<String>) -> Self {
        Self::InvalidImport(msg.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
