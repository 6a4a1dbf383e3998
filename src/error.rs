//! Conversion error taxonomy

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while converting the legacy repository.
///
/// Item-local failures (`MalformedMetadata`) skip the one item and leave the
/// rest of the batch alone. Batch- and run-level failures stop the pipeline,
/// since partial unflagged progress risks index/database divergence.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Metadata document is missing a required field; skip this item only
    #[error("malformed metadata for item {item}: {reason}")]
    MalformedMetadata { item: String, reason: String },

    /// Search backend failed transiently and the retry budget ran out
    #[error("search backend unavailable after {attempts} attempts: {reason}")]
    BackendExhausted { attempts: u32, reason: String },

    /// Search backend rejected the batch with a non-transient error
    #[error("search backend rejected batch: {0}")]
    BackendRejected(String),

    /// A single record exceeds the record cap even with its text removed
    #[error("record {id} cannot fit under {limit} bytes even fully truncated")]
    OversizedRecord { id: String, limit: usize },

    /// Unresolvable configuration; aborts the run immediately
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Another conversion run holds the lock
    #[error("another conversion run holds the lock at {0}")]
    ConcurrentRun(PathBuf),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// XML parse error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    /// True for failures that abort only the current item.
    pub fn is_item_local(&self) -> bool {
        matches!(self, ConvertError::MalformedMetadata { .. })
    }
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
