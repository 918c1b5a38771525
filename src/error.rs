//! Public error taxonomy for the store.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VectorStoreError>;

/// Every failure mode the store can surface to a caller.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("{} is not a valid store directory", .0.display())]
    NotAStore(PathBuf),

    #[error("no extractor registered for extension {0:?}")]
    UnsupportedFormat(String),

    #[error("unable to read source {}: {reason}", .path.display())]
    UnreadableSource { path: PathBuf, reason: String },

    #[error("embedding failed: {0}")]
    EmbeddingFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("model unavailable: {0}")]
    ModelUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed chunk record json: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VectorStoreError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unreadable_source(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn embedding_failed(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::EmbeddingFailed(Box::new(err))
    }

    pub fn model_unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ModelUnavailable(Box::new(err))
    }
}
