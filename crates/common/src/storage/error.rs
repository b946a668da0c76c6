//! Storage error types

use thiserror::Error;

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(String),

    #[error("Stored value is corrupt for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Build a [`StorageError::Corrupt`] for a key.
    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt { key: key.into(), reason: reason.into() }
    }

    /// Whether the operation may succeed if attempted again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Unavailable(_))
    }
}
