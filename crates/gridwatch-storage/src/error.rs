//! Error types for the storage crate.

use thiserror::Error;

// Re-export the core error type
pub use gridwatch_core::error::Error as CoreError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The state path does not name a file.
    #[error("invalid state path: {0}")]
    InvalidPath(String),
}

impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        CoreError::Storage(e.to_string())
    }
}
