//! Storage error types.

use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A storage backend operation failed (I/O, encoding, backend-specific).
    #[error("storage error: {0}")]
    Internal(String),

    /// The key or namespace prefix is invalid (empty, contains the
    /// namespace separator).
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
