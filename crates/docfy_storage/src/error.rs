//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record with the same unique key already exists.
    #[error("duplicate {collection}: {key}")]
    Duplicate {
        /// Collection name.
        collection: &'static str,
        /// The conflicting key.
        key: String,
    },

    /// The addressed record does not exist.
    #[error("{collection} not found: {key}")]
    NotFound {
        /// Collection name.
        collection: &'static str,
        /// The missing key.
        key: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A snapshot could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The stored snapshot could not be read back.
    #[error("storage corrupted: {0}")]
    Corrupted(String),
}

impl StorageError {
    /// Returns true when the error is about the caller's input rather than
    /// the backend.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Duplicate { .. } | StorageError::NotFound { .. })
    }
}
