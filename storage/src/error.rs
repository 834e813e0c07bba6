//! Storage error types.
//!
//! Used by the key-value backends, the rule store and the stats repository.

use shift_core::ShiftError;
use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    /// A persisted record exists but cannot be parsed.
    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl From<StorageError> for ShiftError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Corrupt { key, reason } => ShiftError::DataCorruption { key, reason },
            other => ShiftError::Storage(other.to_string()),
        }
    }
}
