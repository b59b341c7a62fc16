//! Error type shared by every storage operation.
//!
//! Callers get `Ok(vec![])` for an empty partition and `Err(StorageError)` for a
//! failed read or write, so "nothing stored" and "storage broke" stay distinct.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<shared::ProfileValidationError> for StorageError {
    fn from(err: shared::ProfileValidationError) -> Self {
        StorageError::Validation(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
