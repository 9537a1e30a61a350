//! Cache error types.

use thiserror::Error;

/// Errors that can occur when using the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to open the store.
    #[error("Failed to open store: {0}")]
    OpenError(String),

    /// Failed to serialize or deserialize a value.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Failed to perform store operation.
    #[error("Store operation failed: {0}")]
    StoreError(String),

    /// Key is not usable as a storage name.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl CacheError {
    /// Whether the stored bytes were present but could not be decoded.
    pub fn is_corruption(&self) -> bool {
        matches!(self, CacheError::SerializeError(e) if !e.is_io())
    }
}
