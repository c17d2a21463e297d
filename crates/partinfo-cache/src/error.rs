//! Cache error types.

use thiserror::Error;

/// Cache-specific errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed to read or write.
    #[error("cache store error: {0}")]
    Store(String),

    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
