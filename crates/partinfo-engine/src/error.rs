//! Error types for the aggregation engine.

use partinfo_cache::CacheError;
use partinfo_core::{ConfigError, PartinfoError};
use partinfo_sources::SourceError;
use thiserror::Error;

/// Errors surfaced by the engine to its callers.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid query or other core failure
    #[error(transparent)]
    Core(#[from] PartinfoError),

    /// Configuration failure
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A source could not be constructed
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Cache failure
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The common-parts catalog could not be loaded
    #[error("invalid common parts catalog: {0}")]
    Catalog(#[from] serde_json::Error),

    /// The query scheduler is no longer running
    #[error("query scheduler has shut down")]
    CoalescerClosed,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
