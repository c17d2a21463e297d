//! Error types for part data sources.

use thiserror::Error;

/// Errors raised while talking to a part data provider.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("API error ({provider}): status {status}, {message}")]
    ApiError {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Provider answered with something we could not decode
    #[error("failed to parse response from {provider}: {message}")]
    ParseError {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Provider requires an API key and none was configured
    #[error("no API key configured for {provider}")]
    MissingApiKey {
        /// Provider name
        provider: String,
    },

    /// Provider reports the listing as no longer stocked or manufactured
    #[error("{provider} reports {sku} as discontinued")]
    Discontinued {
        /// Provider name
        provider: String,
        /// Listing the provider was asked about
        sku: String,
    },

    /// Provider cannot serve this request
    #[error("{provider} does not support {message}")]
    Unsupported {
        /// Provider name
        provider: String,
        /// What was asked for
        message: String,
    },

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
