//! Core error types for partinfo.
//!
//! This module defines the error type shared by the data model and the query
//! front, plus the configuration error used by [`crate::config`].

use thiserror::Error;

/// Central error type for partinfo operations.
#[derive(Error, Debug)]
pub enum PartinfoError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A query carried neither an Mpn, a Sku, nor a search term
    #[error("Mpn or Sku required")]
    MissingIdentity,

    /// JSON encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `PartinfoError`.
pub type Result<T> = std::result::Result<T, PartinfoError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PartinfoError::MissingIdentity;
        assert_eq!(err.to_string(), "Mpn or Sku required");

        let err = ConfigError::InvalidValue {
            field: "coalescer.max_batch_size".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for coalescer.max_batch_size: must be at least 1"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let err: PartinfoError = config_err.into();
        assert!(matches!(err, PartinfoError::Config(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: PartinfoError = json_err.into();
        assert!(matches!(err, PartinfoError::Serialization(_)));
    }
}
