//! HTTP helpers shared by the providers.

use crate::error::{Result, SourceError};
use partinfo_core::SourceConfig;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Build an HTTP client from a source's timeout and user agent.
///
/// # Errors
/// Returns error if the HTTP client cannot be created.
pub fn build_http_client(config: &SourceConfig) -> Result<Client> {
    let mut builder = Client::builder().timeout(config.timeout());
    if !config.user_agent.is_empty() {
        builder = builder.user_agent(config.user_agent.clone());
    }
    builder
        .build()
        .map_err(|e| SourceError::Internal(format!("failed to create HTTP client: {e}")))
}

/// The configured API key, or [`SourceError::MissingApiKey`].
pub fn require_api_key(provider: &str, config: &SourceConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| SourceError::MissingApiKey {
            provider: provider.to_string(),
        })
}

/// Check the status and decode a JSON body.
pub async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(SourceError::ApiError {
            provider: provider.to_string(),
            status: status.as_u16(),
            message: error_text,
        });
    }

    response.json().await.map_err(|e| SourceError::ParseError {
        provider: provider.to_string(),
        message: format!("Failed to parse response: {e}"),
    })
}

/// Decode a provider value that may arrive as a JSON number or a numeric
/// string. Unparseable strings decode as `None`.
pub fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
        Null,
    }

    Ok(match Loose::deserialize(deserializer)? {
        Loose::Number(n) => Some(n),
        Loose::Text(s) => s.trim().parse().ok(),
        Loose::Null => None,
    })
}

/// Provider counts where negative values mean "unknown".
#[must_use]
pub fn known_count(value: Option<i64>) -> Option<u64> {
    value.and_then(|v| u64::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Price {
        #[serde(deserialize_with = "number_or_string")]
        value: Option<f64>,
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&SourceConfig::octopart());
        assert!(client.is_ok());
    }

    #[test]
    fn test_require_api_key() {
        let mut config = SourceConfig::octopart();
        assert!(matches!(
            require_api_key("octopart", &config),
            Err(SourceError::MissingApiKey { .. })
        ));

        config.api_key = Some("secret".to_string());
        assert_eq!(require_api_key("octopart", &config).expect("key"), "secret");
    }

    #[test]
    fn test_number_or_string() {
        let parse = |json: &str| serde_json::from_str::<Price>(json).expect("parse").value;
        assert_eq!(parse(r#"{"value": 0.5}"#), Some(0.5));
        assert_eq!(parse(r#"{"value": "0.25"}"#), Some(0.25));
        assert_eq!(parse(r#"{"value": "n/a"}"#), None);
        assert_eq!(parse(r#"{"value": null}"#), None);
    }

    #[test]
    fn test_known_count() {
        assert_eq!(known_count(Some(12)), Some(12));
        assert_eq!(known_count(Some(-1)), None);
        assert_eq!(known_count(None), None);
    }
}
