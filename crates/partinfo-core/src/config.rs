//! Configuration management for partinfo.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::retailers::default_retailers;
use directories::ProjectDirs;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/partinfo/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Request batching
    pub coalescer: CoalescerConfig,
    /// Merged-result cache
    pub cache: CacheConfig,
    /// Retailer defaults
    pub retailers: RetailerConfig,
    /// Primary aggregator
    #[serde(deserialize_with = "octopart_section")]
    pub octopart: SourceConfig,
    /// Secondary distributor catalog
    #[serde(deserialize_with = "lcsc_section")]
    pub lcsc: SourceConfig,
    /// Farnell/Newark offer enrichment
    #[serde(deserialize_with = "element14_section")]
    pub element14: SourceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            coalescer: CoalescerConfig::default(),
            cache: CacheConfig::default(),
            retailers: RetailerConfig::default(),
            octopart: SourceConfig::octopart(),
            lcsc: SourceConfig::lcsc(),
            element14: SourceConfig::element14(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// See [`AppConfig::apply_env`] for the supported variables.
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PARTINFO_OCTOPART_API_KEY`: Octopart API key
    /// - `PARTINFO_ELEMENT14_API_KEY`: element14 API key
    /// - `PARTINFO_MERGED_TTL_SECS`: Override merged-result cache TTL
    /// - `PARTINFO_MAX_BATCH_SIZE`: Override coalescer batch size
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("PARTINFO_OCTOPART_API_KEY") {
            self.octopart.api_key = Some(key);
            tracing::debug!("Loaded octopart API key from env");
        }

        if let Ok(key) = std::env::var("PARTINFO_ELEMENT14_API_KEY") {
            self.element14.api_key = Some(key);
            tracing::debug!("Loaded element14 API key from env");
        }

        if let Ok(val) = std::env::var("PARTINFO_MERGED_TTL_SECS") {
            if let Ok(secs) = val.parse() {
                self.cache.merged_ttl_secs = secs;
                tracing::debug!("Override cache.merged_ttl_secs from env: {}", secs);
            }
        }

        if let Ok(val) = std::env::var("PARTINFO_MAX_BATCH_SIZE") {
            if let Ok(size) = val.parse() {
                self.coalescer.max_batch_size = size;
                tracing::debug!("Override coalescer.max_batch_size from env: {}", size);
            }
        }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.coalescer.max_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "coalescer.max_batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.coalescer.tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "coalescer.tick_ms".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        for (name, source) in [
            ("octopart", &self.octopart),
            ("lcsc", &self.lcsc),
            ("element14", &self.element14),
        ] {
            if source.enabled && source.base_url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{name}.base_url"),
                    reason: "must be set for an enabled source".to_string(),
                });
            }
            if source.max_calls == 0 || source.max_in_flight == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("{name}.max_calls"),
                    reason: "rate limits must allow at least one call".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> ConfigResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/partinfo/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "partinfo", "partinfo").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Request batching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoalescerConfig {
    /// Dispatch as soon as this many queries are pending
    pub max_batch_size: usize,
    /// Dispatch once the oldest pending query has waited this long
    pub max_latency_ms: u64,
    /// Interval of the periodic pending-list check
    pub tick_ms: u64,
}

impl CoalescerConfig {
    /// Maximum latency as a `Duration`.
    #[must_use]
    pub fn max_latency(&self) -> Duration {
        Duration::from_millis(self.max_latency_ms)
    }

    /// Tick interval as a `Duration`.
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 20,
            max_latency_ms: 100,
            tick_ms: 1000,
        }
    }
}

/// Merged-result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix for every cache key
    pub key_prefix: String,
    /// TTL of merged query results in seconds
    pub merged_ttl_secs: u64,
}

impl CacheConfig {
    /// Merged-result TTL as a `Duration`.
    #[must_use]
    pub fn merged_ttl(&self) -> Duration {
        Duration::from_secs(self.merged_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "partinfo:".to_string(),
            merged_ttl_secs: 3600,
        }
    }
}

/// Retailer defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetailerConfig {
    /// Vendors served when a query names none
    pub default: Vec<String>,
}

impl Default for RetailerConfig {
    fn default() -> Self {
        Self {
            default: default_retailers().into_iter().collect(),
        }
    }
}

/// Settings for one external data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Whether the provider is queried at all
    pub enabled: bool,
    /// API base URL
    pub base_url: String,
    /// API key (supplied through the environment, never written to disk)
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Calls allowed per rate-limit window
    pub max_calls: u32,
    /// Rate-limit window in milliseconds
    pub window_ms: u64,
    /// Calls allowed in flight at once
    pub max_in_flight: u32,
    /// TTL of cached raw responses in seconds
    pub cache_ttl_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl SourceConfig {
    /// Defaults for the Octopart aggregator.
    #[must_use]
    pub fn octopart() -> Self {
        Self {
            base_url: "https://octopart.com/api/v3".to_string(),
            max_calls: 3,
            max_in_flight: 3,
            cache_ttl_secs: 300,
            ..Self::default()
        }
    }

    /// Defaults for the LCSC catalog.
    #[must_use]
    pub fn lcsc() -> Self {
        Self {
            base_url: "https://wmsc.lcsc.com/wmsc".to_string(),
            max_calls: 30,
            max_in_flight: 10,
            cache_ttl_secs: 600,
            ..Self::default()
        }
    }

    /// Defaults for the element14 product API.
    #[must_use]
    pub fn element14() -> Self {
        Self {
            base_url: "https://api.element14.com/catalog".to_string(),
            max_calls: 2,
            max_in_flight: 2,
            cache_ttl_secs: 900,
            ..Self::default()
        }
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Rate-limit window as a `Duration`.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Raw-response cache TTL as a `Duration`.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: String::new(),
            api_key: None,
            timeout_secs: 30,
            max_calls: 5,
            window_ms: 1000,
            max_in_flight: 5,
            cache_ttl_secs: 300,
            user_agent: "partinfo/0.1.0 (+https://github.com/partinfo/partinfo)".to_string(),
        }
    }
}

/// A provider section as written in the file. Keys left out keep the
/// provider's own defaults rather than the generic ones.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceSection {
    enabled: Option<bool>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_calls: Option<u32>,
    window_ms: Option<u64>,
    max_in_flight: Option<u32>,
    cache_ttl_secs: Option<u64>,
    user_agent: Option<String>,
}

impl SourceSection {
    fn over(self, mut base: SourceConfig) -> SourceConfig {
        if let Some(enabled) = self.enabled {
            base.enabled = enabled;
        }
        if let Some(base_url) = self.base_url {
            base.base_url = base_url;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            base.timeout_secs = timeout_secs;
        }
        if let Some(max_calls) = self.max_calls {
            base.max_calls = max_calls;
        }
        if let Some(window_ms) = self.window_ms {
            base.window_ms = window_ms;
        }
        if let Some(max_in_flight) = self.max_in_flight {
            base.max_in_flight = max_in_flight;
        }
        if let Some(cache_ttl_secs) = self.cache_ttl_secs {
            base.cache_ttl_secs = cache_ttl_secs;
        }
        if let Some(user_agent) = self.user_agent {
            base.user_agent = user_agent;
        }
        base
    }
}

fn octopart_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SourceConfig, D::Error> {
    SourceSection::deserialize(deserializer).map(|section| section.over(SourceConfig::octopart()))
}

fn lcsc_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SourceConfig, D::Error> {
    SourceSection::deserialize(deserializer).map(|section| section.over(SourceConfig::lcsc()))
}

fn element14_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SourceConfig, D::Error> {
    SourceSection::deserialize(deserializer).map(|section| section.over(SourceConfig::element14()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.coalescer.max_batch_size, 20);
        assert_eq!(config.coalescer.max_latency(), Duration::from_millis(100));
        assert_eq!(config.coalescer.tick(), Duration::from_secs(1));
        assert_eq!(config.cache.key_prefix, "partinfo:");
        assert_eq!(config.lcsc.max_calls, 30);
        assert!(config.retailers.default.contains(&"Digikey".to_string()));
        assert!(config.octopart.api_key.is_none());
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AppConfig::default();
        config.octopart.api_key = Some("secret".to_string());

        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[coalescer]"));
        assert!(toml_str.contains("[octopart]"));
        assert!(!toml_str.contains("secret"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.octopart.base_url, config.octopart.base_url);
        assert!(parsed.octopart.api_key.is_none());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.cache.merged_ttl_secs = 120;
        config.coalescer.max_batch_size = 5;
        config.save_to(&config_path).expect("save config");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.cache.merged_ttl_secs, 120);
        assert_eq!(loaded.coalescer.max_batch_size, 5);
    }

    #[test]
    fn test_load_from_missing_path() {
        let tmp = TempDir::new().expect("create temp dir");
        let err = AppConfig::load_from(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("PARTINFO_OCTOPART_API_KEY", "from-env");
        std::env::set_var("PARTINFO_MERGED_TTL_SECS", "60");
        std::env::set_var("PARTINFO_MAX_BATCH_SIZE", "not-a-number");

        let mut config = AppConfig::default();
        config.apply_env();

        assert_eq!(config.octopart.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.cache.merged_ttl_secs, 60);
        assert_eq!(config.coalescer.max_batch_size, 20);

        std::env::remove_var("PARTINFO_OCTOPART_API_KEY");
        std::env::remove_var("PARTINFO_MERGED_TTL_SECS");
        std::env::remove_var("PARTINFO_MAX_BATCH_SIZE");
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[coalescer]
max_latency_ms = 250

[lcsc]
enabled = false
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.coalescer.max_latency_ms, 250);
        assert!(!config.lcsc.enabled);
        // These should be defaults
        assert_eq!(config.coalescer.max_batch_size, 20);
        assert_eq!(config.octopart.base_url, "https://octopart.com/api/v3");
    }

    #[test]
    fn test_partial_source_section_keeps_provider_defaults() {
        let toml_str = r#"
[octopart]
cache_ttl_secs = 60

[element14]
max_calls = 1
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.octopart.cache_ttl_secs, 60);
        assert_eq!(config.octopart.base_url, "https://octopart.com/api/v3");
        assert_eq!(config.octopart.max_calls, 3);
        assert_eq!(config.octopart.max_in_flight, 3);
        assert_eq!(config.element14.max_calls, 1);
        assert_eq!(config.element14.base_url, "https://api.element14.com/catalog");
        assert_eq!(config.element14.cache_ttl_secs, 900);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enabled_source_needs_base_url() {
        let mut config = AppConfig::default();
        config.lcsc.base_url = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "lcsc.base_url"
        ));

        config.lcsc.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_batch_size_rejected() {
        let mut config = AppConfig::default();
        config.coalescer.max_batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
