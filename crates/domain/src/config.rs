//! Configuration structures
//!
//! Every section is defaulted, so an empty file (or no file at all) yields a
//! working in-memory configuration. Integrations whose credentials are absent
//! are simply not constructed.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CACHE_KEY_PREFIX, DEFAULT_CACHE_STORE_TIMEOUT_MS, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_PERFORMANCE_FLUSH_SECS, LARGE_RESOURCE_THRESHOLD_BYTES, MAX_CACHE_TTL_SECS,
    SLOW_RESOURCE_THRESHOLD_MS,
};
use crate::errors::{BiteBaseError, Result};

/// Root application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment environment name (`development`, `staging`, `production`).
    pub environment: String,
    pub features: FeaturesConfig,
    pub cache: CacheServiceConfig,
    pub monitoring: MonitoringConfig,
    pub performance: PerformanceConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            features: FeaturesConfig::default(),
            cache: CacheServiceConfig::default(),
            monitoring: MonitoringConfig::default(),
            performance: PerformanceConfig::default(),
            security: SecurityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    /// Returns `BiteBaseError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.cache.default_ttl_secs == 0 {
            return Err(BiteBaseError::Config("cache.default_ttl_secs must be > 0".into()));
        }
        if self.cache.default_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(BiteBaseError::Config(format!(
                "cache.default_ttl_secs must be <= {MAX_CACHE_TTL_SECS}"
            )));
        }
        if self.performance.flush_interval_secs == 0 {
            return Err(BiteBaseError::Config(
                "performance.flush_interval_secs must be > 0".into(),
            ));
        }
        if let Some(key) = &self.security.encryption_key {
            if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(BiteBaseError::Config(
                    "security.encryption_key must be 64 hex characters (32 bytes)".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Feature switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub analytics: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self { analytics: true }
    }
}

/// Two-tier cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheServiceConfig {
    /// Redis connection URL; the external tier is disabled when absent.
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub default_ttl_secs: u64,
    /// Upper bound for a single external store call.
    pub store_timeout_ms: u64,
    /// Capacity of the in-process tier (unbounded when absent).
    pub max_entries: Option<usize>,
}

impl Default for CacheServiceConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            default_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            store_timeout_ms: DEFAULT_CACHE_STORE_TIMEOUT_MS,
            max_entries: None,
        }
    }
}

impl CacheServiceConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Credentials and endpoints for monitoring and analytics sinks.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub sentry_dsn: Option<String>,
    pub mixpanel_token: Option<String>,
    pub mixpanel_api_url: String,
    pub ga_measurement_id: Option<String>,
    pub ga_api_secret: Option<String>,
    pub ga_api_url: String,
    /// Slack-compatible webhook used for critical alerts.
    pub alert_webhook_url: Option<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sentry_dsn: None,
            mixpanel_token: None,
            mixpanel_api_url: "https://api.mixpanel.com".to_string(),
            ga_measurement_id: None,
            ga_api_secret: None,
            ga_api_url: "https://www.google-analytics.com".to_string(),
            alert_webhook_url: None,
        }
    }
}

impl fmt::Debug for MonitoringConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitoringConfig")
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("mixpanel_token", &self.mixpanel_token.as_ref().map(|_| "[REDACTED]"))
            .field("mixpanel_api_url", &self.mixpanel_api_url)
            .field("ga_measurement_id", &self.ga_measurement_id)
            .field("ga_api_secret", &self.ga_api_secret.as_ref().map(|_| "[REDACTED]"))
            .field("ga_api_url", &self.ga_api_url)
            .field("alert_webhook_url", &self.alert_webhook_url.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Performance collection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub enabled: bool,
    pub flush_interval_secs: u64,
    pub slow_resource_ms: f64,
    pub large_resource_bytes: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_interval_secs: DEFAULT_PERFORMANCE_FLUSH_SECS,
            slow_resource_ms: SLOW_RESOURCE_THRESHOLD_MS,
            large_resource_bytes: LARGE_RESOURCE_THRESHOLD_BYTES,
        }
    }
}

impl PerformanceConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

/// Security settings.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Hex-encoded 32-byte AES-256-GCM key.
    pub encryption_key: Option<String>,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Logging settings; `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for config.
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let config = Config::default();

        assert_eq!(config.cache.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.performance.flush_interval(), Duration::from_secs(30));
        assert!(config.features.analytics);
        assert!(config.cache.redis_url.is_none());
        assert!(config.validate().is_ok());
    }

    /// Validates that partial TOML documents fill the remaining sections from
    /// defaults.
    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            environment = "production"

            [cache]
            redis_url = "redis://localhost:6379"
            "#,
        )
        .unwrap();

        assert!(config.is_production());
        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.cache.key_prefix, DEFAULT_CACHE_KEY_PREFIX);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn validate_rejects_short_encryption_key() {
        let mut config = Config::default();
        config.security.encryption_key = Some("abcd".into());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, BiteBaseError::Config(msg) if msg.contains("encryption_key")));
    }

    #[test]
    fn validate_bounds_cache_ttl() {
        let mut config = Config::default();
        config.cache.default_ttl_secs = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BiteBaseError::Config(msg) if msg.contains("default_ttl_secs")));

        config.cache.default_ttl_secs = MAX_CACHE_TTL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_flush_interval() {
        let mut config = Config::default();
        config.performance.flush_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = Config::default();
        config.security.encryption_key = Some("00".repeat(32));
        config.monitoring.mixpanel_token = Some("token-123".into());

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("token-123"));
        assert!(!rendered.contains(&"00".repeat(32)));
        assert!(rendered.contains("[REDACTED]"));
    }
}
