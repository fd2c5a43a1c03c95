//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Read `.env` (if present) into the process environment
//! 2. Load a config file: `BITEBASE_CONFIG_PATH` when set, otherwise the
//!    first file found by [`find_config_path`], otherwise defaults
//! 3. Apply `BITEBASE_*` environment overrides
//! 4. Validate value ranges
//!
//! ## Environment Variables
//! - `BITEBASE_CONFIG_PATH`: Explicit config file path
//! - `BITEBASE_ENVIRONMENT`: Deployment environment name
//! - `BITEBASE_FEATURES_ANALYTICS`: Enable analytics (true/false)
//! - `BITEBASE_REDIS_URL`: Redis URL for the external cache tier
//! - `BITEBASE_CACHE_PREFIX`: Key prefix for the external cache tier
//! - `BITEBASE_CACHE_DEFAULT_TTL`: Default cache TTL in seconds
//! - `BITEBASE_SENTRY_DSN`: Sentry DSN
//! - `BITEBASE_MIXPANEL_TOKEN`: Mixpanel project token
//! - `BITEBASE_GA_MEASUREMENT_ID` / `BITEBASE_GA_API_SECRET`: GA4 credentials
//! - `BITEBASE_ALERT_WEBHOOK_URL`: Critical alert webhook
//! - `BITEBASE_PERF_FLUSH_INTERVAL`: Performance flush interval in seconds
//! - `BITEBASE_ENCRYPTION_KEY`: Hex-encoded AES-256 key
//! - `BITEBASE_LOG_LEVEL`: Default log filter
//! - `BITEBASE_LOG_JSON`: Emit JSON logs (true/false)
//!
//! Empty values count as unset, so `BITEBASE_SENTRY_DSN=` disables Sentry
//! even when the file configures it.
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./bitebase.{toml,json}` then `./config.{toml,json}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};

use bitebase_domain::{BiteBaseError, Config, Result};

use crate::errors::to_domain;

const CONFIG_PATH_VAR: &str = "BITEBASE_CONFIG_PATH";
const CONFIG_FILE_NAMES: [&str; 4] = ["bitebase.toml", "bitebase.json", "config.toml", "config.json"];

/// Load configuration with the full strategy described in the module docs.
///
/// # Errors
/// Returns `BiteBaseError::Config` if an explicit config path is missing, a
/// file cannot be parsed, an override has an invalid value, or validation
/// fails.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => return Err(BiteBaseError::Config(format!("Invalid .env file: {err}"))),
    }

    let config = match non_empty_env(CONFIG_PATH_VAR) {
        Some(path) => load_from_file(Some(PathBuf::from(path)))?,
        None => match find_config_path() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::info!("No config file found; using defaults");
                Config::default()
            }
        },
    };

    finish(config)
}

/// Defaults plus `BITEBASE_*` overrides, ignoring config files.
///
/// # Errors
/// Returns `BiteBaseError::Config` for invalid override values.
pub fn load_from_env() -> Result<Config> {
    finish(Config::default())
}

fn finish(mut config: Config) -> Result<Config> {
    apply_env_overrides(&mut config)?;
    config.validate()?;
    tracing::info!(environment = %config.environment, "Configuration loaded");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations. Format is detected
/// by file extension (`.toml` or `.json`). Overrides are not applied.
///
/// # Errors
/// Returns `BiteBaseError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BiteBaseError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            BiteBaseError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(to_domain)?;
    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, detecting the format from `path`.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents).map_err(to_domain),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BiteBaseError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(BiteBaseError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a config file.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.is_file())
}

/// Apply `BITEBASE_*` overrides on top of `config`.
///
/// # Errors
/// Returns `BiteBaseError::Config` naming the variable with an invalid value.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(environment) = non_empty_env("BITEBASE_ENVIRONMENT") {
        config.environment = environment;
    }
    if let Some(enabled) = env_bool("BITEBASE_FEATURES_ANALYTICS")? {
        config.features.analytics = enabled;
    }

    override_optional("BITEBASE_REDIS_URL", &mut config.cache.redis_url);
    if let Some(prefix) = non_empty_env("BITEBASE_CACHE_PREFIX") {
        config.cache.key_prefix = prefix;
    }
    if let Some(ttl) = env_u64("BITEBASE_CACHE_DEFAULT_TTL")? {
        config.cache.default_ttl_secs = ttl;
    }

    let monitoring = &mut config.monitoring;
    override_optional("BITEBASE_SENTRY_DSN", &mut monitoring.sentry_dsn);
    override_optional("BITEBASE_MIXPANEL_TOKEN", &mut monitoring.mixpanel_token);
    override_optional("BITEBASE_GA_MEASUREMENT_ID", &mut monitoring.ga_measurement_id);
    override_optional("BITEBASE_GA_API_SECRET", &mut monitoring.ga_api_secret);
    override_optional("BITEBASE_ALERT_WEBHOOK_URL", &mut monitoring.alert_webhook_url);

    if let Some(interval) = env_u64("BITEBASE_PERF_FLUSH_INTERVAL")? {
        config.performance.flush_interval_secs = interval;
    }
    override_optional("BITEBASE_ENCRYPTION_KEY", &mut config.security.encryption_key);

    if let Some(level) = non_empty_env("BITEBASE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env_bool("BITEBASE_LOG_JSON")? {
        config.logging.json = json;
    }
    Ok(())
}

/// Set => `Some(value)`, set but empty => `None`, unset => unchanged.
fn override_optional(key: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(key) {
        let value = value.trim();
        *target = (!value.is_empty()).then(|| value.to_string());
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    non_empty_env(key)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|e| BiteBaseError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse a boolean environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str) -> Result<Option<bool>> {
    non_empty_env(key)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(BiteBaseError::Config(format!("Invalid boolean for {key}: {other}"))),
        })
        .transpose()
}
