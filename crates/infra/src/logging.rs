//! Tracing subscriber bootstrap
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either
//! the human-readable or the JSON formatter. `RUST_LOG` takes precedence over
//! the configured level. Installing twice is a no-op.

use std::sync::OnceLock;

use bitebase_domain::{BiteBaseError, LoggingConfig, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Build the filter, preferring `RUST_LOG` over `level`.
///
/// # Errors
/// Returns `BiteBaseError::Config` when `level` is not a valid filter
/// directive.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|err| BiteBaseError::Config(format!("Invalid log level {level:?}: {err}")))
}

/// Install the global subscriber.
///
/// # Errors
/// Returns `BiteBaseError::Config` for an invalid log level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    if TRACING_INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = build_filter(&config.level)?;
    let json_layer = config.json.then(|| fmt::layer().json().with_current_span(true).with_target(true));
    let text_layer = (!config.json).then(|| fmt::layer().with_target(true).with_level(true));

    let subscriber = tracing_subscriber::registry().with(filter).with(json_layer).with(text_layer);

    if subscriber.try_init().is_err() {
        tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
    } else {
        tracing::info!(level = %config.level, json = config.json, "Logging initialized");
    }
    let _ = TRACING_INITIALIZED.set(());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_validates_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(build_filter("bitebase_core=debug,info").is_ok());
        assert!(matches!(build_filter("bitebase_core=loud"), Err(BiteBaseError::Config(_))));
    }

    #[test]
    fn test_init_tracing_twice_is_ok() {
        let config = LoggingConfig { level: "warn".into(), json: true };
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }
}
