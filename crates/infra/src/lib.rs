//! # BiteBase Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The Redis cache store
//! - Sentry, Mixpanel, GA4 and webhook adapters
//! - The shared HTTP client with API call timing
//! - Configuration loading and tracing bootstrap
//! - The [`AppServices`] composition root and its background tasks
//!
//! ## Architecture
//! - Implements traits defined in `bitebase-core`
//! - Contains all "impure" code (network I/O, files, environment)

pub mod analytics;
pub mod cache;
pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod monitoring;
pub mod performance;
pub mod services;

// Re-export commonly used items
pub use analytics::{GoogleAnalyticsClient, MixpanelClient};
pub use cache::RedisCacheStore;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use logging::init_tracing;
pub use monitoring::{SentryDsn, SentrySink, WebhookNotifier};
pub use performance::PerformanceReporter;
pub use services::AppServices;
