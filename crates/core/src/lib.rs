//! # BiteBase Core
//!
//! Service layer business logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The error taxonomy service and its retry/fallback engine
//! - The two-tier cache service
//! - Analytics, performance collection and security services
//! - Port interfaces (traits) implemented by `bitebase-infra`
//!
//! ## Architecture Principles
//! - Only depends on `bitebase-common` and `bitebase-domain`
//! - No Redis, HTTP or vendor SDK code
//! - All external dependencies via traits
//! - Services are constructed explicitly and shared behind `Arc`

pub mod analytics;
pub mod cache;
pub mod errors;
pub mod performance;
pub mod resilience;
pub mod security;
pub mod utils;

// Ports
pub use analytics::AnalyticsClient;
pub use cache::CacheStore;
pub use errors::{CriticalAlertNotifier, MonitoringSink};
// Services
pub use analytics::AnalyticsService;
pub use cache::{CacheInvalidation, CacheOptions, CacheService};
pub use errors::{ErrorHandler, ErrorHandlerBuilder};
pub use performance::{PerformanceCollector, PerformanceEvent};
pub use resilience::{RetryEngine, RetryFailure, RetryOptions};
pub use security::SecurityService;
