//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! service layer.

// Cache defaults
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "bitebase:cache:";
pub const DEFAULT_CACHE_STORE_TIMEOUT_MS: u64 = 500;
/// Longest accepted `cache.default_ttl_secs` (30 days).
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 3600;

// Retry defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

// Performance collection
pub const DEFAULT_PERFORMANCE_FLUSH_SECS: u64 = 30;
pub const SLOW_RESOURCE_THRESHOLD_MS: f64 = 1000.0;
pub const LARGE_RESOURCE_THRESHOLD_BYTES: u64 = 1024 * 1024;

// Error reporting
pub const ERROR_DISPATCH_QUEUE_CAPACITY: usize = 256;
pub const MONITORING_SINK_TIMEOUT_MS: u64 = 5000;

// Analytics event names
pub const EVENT_PAGE_VIEW: &str = "page_view";
pub const EVENT_RESTAURANT_SETUP: &str = "restaurant_setup";
pub const EVENT_MARKET_ANALYSIS: &str = "market_analysis";
pub const EVENT_AI_INTERACTION: &str = "ai_interaction";
pub const EVENT_SUBSCRIPTION: &str = "subscription_change";
pub const EVENT_FUNNEL_STEP: &str = "funnel_step";
pub const EVENT_ERROR_OCCURRED: &str = "error_occurred";
pub const EVENT_PERFORMANCE_METRICS: &str = "performance_metrics";

// Additional authenticated data bound into every encrypted payload
pub const ENCRYPTION_AAD: &[u8] = b"BiteBase";
