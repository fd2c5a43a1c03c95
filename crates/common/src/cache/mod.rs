//! Generic in-memory cache with TTLs, tags and configurable eviction
//!
//! # Features
//!
//! - **Async**: storage behind `tokio::sync::RwLock`, shareable via `Clone`
//! - **TTL support**: per-entry TTL with a configurable default
//! - **Tags**: bulk invalidation of every entry carrying a tag
//! - **Configurable eviction**: LRU, LFU, FIFO, or no eviction
//! - **Metrics tracking**: hit/miss/eviction/expiration/invalidation counters
//! - **Testable**: [`Clock`](crate::resilience::Clock) abstraction for
//!   deterministic expiry tests
//!
//! The cache stores values of a single type `V`. Callers that cache
//! heterogeneous payloads pick an enum or serialized representation for `V`.

mod config;
mod stats;
mod tagged;

pub use config::{CacheConfig, CacheConfigBuilder, EvictionPolicy};
pub use stats::CacheStats;
pub use tagged::TaggedCache;
