//! Two-tier cache with TTL and tag-based invalidation

pub mod ports;
pub mod service;

pub use ports::CacheStore;
pub use service::{CacheInvalidation, CacheOptions, CacheService, CachedPayload};
