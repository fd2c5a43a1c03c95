//! Port interface for the external cache tier

use std::time::Duration;

use async_trait::async_trait;
use bitebase_domain::Result;

/// Shared key-value store behind the in-process cache (Redis in production)
///
/// Values are opaque text; the cache service owns their encoding.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short name used in log fields
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn delete_many(&self, keys: &[String]) -> Result<()>;
}
