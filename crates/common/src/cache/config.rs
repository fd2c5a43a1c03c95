//! Cache sizing, expiry and eviction settings

use std::time::Duration;

/// Which entry to drop when an insert would exceed `max_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Oldest `last_accessed`
    #[default]
    LRU,
    /// Lowest access count
    LFU,
    /// Oldest `inserted_at`
    FIFO,
    /// Never evict; the cache grows past `max_size`
    None,
}

/// Settings of a [`TaggedCache`](super::TaggedCache)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entry bound; `None` leaves the cache unbounded.
    pub max_size: Option<usize>,
    /// Used by inserts without an explicit TTL. `None` means entries live
    /// until invalidated.
    pub default_ttl: Option<Duration>,
    /// Victim choice once `max_size` is reached
    pub eviction_policy: EvictionPolicy,
    /// When false, [`CacheStats`](super::CacheStats) counters stay at zero.
    pub track_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_size: None, default_ttl: None, eviction_policy: EvictionPolicy::LRU, track_metrics: true }
    }
}

impl CacheConfig {
    /// Start from [`CacheConfig::default`].
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Unbounded cache whose entries expire after `duration` by default.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use bitebase_common::cache::CacheConfig;
    ///
    /// let config = CacheConfig::ttl(Duration::from_secs(3600));
    /// assert!(config.max_size.is_none());
    /// ```
    pub fn ttl(duration: Duration) -> Self {
        Self { default_ttl: Some(duration), eviction_policy: EvictionPolicy::None, ..Self::default() }
    }

    /// At most `max_size` entries, evicting the least recently used.
    pub fn lru(max_size: usize) -> Self {
        Self { max_size: Some(max_size), ..Self::default() }
    }
}

/// Builder for [`CacheConfig`]
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Bound the cache to `size` entries.
    pub fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = Some(size);
        self
    }

    /// Expire entries inserted without a TTL after `duration`.
    pub fn default_ttl(mut self, duration: Duration) -> Self {
        self.config.default_ttl = Some(duration);
        self
    }

    /// Choose the eviction victim.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.config.eviction_policy = policy;
        self
    }

    /// Count hits, misses and evictions.
    pub fn track_metrics(mut self, enabled: bool) -> Self {
        self.config.track_metrics = enabled;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}
