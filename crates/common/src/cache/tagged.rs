//! Async in-memory cache with per-entry TTL and tag-based invalidation.
//!
//! Storage sits behind a `tokio::sync::RwLock`; the lock is never held across
//! anything but map operations. Every entry may carry a set of tags, and a
//! reverse index from tag to keys keeps [`TaggedCache::invalidate_tags`]
//! proportional to the number of matching entries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use super::config::{CacheConfig, EvictionPolicy};
use super::stats::{CacheStats, MetricsCollector};
use crate::resilience::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
    tags: HashSet<String>,
    last_access_tick: u64,
    access_count: u64,
    insertion_order: u64,
}

impl<V> CacheEntry<V> {
    /// An entry is expired once `now` reaches its deadline.
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug)]
struct CacheStorage<V> {
    data: HashMap<String, CacheEntry<V>>,
    tag_index: HashMap<String, HashSet<String>>,
    tick: u64,
}

impl<V> CacheStorage<V> {
    fn new() -> Self {
        Self { data: HashMap::new(), tag_index: HashMap::new(), tick: 0 }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Remove `key` and unlink it from every tag it carried.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.data.remove(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }

    fn expired_keys(&self, now: Instant) -> Vec<String> {
        self.data
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Async string-keyed cache with TTLs and tags.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bitebase_common::cache::{CacheConfig, TaggedCache};
///
/// # tokio_test::block_on(async {
/// let cache: TaggedCache<String> = TaggedCache::new(CacheConfig::default());
/// cache
///     .insert("restaurant:42", "Noodle Bar".to_string(), Some(Duration::from_secs(60)), ["restaurants"])
///     .await;
///
/// assert_eq!(cache.get("restaurant:42").await.as_deref(), Some("Noodle Bar"));
/// assert_eq!(cache.invalidate_tags(&["restaurants"]).await, vec!["restaurant:42".to_string()]);
/// # });
/// ```
pub struct TaggedCache<V, C = SystemClock>
where
    V: Clone,
    C: Clock + Clone,
{
    storage: Arc<RwLock<CacheStorage<V>>>,
    config: CacheConfig,
    metrics: Arc<MetricsCollector>,
    clock: C,
}

impl<V: Clone> TaggedCache<V, SystemClock> {
    /// Creates a cache with the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<V, C> TaggedCache<V, C>
where
    V: Clone,
    C: Clock + Clone,
{
    /// Creates a cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            storage: Arc::new(RwLock::new(CacheStorage::new())),
            metrics: Arc::new(MetricsCollector::new(config.track_metrics)),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Inserts or replaces `key`.
    ///
    /// `ttl` overrides the configured default; with neither the entry never
    /// expires. Replacing a key drops its previous tags.
    pub async fn insert<K, T, I>(&self, key: K, value: V, ttl: Option<Duration>, tags: I)
    where
        K: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        let key = key.into();
        let tags: HashSet<String> = tags.into_iter().map(Into::into).collect();
        let now = self.clock.now();
        // A deadline past the clock's range is the same as no deadline.
        let expires_at = ttl.or(self.config.default_ttl).and_then(|ttl| now.checked_add(ttl));

        let mut storage = self.storage.write().await;
        storage.remove_entry(&key);

        if let Some(max_size) = self.config.max_size {
            if storage.data.len() >= max_size {
                self.evict_one(&mut storage, now);
            }
        }

        for tag in &tags {
            storage.tag_index.entry(tag.clone()).or_default().insert(key.clone());
        }

        let tick = storage.next_tick();
        storage.data.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                tags,
                last_access_tick: tick,
                access_count: 1,
                insertion_order: tick,
            },
        );
        self.metrics.record_insert();
    }

    /// Returns the value for `key` unless it is missing or expired.
    ///
    /// Expired entries are removed on access.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut storage = self.storage.write().await;

        let expired = match storage.data.get(key) {
            None => {
                self.metrics.record_miss();
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            storage.remove_entry(key);
            self.metrics.record_expirations(1);
            self.metrics.record_miss();
            return None;
        }

        let tick = storage.next_tick();
        let entry = storage.data.get_mut(key)?;
        entry.last_access_tick = tick;
        entry.access_count += 1;
        self.metrics.record_hit();
        Some(entry.value.clone())
    }

    /// Returns whether `key` holds a live entry without touching access data.
    pub async fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.storage.read().await.data.get(key).is_some_and(|entry| !entry.is_expired(now))
    }

    /// Removes `key`, returning its value if it was present and live.
    pub async fn remove(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let entry = self.storage.write().await.remove_entry(key)?;
        (!entry.is_expired(now)).then_some(entry.value)
    }

    /// Removes every entry carrying at least one of `tags`.
    ///
    /// Returns the removed keys in sorted order.
    pub async fn invalidate_tags<T: AsRef<str>>(&self, tags: &[T]) -> Vec<String> {
        let mut storage = self.storage.write().await;

        let mut keys: Vec<String> = tags
            .iter()
            .filter_map(|tag| storage.tag_index.get(tag.as_ref()))
            .flat_map(|keys| keys.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        keys.sort();

        for key in &keys {
            storage.remove_entry(key);
        }
        drop(storage);

        if !keys.is_empty() {
            debug!(count = keys.len(), "invalidated cache entries by tag");
        }
        self.metrics.record_invalidations(keys.len());
        keys
    }

    /// Keys currently linked to `tag`, sorted.
    pub async fn keys_with_tag(&self, tag: &str) -> Vec<String> {
        let storage = self.storage.read().await;
        let mut keys: Vec<String> =
            storage.tag_index.get(tag).map(|keys| keys.iter().cloned().collect()).unwrap_or_default();
        keys.sort();
        keys
    }

    /// Removes every expired entry, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut storage = self.storage.write().await;
        let expired = storage.expired_keys(now);
        for key in &expired {
            storage.remove_entry(key);
        }
        self.metrics.record_expirations(expired.len());
        expired.len()
    }

    /// Removes every entry.
    pub async fn clear(&self) {
        let mut storage = self.storage.write().await;
        storage.data.clear();
        storage.tag_index.clear();
    }

    /// Number of stored entries, including expired ones not yet cleaned up.
    pub async fn len(&self) -> usize {
        self.storage.read().await.data.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.data.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        let size = self.len().await;
        self.metrics.snapshot(size, self.config.max_size)
    }

    pub fn reset_stats(&self) {
        self.metrics.reset();
    }

    /// Frees one slot, preferring an expired entry over a policy victim.
    fn evict_one(&self, storage: &mut CacheStorage<V>, now: Instant) {
        if let Some(key) = storage.expired_keys(now).into_iter().next() {
            storage.remove_entry(&key);
            self.metrics.record_expirations(1);
            return;
        }

        let victim = match self.config.eviction_policy {
            EvictionPolicy::LRU => storage
                .data
                .iter()
                .min_by_key(|(_, entry)| entry.last_access_tick)
                .map(|(k, _)| k.clone()),
            EvictionPolicy::LFU => storage
                .data
                .iter()
                .min_by_key(|(_, entry)| (entry.access_count, entry.insertion_order))
                .map(|(k, _)| k.clone()),
            EvictionPolicy::FIFO => storage
                .data
                .iter()
                .min_by_key(|(_, entry)| entry.insertion_order)
                .map(|(k, _)| k.clone()),
            EvictionPolicy::None => None,
        };

        if let Some(key) = victim {
            storage.remove_entry(&key);
            self.metrics.record_eviction();
        }
    }
}

impl<V, C> Clone for TaggedCache<V, C>
where
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config.clone(),
            metrics: Arc::clone(&self.metrics),
            clock: self.clock.clone(),
        }
    }
}

impl<V, C> std::fmt::Debug for TaggedCache<V, C>
where
    V: Clone,
    C: Clock + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedCache").field("config", &self.config).finish_non_exhaustive()
    }
}
