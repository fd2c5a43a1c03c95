//! Two-tier cache service
//!
//! The in-process [`TaggedCache`] is authoritative for tags and is always
//! written first; the optional [`CacheStore`] mirrors values for other
//! processes. Every store call is bounded by a timeout and its failures are
//! logged, never returned: callers only ever see a hit or a miss.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bitebase_common::cache::{CacheConfig, CacheStats, EvictionPolicy, TaggedCache};
use bitebase_common::compression::CompressionService;
use bitebase_common::error::CommonError;
use bitebase_common::resilience::{Clock, SystemClock};
use bitebase_domain::constants::{DEFAULT_CACHE_STORE_TIMEOUT_MS, DEFAULT_CACHE_TTL_SECS};
use bitebase_domain::{BiteBaseError, CacheServiceConfig, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ports::CacheStore;

/// Marks gzip+base64 payloads in the external store. JSON text never
/// starts with this prefix.
const COMPRESSED_PREFIX: &str = "gzip:";

/// Separates the epoch-millisecond deadline from the body of a store payload.
const DEADLINE_SEPARATOR: char = '|';

/// Per-call options of [`CacheService::cache`]
///
/// ```
/// use std::time::Duration;
///
/// use bitebase_core::CacheOptions;
///
/// let options = CacheOptions::new().ttl(Duration::from_secs(300)).tags(["menu", "restaurant:7"]).compress(true);
/// assert_eq!(options.ttl, Some(Duration::from_secs(300)));
/// assert_eq!(options.tags, ["menu", "restaurant:7"]);
/// assert!(options.compress && options.serialize);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Overrides the service default TTL
    pub ttl: Option<Duration>,
    /// Tags for [`CacheService::invalidate_cache`]
    pub tags: Vec<String>,
    /// Gzip the JSON text
    pub compress: bool,
    /// Hold the value as JSON text; `false` keeps the structured value in
    /// the in-process tier
    pub serialize: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { ttl: None, tags: Vec::new(), compress: false, serialize: true }
    }
}

impl CacheOptions {
    /// Default TTL, no tags, plain JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire after `ttl` instead of the service default.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Add one tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add every tag in `tags`.
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Gzip the payload before storing it.
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Keep JSON text (`true`) or the structured value (`false`).
    pub fn serialize(mut self, serialize: bool) -> Self {
        self.serialize = serialize;
        self
    }
}

/// Target of [`CacheService::invalidate_cache`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheInvalidation {
    /// Exact key
    Key(String),
    /// Every entry carrying at least one of the tags
    Tags(Vec<String>),
}

impl From<&str> for CacheInvalidation {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for CacheInvalidation {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<Vec<String>> for CacheInvalidation {
    fn from(tags: Vec<String>) -> Self {
        Self::Tags(tags)
    }
}

impl From<&[&str]> for CacheInvalidation {
    fn from(tags: &[&str]) -> Self {
        Self::Tags(tags.iter().map(|tag| (*tag).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for CacheInvalidation {
    fn from(tags: [&str; N]) -> Self {
        Self::Tags(tags.iter().map(|tag| (*tag).to_string()).collect())
    }
}

/// Value held by the in-process tier
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    /// JSON text
    Json(String),
    /// Structured value (`serialize = false`)
    Value(Value),
    /// Gzip-compressed JSON text, base64 encoded
    Compressed(String),
}

impl CachedPayload {
    fn encode<T>(data: &T, options: &CacheOptions, codec: &CompressionService) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        if options.compress {
            let text = serde_json::to_vec(data)?;
            return codec.compress_to_base64(&text).map(Self::Compressed).map_err(codec_error);
        }
        if options.serialize {
            Ok(Self::Json(serde_json::to_string(data)?))
        } else {
            Ok(Self::Value(serde_json::to_value(data)?))
        }
    }

    fn decode<T: DeserializeOwned>(&self, codec: &CompressionService) -> Result<T> {
        match self {
            Self::Json(text) => Ok(serde_json::from_str(text)?),
            Self::Value(value) => Ok(T::deserialize(value)?),
            Self::Compressed(encoded) => decode_compressed(encoded, codec),
        }
    }

    /// Text form written to the external store, led by its absolute
    /// deadline: `<expires_at_ms>|<body>`.
    fn to_store_text(&self, expires_at_ms: u64) -> Result<String> {
        let body = match self {
            Self::Json(text) => text.clone(),
            Self::Value(value) => serde_json::to_string(value)?,
            Self::Compressed(encoded) => format!("{COMPRESSED_PREFIX}{encoded}"),
        };
        Ok(format!("{expires_at_ms}{DEADLINE_SEPARATOR}{body}"))
    }

    /// Decode a store payload, or `Ok(None)` once `now_ms` reached its
    /// deadline.
    ///
    /// The store's own expiry may lag behind the in-process tier, so the
    /// embedded deadline decides.
    fn decode_store_text<T: DeserializeOwned>(
        text: &str,
        now_ms: u64,
        codec: &CompressionService,
    ) -> Result<Option<T>> {
        let (deadline, body) = text
            .split_once(DEADLINE_SEPARATOR)
            .and_then(|(deadline, body)| Some((deadline.parse::<u64>().ok()?, body)))
            .ok_or_else(|| BiteBaseError::Serialization("store payload has no deadline".into()))?;
        if now_ms >= deadline {
            return Ok(None);
        }

        match body.strip_prefix(COMPRESSED_PREFIX) {
            Some(encoded) => decode_compressed(encoded, codec).map(Some),
            None => Ok(Some(serde_json::from_str(body)?)),
        }
    }
}

fn decode_compressed<T: DeserializeOwned>(encoded: &str, codec: &CompressionService) -> Result<T> {
    let text = codec.decompress_from_base64(encoded).map_err(codec_error)?;
    Ok(serde_json::from_slice(&text)?)
}

fn codec_error(err: CommonError) -> BiteBaseError {
    BiteBaseError::Serialization(err.to_string())
}

/// Typed two-tier cache
pub struct CacheService<C = SystemClock>
where
    C: Clock + Clone,
{
    memory: TaggedCache<CachedPayload, C>,
    store: Option<Arc<dyn CacheStore>>,
    key_prefix: String,
    default_ttl: Duration,
    store_timeout: Duration,
    codec: CompressionService,
    clock: C,
}

impl CacheService<SystemClock> {
    /// In-process cache only, with the default TTL.
    pub fn in_memory() -> Self {
        Self::with_clock(&CacheServiceConfig::default(), SystemClock)
    }

    /// In-process tier sized and expired per `config`; attach a store separately.
    pub fn from_config(config: &CacheServiceConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C> CacheService<C>
where
    C: Clock + Clone,
{
    /// Same as [`from_config`](CacheService::from_config) with an injected clock.
    pub fn with_clock(config: &CacheServiceConfig, clock: C) -> Self {
        let default_ttl = match config.default_ttl() {
            ttl if ttl.is_zero() => Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            ttl => ttl,
        };
        let store_timeout = match config.store_timeout() {
            timeout if timeout.is_zero() => Duration::from_millis(DEFAULT_CACHE_STORE_TIMEOUT_MS),
            timeout => timeout,
        };
        let memory_config = CacheConfig {
            max_size: config.max_entries,
            default_ttl: Some(default_ttl),
            eviction_policy: if config.max_entries.is_some() {
                EvictionPolicy::LRU
            } else {
                EvictionPolicy::None
            },
            track_metrics: true,
        };

        Self {
            memory: TaggedCache::with_clock(memory_config, clock.clone()),
            store: None,
            key_prefix: config.key_prefix.clone(),
            default_ttl,
            store_timeout,
            codec: CompressionService::default(),
            clock,
        }
    }

    /// Mirror entries to `store`.
    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Whether an external tier is attached.
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// TTL used when [`CacheOptions::ttl`] is not set.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store `data` under `key`. Failures are logged and swallowed.
    pub async fn cache<T>(&self, key: &str, data: &T, options: CacheOptions)
    where
        T: Serialize + ?Sized,
    {
        let payload = match CachedPayload::encode(data, &options, &self.codec) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key, error = %err, "failed to cache data");
                return;
            }
        };
        let ttl = options.ttl.unwrap_or(self.default_ttl);

        let store_text = match &self.store {
            Some(_) => match payload.to_store_text(self.store_deadline(ttl)) {
                Ok(text) => Some(text),
                Err(err) => {
                    warn!(key, error = %err, "failed to encode cache payload for store");
                    None
                }
            },
            None => None,
        };

        self.memory.insert(key, payload, Some(ttl), options.tags).await;
        debug!(key, ttl_secs = ttl.as_secs(), "cache_set");

        if let (Some(store), Some(text)) = (&self.store, store_text) {
            let store_key = self.store_key(key);
            self.call_store("set", key, store.set(&store_key, &text, ttl)).await;
        }
    }

    /// Read `key`, falling back to the external store on an in-process miss.
    ///
    /// Returns `None` on a miss, on expiry, or when the payload does not
    /// decode into `T`.
    pub async fn get_cache<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(payload) = self.memory.get(key).await {
            return match payload.decode(&self.codec) {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!(key, error = %err, "cached payload does not match requested type");
                    None
                }
            };
        }

        let store = self.store.as_ref()?;
        let store_key = self.store_key(key);
        let text = self.call_store("get", key, store.get(&store_key)).await??;

        match CachedPayload::decode_store_text(&text, self.clock.millis_since_epoch(), &self.codec) {
            Ok(Some(value)) => {
                debug!(key, store = store.name(), "cache_store_hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key, store = store.name(), "cache_store_stale");
                None
            }
            Err(err) => {
                warn!(key, error = %err, "failed to retrieve cached data");
                None
            }
        }
    }

    /// Delete a key or every entry sharing one of the tags.
    ///
    /// Returns the keys removed from the in-process tier; removing a missing
    /// key or tag is a no-op.
    pub async fn invalidate_cache(&self, target: impl Into<CacheInvalidation>) -> Vec<String> {
        match target.into() {
            CacheInvalidation::Key(key) => {
                let removed = self.memory.remove(&key).await.is_some();
                if let Some(store) = &self.store {
                    let store_key = self.store_key(&key);
                    self.call_store("delete", &key, store.delete(&store_key)).await;
                }
                if removed {
                    vec![key]
                } else {
                    Vec::new()
                }
            }
            CacheInvalidation::Tags(tags) => {
                let keys = self.memory.invalidate_tags(&tags).await;
                debug!(tags = ?tags, removed = keys.len(), "cache_invalidated");
                if let (Some(store), false) = (&self.store, keys.is_empty()) {
                    let store_keys: Vec<String> = keys.iter().map(|key| self.store_key(key)).collect();
                    self.call_store("delete_many", "*", store.delete_many(&store_keys)).await;
                }
                keys
            }
        }
    }

    /// Drop expired in-process entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.memory.cleanup_expired().await
    }

    /// Drop the in-process tier. The external store is left untouched.
    pub async fn clear(&self) {
        self.memory.clear().await;
    }

    /// Counters of the in-process tier.
    pub async fn stats(&self) -> CacheStats {
        self.memory.stats().await
    }

    fn store_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    /// Wall-clock deadline of a store copy written now, never later than the
    /// in-process entry.
    fn store_deadline(&self, ttl: Duration) -> u64 {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self.clock.millis_since_epoch().saturating_add(ttl_ms)
    }

    async fn call_store<T>(&self, operation: &str, key: &str, call: impl Future<Output = Result<T>>) -> Option<T> {
        let store_name = self.store.as_ref().map_or("store", |store| store.name());
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                warn!(store = store_name, operation, key, error = %err, "cache store call failed");
                None
            }
            Err(_) => {
                warn!(
                    store = store_name,
                    operation,
                    key,
                    timeout_ms = u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX),
                    "cache store call timed out"
                );
                None
            }
        }
    }
}

impl<C> std::fmt::Debug for CacheService<C>
where
    C: Clock + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("store", &self.store.as_ref().map(|store| store.name()))
            .field("key_prefix", &self.key_prefix)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::service.
    use std::collections::HashMap;

    use async_trait::async_trait;
    use bitebase_common::resilience::MockClock;
    use parking_lot::Mutex;
    use serde::Deserialize;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        values: Mutex<HashMap<String, String>>,
        fail: bool,
    }

    #[async_trait]
    impl CacheStore for MemoryStore {
        fn name(&self) -> &str {
            "memory"
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            if self.fail {
                return Err(BiteBaseError::Cache("connection refused".into()));
            }
            Ok(self.values.lock().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<()> {
            if self.fail {
                return Err(BiteBaseError::Cache("connection refused".into()));
            }
            self.values.lock().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.values.lock().remove(key);
            Ok(())
        }

        async fn delete_many(&self, keys: &[String]) -> Result<()> {
            let mut values = self.values.lock();
            for key in keys {
                values.remove(key);
            }
            Ok(())
        }
    }

    /// Store that expires keys on the mock clock, rounding TTLs up to whole
    /// seconds the way a coarse backend would.
    struct ExpiringStore {
        clock: MockClock,
        values: Mutex<HashMap<String, (String, std::time::Instant)>>,
    }

    impl ExpiringStore {
        fn new(clock: MockClock) -> Self {
            Self { clock, values: Mutex::new(HashMap::new()) }
        }

        fn holds(&self, key: &str) -> bool {
            let now = self.clock.now();
            self.values.lock().get(key).is_some_and(|(_, deadline)| now < *deadline)
        }
    }

    #[async_trait]
    impl CacheStore for ExpiringStore {
        fn name(&self) -> &str {
            "expiring"
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            let now = self.clock.now();
            Ok(self
                .values
                .lock()
                .get(key)
                .filter(|(_, deadline)| now < *deadline)
                .map(|(text, _)| text.clone()))
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
            let rounded = Duration::from_secs(ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0));
            self.values.lock().insert(key.to_string(), (value.to_string(), self.clock.now() + rounded));
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.values.lock().remove(key);
            Ok(())
        }

        async fn delete_many(&self, keys: &[String]) -> Result<()> {
            let mut values = self.values.lock();
            for key in keys {
                values.remove(key);
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Restaurant {
        name: String,
        rating: f32,
    }

    fn noodle_bar() -> Restaurant {
        Restaurant { name: "Noodle Bar".into(), rating: 4.5 }
    }

    fn service_with_clock() -> (CacheService<MockClock>, MockClock) {
        let clock = MockClock::new();
        (CacheService::with_clock(&CacheServiceConfig::default(), clock.clone()), clock)
    }

    /// Validates TTL expiry of cached values.
    ///
    /// Assertions:
    /// - Confirms the value is returned before the TTL elapses.
    /// - Ensures it is gone exactly when the TTL has elapsed.
    #[tokio::test]
    async fn test_value_expires_after_ttl() {
        let (cache, clock) = service_with_clock();
        cache.cache("restaurant:1", &noodle_bar(), CacheOptions::new().ttl(Duration::from_secs(60))).await;

        clock.advance_secs(59);
        assert_eq!(cache.get_cache::<Restaurant>("restaurant:1").await, Some(noodle_bar()));

        clock.advance_secs(1);
        assert_eq!(cache.get_cache::<Restaurant>("restaurant:1").await, None);
    }

    #[tokio::test]
    async fn test_default_ttl_applies() {
        let (cache, clock) = service_with_clock();
        cache.cache("k", &1u32, CacheOptions::new()).await;

        clock.advance_secs(DEFAULT_CACHE_TTL_SECS - 1);
        assert_eq!(cache.get_cache::<u32>("k").await, Some(1));
        clock.advance_secs(1);
        assert_eq!(cache.get_cache::<u32>("k").await, None);
    }

    /// Validates tag-based invalidation across overlapping tag sets.
    ///
    /// Assertions:
    /// - Confirms entries tagged `x` are removed.
    /// - Ensures the entry carrying only `y` survives.
    #[tokio::test]
    async fn test_tag_invalidation() {
        let cache = CacheService::in_memory();
        cache.cache("a", &1, CacheOptions::new().tag("x")).await;
        cache.cache("b", &2, CacheOptions::new().tags(["x", "y"])).await;
        cache.cache("c", &3, CacheOptions::new().tag("y")).await;

        let removed = cache.invalidate_cache(["x"]).await;

        assert_eq!(removed, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cache.get_cache::<i32>("a").await, None);
        assert_eq!(cache.get_cache::<i32>("b").await, None);
        assert_eq!(cache.get_cache::<i32>("c").await, Some(3));
    }

    #[tokio::test]
    async fn test_invalidating_missing_key_is_noop() {
        let cache = CacheService::in_memory();
        cache.cache("kept", &"value", CacheOptions::new()).await;

        assert!(cache.invalidate_cache("missing").await.is_empty());
        assert!(cache.invalidate_cache("missing").await.is_empty());
        assert!(cache.invalidate_cache(["no-such-tag"]).await.is_empty());
        assert_eq!(cache.get_cache::<String>("kept").await.as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_payload_modes_roundtrip_typed_values() {
        let cache = CacheService::in_memory();
        cache.cache("json", &noodle_bar(), CacheOptions::new()).await;
        cache.cache("value", &noodle_bar(), CacheOptions::new().serialize(false)).await;
        cache.cache("gzip", &noodle_bar(), CacheOptions::new().compress(true)).await;

        for key in ["json", "value", "gzip"] {
            assert_eq!(cache.get_cache::<Restaurant>(key).await, Some(noodle_bar()), "mode {key}");
        }
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_miss() {
        let cache = CacheService::in_memory();
        cache.cache("restaurant", &noodle_bar(), CacheOptions::new()).await;

        assert_eq!(cache.get_cache::<Vec<u64>>("restaurant").await, None);
    }

    /// Validates the store fallback and key prefixing.
    ///
    /// Assertions:
    /// - Confirms writes are mirrored under the prefixed key.
    /// - Confirms an in-process miss is served from the store.
    /// - Ensures tag invalidation also deletes the store copies.
    #[tokio::test]
    async fn test_store_mirror_and_fallback() {
        let store = Arc::new(MemoryStore::default());
        let cache = CacheService::in_memory().with_store(store.clone());

        cache.cache("market:bkk", &noodle_bar(), CacheOptions::new().tag("market").compress(true)).await;
        let stored = store.values.lock().get("bitebase:cache:market:bkk").cloned();
        assert!(stored.is_some_and(|text| text
            .split_once(DEADLINE_SEPARATOR)
            .is_some_and(|(_, body)| body.starts_with(COMPRESSED_PREFIX))));

        cache.clear().await;
        assert_eq!(cache.get_cache::<Restaurant>("market:bkk").await, Some(noodle_bar()));

        cache.cache("market:cnx", &noodle_bar(), CacheOptions::new().tag("market")).await;
        cache.invalidate_cache(["market"]).await;
        assert!(!store.values.lock().contains_key("bitebase:cache:market:cnx"));
    }

    /// Validates that both tiers stop serving a value at the same deadline.
    ///
    /// Assertions:
    /// - Confirms the store copy is served once the in-process tier lost it.
    /// - Ensures nothing is served once the TTL elapsed, even while the store
    ///   still holds its rounded-up copy.
    #[tokio::test]
    async fn test_store_copy_expires_with_memory_entry() {
        let clock = MockClock::new();
        let store = Arc::new(ExpiringStore::new(clock.clone()));
        let cache = CacheService::with_clock(&CacheServiceConfig::default(), clock.clone())
            .with_store(store.clone());
        let ttl = CacheOptions::new().ttl(Duration::from_millis(1500));

        cache.cache("menu:1", &noodle_bar(), ttl.clone()).await;
        clock.advance_millis(1499);
        cache.clear().await;
        assert_eq!(cache.get_cache::<Restaurant>("menu:1").await, Some(noodle_bar()));

        cache.cache("menu:2", &noodle_bar(), ttl).await;
        clock.advance_millis(1500);
        assert!(store.holds("bitebase:cache:menu:2"));
        assert_eq!(cache.get_cache::<Restaurant>("menu:2").await, None);
    }

    #[tokio::test]
    async fn test_store_payload_without_deadline_is_a_miss() {
        let store = Arc::new(MemoryStore::default());
        store.values.lock().insert("bitebase:cache:legacy".into(), "42".into());
        let cache = CacheService::in_memory().with_store(store);

        assert_eq!(cache.get_cache::<u32>("legacy").await, None);
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_accepted() {
        let (cache, clock) = service_with_clock();
        cache.cache("forever", &1u32, CacheOptions::new().ttl(Duration::from_secs(u64::MAX))).await;

        clock.advance_secs(DEFAULT_CACHE_TTL_SECS * 24 * 365);
        assert_eq!(cache.get_cache::<u32>("forever").await, Some(1));
    }

    #[tokio::test]
    async fn test_failing_store_is_not_fatal() {
        let store = Arc::new(MemoryStore { fail: true, ..Default::default() });
        let cache = CacheService::in_memory().with_store(store);

        cache.cache("k", &"v", CacheOptions::new()).await;
        assert_eq!(cache.get_cache::<String>("k").await.as_deref(), Some("v"));

        cache.clear().await;
        assert_eq!(cache.get_cache::<String>("k").await, None);
    }

    #[tokio::test]
    async fn test_purge_and_stats() {
        let (cache, clock) = service_with_clock();
        cache.cache("short", &1, CacheOptions::new().ttl(Duration::from_secs(1))).await;
        cache.cache("long", &2, CacheOptions::new().ttl(Duration::from_secs(600))).await;

        clock.advance_secs(5);
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.get_cache::<i32>("long").await, Some(2));

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.inserts, 2);
        assert_eq!(stats.hits, 1);
    }
}
