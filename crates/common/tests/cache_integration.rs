//! Integration tests for the tagged cache
//!
//! Exercises TTL expiry with a shared mock clock, tag invalidation across
//! clones and concurrent access from multiple tasks.

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::time::Duration;

use bitebase_common::cache::{CacheConfig, EvictionPolicy, TaggedCache};
use bitebase_common::resilience::MockClock;

/// Verifies that clones of the cache share storage, tags and statistics.
///
/// # Test Steps
/// 1. Insert tagged entries through one handle
/// 2. Invalidate a tag through a clone
/// 3. Verify the original handle observes the removal and the counters
#[tokio::test]
async fn test_clones_share_storage_and_stats() {
    let cache: TaggedCache<String> = TaggedCache::new(CacheConfig::default());
    let handle = cache.clone();

    cache.insert("restaurant:1:menu", "pho".to_string(), None, ["restaurant:1"]).await;
    cache.insert("restaurant:1:hours", "9-5".to_string(), None, ["restaurant:1"]).await;
    cache.insert("restaurant:2:menu", "tacos".to_string(), None, ["restaurant:2"]).await;

    let removed = handle.invalidate_tags(&["restaurant:1"]).await;

    assert_eq!(removed.len(), 2);
    assert_eq!(cache.get("restaurant:1:menu").await, None);
    assert_eq!(cache.get("restaurant:2:menu").await.as_deref(), Some("tacos"));

    let stats = cache.stats().await;
    assert_eq!(stats.size, 1);
    assert_eq!(stats.inserts, 3);
    assert_eq!(stats.invalidations, 2);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

/// Validates mixed TTLs under a mock clock with a bounded FIFO cache.
///
/// # Test Steps
/// 1. Fill a two-slot cache with a short-lived and a long-lived entry
/// 2. Advance past the short TTL and insert a third entry
/// 3. Verify the expired entry made room instead of the FIFO victim
#[tokio::test]
async fn test_expired_entries_free_capacity_first() {
    let clock = MockClock::new();
    let config = CacheConfig::builder()
        .max_size(2)
        .eviction_policy(EvictionPolicy::FIFO)
        .default_ttl(Duration::from_secs(3600))
        .build();
    let cache: TaggedCache<u32, MockClock> = TaggedCache::with_clock(config, clock.clone());

    cache.insert("long", 1, None, ["analysis"]).await;
    cache.insert("short", 2, Some(Duration::from_secs(30)), ["analysis"]).await;

    clock.advance_secs(30);
    cache.insert("third", 3, None, ["analysis"]).await;

    assert_eq!(cache.get("long").await, Some(1));
    assert_eq!(cache.get("third").await, Some(3));
    assert_eq!(cache.keys_with_tag("analysis").await, vec!["long".to_string(), "third".to_string()]);

    clock.advance_secs(3600);
    assert_eq!(cache.cleanup_expired().await, 2);
    assert!(cache.is_empty().await);
}

/// Runs concurrent writers and readers against one cache.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access() {
    let cache = Arc::new(TaggedCache::<usize>::new(CacheConfig::lru(1_000)));

    let mut handles = Vec::new();
    for worker in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                let key = format!("w{worker}:k{i}");
                cache.insert(key.clone(), i, None, [format!("worker:{worker}")]).await;
                assert_eq!(cache.get(&key).await, Some(i));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.len().await, 400);
    assert_eq!(cache.invalidate_tags(&["worker:3"]).await.len(), 50);
    assert_eq!(cache.len().await, 350);
}
