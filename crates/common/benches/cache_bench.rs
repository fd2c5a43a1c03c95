//! Tagged cache benchmarks
//!
//! Run with: `cargo bench --bench cache_bench -p bitebase-common --features
//! runtime`

use std::time::Duration;

use bitebase_common::cache::{CacheConfig, TaggedCache};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn bench_insert(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("tagged_cache_insert");

    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("lru", size), &size, |b, &size| {
            let cache: TaggedCache<String> = TaggedCache::new(CacheConfig::lru(size));
            let mut counter = 0u64;
            b.to_async(&rt).iter(|| {
                counter = counter.wrapping_add(1);
                let cache = cache.clone();
                let key = format!("key_{counter}");
                async move {
                    cache
                        .insert(black_box(key), "value".to_string(), Some(Duration::from_secs(60)), ["bench"])
                        .await;
                }
            });
        });
    }

    group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
    let rt = runtime();
    let cache: TaggedCache<String> = TaggedCache::new(CacheConfig::default());
    rt.block_on(async {
        for i in 0..1_000 {
            cache.insert(format!("key_{i}"), format!("value_{i}"), None, ["bench"]).await;
        }
    });

    c.bench_function("tagged_cache_get_hit", |b| {
        b.to_async(&rt).iter(|| {
            let cache = cache.clone();
            async move { black_box(cache.get("key_500").await) }
        });
    });
}

fn bench_invalidate_tag(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("tagged_cache_invalidate_100", |b| {
        b.to_async(&rt).iter(|| async {
            let cache: TaggedCache<u32> = TaggedCache::new(CacheConfig::default());
            for i in 0..100 {
                cache.insert(format!("k{i}"), i, None, ["restaurant:1"]).await;
            }
            black_box(cache.invalidate_tags(&["restaurant:1"]).await)
        });
    });
}

criterion_group!(benches, bench_insert, bench_get_hit, bench_invalidate_tag);
criterion_main!(benches);
