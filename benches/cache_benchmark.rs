//! Criterion benchmark: pool hot paths over each backend.
//! Run with: cargo bench --bench cache_benchmark (QUICK=1 for a short pass)

use criterion::measurement::WallTime;
use criterion::{criterion_group, criterion_main, BenchmarkGroup, Criterion};
use pool_cache::backend::MemoryBackend;
use pool_cache::serialization::{decode_item, encode_item};
use pool_cache::{CacheAdapter, CacheBackend, CacheItem, CachePool, Ttl};
use rand::Rng;
use std::hint::black_box;
use std::time::Duration;

const KEYS: usize = 1_000;

fn keys() -> Vec<String> {
    (0..KEYS).map(|i| format!("bench:key:{i}")).collect()
}

fn seeded<B: CacheBackend>(backend: B, keys: &[String], payload: &[u8]) -> CacheAdapter<B> {
    let pool = CacheAdapter::new(backend);
    for key in keys {
        pool.set(key, payload.to_vec(), Some(Ttl::Seconds(3600)))
            .expect("Failed to seed pool");
    }
    pool
}

fn configure<'a>(c: &'a mut Criterion, name: &str) -> BenchmarkGroup<'a, WallTime> {
    let mut group = c.benchmark_group(name);
    if std::env::var("QUICK").is_ok() {
        group.sample_size(10).measurement_time(Duration::from_secs(2));
    }
    group
}

fn bench_pool<B: CacheBackend>(c: &mut Criterion, name: &str, backend: B) {
    let keys = keys();
    let payload = vec![0x5a_u8; 256];
    let pool = seeded(backend, &keys, &payload);
    let mut rng = rand::rng();

    let mut group = configure(c, name);
    group.bench_function("get_hit", |b| {
        b.iter(|| {
            let key = &keys[rng.random_range(0..KEYS)];
            black_box(pool.get(key).expect("Failed to get"))
        })
    });
    group.bench_function("get_miss", |b| {
        b.iter(|| black_box(pool.get("bench:absent").expect("Failed to get")))
    });
    group.bench_function("set", |b| {
        b.iter(|| {
            let key = &keys[rng.random_range(0..KEYS)];
            black_box(
                pool.set(key, payload.clone(), Some(Ttl::Seconds(3600)))
                    .expect("Failed to set"),
            )
        })
    });
    group.bench_function("deferred_commit_16", |b| {
        b.iter(|| {
            for key in keys.iter().take(16) {
                let item =
                    CacheItem::with_ttl(key.as_str(), payload.clone(), Some(Ttl::Seconds(3600)))
                        .expect("Failed to create item");
                pool.save_deferred(item).expect("Failed to defer");
            }
            black_box(pool.commit().expect("Failed to commit"))
        })
    });
    group.finish();
}

fn bench_memory(c: &mut Criterion) {
    bench_pool(c, "memory", MemoryBackend::new());
}

#[cfg(feature = "file")]
fn bench_file(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let backend = pool_cache::backend::FileBackend::new(Some(dir.path().to_path_buf()))
        .expect("Failed to open backend");
    bench_pool(c, "file", backend);
}

#[cfg(not(feature = "file"))]
fn bench_file(_c: &mut Criterion) {}

#[cfg(feature = "sqlite")]
fn bench_sqlite(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let backend = pool_cache::backend::SqliteBackend::open(dir.path().join("bench.db"))
        .expect("Failed to open backend");
    bench_pool(c, "sqlite", backend);
}

#[cfg(not(feature = "sqlite"))]
fn bench_sqlite(_c: &mut Criterion) {}

fn bench_envelope(c: &mut Criterion) {
    let item = CacheItem::with_ttl("bench:envelope", vec![7u8; 1024], Some(Ttl::Seconds(60)))
        .expect("Failed to create item");
    let encoded = encode_item(&item).expect("Failed to encode");

    let mut group = configure(c, "envelope");
    group.bench_function("encode_1k", |b| {
        b.iter(|| black_box(encode_item(black_box(&item)).expect("Failed to encode")))
    });
    group.bench_function("decode_1k", |b| {
        b.iter(|| {
            black_box(decode_item("bench:envelope", black_box(&encoded)).expect("Failed to decode"))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_memory, bench_file, bench_sqlite, bench_envelope);
criterion_main!(benches);
