//! Throughput Benchmark for TallyKV
//!
//! This benchmark measures the storage engine and the request parser
//! under various workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use tallykv::protocol::{Request, RequestParser, Resource};
use tallykv::storage::StorageEngine;

/// Benchmark value inserts
fn bench_insert(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            black_box(engine.insert_value(key, Bytes::from("small_value")).is_ok());
            i += 1;
        });
    });

    group.bench_function("insert_large", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(64 * 1024)); // 64KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            black_box(engine.insert_value(key, value.clone()).is_ok());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark value reads, with and without a read counter attached
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        let _ = engine.insert_value(key, value);
    }

    let limited = Bytes::from("limited");
    let _ = engine.insert_value(limited.clone(), Bytes::from("value"));
    let _ = engine.insert_counter(&limited, u64::MAX);

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_unlimited", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(engine.get_value(&key));
            i += 1;
        });
    });

    group.bench_function("get_counted", |b| {
        b.iter(|| {
            black_box(engine.get_value(&limited));
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(engine.get_value(&key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent reads draining one shared counter
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_drain_counter", |b| {
        b.iter(|| {
            let engine = Arc::new(StorageEngine::new());
            let key = Bytes::from("shared");
            let _ = engine.insert_value(key.clone(), Bytes::from("value"));
            let _ = engine.insert_counter(&key, 40_000);

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let engine = Arc::clone(&engine);
                    let key = key.clone();
                    thread::spawn(move || {
                        for _ in 0..10_000 {
                            engine.get_value(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

/// Benchmark request framing
fn bench_parse(c: &mut Criterion) {
    let get = Request::get(Resource::Key(Bytes::from("user:101"))).serialize();
    let post = Request::post(
        Resource::Key(Bytes::from("user:101")),
        Bytes::from("x".repeat(1024)),
    )
    .serialize();
    let pipeline: Vec<u8> = (0..100).flat_map(|_| get.iter().copied()).collect();

    let mut group = c.benchmark_group("parse");

    group.throughput(Throughput::Elements(1));
    group.bench_function("parse_get", |b| {
        let mut parser = RequestParser::new();
        b.iter(|| black_box(parser.parse(&get).unwrap()));
    });

    group.bench_function("parse_post_1kb", |b| {
        let mut parser = RequestParser::new();
        b.iter(|| black_box(parser.parse(&post).unwrap()));
    });

    group.throughput(Throughput::Elements(100));
    group.bench_function("parse_pipeline_100", |b| {
        let mut parser = RequestParser::new();
        b.iter(|| {
            let mut offset = 0;
            while let Some((request, consumed)) = parser.parse(&pipeline[offset..]).unwrap() {
                black_box(request);
                offset += consumed;
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_concurrent, bench_parse);

criterion_main!(benches);
