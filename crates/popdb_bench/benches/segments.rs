//! Record store benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use popdb_core::segment::SegmentBuilder;
use popdb_core::{BackendKind, Segment};
use popdb_testkit::{canonical, child, genesis, TestStore, ALL_BACKENDS};
use serde_json::json;

/// Build a chain of `length` segments with a state payload of `size` bytes.
fn build_chain(length: usize, size: usize) -> Vec<Segment> {
    let payload = "x".repeat(size);
    let mut segments: Vec<Segment> = Vec::with_capacity(length);
    for i in 0..length {
        let segment = match segments.last() {
            None => SegmentBuilder::new("bench", "map")
                .state(json!({ "payload": payload }))
                .build()
                .unwrap(),
            Some(parent) => child(parent, &[if i % 2 == 0 { "even" } else { "odd" }]),
        };
        segments.push(segment);
    }
    segments
}

fn store_with_chain(backend: BackendKind, length: usize) -> (TestStore, Vec<Segment>) {
    let mut store = TestStore::memory(backend);
    let segments = build_chain(length, 64);
    for segment in &segments {
        store.put(segment);
    }
    (store, segments)
}

/// Benchmark genesis writes, which also record the map.
fn bench_put_genesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_genesis");

    for backend in ALL_BACKENDS {
        group.bench_function(BenchmarkId::from_parameter(backend), |b| {
            let mut store = TestStore::memory(backend);
            let mut i = 0u64;
            b.iter(|| {
                let raw = canonical(&genesis("bench", &format!("map-{i}")));
                i += 1;
                black_box(store.put_segment(black_box(&raw)).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark appending to a chain, which checks the parent first.
fn bench_put_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_chain");

    for size in [64, 1024, 4096] {
        group.throughput(Throughput::Bytes(size as u64));
        for backend in ALL_BACKENDS {
            group.bench_with_input(BenchmarkId::new(backend.as_str(), size), &size, |b, &size| {
                b.iter_with_setup(
                    || {
                        let raws: Vec<Vec<u8>> =
                            build_chain(50, size).iter().map(canonical).collect();
                        (TestStore::memory(backend), raws)
                    },
                    |(mut store, raws)| {
                        for raw in &raws {
                            store.put_segment(black_box(raw)).unwrap();
                        }
                    },
                );
            });
        }
    }

    group.finish();
}

/// Benchmark point reads by link hash.
fn bench_get_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_segment");

    for backend in ALL_BACKENDS {
        let (store, segments) = store_with_chain(backend, 1000);
        let hashes: Vec<String> = segments
            .iter()
            .map(|s| s.compute_link_hash().unwrap().to_hex())
            .collect();

        group.bench_function(BenchmarkId::from_parameter(backend), |b| {
            let mut i = 0;
            b.iter(|| {
                let hash = &hashes[i % hashes.len()];
                i += 1;
                black_box(store.get_segment(black_box(hash)).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark listing a map of increasing length.
fn bench_list_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_segments_for_map");

    for length in [10, 100, 1000] {
        group.throughput(Throughput::Elements(length as u64));
        for backend in ALL_BACKENDS {
            let (store, _) = store_with_chain(backend, length);
            group.bench_with_input(BenchmarkId::new(backend.as_str(), length), &length, |b, _| {
                b.iter(|| black_box(store.list_segments_for_map("map").unwrap()));
            });
        }
    }

    group.finish();
}

/// Benchmark a paginated filter query.
fn bench_find_segments(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_segments");

    for backend in ALL_BACKENDS {
        let (store, _) = store_with_chain(backend, 1000);
        group.bench_function(BenchmarkId::from_parameter(backend), |b| {
            b.iter(|| {
                black_box(
                    store
                        .find_segments(black_box("process=bench&offset=100&limit=20"))
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_put_genesis,
    bench_put_chain,
    bench_get_segment,
    bench_list_map,
    bench_find_segments,
);
criterion_main!(benches);
