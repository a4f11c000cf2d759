//! Benchmarks for the atom store engine.
//!
//! Run with: cargo bench --package gtaf
//!
//! ## Benchmark Categories
//!
//! - **Append paths**: canonical (dedup-heavy and unique), temporal, batch
//! - **Projection**: single rebuild, full rebuild, streaming rebuild
//! - **Query index**: direct vs projection build, substring scan

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gtaf::{
    AppendItem, AtomClass, AtomStore, AtomValue, EntityId, ProjectionEngine, QueryIndex,
};

fn make_entity(id: u64) -> EntityId {
    EntityId::from_sequence(id)
}

/// Builds a store with `entities` entities carrying `props` string
/// properties each.
fn populate_store(entities: u64, props: u64) -> AtomStore {
    let mut store = AtomStore::new();
    store.reserve((entities * props) as usize, entities as usize);
    for e in 0..entities {
        let entity = make_entity(e + 1);
        for p in 0..props {
            store.append(
                entity,
                &format!("field{p}"),
                AtomValue::Text(format!("value-{e}-{p}")),
                AtomClass::Canonical,
            );
        }
    }
    store
}

fn bench_canonical_append_unique(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical_append");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("unique_1k", |b| {
        b.iter(|| {
            let mut store = AtomStore::new();
            for i in 0..1000u64 {
                store.append(
                    make_entity(i % 10 + 1),
                    "payload",
                    AtomValue::Text(format!("value-{i}")),
                    AtomClass::Canonical,
                );
            }
            black_box(store.get_stats())
        })
    });

    // Dedup-heavy: ten distinct values over 1000 appends.
    group.bench_function("dedup_1k", |b| {
        b.iter(|| {
            let mut store = AtomStore::new();
            for i in 0..1000u64 {
                store.append(
                    make_entity(i % 10 + 1),
                    "payload",
                    AtomValue::Text(format!("value-{}", i % 10)),
                    AtomClass::Canonical,
                );
            }
            black_box(store.get_stats())
        })
    });

    group.finish();
}

fn bench_batch_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_append");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("canonical_1k", |b| {
        b.iter_batched(
            || {
                (0..1000u64)
                    .map(|i| AppendItem {
                        entity: make_entity(i % 10 + 1),
                        tag: format!("field{}", i % 20),
                        value: AtomValue::Text(format!("value-{i}")),
                        class: AtomClass::Canonical,
                    })
                    .collect::<Vec<_>>()
            },
            |items| {
                let mut store = AtomStore::new();
                black_box(store.append_batch(items))
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_temporal_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("temporal_append");

    // 5000 samples at the default threshold seals four chunks.
    group.throughput(Throughput::Elements(5000));
    group.bench_function("with_sealing_5k", |b| {
        b.iter(|| {
            let mut store = AtomStore::new();
            let entity = make_entity(1);
            for i in 0..5000 {
                store.append(
                    entity,
                    "sensor.temperature",
                    AtomValue::Float(20.0 + i as f64),
                    AtomClass::Temporal,
                );
            }
            black_box(store.query_temporal_all(entity, "sensor.temperature").total_count)
        })
    });

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let store = populate_store(1000, 10);
    let mut group = c.benchmark_group("projection");

    group.bench_function("rebuild_one", |b| {
        let engine = ProjectionEngine::new(&store);
        b.iter(|| black_box(engine.rebuild(make_entity(500))))
    });

    group.bench_function("rebuild_all_1k_entities", |b| {
        let engine = ProjectionEngine::new(&store);
        b.iter(|| black_box(engine.rebuild_all().len()))
    });

    group.bench_function("rebuild_all_streaming_1k_entities", |b| {
        let engine = ProjectionEngine::new(&store);
        b.iter(|| {
            let mut count = 0usize;
            engine.rebuild_all_streaming(|node| count += node.history().len());
            black_box(count)
        })
    });

    group.finish();
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");

    for entities in [100u64, 1000] {
        let store = populate_store(entities, 10);

        group.bench_with_input(
            BenchmarkId::new("direct", entities),
            &store,
            |b, store| {
                b.iter(|| {
                    let mut index = QueryIndex::from_store(store);
                    black_box(index.build_indexes(&["field0", "field1", "field2"]))
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("projection", entities),
            &store,
            |b, store| {
                b.iter(|| {
                    let engine = ProjectionEngine::new(store);
                    let mut index = QueryIndex::from_projection(&engine);
                    black_box(index.build_indexes(&["field0", "field1", "field2"]))
                })
            },
        );
    }

    group.finish();
}

fn bench_index_scan(c: &mut Criterion) {
    let store = populate_store(10_000, 3);
    let mut index = QueryIndex::from_store(&store);
    index.build_index("field0");

    let mut group = c.benchmark_group("index_scan");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("find_contains_10k", |b| {
        b.iter(|| black_box(index.find_contains("field0", "VALUE-42")))
    });

    group.bench_function("find_equals_10k", |b| {
        b.iter(|| black_box(index.find_equals("field0", "value-42-0")))
    });

    group.bench_function("find_int_where_10k", |b| {
        b.iter(|| black_box(index.find_int_where("field0", |v| v > 0)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_canonical_append_unique,
    bench_batch_append,
    bench_temporal_append,
    bench_projection,
    bench_index_build,
    bench_index_scan,
);
criterion_main!(benches);
