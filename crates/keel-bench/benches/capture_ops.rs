//! Criterion benchmarks for capture under both scheduling strategies.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use keel_bench::reference_profile;
use keel_engine::{EngineConfig, SchedulingStrategy, SnapshotEngine};

fn engine(strategy: SchedulingStrategy, workers: usize) -> SnapshotEngine {
    SnapshotEngine::new(EngineConfig {
        strategy,
        worker_count: Some(workers),
    })
    .unwrap()
}

/// Benchmark: capture 10K records into a warm container.
fn bench_capture_10k(c: &mut Criterion) {
    let profile = reference_profile(42);
    let inputs = profile.capture_inputs();
    let mut group = c.benchmark_group("capture_10k");

    for strategy in [SchedulingStrategy::PerField, SchedulingStrategy::Grouped] {
        for workers in [1, 4] {
            let engine = engine(strategy, workers);
            let mut container = profile.container();
            engine.capture_groups(&mut container, &inputs);
            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), workers),
                &workers,
                |b, _| {
                    b.iter(|| {
                        let stats = engine.capture_groups(&mut container, &inputs);
                        std::hint::black_box(stats);
                    });
                },
            );
        }
    }
    group.finish();
}

/// Benchmark: first capture into a zeroed container, every slot changes.
fn bench_capture_cold_10k(c: &mut Criterion) {
    let profile = reference_profile(42);
    let inputs = profile.capture_inputs();
    let engine = engine(SchedulingStrategy::Grouped, 4);

    c.bench_function("capture_cold_10k", |b| {
        b.iter_batched(
            || profile.container(),
            |mut container| {
                let stats = engine.capture_groups(&mut container, &inputs);
                std::hint::black_box((stats, container));
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_capture_10k, bench_capture_cold_10k);
criterion_main!(benches);
