//! Criterion benchmarks for in-place resize.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use keel_bench::reference_profile;
use keel_engine::SnapshotEngine;

/// Benchmark: grow every group by half.
fn bench_resize_grow(c: &mut Criterion) {
    let profile = reference_profile(42);
    let engine = SnapshotEngine::default();
    let mut container = profile.container();
    engine.capture_groups(&mut container, &profile.capture_inputs());
    let grown: Vec<u32> = profile.record_counts().iter().map(|n| n + n / 2).collect();

    c.bench_function("resize_grow_10k", |b| {
        b.iter_batched(
            || container.clone(),
            |mut container| {
                let outcome = engine.resize(&mut container, &grown).unwrap();
                std::hint::black_box(outcome);
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: shrink the even groups and grow the odd ones in one pass.
fn bench_resize_mixed(c: &mut Criterion) {
    let profile = reference_profile(42);
    let engine = SnapshotEngine::default();
    let mut container = profile.container();
    engine.capture_groups(&mut container, &profile.capture_inputs());
    let mixed: Vec<u32> = profile
        .record_counts()
        .iter()
        .enumerate()
        .map(|(g, &n)| if g % 2 == 0 { n / 3 } else { n * 3 })
        .collect();

    c.bench_function("resize_mixed_10k", |b| {
        b.iter_batched(
            || container.clone(),
            |mut container| {
                let outcome = engine.resize(&mut container, &mixed).unwrap();
                std::hint::black_box(outcome);
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: resize to the current counts, which must not move bytes.
fn bench_resize_noop(c: &mut Criterion) {
    let profile = reference_profile(42);
    let engine = SnapshotEngine::default();
    let mut container = profile.container();
    let same = profile.record_counts();

    c.bench_function("resize_noop_10k", |b| {
        b.iter(|| {
            let outcome = engine.resize(&mut container, &same).unwrap();
            std::hint::black_box(outcome);
        });
    });
}

criterion_group!(benches, bench_resize_grow, bench_resize_mixed, bench_resize_noop);
criterion_main!(benches);
