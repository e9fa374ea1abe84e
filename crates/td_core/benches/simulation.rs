//! Simulation benchmarks for td_core.
//!
//! Run with: `cargo bench -p td_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use td_core::prelude::*;

fn runner(waves: u32) -> SimulationRunner {
    let config = SimulationConfig::default()
        .with_starting_money(1000)
        .with_max_waves(waves)
        .with_fast_mode(true);
    SimulationRunner::new(
        config,
        BuildingCatalog::builtin(),
        EnemyCatalog::builtin(),
        PlacementConfig::default(),
    )
    .expect("default config is valid")
}

/// Full runs of increasing length.
pub fn simulation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");
    for waves in [1_u32, 5, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(waves), &waves, |b, &waves| {
            let mut runner = runner(waves);
            b.iter(|| black_box(runner.run()));
        });
    }
    group.finish();
}

/// Wave scaling lookups.
pub fn scaling_benchmark(c: &mut Criterion) {
    let enemies = EnemyCatalog::builtin();
    c.bench_function("scaled_stats_for_wave", |b| {
        b.iter(|| {
            for wave in 1..=20 {
                black_box(enemies.scaled_stats_for_wave(black_box("tank"), wave).ok());
            }
        });
    });
}

criterion_group!(benches, simulation_benchmark, scaling_benchmark);
criterion_main!(benches);
