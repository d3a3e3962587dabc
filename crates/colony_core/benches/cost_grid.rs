//! Cost grid and admission benchmarks for colony_core.
//!
//! Run with: `cargo bench -p colony_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use colony_core::costgrid::{compute_cost_grid, CostMatrixCache, CostProfile, Hazard};
use colony_core::diagnostics::Diagnostics;
use colony_core::math::GridPos;
use colony_test_utils::determinism::ColonyHarness;
use colony_test_utils::fixtures::{hazard_layout, mixed_layout};

/// Grid computation from scratch and through a warm cache.
pub fn cost_grid_benchmark(c: &mut Criterion) {
    let profile = CostProfile::default();
    let mixed = mixed_layout("W1N1");
    let mut hazards = hazard_layout("W1N1", GridPos::new(25, 25), 8);
    hazards.hazards.extend([
        Hazard { pos: GridPos::new(5, 40), radius: 6 },
        Hazard { pos: GridPos::new(44, 8), radius: 6 },
    ]);

    c.bench_function("compute_mixed", |b| {
        b.iter(|| compute_cost_grid(black_box(&mixed), &profile, 0, &mut Diagnostics::new()))
    });

    c.bench_function("compute_hazards", |b| {
        b.iter(|| compute_cost_grid(black_box(&hazards), &profile, 0, &mut Diagnostics::new()))
    });

    let mut cache = CostMatrixCache::new(profile.clone());
    let mut diagnostics = Diagnostics::new();
    cache.get_or_compute(&hazards, 0, &mut diagnostics);
    c.bench_function("cache_hit", |b| {
        b.iter(|| black_box(cache.get_or_compute(&hazards, 1, &mut diagnostics).token()))
    });
}

/// One hundred ticks of the sample colony.
pub fn colony_tick_benchmark(c: &mut Criterion) {
    c.bench_function("sample_colony_100_ticks", |b| {
        b.iter(|| {
            let mut harness = ColonyHarness::sample();
            for _ in 0..100 {
                harness.tick();
            }
            black_box(harness.store.unit_count())
        })
    });
}

criterion_group!(benches, cost_grid_benchmark, colony_tick_benchmark);
criterion_main!(benches);
