//! Battle resolution benchmarks for raid_core.
//!
//! Run with: `cargo bench -p raid_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use raid_core::prelude::*;
use raid_test_utils::fixtures::{
    building, sample_commands, simulator, village_layout, BRAWLER, BREAKER, CANNON, TOWN_HALL,
};

fn grid_layout(side: i32) -> Arc<BattleLayout> {
    let buildings = (0..side * side).map(|i| {
        let data_id = if i == 0 { TOWN_HALL } else { CANNON };
        building(500_000_000 + i, data_id, 400, i == 0, (i % side) * 3, (i / side) * 3)
    });
    Arc::new(BattleLayout::new(buildings.collect::<Vec<_>>()).expect("grid is never empty"))
}

/// Runs battle benchmarks for the raid_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    let village = simulator(village_layout());
    let commands = sample_commands();
    c.bench_function("destroy_only_village", |b| {
        b.iter(|| black_box(village.run(black_box(&commands))));
    });

    let mut group = c.benchmark_group("troop_battle");
    for side in [4, 8, 16] {
        let sim = simulator(grid_layout(side));
        let troops: Vec<_> = (0..10)
            .map(|i| BattleCommand::new(i * 63, if i % 2 == 0 { BRAWLER } else { BREAKER }, i, 0))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &troops, |b, troops| {
            b.iter(|| black_box(sim.run(black_box(troops))));
        });
    }
    group.finish();
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
