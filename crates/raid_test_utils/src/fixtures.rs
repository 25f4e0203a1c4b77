//! Test fixtures and helpers.
//!
//! Pre-built layouts, stats tables and simulators for consistent testing.

use std::sync::Arc;

use raid_core::prelude::*;

/// Data id of the plain building used across fixtures.
pub const CANNON: i32 = 1_000_000;
/// Data id of the town hall.
pub const TOWN_HALL: i32 = 1_000_001;
/// Data id of a third building type.
pub const STORAGE: i32 = 1_000_002;
/// Data id of a defence that some troops prefer.
pub const TOWER: i32 = 1_000_008;

/// Basic melee troop.
pub const BRAWLER: i32 = 4_000_000;
/// Slow troop preferring [`TOWER`].
pub const BREAKER: i32 = 4_000_001;
/// Fast, hard-hitting troop used for travel-time checks.
pub const RUNNER: i32 = 4_000_010;

/// Create a building definition.
///
/// # Panics
///
/// Panics on invalid values; fixtures are expected to be valid.
#[must_use]
pub fn building(
    instance_id: i32,
    data_id: i32,
    hitpoints: i32,
    is_town_hall: bool,
    x: i32,
    y: i32,
) -> BuildingDefinition {
    BuildingDefinition::new(instance_id, data_id, hitpoints, is_town_hall, x, y)
        .expect("fixture building must be valid")
}

/// One plain building: 1000 hp, instance `500_000_001`.
#[must_use]
pub fn single_building_layout() -> Arc<BattleLayout> {
    layout(vec![building(500_000_001, CANNON, 1000, false, 10, 10)])
}

/// [`single_building_layout`] plus a 2000 hp town hall, instance `500_000_002`.
#[must_use]
pub fn town_hall_layout() -> Arc<BattleLayout> {
    layout(vec![
        building(500_000_001, CANNON, 1000, false, 10, 10),
        building(500_000_002, TOWN_HALL, 2000, true, 20, 20),
    ])
}

/// A small village matching [`sample_commands`]. 6200 hp in total.
#[must_use]
pub fn village_layout() -> Arc<BattleLayout> {
    layout(vec![
        building(500_000_001, TOWN_HALL, 2400, true, 50, 40),
        building(500_000_002, CANNON, 800, false, 40, 42),
        building(500_000_003, CANNON, 800, false, 60, 30),
        building(500_000_004, STORAGE, 600, false, 47, 49),
        building(500_000_005, STORAGE, 600, false, 30, 55),
        building(500_000_006, TOWER, 1000, false, 20, 20),
    ])
}

/// Descriptors for [`village_layout`], without instance ids.
#[must_use]
pub fn village_descriptors() -> Vec<BuildingDescriptor> {
    village_layout()
        .buildings()
        .iter()
        .map(|b| BuildingDescriptor::new(b.data_id(), 1, b.x(), b.y()))
        .collect()
}

/// The built-in demo command sequence.
#[must_use]
pub fn sample_commands() -> Vec<BattleCommand> {
    vec![
        BattleCommand::new(63, TOWN_HALL, 56, 38),
        BattleCommand::new(126, STORAGE, 47, 49),
        BattleCommand::new(189, CANNON, 40, 42),
        BattleCommand::new(252, 500_000_001, 50, 40),
    ]
}

/// Stats for every fixture building and troop.
///
/// # Panics
///
/// Panics if the fixture troop stats are invalid.
#[must_use]
pub fn sample_stats() -> StatsTable {
    StatsTable::new()
        .with_building(CANNON, 800, false)
        .with_building(TOWN_HALL, 2400, true)
        .with_building(STORAGE, 600, false)
        .with_building(TOWER, 1000, false)
        .with_troop(brawler())
        .with_troop(breaker())
        .with_troop(runner())
}

/// 45 hp, 8 dps, 2 tiles/s, range 0.4.
#[must_use]
pub fn brawler() -> TroopStats {
    troop(BRAWLER, 45.0, 8.0, 2.0, 0.4, &[], 1.0)
}

/// 300 hp, 30 dps, 1.5 tiles/s, range 1, triple damage against towers.
#[must_use]
pub fn breaker() -> TroopStats {
    troop(BREAKER, 300.0, 30.0, 1.5, 1.0, &[TOWER], 3.0)
}

/// 100 hp, 500 dps, 10 tiles/s, range 1.
#[must_use]
pub fn runner() -> TroopStats {
    troop(RUNNER, 100.0, 500.0, 10.0, 1.0, &[], 1.0)
}

fn troop(
    data_id: i32,
    hitpoints: f64,
    dps: f64,
    speed: f64,
    range: f64,
    preferred: &[i32],
    multiplier: f64,
) -> TroopStats {
    TroopStats::new(
        data_id,
        hitpoints,
        dps,
        speed,
        range,
        false,
        preferred.iter().copied(),
        multiplier,
    )
    .expect("fixture troop must be valid")
}

/// Share a stats table as a troop-stats source.
#[must_use]
pub fn shared_troops(stats: StatsTable) -> SharedTroopStats {
    Arc::new(stats)
}

/// Simulator over `layout` with default config and [`sample_stats`] troops.
///
/// # Panics
///
/// Panics if the default config is rejected.
#[must_use]
pub fn simulator(layout: Arc<BattleLayout>) -> BattleSimulator {
    simulator_with(layout, BattleConfig::default())
}

/// Simulator over `layout` with `config` and [`sample_stats`] troops.
///
/// # Panics
///
/// Panics if `config` is rejected.
#[must_use]
pub fn simulator_with(layout: Arc<BattleLayout>, config: BattleConfig) -> BattleSimulator {
    BattleSimulator::new(layout, config)
        .expect("fixture config must be valid")
        .with_troop_stats(shared_troops(sample_stats()))
}

fn layout(buildings: Vec<BuildingDefinition>) -> Arc<BattleLayout> {
    Arc::new(BattleLayout::new(buildings).expect("fixture layout must not be empty"))
}
