//! Proptest strategies for battle testing.
//!
//! These strategies generate random but reproducible layouts and command
//! streams for property-based testing of the engine's invariants.

use proptest::prelude::*;
use raid_core::prelude::*;

use crate::fixtures::{BREAKER, BRAWLER, CANNON, RUNNER, STORAGE, TOWER, TOWN_HALL};

/// Building type ids used by generated layouts.
pub const BUILDING_TYPES: [i32; 4] = [CANNON, TOWN_HALL, STORAGE, TOWER];

/// Generate a tile coordinate on a 64x64 map.
pub fn arb_tile() -> impl Strategy<Value = i32> {
    0i32..64
}

/// Generate a tick within preparation plus attack time and a bit beyond.
pub fn arb_tick() -> impl Strategy<Value = i32> {
    0i32..(63 * 240)
}

/// Generate building hitpoints (1-5000).
pub fn arb_hitpoints() -> impl Strategy<Value = i32> {
    1i32..5000
}

/// Generate a layout of `1..max_buildings` buildings with instance ids
/// `500_000_000 + index`.
pub fn arb_layout(max_buildings: usize) -> impl Strategy<Value = BattleLayout> {
    proptest::collection::vec(
        (
            proptest::sample::select(BUILDING_TYPES.to_vec()),
            arb_hitpoints(),
            arb_tile(),
            arb_tile(),
        ),
        1..max_buildings.max(2),
    )
    .prop_map(|specs| {
        let buildings = specs.into_iter().enumerate().filter_map(|(i, (data, hp, x, y))| {
            let instance_id = 500_000_000 + i32::try_from(i).ok()?;
            BuildingDefinition::new(instance_id, data, hp, data == TOWN_HALL, x, y).ok()
        });
        BattleLayout::new(buildings.collect::<Vec<_>>())
            .expect("generated layouts always have a building")
    })
}

/// Generate a destroy-by-instance command aimed at the first
/// `building_count` generated instance ids, plus a few misses.
pub fn arb_instance_command(building_count: usize) -> impl Strategy<Value = BattleCommand> {
    let upper = i32::try_from(building_count).unwrap_or(i32::MAX).saturating_add(3);
    (arb_tick(), 0..upper).prop_map(|(tick, offset)| {
        BattleCommand::new(tick, 500_000_000 + offset, 0, 0)
    })
}

/// Generate a destroy-by-type command.
pub fn arb_type_command() -> impl Strategy<Value = BattleCommand> {
    (
        arb_tick(),
        proptest::sample::select(BUILDING_TYPES.to_vec()),
        arb_tile(),
        arb_tile(),
    )
        .prop_map(|(tick, data, x, y)| BattleCommand::new(tick, data, x, y))
}

/// Generate a troop spawn, including a type with no stats.
pub fn arb_spawn_command() -> impl Strategy<Value = BattleCommand> {
    (
        arb_tick(),
        proptest::sample::select(vec![BRAWLER, BREAKER, RUNNER, 4_000_099]),
        arb_tile(),
        arb_tile(),
    )
        .prop_map(|(tick, data, x, y)| BattleCommand::new(tick, data, x, y))
}

/// Generate a command the engine ignores: non-positive ids and ids whose
/// class is none of the handled ones.
pub fn arb_ignored_command() -> impl Strategy<Value = BattleCommand> {
    let data_id = prop_oneof![
        i32::MIN..=0,
        2_000_000i32..4_000_000,
        5_000_000i32..500_000_000,
        501_000_000i32..=i32::MAX,
    ];
    (arb_tick(), data_id, arb_tile(), arb_tile())
        .prop_map(|(tick, data, x, y)| BattleCommand::new(tick, data, x, y))
}

/// Generate any command.
pub fn arb_command(building_count: usize) -> impl Strategy<Value = BattleCommand> {
    prop_oneof![
        3 => arb_instance_command(building_count),
        3 => arb_type_command(),
        2 => arb_spawn_command(),
        1 => arb_ignored_command(),
    ]
}

/// Generate a command stream of up to `max_len` commands.
pub fn arb_command_sequence(
    building_count: usize,
    max_len: usize,
) -> impl Strategy<Value = Vec<BattleCommand>> {
    proptest::collection::vec(arb_command(building_count), 0..max_len)
}

/// Generate a valid battle config.
pub fn arb_config() -> impl Strategy<Value = BattleConfig> {
    (0.0f64..60.0, 0.0f64..240.0, prop_oneof![Just(0.25), 0.05f64..1.0])
        .prop_map(|(prep, attack, resolution)| {
            BattleConfig::default()
                .with_preparation_time(prep)
                .with_attack_time(attack)
                .with_tick_resolution(resolution)
        })
}

/// Generate a layout together with a command stream aimed at it.
pub fn arb_battle(
    max_buildings: usize,
    max_commands: usize,
) -> impl Strategy<Value = (BattleLayout, Vec<BattleCommand>)> {
    arb_layout(max_buildings).prop_flat_map(move |layout| {
        let count = layout.len();
        (Just(layout), arb_command_sequence(count, max_commands))
    })
}
