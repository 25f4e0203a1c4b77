//! Batch runner tests for raid_headless.
//!
//! Every test writes its battle inputs to a temporary directory and loads
//! them back through the same loaders the CLI uses.

use std::fs;
use std::path::Path;

use raid_core::prelude::*;
use raid_headless::batch::{run_batch, verify_determinism, BatchInputs};
use raid_headless::loader::{save_commands, LayoutFile};
use raid_headless::{BatchConfig, BatchResults, LoadError};
use raid_test_utils::fixtures::{sample_commands, village_layout};

const STATS: &str = r#"{
    "buildings": [
        {"dataId": 1000000, "defaultHitpoints": 800},
        {"dataId": 1000001, "isTownHall": true, "hitpoints": [2400]},
        {"dataId": 1000002, "hitpoints": {"1": 600}},
        {"dataId": 1000008, "hitpoints": [1000]}
    ],
    "troops": [
        {"dataId": 4000000, "hitpoints": 45, "damagePerSecond": 8,
         "moveSpeed": 2, "attackRange": 0.4}
    ]
}"#;

/// Write the fixture village, its stats and the sample attack into `dir`.
fn write_inputs(dir: &Path, game_count: u32) -> BatchConfig {
    let layout = LayoutFile {
        buildings: village_layout()
            .buildings()
            .iter()
            .map(|b| {
                BuildingDescriptor::new(b.data_id(), 1, b.x(), b.y())
                    .with_instance_id(b.instance_id())
            })
            .collect(),
    };

    let layout_path = dir.join("village.json");
    let stats_path = dir.join("stats.json");
    let commands_path = dir.join("attack.json");
    fs::write(&layout_path, serde_json::to_string(&layout).unwrap()).unwrap();
    fs::write(&stats_path, STATS).unwrap();
    save_commands(&commands_path, &sample_commands()).unwrap();

    BatchConfig::new(layout_path, stats_path, game_count).with_commands(commands_path)
}

// =============================================================================
// Loading
// =============================================================================

mod loading {
    use super::*;

    #[test]
    fn test_inputs_rebuild_the_village() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = BatchInputs::load(&write_inputs(dir.path(), 1)).unwrap();

        assert_eq!(inputs.simulator.layout(), village_layout().as_ref());
        assert_eq!(inputs.commands, sample_commands());
        assert!(inputs.simulator.troop_stats().troop_stats(4_000_000).is_some());
    }

    #[test]
    fn test_missing_layout_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path(), 1);
        config.layout = dir.path().join("nowhere.json");

        assert!(matches!(run_batch(config), Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_battle_config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let ron_path = dir.path().join("battle.ron");
        fs::write(&ron_path, "(preparation_time: 0.0)").unwrap();
        let config = write_inputs(dir.path(), 2).with_battle_config(ron_path);

        let results = run_batch(config).unwrap();
        // One second of attack time per command
        assert_eq!(results.games[0].result.battle_time, 4);
        assert_eq!(results.games[0].result.attack_time_remaining, 176.0);
    }

    #[test]
    fn test_invalid_battle_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ron_path = dir.path().join("battle.ron");
        fs::write(&ron_path, "(attack_time: -5.0)").unwrap();
        let config = write_inputs(dir.path(), 2).with_battle_config(ron_path);

        assert!(matches!(run_batch(config), Err(LoadError::Game(_))));
    }
}

// =============================================================================
// Batch runs
// =============================================================================

mod runs {
    use super::*;

    #[test]
    fn test_unshuffled_games_all_match() {
        let dir = tempfile::tempdir().unwrap();
        let results = run_batch(write_inputs(dir.path(), 8)).unwrap();

        assert_eq!(results.games.len(), 8);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 8);
        assert_eq!(results.summary.distinct_results, 1);
        assert_eq!(results.summary.star_histogram, [0, 0, 8, 0]);
        assert!((results.summary.mean_destruction - 61.0).abs() < 1e-9);
        assert!((results.summary.town_hall_rate - 1.0).abs() < 1e-9);
        for (i, game) in results.games.iter().enumerate() {
            assert_eq!(game.game_index as usize, i);
            assert_eq!(game.commands, sample_commands());
        }
    }

    #[test]
    fn test_shuffled_games_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path(), 12).with_shuffle(true).with_seed(100);

        let first = run_batch(config.clone()).unwrap();
        let second = run_batch(config).unwrap();

        assert_eq!(first.games.len(), 12);
        for (a, b) in first.games.iter().zip(&second.games) {
            assert_eq!(a.seed, 100 + u64::from(a.game_index));
            assert_eq!(a.commands, b.commands);
            assert_eq!(a.result, b.result);
        }
        assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn test_shuffled_games_keep_every_command() {
        let dir = tempfile::tempdir().unwrap();
        let results = run_batch(write_inputs(dir.path(), 6).with_shuffle(true)).unwrap();

        let mut expected: Vec<_> = sample_commands().iter().map(|c| c.data_id).collect();
        expected.sort_unstable();
        for game in &results.games {
            let mut ids: Vec<_> = game.commands.iter().map(|c| c.data_id).collect();
            ids.sort_unstable();
            assert_eq!(ids, expected);
            assert!(game.result.stars <= 3);
        }
    }

    #[test]
    fn test_replays_are_recorded_and_match() {
        let dir = tempfile::tempdir().unwrap();
        let results = run_batch(write_inputs(dir.path(), 3).with_replays(true)).unwrap();

        assert!(results.errors.is_empty());
        for game in &results.games {
            let replay = game.replay.as_ref().unwrap();
            assert_eq!(replay.label, "village");
            assert_eq!(replay.result, game.result);
            assert_eq!(replay.commands, game.commands);
        }
    }

    #[test]
    fn test_empty_attack() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path(), 2);
        config.commands = None;

        let results = run_batch(config).unwrap();
        assert_eq!(results.summary.max_destruction, 0);
        assert_eq!(results.summary.star_histogram, [2, 0, 0, 0]);
    }

    #[test]
    fn test_zero_games() {
        let dir = tempfile::tempdir().unwrap();
        let results = run_batch(write_inputs(dir.path(), 0)).unwrap();
        assert!(results.games.is_empty());
        assert_eq!(results.summary.total_games, 0);
        assert!(results.best_game().is_none());
    }
}

// =============================================================================
// Results files and verification
// =============================================================================

mod results {
    use super::*;

    #[test]
    fn test_results_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let results = run_batch(write_inputs(dir.path(), 5).with_replays(true)).unwrap();

        let path = dir.path().join("out").join("batch.json");
        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games.len(), 5);
        assert_eq!(loaded.summary, results.summary);
        assert_eq!(loaded.config.game_count, 5);
        assert!(loaded.games[0].replay.is_some());
    }

    #[test]
    fn test_best_game_prefers_earliest_on_ties() {
        let dir = tempfile::tempdir().unwrap();
        let results = run_batch(write_inputs(dir.path(), 4)).unwrap();
        assert_eq!(results.best_game().unwrap().game_index, 0);
    }

    #[test]
    fn test_verify_determinism_with_troops() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = BatchInputs::load(&write_inputs(dir.path(), 1)).unwrap();
        let mut commands = inputs.commands.clone();
        commands.push(BattleCommand::new(0, 4_000_000, 25, 25));
        commands.push(BattleCommand::new(2000, 4_000_000, 62, 28));

        assert!(verify_determinism(&inputs.simulator, &commands, 16));
        assert!(verify_determinism(&inputs.simulator, &commands, 0));
    }
}
