//! Battle input loading.
//!
//! Reads the JSON files a battle is described by (defender layout, stats
//! table, attack commands) and the optional RON battle config.
//!
//! ```text
//! layout.json    {"buildings": [{"data": 1000001, "lvl": 3, "id": 500000001, "x": 20, "y": 20}]}
//! stats.json     {"buildings": [...], "troops": [...]}
//! commands.json  [{"tick": 63, "dataId": 1000001, "x": 56, "y": 38}]
//! config.ron     (preparation_time: 30.0, attack_time: 180.0, tick_resolution_seconds: 0.25)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use raid_core::prelude::*;
use std::result::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading battle inputs.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to read the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed RON.
    #[error("Invalid RON: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// The contents parsed but were rejected by the engine.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// On-disk shape of a defender layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFile {
    /// Buildings in layout order.
    #[serde(default)]
    pub buildings: Vec<BuildingDescriptor>,
}

fn read_source(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

/// Parse a stats table from JSON text.
pub fn parse_stats(json: &str) -> Result<StatsTable, LoadError> {
    let file: StatsFile = serde_json::from_str(json)?;
    Ok(StatsTable::from_file(file)?)
}

/// Load a stats table from a JSON file.
pub fn load_stats(path: &Path) -> Result<StatsTable, LoadError> {
    let table = parse_stats(&read_source(path)?)?;
    debug!(
        path = %path.display(),
        buildings = table.building_count(),
        troops = table.troop_count(),
        "Loaded stats"
    );
    Ok(table)
}

/// Parse a layout from JSON text, resolving hitpoints through `stats`.
pub fn parse_layout<P>(json: &str, stats: &P) -> Result<BattleLayout, LoadError>
where
    P: BuildingStatsProvider + ?Sized,
{
    let file: LayoutFile = serde_json::from_str(json)?;
    Ok(BattleLayout::from_descriptors(&file.buildings, stats)?)
}

/// Load a layout from a JSON file.
pub fn load_layout<P>(path: &Path, stats: &P) -> Result<BattleLayout, LoadError>
where
    P: BuildingStatsProvider + ?Sized,
{
    let layout = parse_layout(&read_source(path)?, stats)?;
    debug!(path = %path.display(), buildings = layout.len(), "Loaded layout");
    Ok(layout)
}

/// Parse a command list from a JSON array.
///
/// Entries that are not objects are skipped; missing fields read as 0.
pub fn parse_commands(json: &str) -> Result<Vec<BattleCommand>, LoadError> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut commands = Vec::with_capacity(entries.len());
    for entry in entries.into_iter().filter(serde_json::Value::is_object) {
        commands.push(serde_json::from_value(entry)?);
    }
    Ok(commands)
}

/// Load a command list from a JSON file.
pub fn load_commands(path: &Path) -> Result<Vec<BattleCommand>, LoadError> {
    let commands = parse_commands(&read_source(path)?)?;
    debug!(path = %path.display(), commands = commands.len(), "Loaded commands");
    Ok(commands)
}

/// Write a command list as pretty JSON.
pub fn save_commands(path: &Path, commands: &[BattleCommand]) -> Result<(), LoadError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(commands)?)?;
    Ok(())
}

/// Parse and validate a battle config from RON text.
pub fn parse_config(source: &str) -> Result<BattleConfig, LoadError> {
    let config: BattleConfig = ron::from_str(source)?;
    config.validate()?;
    Ok(config)
}

/// Load a battle config from a RON file.
pub fn load_config(path: &Path) -> Result<BattleConfig, LoadError> {
    parse_config(&read_source(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS: &str = r#"{
        "buildings": [
            {"dataId": 1000000, "hitpoints": [400, 500, 600]},
            {"dataId": 1000001, "isTownHall": true, "hitpoints": {"1": 1500, "2": 1800}},
            {"dataId": 1000002, "defaultHitpoints": 300},
            {"dataId": 0, "hitpoints": [1]}
        ],
        "troops": [
            {"dataId": 4000000, "hitpoints": 45, "damagePerSecond": 8,
             "moveSpeed": 2, "attackRange": 0.4},
            {"dataId": 4000001, "hitpoints": 0, "damagePerSecond": 8}
        ]
    }"#;

    #[test]
    fn test_parse_stats() {
        let stats = parse_stats(STATS).unwrap();
        assert_eq!(stats.building_count(), 3);
        assert_eq!(stats.troop_count(), 1);
        assert_eq!(stats.building_stats(1_000_000, 2).unwrap().hitpoints, 500);
        assert!(stats.building_stats(1_000_001, 2).unwrap().is_town_hall);
        assert_eq!(stats.building_stats(1_000_002, 9).unwrap().hitpoints, 300);
    }

    #[test]
    fn test_stats_without_buildings_is_rejected() {
        let err = parse_stats(r#"{"buildings": [{"dataId": -1}]}"#).unwrap_err();
        assert!(matches!(err, LoadError::Game(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_layout() {
        let stats = parse_stats(STATS).unwrap();
        let layout = parse_layout(
            r#"{"buildings": [
                {"data": 1000001, "lvl": 2, "id": 500000010, "x": 20, "y": 20},
                {"data": 1000000, "lvl": 3, "x": 10, "y": 12}
            ]}"#,
            &stats,
        )
        .unwrap();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.total_hitpoints(), 2400);
        assert_eq!(layout.buildings()[0].instance_id(), 500_000_010);
        assert_eq!(layout.buildings()[1].instance_id(), 500_000_000);
    }

    #[test]
    fn test_layout_with_unknown_level_fails() {
        let stats = parse_stats(STATS).unwrap();
        let err = parse_layout(r#"{"buildings": [{"data": 1000000, "lvl": 7}]}"#, &stats)
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Game(GameError::StatsNotFound {
                data_id: 1_000_000,
                level: 7
            })
        ));
    }

    #[test]
    fn test_parse_commands_defaults_and_skips() {
        let commands =
            parse_commands(r#"[{"tick": 63, "dataId": 1000001, "x": 5}, 17, {"dataId": 4}]"#)
                .unwrap();
        assert_eq!(
            commands,
            vec![
                BattleCommand::new(63, 1_000_001, 5, 0),
                BattleCommand::new(0, 4, 0, 0)
            ]
        );
    }

    #[test]
    fn test_commands_must_be_an_array() {
        assert!(matches!(
            parse_commands(r#"{"tick": 1}"#),
            Err(LoadError::Json(_))
        ));
    }

    #[test]
    fn test_parse_config() {
        let config = parse_config("(preparation_time: 5.0, attack_time: 90.0)").unwrap();
        assert_eq!(config.preparation_time, 5.0);
        assert_eq!(config.attack_time, 90.0);
        assert_eq!(config.tick_resolution_seconds, 0.25);

        assert!(matches!(parse_config("(attack_time: "), Err(LoadError::Ron(_))));
        assert!(matches!(
            parse_config("(attack_time: -1.0)"),
            Err(LoadError::Game(GameError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_commands(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
        assert!(err.to_string().contains("here.json"));
    }

    #[test]
    fn test_commands_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("commands.json");
        let commands = vec![
            BattleCommand::new(63, 1_000_001, 56, 38),
            BattleCommand::new(126, 500_000_001, 0, 0),
        ];
        save_commands(&path, &commands).unwrap();
        assert_eq!(load_commands(&path).unwrap(), commands);
    }
}
