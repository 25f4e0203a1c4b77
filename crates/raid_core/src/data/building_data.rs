//! Building entries of a stats file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::layout::BuildingStats;

/// Hitpoints per level, either as a 1-based array or a level-keyed map.
///
/// # Example JSON
///
/// ```json
/// "hitpoints": [400, 450, 500]
/// "hitpoints": { "1": 400, "2": 450, "7": 900 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HitpointTable {
    /// Index 0 holds level 1.
    ByIndex(Vec<i32>),
    /// Keys are decimal level numbers. Keys that do not parse are ignored.
    ByLevel(BTreeMap<String, i32>),
}

impl Default for HitpointTable {
    fn default() -> Self {
        Self::ByIndex(Vec::new())
    }
}

impl HitpointTable {
    /// Positive hitpoints for `level`, if the table has an entry.
    #[must_use]
    pub fn at_level(&self, level: i32) -> Option<i32> {
        let hitpoints = match self {
            Self::ByIndex(values) => {
                let index = usize::try_from(level.checked_sub(1)?).ok()?;
                values.get(index).copied()
            }
            Self::ByLevel(values) => values
                .iter()
                .find(|(key, _)| key.trim().parse::<i32>() == Ok(level))
                .map(|(_, hp)| *hp),
        }?;

        (hitpoints > 0).then_some(hitpoints)
    }
}

/// One building type in a stats file.
///
/// # Example JSON
///
/// ```json
/// { "dataId": 1000001, "isTownHall": true, "defaultHitpoints": 1500,
///   "hitpoints": [1500, 1600] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingData {
    /// Building type id. Entries with a non-positive id are ignored.
    #[serde(default)]
    pub data_id: i32,

    /// Whether this building type is the town hall.
    #[serde(default)]
    pub is_town_hall: bool,

    /// Used for levels the table does not cover.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_hitpoints: Option<i32>,

    /// Per-level hitpoints.
    #[serde(default)]
    pub hitpoints: HitpointTable,
}

impl BuildingData {
    /// Create an entry with a single fallback hitpoint value.
    #[must_use]
    pub fn with_default(data_id: i32, default_hitpoints: i32, is_town_hall: bool) -> Self {
        Self {
            data_id,
            is_town_hall,
            default_hitpoints: Some(default_hitpoints),
            hitpoints: HitpointTable::default(),
        }
    }

    /// Resolve stats for a level.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::StatsNotFound`] when the table has no positive
    /// entry for `level` and no default is set.
    pub fn stats_at(&self, level: i32) -> Result<BuildingStats> {
        self.hitpoints
            .at_level(level)
            .or(self.default_hitpoints)
            .map(|hp| BuildingStats::new(hp, self.is_town_hall))
            .ok_or(GameError::StatsNotFound {
                data_id: self.data_id,
                level,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> BuildingData {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_array_is_one_based() {
        let data = parse(r#"{"dataId": 1000000, "hitpoints": [400, 0, 500]}"#);
        assert_eq!(data.stats_at(1).unwrap().hitpoints, 400);
        assert_eq!(data.stats_at(3).unwrap().hitpoints, 500);
        // Non-positive entries behave as missing
        assert!(data.stats_at(2).is_err());
        assert!(data.stats_at(0).is_err());
        assert!(data.stats_at(4).is_err());
        assert!(data.stats_at(i32::MIN).is_err());
    }

    #[test]
    fn test_map_by_level() {
        let data = parse(
            r#"{"dataId": 1000001, "isTownHall": true,
                "hitpoints": {"1": 1500, "7": 2400, "max": 9999}}"#,
        );
        let stats = data.stats_at(7).unwrap();
        assert_eq!(stats, BuildingStats::new(2400, true));
        assert!(data.stats_at(2).is_err());
    }

    #[test]
    fn test_default_hitpoints_fallback() {
        let data = parse(r#"{"dataId": 1000002, "defaultHitpoints": 300, "hitpoints": [100]}"#);
        assert_eq!(data.stats_at(1).unwrap().hitpoints, 100);
        assert_eq!(data.stats_at(9).unwrap().hitpoints, 300);
    }

    #[test]
    fn test_missing_level_reports_pair() {
        let data = parse(r#"{"dataId": 1000003}"#);
        let err = data.stats_at(5).unwrap_err();
        assert!(matches!(
            err,
            GameError::StatsNotFound {
                data_id: 1_000_003,
                level: 5
            }
        ));
    }
}
