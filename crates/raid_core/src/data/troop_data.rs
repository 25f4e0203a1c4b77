//! Troop entries of a stats file.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::troops::TroopStats;

/// One troop type in a stats file.
///
/// Every field is optional in the file; missing numbers read as zero and a
/// missing multiplier reads as 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TroopData {
    /// Troop type id.
    #[serde(default)]
    pub data_id: i32,

    /// Starting hitpoints.
    #[serde(default)]
    pub hitpoints: f64,

    /// Damage per second.
    #[serde(default)]
    pub damage_per_second: f64,

    /// Tiles per second.
    #[serde(default)]
    pub move_speed: f64,

    /// Attack range in tiles.
    #[serde(default)]
    pub attack_range: f64,

    /// Informational.
    #[serde(default)]
    pub is_flying: bool,

    /// Building data ids this troop prefers.
    #[serde(default)]
    pub preferred_target_data_ids: Vec<i32>,

    /// Damage multiplier against preferred targets.
    #[serde(default = "default_multiplier")]
    pub preferred_target_multiplier: f64,
}

const fn default_multiplier() -> f64 {
    1.0
}

impl Default for TroopData {
    fn default() -> Self {
        Self {
            data_id: 0,
            hitpoints: 0.0,
            damage_per_second: 0.0,
            move_speed: 0.0,
            attack_range: 0.0,
            is_flying: false,
            preferred_target_data_ids: Vec::new(),
            preferred_target_multiplier: default_multiplier(),
        }
    }
}

impl TroopData {
    /// Convert to validated stats.
    ///
    /// Returns `Ok(None)` for entries a stats file is allowed to carry but
    /// that describe no usable troop (non-positive id or hitpoints). A
    /// non-positive multiplier is read as 1.0.
    ///
    /// # Errors
    ///
    /// Returns an error if the remaining values fail [`TroopStats::new`].
    pub fn to_stats(&self) -> Result<Option<TroopStats>> {
        if self.data_id <= 0 || self.hitpoints <= 0.0 {
            return Ok(None);
        }

        let multiplier = if self.preferred_target_multiplier <= 0.0 {
            1.0
        } else {
            self.preferred_target_multiplier
        };

        TroopStats::new(
            self.data_id,
            self.hitpoints,
            self.damage_per_second,
            self.move_speed,
            self.attack_range,
            self.is_flying,
            self.preferred_target_data_ids.iter().copied(),
            multiplier,
        )
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_sparse_json() {
        let data: TroopData =
            serde_json::from_str(r#"{"dataId": 4000000, "hitpoints": 45}"#).unwrap();
        assert_eq!(data.preferred_target_multiplier, 1.0);
        let stats = data.to_stats().unwrap().unwrap();
        assert_eq!(stats.damage_per_second(), 0.0);
        assert!(stats.preferred_targets().is_empty());
    }

    #[test]
    fn test_skips_unusable_entries() {
        let no_id = TroopData {
            hitpoints: 10.0,
            ..TroopData::default()
        };
        let no_hp = TroopData {
            data_id: 4_000_000,
            ..TroopData::default()
        };
        assert!(no_id.to_stats().unwrap().is_none());
        assert!(no_hp.to_stats().unwrap().is_none());
    }

    #[test]
    fn test_non_positive_multiplier_reads_as_one() {
        let data = TroopData {
            data_id: 4_000_003,
            hitpoints: 20.0,
            preferred_target_data_ids: vec![1_000_008],
            preferred_target_multiplier: -2.0,
            ..TroopData::default()
        };
        let stats = data.to_stats().unwrap().unwrap();
        assert_eq!(stats.damage_multiplier(1_000_008), 1.0);
    }

    #[test]
    fn test_negative_damage_is_rejected() {
        let data = TroopData {
            data_id: 4_000_004,
            hitpoints: 20.0,
            damage_per_second: -1.0,
            ..TroopData::default()
        };
        assert!(data.to_stats().is_err());
    }
}
