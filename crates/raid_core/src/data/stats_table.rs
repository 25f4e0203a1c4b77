//! In-memory stats lookup built from a stats file.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BuildingData, TroopData};
use crate::error::{GameError, Result};
use crate::layout::{BuildingStats, BuildingStatsProvider};
use crate::troops::{TroopStats, TroopStatsProvider};

/// Raw contents of a stats file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsFile {
    /// Building types.
    pub buildings: Vec<BuildingData>,
    /// Troop types.
    #[serde(default)]
    pub troops: Vec<TroopData>,
}

/// Building and troop stats keyed by data id.
///
/// Implements both [`BuildingStatsProvider`] and [`TroopStatsProvider`], so
/// one table can drive layout construction and troop spawning.
#[derive(Debug, Clone, Default)]
pub struct StatsTable {
    buildings: HashMap<i32, BuildingData>,
    troops: HashMap<i32, Arc<TroopStats>>,
}

impl StatsTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from parsed file contents.
    ///
    /// Later entries for the same data id replace earlier ones.
    ///
    /// # Errors
    ///
    /// Fails if no building entry has a positive data id, or if a troop
    /// entry has invalid values.
    pub fn from_file(file: StatsFile) -> Result<Self> {
        let mut table = Self::new();

        for building in file.buildings {
            if building.data_id > 0 {
                table.insert_building(building);
            }
        }

        if table.buildings.is_empty() {
            return Err(GameError::InvalidConfig(
                "stats file did not contain any valid building entries".to_string(),
            ));
        }

        for troop in &file.troops {
            if let Some(stats) = troop.to_stats()? {
                table.insert_troop(stats);
            }
        }

        debug!(
            buildings = table.buildings.len(),
            troops = table.troops.len(),
            "Loaded stats table"
        );
        Ok(table)
    }

    /// Add or replace a building entry.
    pub fn insert_building(&mut self, data: BuildingData) {
        self.buildings.insert(data.data_id, data);
    }

    /// Add or replace troop stats.
    pub fn insert_troop(&mut self, stats: TroopStats) {
        self.troops.insert(stats.data_id(), Arc::new(stats));
    }

    /// Builder method adding a building with one hitpoint value for all levels.
    #[must_use]
    pub fn with_building(mut self, data_id: i32, hitpoints: i32, is_town_hall: bool) -> Self {
        self.insert_building(BuildingData::with_default(data_id, hitpoints, is_town_hall));
        self
    }

    /// Builder method adding troop stats.
    #[must_use]
    pub fn with_troop(mut self, stats: TroopStats) -> Self {
        self.insert_troop(stats);
        self
    }

    /// Number of building types.
    #[must_use]
    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    /// Number of troop types.
    #[must_use]
    pub fn troop_count(&self) -> usize {
        self.troops.len()
    }
}

impl BuildingStatsProvider for StatsTable {
    fn building_stats(&self, data_id: i32, level: i32) -> Result<BuildingStats> {
        self.buildings
            .get(&data_id)
            .ok_or(GameError::StatsNotFound { data_id, level })?
            .stats_at(level)
    }
}

impl TroopStatsProvider for StatsTable {
    fn troop_stats(&self, data_id: i32) -> Option<Arc<TroopStats>> {
        self.troops.get(&data_id).cloned()
    }
}
