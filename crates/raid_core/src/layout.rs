//! Defender layouts.
//!
//! A [`BattleLayout`] is the immutable template every run starts from. It is
//! built once from saved building descriptors and a stats lookup, then shared
//! read-only (typically behind an `Arc`) by any number of runs. Runs never
//! touch it; they copy it into per-run snapshots instead.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GameError, Result};
use crate::global_id::GENERATED_INSTANCE_ID_BASE;

/// Hitpoints and town-hall flag for a building type at a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingStats {
    /// Hitpoints at this level.
    pub hitpoints: i32,
    /// Whether this building type is the town hall.
    pub is_town_hall: bool,
}

impl BuildingStats {
    /// Create new building stats.
    #[must_use]
    pub const fn new(hitpoints: i32, is_town_hall: bool) -> Self {
        Self {
            hitpoints,
            is_town_hall,
        }
    }
}

/// Source of building stats, keyed by data id and level.
pub trait BuildingStatsProvider {
    /// Look up the stats for a building type at a level.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::StatsNotFound`] when no data exists for the pair
    /// and no default hitpoints are configured.
    fn building_stats(&self, data_id: i32, level: i32) -> Result<BuildingStats>;
}

impl<F> BuildingStatsProvider for F
where
    F: Fn(i32, i32) -> Result<BuildingStats>,
{
    fn building_stats(&self, data_id: i32, level: i32) -> Result<BuildingStats> {
        self(data_id, level)
    }
}

/// A building entry as stored in a saved base.
///
/// Field names follow the save format (`data`, `lvl`, `id`, `x`, `y`);
/// missing numeric fields read as 0 and a missing `id` means the building
/// gets a generated instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildingDescriptor {
    /// Building type id.
    #[serde(rename = "data", default)]
    pub data_id: i32,
    /// Building level.
    #[serde(rename = "lvl", default)]
    pub level: i32,
    /// Instance id, if the save has one.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<i32>,
    /// Tile X coordinate.
    #[serde(default)]
    pub x: i32,
    /// Tile Y coordinate.
    #[serde(default)]
    pub y: i32,
}

impl BuildingDescriptor {
    /// Create a descriptor without an instance id.
    #[must_use]
    pub const fn new(data_id: i32, level: i32, x: i32, y: i32) -> Self {
        Self {
            data_id,
            level,
            instance_id: None,
            x,
            y,
        }
    }

    /// Builder method to set the instance id.
    #[must_use]
    pub const fn with_instance_id(mut self, instance_id: i32) -> Self {
        self.instance_id = Some(instance_id);
        self
    }
}

/// An immutable building in a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingDefinition {
    instance_id: i32,
    data_id: i32,
    hitpoints: i32,
    is_town_hall: bool,
    x: i32,
    y: i32,
}

impl BuildingDefinition {
    /// Create a validated building definition.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidBuilding`] if `data_id` or `hitpoints` is
    /// not positive.
    pub fn new(
        instance_id: i32,
        data_id: i32,
        hitpoints: i32,
        is_town_hall: bool,
        x: i32,
        y: i32,
    ) -> Result<Self> {
        if data_id <= 0 {
            return Err(GameError::InvalidBuilding {
                data_id,
                reason: "data id must be positive".to_string(),
            });
        }
        if hitpoints <= 0 {
            return Err(GameError::InvalidBuilding {
                data_id,
                reason: format!("hitpoints must be positive, got {hitpoints}"),
            });
        }

        Ok(Self {
            instance_id,
            data_id,
            hitpoints,
            is_town_hall,
            x,
            y,
        })
    }

    /// Instance id (real or generated).
    #[must_use]
    pub const fn instance_id(&self) -> i32 {
        self.instance_id
    }

    /// Building type id.
    #[must_use]
    pub const fn data_id(&self) -> i32 {
        self.data_id
    }

    /// Original hitpoints.
    #[must_use]
    pub const fn hitpoints(&self) -> i32 {
        self.hitpoints
    }

    /// Whether this is a town hall.
    #[must_use]
    pub const fn is_town_hall(&self) -> bool {
        self.is_town_hall
    }

    /// Tile X coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Tile Y coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }
}

/// Immutable defender layout: the buildings a battle is fought against.
///
/// Always holds at least one building, and every building has positive
/// hitpoints, so scoring never divides by zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BattleLayout {
    buildings: Vec<BuildingDefinition>,
}

impl BattleLayout {
    /// Create a layout from building definitions.
    ///
    /// Definitions without positive hitpoints are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EmptyLayout`] if nothing is left.
    pub fn new(buildings: impl IntoIterator<Item = BuildingDefinition>) -> Result<Self> {
        let buildings: Vec<_> = buildings
            .into_iter()
            .filter(|b| b.hitpoints > 0 && b.data_id > 0)
            .collect();

        if buildings.is_empty() {
            return Err(GameError::EmptyLayout);
        }

        Ok(Self { buildings })
    }

    /// Build a layout from saved descriptors and a stats lookup.
    ///
    /// Descriptors with a non-positive data id, or whose stats resolve to
    /// non-positive hitpoints, are skipped. Buildings saved without an
    /// instance id get consecutive ids starting at
    /// [`GENERATED_INSTANCE_ID_BASE`].
    ///
    /// # Errors
    ///
    /// Any stats lookup failure aborts the whole build, as does an empty
    /// result. A partially built layout would mis-score every battle.
    pub fn from_descriptors<P>(descriptors: &[BuildingDescriptor], stats: &P) -> Result<Self>
    where
        P: BuildingStatsProvider + ?Sized,
    {
        let mut next_generated_id = GENERATED_INSTANCE_ID_BASE;
        let mut buildings = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if descriptor.data_id <= 0 {
                continue;
            }

            let building_stats = stats.building_stats(descriptor.data_id, descriptor.level)?;
            if building_stats.hitpoints <= 0 {
                debug!(
                    data_id = descriptor.data_id,
                    level = descriptor.level,
                    "Skipping building without hitpoints"
                );
                continue;
            }

            let instance_id = match descriptor.instance_id {
                Some(id) => id,
                None => {
                    let id = next_generated_id;
                    next_generated_id += 1;
                    id
                }
            };

            buildings.push(BuildingDefinition::new(
                instance_id,
                descriptor.data_id,
                building_stats.hitpoints,
                building_stats.is_town_hall,
                descriptor.x,
                descriptor.y,
            )?);
        }

        debug!(buildings = buildings.len(), "Built layout");
        Self::new(buildings)
    }

    /// Buildings in layout order.
    #[must_use]
    pub fn buildings(&self) -> &[BuildingDefinition] {
        &self.buildings
    }

    /// Number of buildings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// Whether the layout has no buildings. [`BattleLayout::new`] rejects
    /// empty layouts, so a built layout is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Sum of original hitpoints over all buildings.
    #[must_use]
    pub fn total_hitpoints(&self) -> i64 {
        self.buildings.iter().map(|b| i64::from(b.hitpoints)).sum()
    }

    /// Number of buildings per data id.
    #[must_use]
    pub fn counts_by_type(&self) -> HashMap<i32, usize> {
        let mut counts = HashMap::new();
        for building in &self.buildings {
            *counts.entry(building.data_id).or_insert(0) += 1;
        }
        counts
    }
}

impl<'de> Deserialize<'de> for BattleLayout {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            buildings: Vec<BuildingDefinition>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.buildings).map_err(serde::de::Error::custom)
    }
}
