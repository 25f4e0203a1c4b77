//! Troop stats and per-run troop state.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Immutable combat stats for a troop type.
///
/// Shared read-only across runs through an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroopStats {
    data_id: i32,
    hitpoints: f64,
    damage_per_second: f64,
    move_speed: f64,
    attack_range: f64,
    is_flying: bool,
    preferred_targets: BTreeSet<i32>,
    preferred_target_damage_multiplier: f64,
}

impl TroopStats {
    /// Create validated troop stats.
    ///
    /// Non-positive preferred target ids are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTroopStats`] if `data_id` or `hitpoints`
    /// is not positive, if damage, speed or range is negative, if the
    /// multiplier is not positive, or if any value is not finite.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data_id: i32,
        hitpoints: f64,
        damage_per_second: f64,
        move_speed: f64,
        attack_range: f64,
        is_flying: bool,
        preferred_targets: impl IntoIterator<Item = i32>,
        preferred_target_damage_multiplier: f64,
    ) -> Result<Self> {
        let invalid = |reason: &str| GameError::InvalidTroopStats {
            data_id,
            reason: reason.to_string(),
        };

        if data_id <= 0 {
            return Err(invalid("data id must be positive"));
        }
        if !(hitpoints.is_finite() && hitpoints > 0.0) {
            return Err(invalid("hitpoints must be positive"));
        }
        if !(damage_per_second.is_finite() && damage_per_second >= 0.0) {
            return Err(invalid("damage per second must not be negative"));
        }
        if !(move_speed.is_finite() && move_speed >= 0.0) {
            return Err(invalid("move speed must not be negative"));
        }
        if !(attack_range.is_finite() && attack_range >= 0.0) {
            return Err(invalid("attack range must not be negative"));
        }
        if !(preferred_target_damage_multiplier.is_finite()
            && preferred_target_damage_multiplier > 0.0)
        {
            return Err(invalid("preferred target multiplier must be positive"));
        }

        Ok(Self {
            data_id,
            hitpoints,
            damage_per_second,
            move_speed,
            attack_range,
            is_flying,
            preferred_targets: preferred_targets.into_iter().filter(|id| *id > 0).collect(),
            preferred_target_damage_multiplier,
        })
    }

    /// Troop type id.
    #[must_use]
    pub const fn data_id(&self) -> i32 {
        self.data_id
    }

    /// Starting hitpoints.
    #[must_use]
    pub const fn hitpoints(&self) -> f64 {
        self.hitpoints
    }

    /// Damage dealt per second of attacking.
    #[must_use]
    pub const fn damage_per_second(&self) -> f64 {
        self.damage_per_second
    }

    /// Tiles travelled per second.
    #[must_use]
    pub const fn move_speed(&self) -> f64 {
        self.move_speed
    }

    /// Attack range in tiles.
    #[must_use]
    pub const fn attack_range(&self) -> f64 {
        self.attack_range
    }

    /// Informational only; flying troops path and target like ground troops.
    #[must_use]
    pub const fn is_flying(&self) -> bool {
        self.is_flying
    }

    /// Building data ids this troop prefers.
    #[must_use]
    pub fn preferred_targets(&self) -> &BTreeSet<i32> {
        &self.preferred_targets
    }

    /// Multiplier applied to damage against preferred targets.
    #[must_use]
    pub const fn preferred_target_damage_multiplier(&self) -> f64 {
        self.preferred_target_damage_multiplier
    }

    /// Whether `building_data_id` is one of the preferred targets.
    #[must_use]
    pub fn prefers(&self, building_data_id: i32) -> bool {
        self.preferred_targets.contains(&building_data_id)
    }

    /// Damage multiplier against a building type.
    #[must_use]
    pub fn damage_multiplier(&self, building_data_id: i32) -> f64 {
        if building_data_id > 0 && self.prefers(building_data_id) {
            self.preferred_target_damage_multiplier
        } else {
            1.0
        }
    }

    /// Seconds needed to close in from `distance` to attack range.
    ///
    /// Immobile troops never need to travel; they attack from where they
    /// stand regardless of range.
    #[must_use]
    pub fn travel_time(&self, distance: f64) -> f64 {
        if self.move_speed <= 0.0 {
            return 0.0;
        }
        (distance - self.attack_range).max(0.0) / self.move_speed
    }
}

/// Source of troop stats.
///
/// Absent stats are not an error: a spawn of an unknown troop is dropped.
pub trait TroopStatsProvider {
    /// Look up troop stats by data id.
    fn troop_stats(&self, data_id: i32) -> Option<Arc<TroopStats>>;
}

impl<F> TroopStatsProvider for F
where
    F: Fn(i32) -> Option<Arc<TroopStats>>,
{
    fn troop_stats(&self, data_id: i32) -> Option<Arc<TroopStats>> {
        self(data_id)
    }
}

/// Provider that knows no troops.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTroopStats;

impl TroopStatsProvider for NoTroopStats {
    fn troop_stats(&self, _data_id: i32) -> Option<Arc<TroopStats>> {
        None
    }
}

/// A spawned troop inside one run.
#[derive(Debug, Clone)]
pub struct TroopInstance {
    stats: Arc<TroopStats>,
    spawn_x: i32,
    spawn_y: i32,
    remaining_hitpoints: f64,
    pub(crate) target: Option<usize>,
    pub(crate) travel_time_remaining: f64,
}

impl TroopInstance {
    pub(crate) fn spawn(stats: Arc<TroopStats>, x: i32, y: i32) -> Self {
        let remaining_hitpoints = stats.hitpoints();
        Self {
            stats,
            spawn_x: x,
            spawn_y: y,
            remaining_hitpoints,
            target: None,
            travel_time_remaining: 0.0,
        }
    }

    /// Troop type id.
    #[must_use]
    pub fn data_id(&self) -> i32 {
        self.stats.data_id()
    }

    /// Stats this troop was spawned with.
    #[must_use]
    pub fn stats(&self) -> &TroopStats {
        &self.stats
    }

    /// Spawn tile, which is also where distances are measured from.
    #[must_use]
    pub const fn spawn_position(&self) -> (i32, i32) {
        (self.spawn_x, self.spawn_y)
    }

    /// Remaining hitpoints. Nothing in a battle damages troops.
    #[must_use]
    pub const fn remaining_hitpoints(&self) -> f64 {
        self.remaining_hitpoints
    }

    /// Whether the troop can still act.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.remaining_hitpoints > 0.0
    }

    /// Index of the current target in the run's building list.
    #[must_use]
    pub const fn target(&self) -> Option<usize> {
        self.target
    }

    /// Seconds of travel left before the troop starts attacking.
    #[must_use]
    pub const fn travel_time_remaining(&self) -> f64 {
        self.travel_time_remaining
    }
}
