//! Per-run building state.

use serde::{Deserialize, Serialize};

use crate::layout::BuildingDefinition;

/// Mutable copy of a [`BuildingDefinition`] owned by one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    definition: BuildingDefinition,
    remaining_hitpoints: f64,
    destroyed: bool,
}

impl BuildingSnapshot {
    /// Fresh snapshot at full hitpoints.
    #[must_use]
    pub fn new(definition: &BuildingDefinition) -> Self {
        Self {
            remaining_hitpoints: f64::from(definition.hitpoints()),
            definition: definition.clone(),
            destroyed: false,
        }
    }

    /// The definition this snapshot was copied from.
    #[must_use]
    pub const fn definition(&self) -> &BuildingDefinition {
        &self.definition
    }

    /// Instance id.
    #[must_use]
    pub const fn instance_id(&self) -> i32 {
        self.definition.instance_id()
    }

    /// Building type id.
    #[must_use]
    pub const fn data_id(&self) -> i32 {
        self.definition.data_id()
    }

    /// Original hitpoints.
    #[must_use]
    pub const fn hitpoints(&self) -> i32 {
        self.definition.hitpoints()
    }

    /// Whether this is a town hall.
    #[must_use]
    pub const fn is_town_hall(&self) -> bool {
        self.definition.is_town_hall()
    }

    /// Tile position.
    #[must_use]
    pub const fn position(&self) -> (i32, i32) {
        (self.definition.x(), self.definition.y())
    }

    /// Hitpoints left.
    #[must_use]
    pub const fn remaining_hitpoints(&self) -> f64 {
        self.remaining_hitpoints
    }

    /// Whether the building is destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Mark destroyed. Remaining hitpoints drop to zero.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.remaining_hitpoints = 0.0;
    }

    /// Subtract damage, destroying the building once nothing is left.
    ///
    /// Returns `true` if this hit destroyed it.
    pub fn apply_damage(&mut self, damage: f64) -> bool {
        if self.destroyed {
            return false;
        }

        self.remaining_hitpoints -= damage;
        if self.remaining_hitpoints <= 0.0 {
            self.destroy();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(hitpoints: i32) -> BuildingSnapshot {
        let definition = BuildingDefinition::new(500_000_000, 1_000_000, hitpoints, false, 4, 5)
            .unwrap();
        BuildingSnapshot::new(&definition)
    }

    #[test]
    fn test_new_snapshot_is_intact() {
        let s = snapshot(300);
        assert_eq!(s.remaining_hitpoints(), 300.0);
        assert!(!s.is_destroyed());
        assert_eq!(s.position(), (4, 5));
    }

    #[test]
    fn test_destroy_zeroes_hitpoints() {
        let mut s = snapshot(300);
        s.destroy();
        assert!(s.is_destroyed());
        assert_eq!(s.remaining_hitpoints(), 0.0);
        assert_eq!(s.hitpoints(), 300);
    }

    #[test]
    fn test_apply_damage() {
        let mut s = snapshot(100);
        assert!(!s.apply_damage(60.0));
        assert_eq!(s.remaining_hitpoints(), 40.0);
        assert!(s.apply_damage(40.0));
        assert!(s.is_destroyed());
        assert_eq!(s.remaining_hitpoints(), 0.0);
        // Already destroyed: nothing happens
        assert!(!s.apply_damage(10.0));
        assert_eq!(s.remaining_hitpoints(), 0.0);
    }
}
