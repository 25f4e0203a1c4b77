//! Global identifier decoding.
//!
//! Every command carries a packed global id whose class selects how the
//! command is handled. The class is the id divided by 1,000,000, computed
//! with the multiply-high trick the game client uses, so it has to be
//! reproduced exactly, including its behaviour for negative ids.

/// Fixed-point reciprocal of 1,000,000 scaled by 2^50.
const RECIPROCAL: i64 = 1_125_899_907;

/// Class of building-type ids (destroy nearest building of a type).
pub const BUILDING_CLASS: i32 = 1;

/// Class of troop ids (spawn a troop).
pub const TROOP_CLASS: i32 = 4;

/// Class of building-instance ids (destroy one specific building).
pub const BUILDING_INSTANCE_CLASS: i32 = 500;

/// First instance id handed out to buildings saved without one.
///
/// Lies inside the instance class so generated ids can be targeted by
/// destroy-by-instance commands just like real ones.
pub const GENERATED_INSTANCE_ID_BASE: i32 = 500_000_000;

/// Decode the class id of a global id.
///
/// `value = (1125899907 * id) >> 32` with a 64-bit signed product and an
/// arithmetic shift, then `(value >> 18) + (value >> 31)`.
#[must_use]
pub const fn class_id(global_id: i32) -> i32 {
    let value = (RECIPROCAL * global_id as i64) >> 32;
    ((value >> 18) + (value >> 31)) as i32
}

/// What a decoded command id asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    /// Destroy the nearest surviving building of this type.
    DestroyByType,
    /// Spawn a troop.
    SpawnTroop,
    /// Destroy the building with this instance id.
    DestroyByInstance,
    /// Anything else. Ignored by the engine.
    Other(i32),
}

impl CommandClass {
    /// Classify a global id.
    #[must_use]
    pub const fn of(global_id: i32) -> Self {
        match class_id(global_id) {
            BUILDING_CLASS => Self::DestroyByType,
            TROOP_CLASS => Self::SpawnTroop,
            BUILDING_INSTANCE_CLASS => Self::DestroyByInstance,
            other => Self::Other(other),
        }
    }
}
