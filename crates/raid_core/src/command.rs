//! Attack commands and their processing order.

use serde::{Deserialize, Serialize};

use crate::global_id::CommandClass;

/// Simulation ticks per game second.
pub const TICKS_PER_SECOND: f64 = 63.0;

/// A single attacker action at a point in battle time.
///
/// `tick` 0 is the start of preparation; every 63 ticks are one second.
/// Ticks at or before the current clock position do not advance time, so
/// a negative tick behaves like tick 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleCommand {
    /// When the command is issued.
    #[serde(default)]
    pub tick: i32,
    /// Packed global id selecting what the command does.
    #[serde(default)]
    pub data_id: i32,
    /// Tile X coordinate.
    #[serde(default)]
    pub x: i32,
    /// Tile Y coordinate.
    #[serde(default)]
    pub y: i32,
}

impl BattleCommand {
    /// Create a new command.
    #[must_use]
    pub const fn new(tick: i32, data_id: i32, x: i32, y: i32) -> Self {
        Self {
            tick,
            data_id,
            x,
            y,
        }
    }

    /// Copy of this command issued at another tick.
    #[must_use]
    pub const fn with_tick(self, tick: i32) -> Self {
        Self { tick, ..self }
    }

    /// Copy of this command at another tile.
    #[must_use]
    pub const fn with_position(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }

    /// How the engine will interpret this command.
    ///
    /// `None` for non-positive ids, which are ignored before decoding.
    #[must_use]
    pub const fn class(&self) -> Option<CommandClass> {
        if self.data_id <= 0 {
            None
        } else {
            Some(CommandClass::of(self.data_id))
        }
    }

    /// Battle time of this command in seconds.
    #[must_use]
    pub fn seconds(&self) -> f64 {
        f64::from(self.tick) / TICKS_PER_SECOND
    }
}

/// Commands in processing order: ascending tick, submission order on ties.
///
/// The sort key carries the submission index explicitly, so the order does
/// not depend on the stability of the sort algorithm.
#[must_use]
pub fn processing_order(commands: &[BattleCommand]) -> Vec<BattleCommand> {
    let mut keyed: Vec<_> = commands.iter().copied().enumerate().collect();
    keyed.sort_unstable_by_key(|(index, command)| (command.tick, *index));
    keyed.into_iter().map(|(_, command)| command).collect()
}
