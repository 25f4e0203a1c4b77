//! Turning final run state into a [`BattleResult`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{round_clamped, round_half_even};
use crate::snapshot::BuildingSnapshot;

/// Battle time is always measured against this many seconds, whatever the
/// configured attack time.
pub const SCORED_ATTACK_SECONDS: f64 = 180.0;

/// Outcome of one battle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResult {
    /// Stars earned, 0 to 3.
    pub stars: u8,
    /// Share of total hitpoints destroyed, 0 to 100.
    pub destruction_percentage: u8,
    /// Whether any town hall was destroyed.
    pub town_hall_destroyed: bool,
    /// Seconds of attack used, 0 to 180.
    pub battle_time: u32,
    /// Unspent preparation seconds.
    pub preparation_time_remaining: f64,
    /// Unspent attack seconds.
    pub attack_time_remaining: f64,
    /// Clock position at the end, rounded to a whole tick.
    pub end_tick: i64,
}

impl fmt::Display for BattleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stars, {}% destruction, town hall {}, {}s battle time, end tick {}",
            self.stars,
            self.destruction_percentage,
            if self.town_hall_destroyed {
                "destroyed"
            } else {
                "standing"
            },
            self.battle_time,
            self.end_tick
        )
    }
}

/// Score a finished run.
///
/// Destruction is structural: a destroyed building counts with its full
/// original hitpoints, a damaged one counts for nothing.
#[must_use]
pub fn score(
    buildings: &[BuildingSnapshot],
    preparation_time: f64,
    attack_time: f64,
    clock_ticks: f64,
) -> BattleResult {
    let total: i64 = buildings.iter().map(|b| i64::from(b.hitpoints())).sum();
    let destroyed: i64 = buildings
        .iter()
        .filter(|b| b.is_destroyed())
        .map(|b| i64::from(b.hitpoints()))
        .sum();

    let destruction_percentage = if total > 0 {
        round_clamped(destroyed as f64 * 100.0 / total as f64, 0, 100)
    } else {
        0
    };

    let town_hall_destroyed = buildings
        .iter()
        .any(|b| b.is_town_hall() && b.is_destroyed());

    let stars = u8::from(destruction_percentage >= 50)
        + u8::from(town_hall_destroyed)
        + u8::from(destruction_percentage >= 100);

    let battle_time = round_clamped(
        SCORED_ATTACK_SECONDS - attack_time,
        0,
        SCORED_ATTACK_SECONDS as i64,
    );

    BattleResult {
        stars: stars.min(3),
        destruction_percentage: destruction_percentage as u8,
        town_hall_destroyed,
        battle_time: battle_time as u32,
        preparation_time_remaining: preparation_time.max(0.0),
        attack_time_remaining: attack_time.max(0.0),
        end_tick: round_half_even(clock_ticks) as i64,
    }
}
