//! Battle resolution.
//!
//! A [`BattleSimulator`] pairs a shared [`BattleLayout`] with a
//! [`BattleConfig`] and a troop-stats source. Every call to
//! [`BattleSimulator::run`] starts a fresh [`BattleRun`]: building snapshots
//! are copied out of the layout, commands are replayed in tick order, and the
//! final state is scored.
//!
//! # Time
//!
//! The run keeps a virtual clock in ticks (63 per second). Advancing the
//! clock spends preparation seconds first; whatever a delta overshoots the
//! preparation budget is spent from attack time in the same step. Attack
//! seconds are spent in troop sub-steps while a troop is alive, so troops
//! deal damage exactly over the attack time that passes.
//!
//! # Determinism
//!
//! A run is a pure function of layout, config, commands and stats:
//! - No randomness, no IO, no wall clock
//! - Commands are ordered by `(tick, submission index)`
//! - Buildings and troops are visited in layout and spawn order
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use raid_core::prelude::*;
//!
//! let layout = BattleLayout::new([
//!     BuildingDefinition::new(500_000_001, 1_000_001, 1500, true, 20, 20).unwrap(),
//!     BuildingDefinition::new(500_000_002, 1_000_000, 500, false, 10, 10).unwrap(),
//! ])
//! .unwrap();
//! let simulator = BattleSimulator::new(Arc::new(layout), BattleConfig::default()).unwrap();
//!
//! let result = simulator.run(&[BattleCommand::new(63, 500_000_001, 0, 0)]);
//! assert_eq!(result.stars, 2);
//! assert_eq!(result.destruction_percentage, 75);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::command::{processing_order, BattleCommand, TICKS_PER_SECOND};
use crate::error::{GameError, Result};
use crate::global_id::CommandClass;
use crate::layout::BattleLayout;
use crate::math::distance_squared;
use crate::scoring::{score, BattleResult};
use crate::snapshot::BuildingSnapshot;
use crate::troops::{NoTroopStats, TroopInstance, TroopStats, TroopStatsProvider};

/// Default preparation time in seconds.
pub const DEFAULT_PREPARATION_TIME: f64 = 30.0;

/// Default attack time in seconds.
pub const DEFAULT_ATTACK_TIME: f64 = 180.0;

/// Default troop sub-step in seconds.
pub const DEFAULT_TICK_RESOLUTION: f64 = 0.25;

/// Smallest troop sub-step; finer resolutions are raised to this.
pub const MIN_TICK_RESOLUTION: f64 = 0.001;

/// Time windows at or below this many seconds count as spent.
const TIME_EPSILON: f64 = 1e-9;

/// Shared troop-stats source.
pub type SharedTroopStats = Arc<dyn TroopStatsProvider + Send + Sync>;

/// Timing parameters for a battle.
///
/// # Example RON
///
/// ```ron
/// BattleConfig(
///     preparation_time: 30.0,
///     attack_time: 180.0,
///     tick_resolution_seconds: 0.25,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Seconds of preparation before attack time starts running.
    pub preparation_time: f64,
    /// Seconds of attack time.
    pub attack_time: f64,
    /// Troop sub-step length in seconds.
    pub tick_resolution_seconds: f64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            preparation_time: DEFAULT_PREPARATION_TIME,
            attack_time: DEFAULT_ATTACK_TIME,
            tick_resolution_seconds: DEFAULT_TICK_RESOLUTION,
        }
    }
}

impl BattleConfig {
    /// Builder method to set the preparation time.
    #[must_use]
    pub const fn with_preparation_time(mut self, seconds: f64) -> Self {
        self.preparation_time = seconds;
        self
    }

    /// Builder method to set the attack time.
    #[must_use]
    pub const fn with_attack_time(mut self, seconds: f64) -> Self {
        self.attack_time = seconds;
        self
    }

    /// Builder method to set the troop sub-step.
    #[must_use]
    pub const fn with_tick_resolution(mut self, seconds: f64) -> Self {
        self.tick_resolution_seconds = seconds;
        self
    }

    /// Check that all values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] for negative or non-finite times
    /// and a non-finite resolution.
    pub fn validate(&self) -> Result<()> {
        if !(self.preparation_time.is_finite() && self.preparation_time >= 0.0) {
            return Err(GameError::InvalidConfig(format!(
                "preparation_time must be a non-negative number, got {}",
                self.preparation_time
            )));
        }
        if !(self.attack_time.is_finite() && self.attack_time >= 0.0) {
            return Err(GameError::InvalidConfig(format!(
                "attack_time must be a non-negative number, got {}",
                self.attack_time
            )));
        }
        if !self.tick_resolution_seconds.is_finite() {
            return Err(GameError::InvalidConfig(format!(
                "tick_resolution_seconds must be finite, got {}",
                self.tick_resolution_seconds
            )));
        }
        Ok(())
    }

    /// Parse and validate a RON config.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] for malformed RON and
    /// [`GameError::InvalidConfig`] for out-of-range values.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)
            .map_err(|e| GameError::Serialization(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Troop sub-step actually used.
    #[must_use]
    pub fn step_seconds(&self) -> f64 {
        self.tick_resolution_seconds.max(MIN_TICK_RESOLUTION)
    }
}

/// Where a run is in its timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattlePhase {
    /// Preparation time is still running.
    Preparation,
    /// Attack time is running.
    Attack,
    /// Every building is destroyed or attack time is spent.
    Ended,
}

/// Result of a run together with its final state.
#[derive(Debug, Clone)]
pub struct BattleOutcome {
    /// The scored result.
    pub result: BattleResult,
    /// Final building snapshots in layout order.
    pub buildings: Vec<BuildingSnapshot>,
    /// Spawned troops in spawn order.
    pub troops: Vec<TroopInstance>,
}

/// Resolves battles against one layout.
///
/// Cheap to clone; the layout and troop stats are shared.
#[derive(Clone)]
pub struct BattleSimulator {
    layout: Arc<BattleLayout>,
    config: BattleConfig,
    troop_stats: SharedTroopStats,
}

impl fmt::Debug for BattleSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleSimulator")
            .field("buildings", &self.layout.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BattleSimulator {
    /// Create a simulator with no troop stats.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(layout: Arc<BattleLayout>, config: BattleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            layout,
            config,
            troop_stats: Arc::new(NoTroopStats),
        })
    }

    /// Builder method to attach a troop-stats source.
    #[must_use]
    pub fn with_troop_stats(mut self, troop_stats: SharedTroopStats) -> Self {
        self.troop_stats = troop_stats;
        self
    }

    /// The layout battles are fought against.
    #[must_use]
    pub fn layout(&self) -> &BattleLayout {
        &self.layout
    }

    /// Shared handle to the layout.
    #[must_use]
    pub fn shared_layout(&self) -> Arc<BattleLayout> {
        Arc::clone(&self.layout)
    }

    /// The timing config.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Shared handle to the troop-stats source.
    #[must_use]
    pub fn troop_stats(&self) -> SharedTroopStats {
        Arc::clone(&self.troop_stats)
    }

    /// Start a fresh run for stepwise control.
    #[must_use]
    pub fn start(&self) -> BattleRun<'_> {
        BattleRun::new(&self.layout, &self.config, self.troop_stats.as_ref())
    }

    /// Resolve a battle and score it.
    ///
    /// Commands may be unsorted; they are processed by tick, submission order
    /// on ties. Malformed commands never fail a run.
    #[must_use]
    pub fn run(&self, commands: &[BattleCommand]) -> BattleResult {
        self.run_detailed(commands).result
    }

    /// Resolve a battle and return the final state along with the result.
    #[must_use]
    pub fn run_detailed(&self, commands: &[BattleCommand]) -> BattleOutcome {
        let mut run = self.start();
        for command in processing_order(commands) {
            if run.is_over() {
                debug!(tick = command.tick, "All buildings destroyed, ignoring remaining commands");
                break;
            }
            run.submit(command);
        }
        run.finish()
    }
}

/// Mutable state of one battle.
///
/// Created by [`BattleSimulator::start`]. Feed commands in tick order with
/// [`submit`](Self::submit), or drive the clock and dispatcher separately
/// with [`advance_to`](Self::advance_to) and
/// [`apply_command`](Self::apply_command).
pub struct BattleRun<'a> {
    troop_stats: &'a (dyn TroopStatsProvider + Send + Sync),
    step_seconds: f64,
    buildings: Vec<BuildingSnapshot>,
    by_type: HashMap<i32, Vec<usize>>,
    by_instance: HashMap<i32, usize>,
    troops: Vec<TroopInstance>,
    preparation_time: f64,
    attack_time: f64,
    clock: f64,
    standing: usize,
}

impl fmt::Debug for BattleRun<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleRun")
            .field("clock", &self.clock)
            .field("preparation_time", &self.preparation_time)
            .field("attack_time", &self.attack_time)
            .field("standing", &self.standing)
            .field("troops", &self.troops.len())
            .finish_non_exhaustive()
    }
}

impl<'a> BattleRun<'a> {
    fn new(
        layout: &BattleLayout,
        config: &BattleConfig,
        troop_stats: &'a (dyn TroopStatsProvider + Send + Sync),
    ) -> Self {
        let buildings: Vec<_> = layout.buildings().iter().map(BuildingSnapshot::new).collect();

        let mut by_type: HashMap<i32, Vec<usize>> = HashMap::new();
        let mut by_instance = HashMap::new();
        for (index, building) in buildings.iter().enumerate() {
            by_type.entry(building.data_id()).or_default().push(index);
            // First building wins when a save repeats an instance id
            by_instance.entry(building.instance_id()).or_insert(index);
        }

        Self {
            troop_stats,
            step_seconds: config.step_seconds(),
            standing: buildings.len(),
            buildings,
            by_type,
            by_instance,
            troops: Vec::new(),
            preparation_time: config.preparation_time,
            attack_time: config.attack_time,
            clock: 0.0,
        }
    }

    /// Building snapshots in layout order.
    #[must_use]
    pub fn buildings(&self) -> &[BuildingSnapshot] {
        &self.buildings
    }

    /// Spawned troops in spawn order.
    #[must_use]
    pub fn troops(&self) -> &[TroopInstance] {
        &self.troops
    }

    /// Unspent preparation seconds.
    #[must_use]
    pub const fn preparation_time_remaining(&self) -> f64 {
        self.preparation_time
    }

    /// Unspent attack seconds.
    #[must_use]
    pub const fn attack_time_remaining(&self) -> f64 {
        self.attack_time
    }

    /// Clock position in ticks.
    #[must_use]
    pub const fn clock_ticks(&self) -> f64 {
        self.clock
    }

    /// Number of buildings not yet destroyed.
    #[must_use]
    pub const fn standing_buildings(&self) -> usize {
        self.standing
    }

    /// Whether every building is destroyed.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.standing == 0
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> BattlePhase {
        if self.is_over() {
            BattlePhase::Ended
        } else if self.preparation_time > 0.0 {
            BattlePhase::Preparation
        } else if self.attack_time > 0.0 {
            BattlePhase::Attack
        } else {
            BattlePhase::Ended
        }
    }

    /// Advance the clock to `tick`, then apply the command.
    pub fn submit(&mut self, command: BattleCommand) {
        self.advance_to(command.tick);
        if !self.is_over() {
            self.apply_command(&command);
        }
    }

    /// Move the clock forward to `tick`, spending preparation then attack
    /// time. Ticks at or behind the clock do nothing.
    ///
    /// Returns `false` if the last building fell before `tick` was reached;
    /// the clock then stops where the battle ended.
    pub fn advance_to(&mut self, tick: i32) -> bool {
        let target = f64::from(tick);
        if self.is_over() || target <= self.clock {
            return !self.is_over();
        }

        let start = self.clock;
        let delta_seconds = (target - start) / TICKS_PER_SECOND;

        let mut attack_seconds = delta_seconds;
        let mut preparation_spent = 0.0;
        if self.preparation_time > 0.0 {
            preparation_spent = delta_seconds.min(self.preparation_time);
            self.preparation_time -= delta_seconds;
            attack_seconds = 0.0;
            if self.preparation_time < 0.0 {
                attack_seconds = -self.preparation_time;
                self.preparation_time = 0.0;
                debug!(tick, "Preparation over, attack time running");
            }
        }

        if attack_seconds > 0.0 && self.attack_time > 0.0 {
            if self.has_active_troops() {
                let window = attack_seconds.min(self.attack_time);
                let consumed = self.step_troops(window);
                self.attack_time = (self.attack_time - consumed).max(0.0);

                if self.is_over() {
                    self.clock = start + (preparation_spent + consumed) * TICKS_PER_SECOND;
                    debug!(
                        clock = self.clock,
                        "Last building destroyed before tick {tick}"
                    );
                    return false;
                }
            } else {
                self.attack_time = (self.attack_time - attack_seconds).max(0.0);
            }

            if self.attack_time <= 0.0 {
                debug!(tick, "Attack time exhausted");
            }
        }

        self.clock = target;
        true
    }

    /// Apply one command at the current clock position.
    ///
    /// Unknown ids, missing buildings, already-destroyed targets and troops
    /// without stats are all silently ignored.
    pub fn apply_command(&mut self, command: &BattleCommand) {
        let Some(class) = command.class() else {
            return;
        };

        match class {
            CommandClass::DestroyByInstance => {
                if let Some(&index) = self.by_instance.get(&command.data_id) {
                    if self.destroy(index) {
                        debug!(instance_id = command.data_id, "Destroyed building by instance");
                    }
                }
            }
            CommandClass::DestroyByType => {
                if let Some(index) = self.nearest_of_type(command.data_id, command.x, command.y) {
                    self.destroy(index);
                    debug!(
                        data_id = command.data_id,
                        instance_id = self.buildings[index].instance_id(),
                        "Destroyed nearest building of type"
                    );
                }
            }
            CommandClass::SpawnTroop => self.spawn_troop(command),
            CommandClass::Other(class_id) => {
                trace!(data_id = command.data_id, class_id, "Ignoring command");
            }
        }
    }

    /// Let troops fight for up to `window` seconds.
    ///
    /// Stops early once no building is left. Returns the seconds actually
    /// spent. Does not touch the clock or the time budgets.
    pub fn step_troops(&mut self, window: f64) -> f64 {
        let mut remaining = window;
        let mut consumed = 0.0;

        while remaining > TIME_EPSILON && self.has_active_troops() && !self.is_over() {
            let step = self.step_seconds.min(remaining);
            for troop_index in 0..self.troops.len() {
                self.step_troop(troop_index, step);
            }
            remaining -= step;
            consumed += step;
        }

        trace!(window, consumed, standing = self.standing, "Troop steps done");
        consumed
    }

    /// Let live troops run out the clock, then score the run.
    ///
    /// Remaining preparation time is spent first, then attack time on
    /// troop steps, the same order [`advance_to`](Self::advance_to) uses.
    #[must_use]
    pub fn finish(mut self) -> BattleOutcome {
        if !self.is_over() && self.has_active_troops() {
            if self.preparation_time > 0.0 {
                self.clock += self.preparation_time * TICKS_PER_SECOND;
                self.preparation_time = 0.0;
            }
            if self.attack_time > 0.0 {
                let consumed = self.step_troops(self.attack_time);
                self.attack_time = (self.attack_time - consumed).max(0.0);
                self.clock += consumed * TICKS_PER_SECOND;
            }
        }

        let result = score(
            &self.buildings,
            self.preparation_time,
            self.attack_time,
            self.clock,
        );
        debug!(%result, "Battle finished");

        BattleOutcome {
            result,
            buildings: self.buildings,
            troops: self.troops,
        }
    }

    fn has_active_troops(&self) -> bool {
        self.troops.iter().any(TroopInstance::is_alive)
    }

    fn destroy(&mut self, index: usize) -> bool {
        let building = &mut self.buildings[index];
        if building.is_destroyed() {
            return false;
        }
        building.destroy();
        self.standing -= 1;
        true
    }

    fn nearest_of_type(&self, data_id: i32, x: i32, y: i32) -> Option<usize> {
        let bucket = self.by_type.get(&data_id)?;
        let mut best: Option<(usize, i64)> = None;

        for &index in bucket {
            let building = &self.buildings[index];
            if building.is_destroyed() {
                continue;
            }
            let (bx, by) = building.position();
            let distance = distance_squared(bx, by, x, y);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }

        best.map(|(index, _)| index)
    }

    fn spawn_troop(&mut self, command: &BattleCommand) {
        let Some(stats) = self.troop_stats.troop_stats(command.data_id) else {
            trace!(data_id = command.data_id, "No troop stats, spawn dropped");
            return;
        };

        let mut troop = TroopInstance::spawn(stats, command.x, command.y);
        (troop.target, troop.travel_time_remaining) =
            self.acquire(troop.stats(), command.x, command.y);
        debug!(
            data_id = command.data_id,
            x = command.x,
            y = command.y,
            target = ?troop.target,
            "Spawned troop"
        );
        self.troops.push(troop);
    }

    fn acquire(&self, stats: &TroopStats, x: i32, y: i32) -> (Option<usize>, f64) {
        let Some(index) = select_target(&self.buildings, stats, x, y) else {
            return (None, 0.0);
        };
        let (bx, by) = self.buildings[index].position();
        let distance = (distance_squared(bx, by, x, y) as f64).sqrt();
        (Some(index), stats.travel_time(distance))
    }

    fn step_troop(&mut self, troop_index: usize, step: f64) {
        if self.is_over() || !self.troops[troop_index].is_alive() {
            return;
        }

        let needs_target = self.troops[troop_index]
            .target
            .map_or(true, |index| self.buildings[index].is_destroyed());
        if needs_target {
            let (x, y) = self.troops[troop_index].spawn_position();
            let acquired = self.acquire(self.troops[troop_index].stats(), x, y);
            let troop = &mut self.troops[troop_index];
            (troop.target, troop.travel_time_remaining) = acquired;
        }

        let troop = &mut self.troops[troop_index];
        let Some(target) = troop.target else {
            return;
        };

        let mut time = step;
        if troop.travel_time_remaining > 0.0 {
            let travelled = troop.travel_time_remaining.min(time);
            troop.travel_time_remaining -= travelled;
            time -= travelled;
        }
        if time <= 0.0 {
            return;
        }

        let building = &mut self.buildings[target];
        let multiplier = troop.stats().damage_multiplier(building.data_id());
        let damage = troop.stats().damage_per_second() * multiplier * time;
        if building.apply_damage(damage) {
            troop.target = None;
            self.standing -= 1;
            trace!(
                instance_id = building.instance_id(),
                troop = troop_index,
                "Troop destroyed building"
            );
        }
    }
}

/// Pick the nearest standing building for a troop at `(x, y)`.
///
/// Preferred building types narrow the search only while at least one of
/// them is still standing. Ties go to the earlier building in layout order.
#[must_use]
pub fn select_target(
    buildings: &[BuildingSnapshot],
    stats: &TroopStats,
    x: i32,
    y: i32,
) -> Option<usize> {
    let restrict = !stats.preferred_targets().is_empty()
        && buildings
            .iter()
            .any(|b| !b.is_destroyed() && stats.prefers(b.data_id()));

    let mut best: Option<(usize, i64)> = None;
    for (index, building) in buildings.iter().enumerate() {
        if building.is_destroyed() || (restrict && !stats.prefers(building.data_id())) {
            continue;
        }
        let (bx, by) = building.position();
        let distance = distance_squared(bx, by, x, y);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((index, distance));
        }
    }

    best.map(|(index, _)| index)
}
