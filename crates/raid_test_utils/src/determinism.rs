//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battle resolution produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Batch evaluation runs thousands of battles in parallel against one shared
//! layout, so a run must never observe another run or depend on scheduling.
//! Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized. The
//!   engine only uses maps for lookups and always walks buildings and troops
//!   in layout and spawn order.
//!
//! - **Shared mutable state**: each run builds fresh snapshots; the layout and
//!   stats are read-only.
//!
//! - **Sort stability**: commands sort on an explicit `(tick, index)` key.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Dispatcher, scheduler and troop AI in isolation
//! 2. **Property tests**: Random command streams produce repeatable results
//! 3. **Integration tests**: Scenario battles are reproducible
//! 4. **Parallel tests**: Running N battles on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use raid_core::prelude::*;
use tracing::warn;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Result hashes from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>) -> Self {
        let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
        if !is_deterministic {
            warn!(runs = hashes.len(), "Runs diverged");
        }
        Self {
            is_deterministic,
            hashes,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different results.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle resolution is non-deterministic!\n\
                 Runs: {}\n\
                 Unique results: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Hash every field of a result, floats by bit pattern.
#[must_use]
pub fn result_hash(result: &BattleResult) -> u64 {
    let mut hasher = DefaultHasher::new();
    result.stars.hash(&mut hasher);
    result.destruction_percentage.hash(&mut hasher);
    result.town_hall_destroyed.hash(&mut hasher);
    result.battle_time.hash(&mut hasher);
    result.preparation_time_remaining.to_bits().hash(&mut hasher);
    result.attack_time_remaining.to_bits().hash(&mut hasher);
    result.end_tick.hash(&mut hasher);
    hasher.finish()
}

/// Hash the observable end state of a run: the result plus every building.
#[must_use]
pub fn outcome_hash(outcome: &BattleOutcome) -> u64 {
    let mut hasher = DefaultHasher::new();
    result_hash(&outcome.result).hash(&mut hasher);
    for building in &outcome.buildings {
        building.instance_id().hash(&mut hasher);
        building.is_destroyed().hash(&mut hasher);
        building.remaining_hitpoints().to_bits().hash(&mut hasher);
    }
    outcome.troops.len().hash(&mut hasher);
    hasher.finish()
}

/// Run a battle multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the battle
/// * `setup` - Function building a fresh simulator for each run
/// * `commands` - The command stream to replay
///
/// # Example
///
/// ```
/// use raid_test_utils::determinism::verify_determinism;
/// use raid_test_utils::fixtures::{sample_commands, simulator, village_layout};
///
/// let result = verify_determinism(5, || simulator(village_layout()), &sample_commands());
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<Setup>(
    runs: usize,
    setup: Setup,
    commands: &[BattleCommand],
) -> DeterminismResult
where
    Setup: Fn() -> BattleSimulator,
{
    let hashes = (0..runs)
        .map(|_| outcome_hash(&setup().run_detailed(commands)))
        .collect();
    DeterminismResult::from_hashes(hashes)
}

/// Run the same battle on `num_threads` threads against one shared simulator.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_battles(
    simulator: &BattleSimulator,
    commands: &[BattleCommand],
    num_threads: usize,
) -> DeterminismResult {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_threads)
            .map(|_| s.spawn(|| outcome_hash(&simulator.run_detailed(commands))))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    DeterminismResult::from_hashes(hashes)
}

/// Step two runs in lockstep and report the first command after which they
/// differ.
///
/// Useful for debugging non-determinism by finding exactly which command
/// makes runs start to differ.
///
/// # Returns
///
/// `None` if the runs stay identical, `Some(index)` of the first command in
/// processing order after which they diverge.
#[must_use]
pub fn find_first_divergence(
    first: &BattleSimulator,
    second: &BattleSimulator,
    commands: &[BattleCommand],
) -> Option<usize> {
    let mut a = first.start();
    let mut b = second.start();

    for (index, command) in processing_order(commands).into_iter().enumerate() {
        a.submit(command);
        b.submit(command);
        if run_state(&a) != run_state(&b) {
            return Some(index);
        }
    }

    None
}

fn run_state(run: &BattleRun<'_>) -> (u64, u64, u64, Vec<(bool, u64)>) {
    (
        run.clock_ticks().to_bits(),
        run.preparation_time_remaining().to_bits(),
        run.attack_time_remaining().to_bits(),
        run.buildings()
            .iter()
            .map(|b| (b.is_destroyed(), b.remaining_hitpoints().to_bits()))
            .collect(),
    )
}

/// Verify that a replay round-trip through bytes still reproduces its
/// result.
#[must_use]
pub fn verify_replay_determinism(
    simulator: &BattleSimulator,
    commands: &[BattleCommand],
) -> bool {
    let replay = BattleReplay::record("determinism", simulator, commands);
    let Ok(bytes) = replay.to_bytes() else {
        return false;
    };
    let Ok(restored) = BattleReplay::from_bytes(&bytes) else {
        return false;
    };
    restored.verify(Some(simulator.troop_stats())).is_ok()
}
