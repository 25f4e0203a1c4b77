//! Replay records for finished battles.
//!
//! A replay stores everything needed to resolve a battle again: the layout,
//! the config and the command stream, together with the result it produced.
//! Because runs are deterministic, re-running a replay must reproduce the
//! recorded result exactly. No simulation state is stored.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::command::BattleCommand;
use crate::error::{GameError, Result};
use crate::layout::BattleLayout;
use crate::scoring::BattleResult;
use crate::simulation::{BattleConfig, BattleSimulator, SharedTroopStats};

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// A recorded battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReplay {
    /// Replay format version.
    pub version: u32,
    /// Free-form label, e.g. the layout file name.
    pub label: String,
    /// The defending layout.
    pub layout: BattleLayout,
    /// Timing config.
    pub config: BattleConfig,
    /// Commands as submitted.
    pub commands: Vec<BattleCommand>,
    /// Result of the recorded run.
    pub result: BattleResult,
}

impl BattleReplay {
    /// Run a battle and record it.
    #[must_use]
    pub fn record(
        label: impl Into<String>,
        simulator: &BattleSimulator,
        commands: &[BattleCommand],
    ) -> Self {
        let result = simulator.run(commands);
        Self {
            version: REPLAY_VERSION,
            label: label.into(),
            layout: simulator.layout().clone(),
            config: *simulator.config(),
            commands: commands.to_vec(),
            result,
        }
    }

    /// Re-run the recorded battle.
    ///
    /// Troop stats are not part of the record; pass the same source the
    /// recording used.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored config no longer validates.
    pub fn replay(&self, troop_stats: Option<SharedTroopStats>) -> Result<BattleResult> {
        let mut simulator = BattleSimulator::new(Arc::new(self.layout.clone()), self.config)?;
        if let Some(troop_stats) = troop_stats {
            simulator = simulator.with_troop_stats(troop_stats);
        }
        Ok(simulator.run(&self.commands))
    }

    /// Re-run and compare against the recorded result.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ReplayMismatch`] if the results differ.
    pub fn verify(&self, troop_stats: Option<SharedTroopStats>) -> Result<BattleResult> {
        let replayed = self.replay(troop_stats)?;
        if replayed != self.result {
            warn!(label = %self.label, "Replay diverged from recording");
            return Err(GameError::ReplayMismatch {
                recorded: self.result.to_string(),
                replayed: replayed.to_string(),
            });
        }
        Ok(replayed)
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Encode to bytes.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize replay: {e}")))
    }

    /// Decode from bytes, checking the format version.
    ///
    /// # Errors
    /// Returns an error if decoding fails or the version does not match.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::Serialization(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }

        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        debug!(path = %path.as_ref().display(), "Saved replay");
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}
