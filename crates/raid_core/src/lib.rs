//! # Raid Core
//!
//! Deterministic battle resolution for base-raid battles.
//!
//! Given a defender layout and a stream of attacker commands, the engine
//! replays the commands against per-run copies of the buildings, lets spawned
//! troops fight over the elapsed attack time, and scores the outcome as
//! stars, destruction percentage and battle time.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No system randomness
//! - No IO beyond replay files
//!
//! This separation enables:
//! - Massively parallel evaluation (independent runs share nothing mutable)
//! - Headless batch and training runners
//! - Replay verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`global_id`] - Command id decoding
//! - [`layout`] - Immutable defender layouts
//! - [`troops`] - Troop stats and per-run troops
//! - [`command`] - Attack commands and ordering
//! - [`simulation`] - Scheduler, dispatcher and troop AI
//! - [`scoring`] - Battle results
//! - [`replay`] - Recorded battles
//! - [`data`] - Stats file data types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod command;
pub mod data;
pub mod error;
pub mod global_id;
pub mod layout;
pub mod math;
pub mod replay;
pub mod scoring;
pub mod simulation;
pub mod snapshot;
pub mod troops;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::command::{processing_order, BattleCommand, TICKS_PER_SECOND};
    pub use crate::data::{StatsFile, StatsTable};
    pub use crate::error::{GameError, Result};
    pub use crate::global_id::{class_id, CommandClass};
    pub use crate::layout::{
        BattleLayout, BuildingDefinition, BuildingDescriptor, BuildingStats, BuildingStatsProvider,
    };
    pub use crate::replay::BattleReplay;
    pub use crate::scoring::BattleResult;
    pub use crate::simulation::{
        BattleConfig, BattleOutcome, BattlePhase, BattleRun, BattleSimulator, SharedTroopStats,
    };
    pub use crate::snapshot::BuildingSnapshot;
    pub use crate::troops::{NoTroopStats, TroopInstance, TroopStats, TroopStatsProvider};
}
