//! Error types for battle resolution.
//!
//! Only layout and configuration problems are errors. Anything wrong with a
//! command stream is absorbed during the run so that a malformed attack can
//! only under-score, never abort evaluation.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all battle engine errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// The layout contains no building with positive hitpoints.
    #[error("A layout must contain at least one building")]
    EmptyLayout,

    /// A building definition failed validation.
    #[error("Invalid building (data id {data_id}): {reason}")]
    InvalidBuilding {
        /// Data id of the offending building.
        data_id: i32,
        /// What was wrong with it.
        reason: String,
    },

    /// No building stats exist for the requested data id and level.
    #[error("No building stats for data id {data_id} at level {level}")]
    StatsNotFound {
        /// Building data id.
        data_id: i32,
        /// Requested level.
        level: i32,
    },

    /// Troop stats failed validation.
    #[error("Invalid troop stats (data id {data_id}): {reason}")]
    InvalidTroopStats {
        /// Troop data id.
        data_id: i32,
        /// What was wrong with it.
        reason: String,
    },

    /// Battle configuration is out of range.
    #[error("Invalid battle configuration: {0}")]
    InvalidConfig(String),

    /// Failed to encode or decode a record.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A replayed battle produced a different result than the recorded one.
    #[error("Replay diverged: recorded {recorded}, replayed {replayed}")]
    ReplayMismatch {
        /// Recorded result, formatted.
        recorded: String,
        /// Result of the re-run, formatted.
        replayed: String,
    },
}
