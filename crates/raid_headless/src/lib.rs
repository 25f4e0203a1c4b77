//! Headless battle runner for attack evaluation and CI verification.
//!
//! Wraps the `raid_core` engine with everything that touches the outside
//! world:
//!
//! - **Loading**: layouts, stats tables and command lists from JSON, battle
//!   configs from RON ([`loader`])
//! - **Episodes**: policy-driven attack generation and reward scoring
//!   ([`pipeline`], [`policy`], [`generators`])
//! - **Batches**: many games in parallel with aggregate statistics
//!   ([`batch`])
//! - **Interactive entry**: typing an attack line by line ([`interactive`])
//!
//! # Example
//!
//! ```bash
//! # Resolve one attack
//! cargo run -p raid_headless -- simulate --layout base.json --stats stats.json \
//!     --commands attack.json
//!
//! # Shuffle the attack order 1000 times and summarise
//! cargo run -p raid_headless -- batch --layout base.json --stats stats.json \
//!     --commands attack.json --count 1000 --shuffle --output results/batch.json
//!
//! # Verify determinism
//! cargo run -p raid_headless -- verify --layout base.json --stats stats.json \
//!     --commands attack.json
//! ```

pub mod batch;
pub mod generators;
pub mod interactive;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod policy;

pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary};
pub use generators::{CommandGenerator, ReplayCommandGenerator, ShuffledCommandGenerator};
pub use loader::LoadError;
pub use pipeline::{run_episodes, BattleContext, BattlePolicy, EpisodeResult, EpisodeSeed};
pub use policy::{RewardWeights, WeightedRewardPolicy};
