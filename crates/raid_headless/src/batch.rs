//! Batch battle runner.
//!
//! Runs many games of one attack against one layout in parallel using
//! rayon. With shuffling enabled each game replays the attack in a
//! seed-determined order, which measures how sensitive the attack is to
//! command ordering; without it every game is a determinism check.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use raid_core::prelude::*;
use std::result::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::generators::{CommandGenerator, ReplayCommandGenerator, ShuffledCommandGenerator};
use crate::loader::{load_commands, load_config, load_layout, load_stats, LoadError};
use crate::pipeline::{run_episode, EpisodeResult, EpisodeSeed};
use crate::policy::{RewardWeights, WeightedRewardPolicy};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Defender layout (JSON)
    pub layout: PathBuf,
    /// Building and troop stats (JSON)
    pub stats: PathBuf,
    /// Attack commands (JSON), empty attack if absent
    pub commands: Option<PathBuf>,
    /// Battle timing config (RON), defaults if absent
    pub battle_config: Option<PathBuf>,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Starting seed for shuffled games
    pub seed_start: u64,
    /// Shuffle the attack per game
    pub shuffle_commands: bool,
    /// Record and verify a replay per game
    pub include_replays: bool,
    /// Reward weights
    pub weights: RewardWeights,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            layout: PathBuf::from("layout.json"),
            stats: PathBuf::from("stats.json"),
            commands: None,
            battle_config: None,
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            shuffle_commands: false,
            include_replays: false,
            weights: RewardWeights::default(),
        }
    }
}

impl BatchConfig {
    /// Create config for a layout and stats file
    pub fn new(layout: impl Into<PathBuf>, stats: impl Into<PathBuf>, game_count: u32) -> Self {
        Self {
            layout: layout.into(),
            stats: stats.into(),
            game_count,
            ..Default::default()
        }
    }

    /// Set the commands file
    pub fn with_commands(mut self, path: impl Into<PathBuf>) -> Self {
        self.commands = Some(path.into());
        self
    }

    /// Set the battle config file
    pub fn with_battle_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.battle_config = Some(path.into());
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Enable per-game shuffling
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle_commands = shuffle;
        self
    }

    /// Enable replay recording
    pub fn with_replays(mut self, include: bool) -> Self {
        self.include_replays = include;
        self
    }

    fn label(&self) -> String {
        self.layout
            .file_stem()
            .map_or_else(|| "layout".to_string(), |s| s.to_string_lossy().into_owned())
    }
}

/// Loaded inputs shared by every game of a batch
#[derive(Debug, Clone)]
pub struct BatchInputs {
    /// Simulator over the defender layout, with troop stats attached
    pub simulator: BattleSimulator,
    /// The attack
    pub commands: Vec<BattleCommand>,
}

impl BatchInputs {
    /// Load every file named by `config`
    pub fn load(config: &BatchConfig) -> Result<Self, LoadError> {
        let stats = Arc::new(load_stats(&config.stats)?);
        let layout = load_layout(&config.layout, stats.as_ref())?;
        let battle_config = match &config.battle_config {
            Some(path) => load_config(path)?,
            None => BattleConfig::default(),
        };
        let commands = match &config.commands {
            Some(path) => load_commands(path)?,
            None => Vec::new(),
        };

        let simulator = BattleSimulator::new(Arc::new(layout), battle_config)?
            .with_troop_stats(stats);
        Ok(Self {
            simulator,
            commands,
        })
    }
}

/// One resolved game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// Game index within the batch
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Commands as played
    pub commands: Vec<BattleCommand>,
    /// Battle result
    pub result: BattleResult,
    /// Weighted reward of the result
    pub reward: f64,
    /// Recorded replay, if requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay: Option<BattleReplay>,
}

/// Aggregate statistics over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games resolved
    pub total_games: u32,
    /// Mean stars
    pub mean_stars: f64,
    /// Mean destruction percentage
    pub mean_destruction: f64,
    /// Lowest destruction percentage
    pub min_destruction: u8,
    /// Highest destruction percentage
    pub max_destruction: u8,
    /// Mean reward
    pub mean_reward: f64,
    /// Games ending with 0, 1, 2 and 3 stars
    pub star_histogram: [u32; 4],
    /// Share of games that destroyed the town hall
    pub town_hall_rate: f64,
    /// Number of distinct results
    pub distinct_results: u32,
}

impl BatchSummary {
    /// Calculate summary from a list of games
    pub fn from_games(games: &[GameRecord]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let count = games.len() as f64;
        let mut summary = Self {
            total_games: games.len() as u32,
            min_destruction: u8::MAX,
            ..Default::default()
        };

        let mut stars = 0u64;
        let mut destruction = 0u64;
        let mut town_halls = 0u32;
        let mut distinct = HashSet::new();

        for game in games {
            let result = &game.result;
            stars += u64::from(result.stars);
            destruction += u64::from(result.destruction_percentage);
            summary.min_destruction = summary.min_destruction.min(result.destruction_percentage);
            summary.max_destruction = summary.max_destruction.max(result.destruction_percentage);
            summary.mean_reward += game.reward;
            summary.star_histogram[usize::from(result.stars.min(3))] += 1;
            if result.town_hall_destroyed {
                town_halls += 1;
            }
            distinct.insert(result_key(result));
        }

        summary.mean_stars = stars as f64 / count;
        summary.mean_destruction = destruction as f64 / count;
        summary.mean_reward /= count;
        summary.town_hall_rate = f64::from(town_halls) / count;
        summary.distinct_results = distinct.len() as u32;
        summary
    }
}

fn result_key(result: &BattleResult) -> (u8, u8, bool, u32, u64, u64, i64) {
    (
        result.stars,
        result.destruction_percentage,
        result.town_hall_destroyed,
        result.battle_time,
        result.preparation_time_remaining.to_bits(),
        result.attack_time_remaining.to_bits(),
        result.end_tick,
    )
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual games
    pub games: Vec<GameRecord>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Game with the highest reward, earliest on ties
    pub fn best_game(&self) -> Option<&GameRecord> {
        self.games.iter().fold(None, |best, g| match best {
            Some(b) if b.reward >= g.reward => Some(b),
            _ => Some(g),
        })
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

fn run_single_game(
    config: &BatchConfig,
    inputs: &BatchInputs,
    label: &str,
    seed: u64,
) -> Result<(Vec<BattleCommand>, BattleResult, f64, Option<BattleReplay>), String> {
    let episode = EpisodeSeed::new(inputs.simulator.clone())
        .with_seed_commands(inputs.commands.clone());

    let outcome = if config.shuffle_commands {
        let generator = ShuffledCommandGenerator::new(inputs.commands.clone(), seed);
        play(generator, config.weights, &episode)
    } else {
        play(ReplayCommandGenerator::new(), config.weights, &episode)
    };

    let replay = if config.include_replays {
        let replay = BattleReplay::record(label, &inputs.simulator, &outcome.commands);
        replay
            .verify(Some(inputs.simulator.troop_stats()))
            .map_err(|e| e.to_string())?;
        if replay.result != outcome.result {
            return Err(format!(
                "replay recorded {} but the game resolved {}",
                replay.result, outcome.result
            ));
        }
        Some(replay)
    } else {
        None
    };

    Ok((outcome.commands, outcome.result, outcome.reward, replay))
}

fn play<G: CommandGenerator>(
    generator: G,
    weights: RewardWeights,
    episode: &EpisodeSeed,
) -> EpisodeResult {
    let mut policy = WeightedRewardPolicy::new(generator).with_weights(weights);
    run_episode(&mut policy, episode)
}

/// Load the inputs named by `config` and run the batch
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, LoadError> {
    let inputs = BatchInputs::load(&config)?;
    Ok(run_batch_with(config, &inputs))
}

/// Run a batch over already loaded inputs
pub fn run_batch_with(config: BatchConfig, inputs: &BatchInputs) -> BatchResults {
    let start = Instant::now();
    let label = config.label();

    info!(
        "Starting batch run: {} games against '{}' ({} commands)",
        config.game_count,
        label,
        inputs.commands.len()
    );

    // Configure thread pool if specified
    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<GameRecord, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_single_game(&config, inputs, &label, seed) {
                Ok((commands, result, reward, replay)) => {
                    debug!(game = i, seed, %result, "Game resolved");
                    Ok(GameRecord {
                        game_index: i,
                        seed,
                        commands,
                        result,
                        reward,
                        replay,
                    })
                }
                Err(e) => {
                    warn!("Game {} failed: {}", i, e);
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e,
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameRecord> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.2}s, mean destruction {:.1}%, mean stars {:.2}",
        games.len(),
        duration_seconds,
        summary.mean_destruction,
        summary.mean_stars
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same battle `runs` times in parallel and check every run ends in
/// the same state
pub fn verify_determinism(
    simulator: &BattleSimulator,
    commands: &[BattleCommand],
    runs: u32,
) -> bool {
    let outcomes: Vec<BattleOutcome> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| simulator.run_detailed(commands))
        .collect();

    let first = &outcomes[0];
    outcomes
        .iter()
        .all(|o| o.result == first.result && o.buildings == first.buildings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stars: u8, destruction: u8, reward: f64) -> GameRecord {
        GameRecord {
            game_index: 0,
            seed: 0,
            commands: Vec::new(),
            result: BattleResult {
                stars,
                destruction_percentage: destruction,
                town_hall_destroyed: stars >= 2,
                battle_time: 0,
                preparation_time_remaining: 30.0,
                attack_time_remaining: 180.0,
                end_tick: 0,
            },
            reward,
            replay: None,
        }
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.game_count, 100);
        assert!(!config.shuffle_commands);
        assert_eq!(config.weights, RewardWeights::default());
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("bases/alpha.json", "stats.json", 500)
            .with_commands("attack.json")
            .with_seed(12345)
            .with_shuffle(true);

        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.commands, Some(PathBuf::from("attack.json")));
        assert!(config.shuffle_commands);
        assert_eq!(config.label(), "alpha");
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }

    #[test]
    fn test_summary() {
        let games = [record(0, 20, 1.0), record(2, 60, 5.0), record(3, 100, 9.0)];
        let summary = BatchSummary::from_games(&games);

        assert_eq!(summary.total_games, 3);
        assert!((summary.mean_stars - 5.0 / 3.0).abs() < 1e-9);
        assert!((summary.mean_destruction - 60.0).abs() < 1e-9);
        assert!((summary.mean_reward - 5.0).abs() < 1e-9);
        assert_eq!(summary.min_destruction, 20);
        assert_eq!(summary.max_destruction, 100);
        assert_eq!(summary.star_histogram, [1, 0, 1, 1]);
        assert!((summary.town_hall_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.distinct_results, 3);
    }

    #[test]
    fn test_identical_results_count_once() {
        let games = [record(2, 60, 5.0), record(2, 60, 5.0)];
        assert_eq!(BatchSummary::from_games(&games).distinct_results, 1);
    }
}
