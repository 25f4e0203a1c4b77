//! Episode pipeline for attack-policy training.
//!
//! Each episode pairs a fresh simulator with optional seed commands. The
//! policy is warm-started with the seeds, proposes a command stream, the
//! battle is resolved, and the policy scores the result. No battle logic
//! lives here; the simulator is the only source of outcomes.

use std::sync::Arc;

use raid_core::prelude::*;
use tracing::{debug, info};

/// Everything a policy may look at before proposing commands.
#[derive(Debug, Clone)]
pub struct BattleContext {
    /// Defending layout.
    pub layout: Arc<BattleLayout>,
    /// Timing config of the battle.
    pub config: BattleConfig,
    /// Seed commands handed to the episode.
    pub seed_commands: Vec<BattleCommand>,
}

impl BattleContext {
    /// Create a new context.
    pub fn new(
        layout: Arc<BattleLayout>,
        config: BattleConfig,
        seed_commands: Vec<BattleCommand>,
    ) -> Self {
        Self {
            layout,
            config,
            seed_commands,
        }
    }
}

/// An attack policy.
pub trait BattlePolicy {
    /// Propose the commands for the battle.
    fn generate_commands(&mut self, context: &BattleContext) -> Vec<BattleCommand>;

    /// Score a resolved battle.
    fn evaluate_reward(&self, result: &BattleResult, context: &BattleContext) -> f64;

    /// Called once per episode before [`BattlePolicy::generate_commands`].
    fn warm_start(&mut self, context: &BattleContext, seed_commands: &[BattleCommand]);
}

/// Input of one episode.
#[derive(Debug, Clone)]
pub struct EpisodeSeed {
    /// Simulator the episode runs on.
    pub simulator: BattleSimulator,
    /// Commands to warm-start the policy with.
    pub seed_commands: Vec<BattleCommand>,
}

impl EpisodeSeed {
    /// Create a seed without seed commands.
    pub fn new(simulator: BattleSimulator) -> Self {
        Self {
            simulator,
            seed_commands: Vec::new(),
        }
    }

    /// Builder method to set the seed commands.
    pub fn with_seed_commands(mut self, commands: Vec<BattleCommand>) -> Self {
        self.seed_commands = commands;
        self
    }
}

/// Outcome of one episode.
#[derive(Debug, Clone)]
pub struct EpisodeResult {
    /// Context the policy saw.
    pub context: BattleContext,
    /// Commands the policy proposed.
    pub commands: Vec<BattleCommand>,
    /// Resolved battle.
    pub result: BattleResult,
    /// Reward assigned by the policy.
    pub reward: f64,
}

/// Run one episode.
pub fn run_episode<P>(policy: &mut P, seed: &EpisodeSeed) -> EpisodeResult
where
    P: BattlePolicy + ?Sized,
{
    let context = BattleContext::new(
        seed.simulator.shared_layout(),
        *seed.simulator.config(),
        seed.seed_commands.clone(),
    );

    policy.warm_start(&context, &context.seed_commands);
    let commands = policy.generate_commands(&context);
    let result = seed.simulator.run(&commands);
    let reward = policy.evaluate_reward(&result, &context);

    debug!(
        commands = commands.len(),
        stars = result.stars,
        destruction = result.destruction_percentage,
        reward,
        "Episode resolved"
    );

    EpisodeResult {
        context,
        commands,
        result,
        reward,
    }
}

/// Run a sequence of episodes with one policy, in order.
pub fn run_episodes<P, I>(policy: &mut P, seeds: I) -> Vec<EpisodeResult>
where
    P: BattlePolicy + ?Sized,
    I: IntoIterator<Item = EpisodeSeed>,
{
    let results: Vec<EpisodeResult> = seeds
        .into_iter()
        .map(|seed| run_episode(policy, &seed))
        .collect();

    if !results.is_empty() {
        info!(
            "Ran {} episodes: mean reward {:.2}",
            results.len(),
            mean_reward(&results)
        );
    }
    results
}

/// Mean reward over `results`, 0 when empty.
pub fn mean_reward(results: &[EpisodeResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.reward).sum::<f64>() / results.len() as f64
}

/// Episode with the highest reward. Ties go to the earliest.
pub fn best_episode(results: &[EpisodeResult]) -> Option<&EpisodeResult> {
    results.iter().fold(None, |best, r| match best {
        Some(b) if b.reward >= r.reward => Some(b),
        _ => Some(r),
    })
}
