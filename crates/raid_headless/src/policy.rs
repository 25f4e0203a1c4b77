//! Reward shaping.

use raid_core::prelude::*;
use raid_core::scoring::SCORED_ATTACK_SECONDS;
use serde::{Deserialize, Serialize};

use crate::generators::CommandGenerator;
use crate::pipeline::{BattleContext, BattlePolicy};

/// Weights of the reward terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Per star earned.
    pub star: f64,
    /// Per destruction percentage point.
    pub destruction: f64,
    /// Per second of the 180 s attack window left unused.
    pub time_bonus: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            star: 10.0,
            destruction: 1.0,
            time_bonus: 0.05,
        }
    }
}

/// `stars * star + destruction * destruction + (180 - battle_time) * time_bonus`.
pub fn weighted_reward(result: &BattleResult, weights: &RewardWeights) -> f64 {
    let unused = SCORED_ATTACK_SECONDS - f64::from(result.battle_time);
    f64::from(result.stars) * weights.star
        + f64::from(result.destruction_percentage) * weights.destruction
        + unused * weights.time_bonus
}

/// Policy pairing a command generator with a weighted reward.
#[derive(Debug, Clone)]
pub struct WeightedRewardPolicy<G> {
    generator: G,
    weights: RewardWeights,
}

impl<G: CommandGenerator> WeightedRewardPolicy<G> {
    /// Create a policy with the default weights.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            weights: RewardWeights::default(),
        }
    }

    /// Builder method to set the weights.
    pub fn with_weights(mut self, weights: RewardWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Current weights.
    pub fn weights(&self) -> &RewardWeights {
        &self.weights
    }

    /// The wrapped generator.
    pub fn generator(&self) -> &G {
        &self.generator
    }
}

impl<G: CommandGenerator> BattlePolicy for WeightedRewardPolicy<G> {
    fn generate_commands(&mut self, context: &BattleContext) -> Vec<BattleCommand> {
        self.generator.generate(context)
    }

    fn evaluate_reward(&self, result: &BattleResult, _context: &BattleContext) -> f64 {
        weighted_reward(result, &self.weights)
    }

    fn warm_start(&mut self, context: &BattleContext, seed_commands: &[BattleCommand]) {
        self.generator.seed(context, seed_commands);
    }
}
