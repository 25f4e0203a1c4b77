//! Attack command generators for the episode pipeline.
//!
//! A generator proposes the command stream for one episode. Generators that
//! learn from a known-good attack also accept seed commands before each
//! episode.

use raid_core::prelude::*;

use crate::pipeline::BattleContext;

/// Produces the commands for an episode.
pub trait CommandGenerator {
    /// Propose a command stream for the battle described by `context`.
    fn generate(&mut self, context: &BattleContext) -> Vec<BattleCommand>;

    /// Accept seed commands before an episode. Generators that cannot be
    /// seeded ignore this.
    fn seed(&mut self, _context: &BattleContext, _seed_commands: &[BattleCommand]) {}
}

/// Simple deterministic RNG for command shuffling.
#[derive(Debug, Clone)]
pub struct CommandRng {
    state: u64,
}

impl CommandRng {
    /// Create new RNG from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Get next random value.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(0x5_DEEC_E66D).wrapping_add(11);
        self.state
    }

    /// Get random index in `0..bound`. Returns 0 when `bound` is 0.
    pub fn next_below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        // Low bits of an LCG cycle quickly
        ((self.next() >> 33) % bound as u64) as usize
    }

    /// Shuffle a slice in place (Fisher-Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_below(i + 1);
            items.swap(i, j);
        }
    }
}

/// Re-emits the seed commands of the most recent warm start.
#[derive(Debug, Clone, Default)]
pub struct ReplayCommandGenerator {
    commands: Vec<BattleCommand>,
}

impl ReplayCommandGenerator {
    /// Create an unseeded generator; it emits nothing until seeded.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandGenerator for ReplayCommandGenerator {
    fn generate(&mut self, _context: &BattleContext) -> Vec<BattleCommand> {
        self.commands.clone()
    }

    fn seed(&mut self, _context: &BattleContext, seed_commands: &[BattleCommand]) {
        self.commands = seed_commands.to_vec();
    }
}

/// Emits a template in random order, pushing the k-th emitted command back
/// by k seconds.
///
/// The shuffle is driven by [`CommandRng`] from an explicit seed, so a run
/// of episodes is reproducible. Seed commands replace the template.
#[derive(Debug, Clone)]
pub struct ShuffledCommandGenerator {
    template: Vec<BattleCommand>,
    rng: CommandRng,
}

impl ShuffledCommandGenerator {
    /// Create a generator over `template`.
    pub fn new(template: Vec<BattleCommand>, seed: u64) -> Self {
        Self {
            template,
            rng: CommandRng::new(seed),
        }
    }

    /// The commands being shuffled.
    pub fn template(&self) -> &[BattleCommand] {
        &self.template
    }
}

impl CommandGenerator for ShuffledCommandGenerator {
    fn generate(&mut self, _context: &BattleContext) -> Vec<BattleCommand> {
        let mut commands = self.template.clone();
        self.rng.shuffle(&mut commands);

        let mut offset = 0i32;
        for command in &mut commands {
            command.tick = command.tick.saturating_add(offset);
            offset = offset.saturating_add(TICKS_PER_SECOND as i32);
        }
        commands
    }

    fn seed(&mut self, _context: &BattleContext, seed_commands: &[BattleCommand]) {
        self.template = seed_commands.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn context() -> BattleContext {
        let layout = BattleLayout::new([BuildingDefinition::new(
            500_000_001,
            1_000_000,
            100,
            false,
            1,
            1,
        )
        .unwrap()])
        .unwrap();
        BattleContext::new(Arc::new(layout), BattleConfig::default(), Vec::new())
    }

    fn template() -> Vec<BattleCommand> {
        (0..8).map(|i| BattleCommand::new(10, 1_000_000 + i, i, i)).collect()
    }

    #[test]
    fn test_rng_is_reproducible() {
        let mut a = CommandRng::new(7);
        let mut b = CommandRng::new(7);
        for _ in 0..20 {
            assert_eq!(a.next(), b.next());
        }
        assert_ne!(CommandRng::new(7).next(), CommandRng::new(8).next());
    }

    #[test]
    fn test_next_below_stays_in_bounds() {
        let mut rng = CommandRng::new(3);
        assert_eq!(rng.next_below(0), 0);
        for bound in 1..50 {
            assert!(rng.next_below(bound) < bound);
        }
    }

    #[test]
    fn test_replay_generator_emits_seed() {
        let mut generator = ReplayCommandGenerator::new();
        let ctx = context();
        assert!(generator.generate(&ctx).is_empty());

        let seed = template();
        generator.seed(&ctx, &seed);
        assert_eq!(generator.generate(&ctx), seed);
        assert_eq!(generator.generate(&ctx), seed);
    }

    #[test]
    fn test_shuffle_is_a_permutation_with_spread_ticks() {
        let mut generator = ShuffledCommandGenerator::new(template(), 42);
        let commands = generator.generate(&context());
        assert_eq!(commands.len(), 8);

        for (k, command) in commands.iter().enumerate() {
            assert_eq!(command.tick, 10 + 63 * k as i32);
        }

        let mut ids: Vec<_> = commands.iter().map(|c| c.data_id).collect();
        ids.sort_unstable();
        let expected: Vec<_> = template().iter().map(|c| c.data_id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_shuffle_depends_on_seed_only() {
        let ctx = context();
        let first = ShuffledCommandGenerator::new(template(), 9).generate(&ctx);
        let again = ShuffledCommandGenerator::new(template(), 9).generate(&ctx);
        assert_eq!(first, again);
    }

    #[test]
    fn test_seed_commands_replace_template() {
        let ctx = context();
        let mut generator = ShuffledCommandGenerator::new(template(), 1);
        let kill = [BattleCommand::new(0, 500_000_001, 0, 0)];
        generator.seed(&ctx, &kill);
        assert_eq!(generator.template(), kill.as_slice());
        assert_eq!(generator.generate(&ctx), kill.to_vec());

        generator.seed(&ctx, &[]);
        assert!(generator.generate(&ctx).is_empty());
    }

    #[test]
    fn test_empty_template() {
        let mut generator = ShuffledCommandGenerator::new(Vec::new(), 1);
        assert!(generator.generate(&context()).is_empty());
    }
}
