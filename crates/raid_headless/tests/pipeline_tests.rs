//! Episode pipeline tests for raid_headless.

use std::sync::Arc;

use raid_core::prelude::*;
use raid_headless::pipeline::{best_episode, mean_reward, run_episode};
use raid_headless::{
    run_episodes, BattleContext, BattlePolicy, EpisodeSeed, ReplayCommandGenerator,
    RewardWeights, ShuffledCommandGenerator, WeightedRewardPolicy,
};
use raid_test_utils::fixtures::{
    sample_commands, simulator, single_building_layout, village_layout, BRAWLER,
};

fn village_seed() -> EpisodeSeed {
    EpisodeSeed::new(simulator(village_layout())).with_seed_commands(sample_commands())
}

// =============================================================================
// Reference policy
// =============================================================================

mod weighted_policy {
    use super::*;

    #[test]
    fn test_replay_policy_plays_the_seed() {
        let mut policy = WeightedRewardPolicy::new(ReplayCommandGenerator::new());
        let episode = run_episode(&mut policy, &village_seed());

        assert_eq!(episode.commands, sample_commands());
        assert_eq!(episode.result, simulator(village_layout()).run(&sample_commands()));
        assert_eq!(episode.result.destruction_percentage, 61);
        // 2 stars * 10 + 61 + 180 s unused * 0.05
        assert!((episode.reward - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_unseeded_episode_scores_only_the_time_bonus() {
        let mut policy = WeightedRewardPolicy::new(ReplayCommandGenerator::new());
        let episode = run_episode(&mut policy, &EpisodeSeed::new(simulator(village_layout())));

        assert!(episode.commands.is_empty());
        assert_eq!(episode.result.stars, 0);
        assert!((episode.reward - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_reseeding_replaces_previous_seed() {
        let mut policy = WeightedRewardPolicy::new(ReplayCommandGenerator::new());
        let kill = vec![BattleCommand::new(0, 500_000_001, 0, 0)];
        let seeds = vec![
            village_seed(),
            EpisodeSeed::new(simulator(single_building_layout())).with_seed_commands(kill.clone()),
        ];

        let results = run_episodes(&mut policy, seeds);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].commands, kill);
        assert_eq!(results[1].result.destruction_percentage, 100);
    }

    #[test]
    fn test_custom_weights() {
        let weights = RewardWeights {
            star: 0.0,
            destruction: 0.0,
            time_bonus: 1.0,
        };
        let mut policy =
            WeightedRewardPolicy::new(ReplayCommandGenerator::new()).with_weights(weights);
        let episode = run_episode(&mut policy, &village_seed());
        assert!((episode.reward - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_shuffled_policy_is_reproducible() {
        let seeds = || (0..4).map(|_| village_seed()).collect::<Vec<_>>();

        let mut a = WeightedRewardPolicy::new(ShuffledCommandGenerator::new(sample_commands(), 5));
        let mut b = WeightedRewardPolicy::new(ShuffledCommandGenerator::new(sample_commands(), 5));
        let first = run_episodes(&mut a, seeds());
        let second = run_episodes(&mut b, seeds());

        assert_eq!(first.len(), 4);
        for (x, y) in first.iter().zip(&second) {
            assert_eq!(x.commands, y.commands);
            assert_eq!(x.result, y.result);
        }
    }

    #[test]
    fn test_shuffled_policy_shuffles_the_warm_start() {
        let mut policy =
            WeightedRewardPolicy::new(ShuffledCommandGenerator::new(sample_commands(), 5));
        let kill = vec![BattleCommand::new(0, 500_000_001, 0, 0)];
        let seed =
            EpisodeSeed::new(simulator(single_building_layout())).with_seed_commands(kill.clone());

        let episode = run_episode(&mut policy, &seed);
        assert_eq!(episode.commands, kill);
        assert_eq!(episode.result.destruction_percentage, 100);
        assert_eq!(policy.generator().template(), kill.as_slice());
    }
}

// =============================================================================
// Orchestration
// =============================================================================

mod orchestration {
    use super::*;

    /// Records the order of calls and always attacks with one brawler.
    #[derive(Default)]
    struct CallRecorder {
        calls: Vec<&'static str>,
        seen_seed: Vec<BattleCommand>,
    }

    impl BattlePolicy for CallRecorder {
        fn generate_commands(&mut self, _context: &BattleContext) -> Vec<BattleCommand> {
            self.calls.push("generate");
            vec![BattleCommand::new(0, BRAWLER, 50, 41)]
        }

        fn evaluate_reward(&self, result: &BattleResult, _context: &BattleContext) -> f64 {
            f64::from(result.destruction_percentage)
        }

        fn warm_start(&mut self, context: &BattleContext, seed_commands: &[BattleCommand]) {
            self.calls.push("warm_start");
            assert_eq!(context.seed_commands.as_slice(), seed_commands);
            self.seen_seed = seed_commands.to_vec();
        }
    }

    #[test]
    fn test_warm_start_precedes_generation() {
        let mut recorder = CallRecorder::default();
        run_episodes(&mut recorder, [village_seed(), village_seed()]);
        assert_eq!(
            recorder.calls,
            ["warm_start", "generate", "warm_start", "generate"]
        );
        assert_eq!(recorder.seen_seed, sample_commands());
    }

    #[test]
    fn test_context_shares_the_simulator_layout() {
        let sim = simulator(village_layout());
        let layout = sim.shared_layout();
        let mut recorder = CallRecorder::default();
        let episode = run_episode(&mut recorder, &EpisodeSeed::new(sim));

        assert!(Arc::ptr_eq(&episode.context.layout, &layout));
        assert_eq!(episode.context.config, BattleConfig::default());
        assert!(episode.context.seed_commands.is_empty());
    }

    #[test]
    fn test_episodes_do_not_leak_state() {
        let mut recorder = CallRecorder::default();
        let results = run_episodes(&mut recorder, [village_seed(), village_seed()]);
        assert_eq!(results[0].result, results[1].result);
        assert_eq!(results[0].reward, results[1].reward);
    }

    #[test]
    fn test_no_seeds_no_episodes() {
        let mut recorder = CallRecorder::default();
        assert!(run_episodes(&mut recorder, Vec::new()).is_empty());
        assert!(recorder.calls.is_empty());
        assert_eq!(mean_reward(&[]), 0.0);
        assert!(best_episode(&[]).is_none());
    }

    #[test]
    fn test_best_and_mean() {
        let mut policy = WeightedRewardPolicy::new(ReplayCommandGenerator::new());
        let results = run_episodes(
            &mut policy,
            [EpisodeSeed::new(simulator(village_layout())), village_seed()],
        );
        assert!((mean_reward(&results) - 49.5).abs() < 1e-9);
        let best = best_episode(&results).unwrap();
        assert_eq!(best.result.destruction_percentage, 61);
    }
}
