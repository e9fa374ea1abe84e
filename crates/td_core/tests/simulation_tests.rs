//! End-to-end tests for td_core.
//!
//! These tests play full sessions and check the properties balance reports
//! rely on: repeatability, wave numbering, lives bounds and reward rules.

use td_core::prelude::*;
use td_test_utils::fixtures::{
    builtin_runner, generous_config, quick_config, sample_wave_set, small_building_catalog,
    small_enemy_catalog, starved_config,
};

// =============================================================================
// Scenario Tests
// =============================================================================

mod scenarios {
    use super::*;

    #[test]
    fn test_generous_config_wins_all_five_waves() {
        let result = builtin_runner(generous_config()).run();
        assert!(result.success, "{}", result.summary());
        assert!(result.victory);
        assert_eq!(result.waves_completed, 5);
        assert!(result.final_lives() > 0);
        assert!(result.summary().starts_with("SUCCESS: Completed 5 waves"));
    }

    #[test]
    fn test_starved_config_fails_early() {
        let result = builtin_runner(starved_config()).run();
        assert!(!result.success);
        assert!(!result.victory);
        let reason = result.failure_reason.clone().unwrap_or_default();
        assert!(!reason.is_empty());
        assert!(result.waves_completed < 10);
    }

    #[test]
    fn test_starved_run_buys_a_single_tower() {
        let result = builtin_runner(starved_config()).run();
        assert_eq!(result.wave_results[0].money_spent, 50);
        assert_eq!(result.final_state.tower_count, 1);
    }

    #[test]
    fn test_custom_catalogs_are_injected() {
        let placement = PlacementConfig::default();
        let mut runner = SimulationRunner::new(
            quick_config(2),
            small_building_catalog(),
            small_enemy_catalog(),
            placement,
        )
        .unwrap();
        let result = runner.run();
        // "basic" is unknown to the small catalog: the cheapest type is used.
        assert_eq!(result.wave_results[0].money_spent, 160);
        assert_eq!(result.final_state.tower_count, 4);
    }

    #[test]
    fn test_authored_wave_set_drives_spawns() {
        let config = quick_config(2).with_wave_set("fixture");
        let mut runner = builtin_runner(config).with_wave_set(sample_wave_set()).unwrap();
        let result = runner.run();
        assert_eq!(result.wave_results[0].enemies_spawned, 3);
        if let Some(second) = result.wave_results.get(1) {
            assert_eq!(second.enemies_spawned, 3);
        }
    }
}

// =============================================================================
// Economy Tests
// =============================================================================

mod economy {
    use super::*;

    /// No kills and every enemy leaks: the wave's only money movement is the
    /// placement spend, whether or not lives remain afterwards.
    #[test]
    fn test_money_conserved_without_kills() {
        for lives in [3, 20] {
            let config = SimulationConfig::default()
                .with_building_damage_multiplier(0.0)
                .with_starting_lives(lives)
                .with_max_waves(1);
            let result = builtin_runner(config.clone()).run();
            let wave = &result.wave_results[0];
            assert_eq!(wave.enemies_killed, 0);
            assert_eq!(wave.completed, lives > wave.enemies_spawned);
            assert_eq!(result.final_money(), config.starting_money - wave.money_spent);
        }
    }

    #[test]
    fn test_money_conserved_over_several_leaking_waves() {
        let config = SimulationConfig::default()
            .with_building_damage_multiplier(0.0)
            .with_starting_lives(100)
            .with_max_waves(3);
        let result = builtin_runner(config.clone()).run();
        assert!(result.victory, "{}", result.summary());
        let spent: u32 = result.wave_results.iter().map(|w| w.money_spent).sum();
        assert_eq!(result.final_money(), config.starting_money - spent);
    }

    #[test]
    fn test_completion_bonus_formula() {
        let result = builtin_runner(generous_config()).run();
        let wave = &result.wave_results[0];
        // Built-in wave 1 is five basic enemies worth 10 gold each.
        assert_eq!(wave.enemies_killed, 5);
        let kill_gold = 5 * 10;
        let bonus = 5 * 5 + 10;
        assert_eq!(wave.money_earned, kill_gold + bonus);
    }

    #[test]
    fn test_score_never_decreases_across_waves() {
        let result = builtin_runner(generous_config()).run();
        let total: u64 = result.wave_results.iter().map(|w| w.score_earned).sum();
        assert_eq!(total, result.final_score());
    }
}

// =============================================================================
// Property Tests
// =============================================================================

mod properties {
    use super::*;
    use td_test_utils::determinism::strategies::{
        arb_config, arb_fixed_speed, arb_multiplier, arb_vec2_position, arb_wave,
    };
    use td_test_utils::proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_runs_are_deterministic(config in arb_config()) {
            let first = builtin_runner(config.clone()).run();
            let second = builtin_runner(config).run();
            prop_assert_eq!(first.outcome(), second.outcome());
        }

        #[test]
        fn prop_wave_numbers_are_contiguous(config in arb_config()) {
            let result = builtin_runner(config).run();
            for (index, wave) in result.wave_results.iter().enumerate() {
                prop_assert_eq!(wave.wave_number, index as u32 + 1);
            }
            let completed = result.wave_results.iter().take_while(|w| w.completed).count();
            prop_assert_eq!(completed as u32, result.waves_completed);
        }

        #[test]
        fn prop_lives_stay_within_bounds(config in arb_config()) {
            let starting = config.starting_lives;
            let result = builtin_runner(config).run();
            let lost: u32 = result.wave_results.iter().map(|w| w.lives_lost).sum();
            prop_assert!(result.final_lives() <= starting);
            prop_assert_eq!(result.final_lives(), starting - lost);
            if !result.success {
                prop_assert!(result.failure_reason.is_some());
            }
        }

        #[test]
        fn prop_waves_finish_within_budget(config in arb_config()) {
            let result = builtin_runner(config.clone()).run();
            for wave in &result.wave_results {
                prop_assert!(wave.ticks <= config.max_ticks_per_wave);
                let resolved = wave.enemies_killed + wave.enemies_leaked;
                if wave.completed {
                    prop_assert_eq!(resolved, wave.enemies_spawned);
                } else {
                    prop_assert!(resolved <= wave.enemies_spawned);
                }
            }
        }

        #[test]
        fn prop_movement_never_overshoots(
            start in arb_vec2_position(),
            goal in arb_vec2_position(),
            step in arb_fixed_speed(),
        ) {
            let before = start.distance(goal);
            let moved = start.move_towards(goal, step);
            if step >= before {
                prop_assert_eq!(moved, goal);
            } else {
                prop_assert!(moved.distance(goal) < before);
            }
        }

        #[test]
        fn prop_scaled_health_grows_with_wave(wave in arb_wave(), health in arb_multiplier()) {
            let catalog = EnemyCatalog::builtin().with_multipliers(
                td_core::stats::EnemyMultipliers { health, speed: 1.0 },
            );
            let current = catalog.scaled_stats_for_wave("basic", wave).unwrap();
            let next = catalog.scaled_stats_for_wave("basic", wave + 1).unwrap();
            prop_assert!(next.max_health > current.max_health);
            prop_assert!(next.damage >= current.damage);
        }
    }
}
