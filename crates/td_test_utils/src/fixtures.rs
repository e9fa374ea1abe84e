//! Test fixtures and helpers.
//!
//! Small in-memory catalogs, configs and wave sets for consistent testing.

use std::collections::BTreeMap;

use fixed::types::I32F32;
use td_core::config::SimulationConfig;
use td_core::data::{
    BuildingStatsEntry, EnemyGroup, EnemyStatsEntry, PlacementConfig, WaveDefinition, WaveScaling,
    WaveSet,
};
use td_core::providers::{BuildingCatalog, EnemyCatalog};
use td_core::simulation::SimulationRunner;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A building entry with default sounds.
#[must_use]
pub fn building_entry(cost: u32, damage: u32, range: f64, fire_rate: f64) -> BuildingStatsEntry {
    BuildingStatsEntry {
        cost,
        damage,
        range,
        fire_rate,
        bullet_speed: 10.0,
        shoot_sound: "shoot_test".to_string(),
        impact_sound: "impact_test".to_string(),
        description: String::new(),
    }
}

/// An enemy entry.
#[must_use]
pub fn enemy_entry(max_health: u32, speed: f64, reward_gold: u32) -> EnemyStatsEntry {
    EnemyStatsEntry {
        max_health,
        speed,
        damage: 1,
        reward_gold,
        reward_xp: reward_gold / 2,
        description: String::new(),
    }
}

/// Two-tower catalog without a default key.
///
/// Unknown keys resolve to `"gun"`, the first entry in key order.
///
/// # Panics
///
/// Never: the entries are valid.
#[must_use]
pub fn small_building_catalog() -> BuildingCatalog {
    let entries: BTreeMap<String, BuildingStatsEntry> = [
        ("gun".to_string(), building_entry(40, 8, 4.0, 2.0)),
        ("mortar".to_string(), building_entry(90, 30, 6.0, 0.5)),
    ]
    .into_iter()
    .collect();
    BuildingCatalog::new(entries).expect("fixture catalog is valid")
}

/// Single-enemy catalog keyed `"basic"`.
///
/// # Panics
///
/// Never: the entries are valid.
#[must_use]
pub fn small_enemy_catalog() -> EnemyCatalog {
    let entries: BTreeMap<String, EnemyStatsEntry> =
        [("basic".to_string(), enemy_entry(50, 1.0, 5))].into_iter().collect();
    EnemyCatalog::new(entries, WaveScaling::default()).expect("fixture catalog is valid")
}

/// Short run against the built-in data.
#[must_use]
pub fn quick_config(waves: u32) -> SimulationConfig {
    SimulationConfig::default()
        .with_max_waves(waves)
        .with_fast_mode(true)
}

/// Plenty of money, weak enemies, cheap towers, five waves.
#[must_use]
pub fn generous_config() -> SimulationConfig {
    SimulationConfig::default()
        .with_starting_money(1000)
        .with_enemy_health_multiplier(0.5)
        .with_building_cost_multiplier(0.5)
        .with_max_waves(5)
}

/// One tower's worth of money against ten-fold enemy health.
#[must_use]
pub fn starved_config() -> SimulationConfig {
    SimulationConfig::default()
        .with_starting_money(50)
        .with_enemy_health_multiplier(10.0)
        .with_max_waves(10)
}

/// Runner over the built-in catalogs and placement.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn builtin_runner(config: SimulationConfig) -> SimulationRunner {
    SimulationRunner::new(
        config,
        BuildingCatalog::builtin(),
        EnemyCatalog::builtin(),
        PlacementConfig::default(),
    )
    .expect("fixture config is valid")
}

/// Two-wave authored set named `"fixture"`.
#[must_use]
pub fn sample_wave_set() -> WaveSet {
    let group = |enemy_type: &str, count: u32, money_reward: Option<u32>| EnemyGroup {
        enemy_type: enemy_type.to_string(),
        count,
        spawn_interval: 0.5,
        start_delay: 1.0,
        health_multiplier: 1.0,
        speed_multiplier: 1.0,
        money_reward,
    };
    WaveSet {
        set_name: "fixture".to_string(),
        description: "Fixture waves".to_string(),
        waves: vec![
            WaveDefinition {
                wave_number: 1,
                wave_name: "Runners".to_string(),
                pre_wave_delay: 2.0,
                post_wave_delay: 1.0,
                bonus_money: 20,
                enemy_groups: vec![group("fast", 3, None)],
            },
            WaveDefinition {
                wave_number: 2,
                wave_name: "Mixed".to_string(),
                pre_wave_delay: 2.0,
                post_wave_delay: 1.0,
                bonus_money: 30,
                enemy_groups: vec![group("basic", 2, Some(15)), group("tank", 1, None)],
            },
        ],
    }
}
