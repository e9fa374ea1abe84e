//! End-to-end tests for the headless pipeline: files in, reports out.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use td_core::config::SimulationConfig;
use td_headless::{
    analyze_run, run_batch, run_scenarios, run_simulation, run_simulation_async,
    run_simulation_with_metrics, BatchConfig, ConfigLocator, DifficultyBand, Scenario,
    SimulationData, SimulationMetrics,
};

const BUILDINGS: &str = r#"{
    "version": "1.0",
    "buildings": {
        "basic": { "cost": 50, "damage": 10, "range": 4.5, "fireRate": 4.0 },
        "cannon": { "cost": 100, "damage": 25, "range": 3.5, "fireRate": 1.5 }
    }
}"#;

const ENEMIES: &str = r#"{
    "enemies": {
        "basic": { "maxHealth": 100, "speed": 1.0, "damage": 1, "rewardGold": 10, "rewardXp": 5 },
        "fast": { "maxHealth": 60, "speed": 2.0, "damage": 1, "rewardGold": 8, "rewardXp": 4 }
    },
    "waveScaling": {
        "healthPerWave": 0.15, "speedPerWave": 0.02,
        "damageEveryNWaves": 3, "rewardPerWave": 0.1
    }
}"#;

const PLACEMENT: &str = r#"{
    "strategies": {
        "initialWave": {
            "buildingCategory": "basic",
            "positions": [[4, 6], [8, 4], [12, 6]],
            "maxCostPerBuilding": 100
        },
        "waveUpgrades": {
            "wave_2": { "category": "cannon", "costThreshold": 150, "position": [10, 6] }
        }
    },
    "fallbackStrategy": {
        "useDefaultType": true, "useCheapestType": true, "emergencyFallback": "basic"
    }
}"#;

const WAVE_SET: &str = r#"{
    "setName": "rush",
    "description": "Fast enemies only",
    "waves": [
        {
            "waveNumber": 1,
            "bonusMoney": 40,
            "enemyGroups": [ { "enemyType": "fast", "count": 4, "spawnInterval": 0.5 } ]
        }
    ]
}"#;

fn write_config_dir(dir: &Path) {
    fs::write(dir.join("buildings.json"), BUILDINGS).unwrap();
    fs::write(dir.join("enemies.json"), ENEMIES).unwrap();
    fs::write(dir.join("placement.json"), PLACEMENT).unwrap();
    fs::create_dir_all(dir.join("wave_sets")).unwrap();
    fs::write(dir.join("wave_sets").join("rush.json"), WAVE_SET).unwrap();
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_loaded_data_drives_a_run() {
    let dir = tempfile::tempdir().unwrap();
    write_config_dir(dir.path());
    let data = SimulationData::load(&ConfigLocator::new(dir.path())).unwrap();
    assert_eq!(data.buildings.len(), 2);
    assert!(data.wave_sets.contains_key("rush"));

    let config = SimulationConfig::default()
        .with_max_waves(2)
        .with_fast_mode(true);
    let result = run_simulation(&config, &data);
    // Three basic towers at 50 each.
    assert_eq!(result.wave_results[0].money_spent, 150);
}

#[test]
fn test_wave_set_from_disk_is_used() {
    let dir = tempfile::tempdir().unwrap();
    write_config_dir(dir.path());
    let data = SimulationData::load(&ConfigLocator::new(dir.path())).unwrap();

    let config = SimulationConfig::default()
        .with_max_waves(1)
        .with_wave_set("rush")
        .with_fast_mode(true);
    let result = run_simulation(&config, &data);
    assert_eq!(result.wave_results[0].enemies_spawned, 4);
}

#[test]
fn test_unloaded_wave_set_fails_the_run() {
    let config = SimulationConfig::default()
        .with_max_waves(1)
        .with_wave_set("nowhere");
    let result = run_simulation(&config, &SimulationData::builtin());
    assert!(!result.success);
    assert_eq!(
        result.failure_reason.as_deref(),
        Some("Unknown wave set: nowhere")
    );
}

// =============================================================================
// Reporting
// =============================================================================

#[test]
fn test_metrics_export_and_report() {
    let config = SimulationConfig::default().with_max_waves(3);
    let (result, metrics) =
        run_simulation_with_metrics(&config, &SimulationData::builtin(), "report");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    metrics.export(&path).unwrap();
    let loaded = SimulationMetrics::load(&path).unwrap();
    assert_eq!(loaded.waves.len(), result.wave_results.len());

    for wave in &loaded.waves {
        assert!((0.0..=5.0).contains(&wave.difficulty_rating));
        assert!((0.0..=1.0).contains(&wave.completion_rate));
    }
    assert!(loaded.balance_score >= 0.0);

    let report = analyze_run(&loaded, DifficultyBand::default()).to_markdown();
    assert!(report.starts_with("# Tuning Report"));
}

#[test]
fn test_scenario_files_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("01_generous.ron"),
        r#"(
            name: "generous",
            config: (
                starting_money: 1000,
                enemy_health_multiplier: 0.5,
                building_cost_multiplier: 0.5,
                max_waves: 5,
            ),
            expect: (victory: Some(true)),
        )"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("02_starved.ron"),
        r#"(
            name: "starved",
            config: (starting_money: 50, enemy_health_multiplier: 10.0),
            expect: (victory: Some(false), max_waves_completed: Some(9)),
        )"#,
    )
    .unwrap();

    let scenarios = Scenario::load_dir(dir.path()).unwrap();
    let outcomes = run_scenarios(&SimulationData::builtin(), &scenarios);
    let names: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["generous", "starved"]);
    assert!(outcomes.iter().all(|o| o.passed()));
}

#[test]
fn test_batch_summary_over_seeds() {
    let config = BatchConfig::new(
        SimulationConfig::default()
            .with_max_waves(3)
            .with_fast_mode(true),
        6,
    );
    let results = run_batch(config, &SimulationData::builtin()).unwrap();
    assert_eq!(results.summary.total_runs, 6);
    assert!((0.0..=1.0).contains(&results.summary.victory_rate));
    assert!(results.summary.avg_waves_completed <= 3.0);
}

// =============================================================================
// Async
// =============================================================================

#[tokio::test]
async fn test_concurrent_async_runs_are_independent() {
    let data = Arc::new(SimulationData::builtin());
    let config = SimulationConfig::default()
        .with_max_waves(3)
        .with_fast_mode(true);

    let first = tokio::spawn(run_simulation_async(config.clone(), Arc::clone(&data)));
    let second = tokio::spawn(run_simulation_async(config, Arc::clone(&data)));
    let (first, second) = (first.await.unwrap(), second.await.unwrap());
    assert_eq!(first.outcome(), second.outcome());
}
