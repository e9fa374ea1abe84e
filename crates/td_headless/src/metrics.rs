//! Run metrics collection for balance analysis.
//!
//! [`MetricsCollector`] is a [`SimulationObserver`]: attach it to a run and
//! it records per-enemy spawn and death times, per-wave ratings and a
//! run-level balance score. It only reads events, so a run with a collector
//! attached plays out exactly like one without.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use td_core::combat::KillEvent;
use td_core::config::SimulationConfig;
use td_core::movement::LeakEvent;
use td_core::observer::SimulationObserver;
use td_core::result::{SimulationResult, WaveResult};
use td_core::session::{EnemyId, LiveEnemy};
use td_core::spawning::EnemyCategory;

/// Simulated seconds after which a wave's duration stops adding difficulty.
const DURATION_SATURATION_SECS: f64 = 60.0;

/// Upper bound of the difficulty rating.
pub const MAX_DIFFICULTY: f64 = 5.0;

/// Errors that can occur while exporting metrics.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to write the file.
    #[error("Failed to write metrics: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to serialize.
    #[error("Failed to serialize metrics: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifetime of one enemy instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemySpawnTiming {
    /// Enemy id within the run.
    pub enemy_id: EnemyId,
    /// Enemy type key.
    pub enemy_type: String,
    /// Spawn category.
    pub category: EnemyCategory,
    /// Simulated seconds from wave start to spawn.
    pub spawn_time: f64,
    /// Simulated seconds from wave start to death, if killed.
    pub death_time: Option<f64>,
    /// Whether the enemy reached the goal.
    pub leaked: bool,
}

impl EnemySpawnTiming {
    /// Seconds the enemy survived, if it was killed.
    #[must_use]
    pub fn time_alive(&self) -> Option<f64> {
        self.death_time.map(|death| death - self.spawn_time)
    }
}

/// Metrics for one wave.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveMetrics {
    /// 1-based wave number.
    pub wave_number: u32,
    /// Whether the wave completed.
    pub completed: bool,
    /// Enemies spawned.
    pub enemies_spawned: u32,
    /// Enemies killed.
    pub enemies_killed: u32,
    /// Enemies leaked.
    pub enemies_leaked: u32,
    /// Lives lost.
    pub lives_lost: u32,
    /// Money earned from kills and bonuses.
    pub money_earned: u32,
    /// Money spent on towers.
    pub money_spent: u32,
    /// Ticks played.
    pub ticks: u64,
    /// Simulated seconds.
    pub simulated_seconds: f64,
    /// Killed over spawned.
    pub completion_rate: f64,
    /// 0 (trivial) to 5.
    pub difficulty_rating: f64,
    /// Mean seconds between spawn and death of killed enemies.
    pub average_time_to_kill: Option<f64>,
    /// Per-enemy timings in id order.
    pub enemy_timings: Vec<EnemySpawnTiming>,
}

impl WaveMetrics {
    /// Killed over spawned, 1.0 for an empty wave.
    #[must_use]
    pub fn completion_rate_of(result: &WaveResult) -> f64 {
        if result.enemies_spawned == 0 {
            1.0
        } else {
            f64::from(result.enemies_killed) / f64::from(result.enemies_spawned)
        }
    }

    /// Difficulty rating of a wave.
    ///
    /// `1 - completion + 0.3 * lives_lost / max_lives + 0.1 * min(seconds / 60, 1)`,
    /// clamped to `0..=5`.
    #[must_use]
    pub fn difficulty_of(completion_rate: f64, lives_lost: u32, max_lives: u32, seconds: f64) -> f64 {
        let lives_share = f64::from(lives_lost) / f64::from(max_lives.max(1));
        let duration_share = (seconds / DURATION_SATURATION_SECS).min(1.0);
        (1.0 - completion_rate + 0.3 * lives_share + 0.1 * duration_share).clamp(0.0, MAX_DIFFICULTY)
    }
}

/// Metrics for a full run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationMetrics {
    /// Free-form run label.
    pub label: String,
    /// Seed of the run.
    pub seed: u64,
    /// Starting lives, the denominator of the lives ratios.
    pub max_lives: u32,
    /// Waves the run was configured for.
    pub max_waves: u32,
    /// Whether the run succeeded.
    pub success: bool,
    /// Whether the run was won.
    pub victory: bool,
    /// Failure reason, if any.
    pub failure_reason: Option<String>,
    /// Waves completed.
    pub waves_completed: u32,
    /// Final money.
    pub final_money: u32,
    /// Final lives.
    pub final_lives: u32,
    /// Final score.
    pub final_score: u64,
    /// Ticks across all waves.
    pub total_ticks: u64,
    /// Simulated seconds across all waves.
    pub simulated_seconds: f64,
    /// Mean wave completion rate.
    pub average_completion_rate: f64,
    /// Mean wave difficulty rating.
    pub average_difficulty: f64,
    /// Run balance score; higher is easier and steadier.
    pub balance_score: f64,
    /// Per-wave metrics.
    pub waves: Vec<WaveMetrics>,
    /// Extra numbers attached by callers.
    pub custom_metrics: BTreeMap<String, f64>,
}

impl SimulationMetrics {
    /// Balance score over a set of waves.
    ///
    /// `max(0, mean(completion) - variance(completion) + max(0, 1 - mean(lives_lost) / max_lives))`.
    /// Zero when there are no waves.
    #[must_use]
    pub fn balance_score_of(waves: &[WaveMetrics], max_lives: u32) -> f64 {
        if waves.is_empty() {
            return 0.0;
        }
        let n = waves.len() as f64;
        let mean = waves.iter().map(|w| w.completion_rate).sum::<f64>() / n;
        let variance = waves
            .iter()
            .map(|w| (w.completion_rate - mean).powi(2))
            .sum::<f64>()
            / n;
        let avg_lives_lost = waves.iter().map(|w| f64::from(w.lives_lost)).sum::<f64>() / n;
        let lives_term = (1.0 - avg_lives_lost / f64::from(max_lives.max(1))).max(0.0);
        (mean - variance + lives_term).max(0.0)
    }

    /// Attach a named number.
    pub fn set_custom(&mut self, name: impl Into<String>, value: f64) {
        self.custom_metrics.insert(name.into(), value);
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write pretty JSON to `path`, creating parent directories.
    pub fn export(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Read metrics previously written by [`export`](Self::export).
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// The hardest wave, if any.
    #[must_use]
    pub fn hardest_wave(&self) -> Option<&WaveMetrics> {
        self.waves
            .iter()
            .max_by(|a, b| a.difficulty_rating.total_cmp(&b.difficulty_rating))
    }
}

/// Summary statistics across many runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Runs summarized.
    pub total_runs: u32,
    /// Runs won.
    pub victories: u32,
    /// Victories over runs.
    pub victory_rate: f64,
    /// Mean waves completed.
    pub avg_waves_completed: f64,
    /// Mean final lives.
    pub avg_final_lives: f64,
    /// Mean final money.
    pub avg_final_money: f64,
    /// Mean balance score.
    pub avg_balance_score: f64,
    /// Fewest waves completed by any run.
    pub min_waves_completed: u32,
    /// Most waves completed by any run.
    pub max_waves_completed: u32,
    /// Mean difficulty per wave number, for waves any run reached.
    pub avg_difficulty_by_wave: BTreeMap<u32, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of run metrics.
    #[must_use]
    pub fn from_runs(runs: &[SimulationMetrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }

        let n = runs.len() as f64;
        let victories = runs.iter().filter(|r| r.victory).count() as u32;
        let mut per_wave: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for run in runs {
            for wave in &run.waves {
                per_wave
                    .entry(wave.wave_number)
                    .or_default()
                    .push(wave.difficulty_rating);
            }
        }

        Self {
            total_runs: runs.len() as u32,
            victories,
            victory_rate: f64::from(victories) / n,
            avg_waves_completed: runs.iter().map(|r| f64::from(r.waves_completed)).sum::<f64>() / n,
            avg_final_lives: runs.iter().map(|r| f64::from(r.final_lives)).sum::<f64>() / n,
            avg_final_money: runs.iter().map(|r| f64::from(r.final_money)).sum::<f64>() / n,
            avg_balance_score: runs.iter().map(|r| r.balance_score).sum::<f64>() / n,
            min_waves_completed: runs.iter().map(|r| r.waves_completed).min().unwrap_or(0),
            max_waves_completed: runs.iter().map(|r| r.waves_completed).max().unwrap_or(0),
            avg_difficulty_by_wave: per_wave
                .into_iter()
                .map(|(wave, ratings)| {
                    let avg = ratings.iter().sum::<f64>() / ratings.len() as f64;
                    (wave, avg)
                })
                .collect(),
        }
    }
}

/// Observer that builds [`SimulationMetrics`] while a run plays.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: SimulationMetrics,
    timings: BTreeMap<EnemyId, EnemySpawnTiming>,
}

impl MetricsCollector {
    /// Create a collector for a labelled run.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            metrics: SimulationMetrics {
                label: label.into(),
                ..SimulationMetrics::default()
            },
            timings: BTreeMap::new(),
        }
    }

    /// Metrics recorded so far.
    #[must_use]
    pub const fn current(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Attach a named number to the run.
    pub fn record_custom(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.set_custom(name, value);
    }

    /// Finalize and return the metrics.
    #[must_use]
    pub fn finish(self) -> SimulationMetrics {
        self.metrics
    }
}

impl SimulationObserver for MetricsCollector {
    fn on_run_started(&mut self, config: &SimulationConfig) {
        let label = std::mem::take(&mut self.metrics.label);
        let custom = std::mem::take(&mut self.metrics.custom_metrics);
        self.metrics = SimulationMetrics {
            label,
            seed: config.random_seed,
            max_lives: config.starting_lives,
            max_waves: config.max_waves,
            custom_metrics: custom,
            ..SimulationMetrics::default()
        };
        self.timings.clear();
    }

    fn on_wave_started(&mut self, _wave: u32, _enemy_count: usize) {
        self.timings.clear();
    }

    fn on_enemy_spawned(&mut self, _wave: u32, enemy: &LiveEnemy) {
        self.timings.insert(
            enemy.id,
            EnemySpawnTiming {
                enemy_id: enemy.id,
                enemy_type: enemy.enemy_type.clone(),
                category: enemy.category,
                spawn_time: enemy.spawn_time,
                death_time: None,
                leaked: false,
            },
        );
    }

    fn on_enemy_killed(&mut self, _wave: u32, kill: &KillEvent, time: f64) {
        if let Some(timing) = self.timings.get_mut(&kill.enemy_id) {
            timing.death_time = Some(time);
        }
    }

    fn on_enemy_leaked(&mut self, _wave: u32, leak: &LeakEvent, _time: f64) {
        if let Some(timing) = self.timings.get_mut(&leak.enemy_id) {
            timing.leaked = true;
        }
    }

    fn on_wave_finished(&mut self, result: &WaveResult) {
        let enemy_timings: Vec<EnemySpawnTiming> =
            std::mem::take(&mut self.timings).into_values().collect();
        let lifetimes: Vec<f64> = enemy_timings
            .iter()
            .filter_map(EnemySpawnTiming::time_alive)
            .collect();
        let average_time_to_kill =
            (!lifetimes.is_empty()).then(|| lifetimes.iter().sum::<f64>() / lifetimes.len() as f64);

        let completion_rate = WaveMetrics::completion_rate_of(result);
        let difficulty_rating = WaveMetrics::difficulty_of(
            completion_rate,
            result.lives_lost,
            self.metrics.max_lives,
            result.simulated_seconds,
        );

        self.metrics.waves.push(WaveMetrics {
            wave_number: result.wave_number,
            completed: result.completed,
            enemies_spawned: result.enemies_spawned,
            enemies_killed: result.enemies_killed,
            enemies_leaked: result.enemies_leaked,
            lives_lost: result.lives_lost,
            money_earned: result.money_earned,
            money_spent: result.money_spent,
            ticks: result.ticks,
            simulated_seconds: result.simulated_seconds,
            completion_rate,
            difficulty_rating,
            average_time_to_kill,
            enemy_timings,
        });
    }

    fn on_run_finished(&mut self, result: &SimulationResult) {
        let metrics = &mut self.metrics;
        metrics.success = result.success;
        metrics.victory = result.victory;
        metrics.failure_reason.clone_from(&result.failure_reason);
        metrics.waves_completed = result.waves_completed;
        metrics.final_money = result.final_money();
        metrics.final_lives = result.final_lives();
        metrics.final_score = result.final_score();
        metrics.total_ticks = result.total_ticks;
        metrics.simulated_seconds = result.simulated_seconds;

        if !metrics.waves.is_empty() {
            let n = metrics.waves.len() as f64;
            metrics.average_completion_rate =
                metrics.waves.iter().map(|w| w.completion_rate).sum::<f64>() / n;
            metrics.average_difficulty =
                metrics.waves.iter().map(|w| w.difficulty_rating).sum::<f64>() / n;
        }
        metrics.balance_score = SimulationMetrics::balance_score_of(&metrics.waves, metrics.max_lives);
    }
}
