//! Seed sweeps.
//!
//! Plays one configuration over a range of seeds in parallel with rayon and
//! aggregates the run metrics into a [`BatchSummary`]. Each run owns its
//! session and RNG; the only shared state is a progress counter.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use td_core::config::SimulationConfig;
use td_core::error::SimError;

use crate::config_loader::SimulationData;
use crate::metrics::{BatchSummary, ExportError, MetricsCollector, SimulationMetrics};

/// Errors that stop a batch from starting.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The base config or data is invalid.
    #[error(transparent)]
    Config(#[from] SimError),
    /// The worker pool could not be built.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for a seed sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    /// Label attached to every run's metrics.
    pub label: String,
    /// Config shared by all runs; only the seed changes.
    pub base: SimulationConfig,
    /// Number of runs.
    pub run_count: u32,
    /// Seed of the first run; run `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Worker threads (0 = rayon default).
    pub parallel_runs: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            label: "batch".to_string(),
            base: SimulationConfig::default().with_fast_mode(true),
            run_count: 100,
            seed_start: 0,
            parallel_runs: 0,
        }
    }
}

impl BatchConfig {
    /// Sweep `run_count` seeds of `base`.
    #[must_use]
    pub fn new(base: SimulationConfig, run_count: u32) -> Self {
        Self {
            base,
            run_count,
            ..Self::default()
        }
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set seed start.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set worker threads.
    #[must_use]
    pub const fn with_parallelism(mut self, threads: u32) -> Self {
        self.parallel_runs = threads;
        self
    }

    /// Seed of run `index`.
    #[must_use]
    pub const fn seed_for(&self, index: u32) -> u64 {
        self.seed_start.wrapping_add(index as u64)
    }
}

/// Results from a seed sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-run metrics in seed order.
    pub runs: Vec<SimulationMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Completed-run counter shared by the workers.
#[derive(Debug)]
struct BatchProgress {
    total: u32,
    completed: AtomicU32,
}

impl BatchProgress {
    const fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
        }
    }

    fn record_completion(&self) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % 10 == 0 || done == self.total {
            debug!("Progress: {}/{}", done, self.total);
        }
    }
}

fn play_seed(
    config: &BatchConfig,
    data: &SimulationData,
    index: u32,
    progress: &BatchProgress,
) -> Result<SimulationMetrics, SimError> {
    let seed = config.seed_for(index);
    let mut runner = data.runner(config.base.clone().with_seed(seed))?;
    let mut collector = MetricsCollector::new(format!("{}#{index}", config.label));
    runner.run_with_observer(&mut collector);
    progress.record_completion();
    Ok(collector.finish())
}

/// Run a seed sweep.
///
/// Fails before any run is played if the base config is invalid.
pub fn run_batch(config: BatchConfig, data: &SimulationData) -> Result<BatchResults, BatchError> {
    data.runner(config.base.clone())?;

    let start = Instant::now();
    let progress = BatchProgress::new(config.run_count);
    info!(
        label = %config.label,
        runs = config.run_count,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    let play_all = || -> Result<Vec<SimulationMetrics>, SimError> {
        (0..config.run_count)
            .into_par_iter()
            .map(|i| play_seed(&config, data, i, &progress))
            .collect()
    };

    let runs = if config.parallel_runs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_runs as usize)
            .build()?
            .install(play_all)?
    } else {
        play_all()?
    };

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} runs in {:.1}s, victory rate {:.1}%",
        runs.len(),
        duration_seconds,
        summary.victory_rate * 100.0
    );

    Ok(BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_test_utils::fixtures::quick_config;

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(quick_config(3), 500)
            .with_label("sweep")
            .with_seed(12345)
            .with_parallelism(2);

        assert_eq!(config.label, "sweep");
        assert_eq!(config.run_count, 500);
        assert_eq!(config.seed_for(3), 12348);
        assert_eq!(config.parallel_runs, 2);
    }

    #[test]
    fn test_run_batch_small() {
        let config = BatchConfig::new(quick_config(3), 8).with_seed(100);
        let results = run_batch(config, &SimulationData::builtin()).unwrap();

        assert_eq!(results.runs.len(), 8);
        assert_eq!(results.summary.total_runs, 8);
        let seeds: Vec<u64> = results.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, (100..108).collect::<Vec<u64>>());
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let data = SimulationData::builtin();
        let config = BatchConfig::new(quick_config(2), 4).with_parallelism(2);
        let results = run_batch(config.clone(), &data).unwrap();

        for (i, metrics) in results.runs.iter().enumerate() {
            let seed = config.seed_for(i as u32);
            let result = data
                .runner(config.base.clone().with_seed(seed))
                .unwrap()
                .run();
            assert_eq!(metrics.final_money, result.final_money());
            assert_eq!(metrics.waves_completed, result.waves_completed);
        }
    }

    #[test]
    fn test_invalid_base_config_fails_up_front() {
        let config = BatchConfig::new(quick_config(1).with_max_waves(0), 4);
        let err = run_batch(config, &SimulationData::builtin()).unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));
    }

    #[test]
    fn test_batch_results_save_load() {
        let config = BatchConfig::new(quick_config(2), 3).with_label("saved");
        let results = run_batch(config, &SimulationData::builtin()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("batch.json");
        results.save(&path).unwrap();

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.runs.len(), 3);
        assert_eq!(loaded.config.label, "saved");
        assert_eq!(loaded.summary, results.summary);
    }
}
