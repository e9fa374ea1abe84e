//! Single-run entry points.
//!
//! Every function here returns a [`SimulationResult`] even when the run
//! cannot start: construction errors become a failed result carrying the
//! error message, so callers have one shape to report.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use td_core::config::SimulationConfig;
use td_core::result::SimulationResult;
use td_core::session::SessionState;

use crate::config_loader::SimulationData;
use crate::metrics::{MetricsCollector, SimulationMetrics};

fn aborted(config: &SimulationConfig, reason: String) -> SimulationResult {
    let session = SessionState::new(config.starting_money, config.starting_lives);
    SimulationResult::aborted(reason, session.snapshot())
}

/// Play one run of `config` against `data`.
pub fn run_simulation(config: &SimulationConfig, data: &SimulationData) -> SimulationResult {
    match data.runner(config.clone()) {
        Ok(mut runner) => runner.run(),
        Err(err) => {
            warn!(error = %err, "Run could not start");
            aborted(config, err.to_string())
        }
    }
}

/// Play one run with a [`MetricsCollector`] attached.
pub fn run_simulation_with_metrics(
    config: &SimulationConfig,
    data: &SimulationData,
    label: &str,
) -> (SimulationResult, SimulationMetrics) {
    let mut collector = MetricsCollector::new(label);
    let result = match data.runner(config.clone()) {
        Ok(mut runner) => runner.run_with_observer(&mut collector),
        Err(err) => {
            warn!(error = %err, label, "Run could not start");
            aborted(config, err.to_string())
        }
    };
    (result, collector.finish())
}

/// Play one run on tokio's blocking pool.
///
/// The run itself stays single-threaded. A panic inside the run becomes a
/// failed result.
pub async fn run_simulation_async(
    config: SimulationConfig,
    data: Arc<SimulationData>,
) -> SimulationResult {
    let fallback = config.clone();
    match tokio::task::spawn_blocking(move || run_simulation(&config, &data)).await {
        Ok(result) => result,
        Err(err) => {
            warn!(error = %err, "Simulation task failed");
            aborted(&fallback, format!("Simulation task failed: {err}"))
        }
    }
}

/// Outcome of replaying one config several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeterminismReport {
    /// Runs played.
    pub runs: u32,
    /// Outcome fingerprint of each run.
    pub fingerprints: Vec<u64>,
    /// Whether all fingerprints match.
    pub deterministic: bool,
}

/// Play `config` `runs` times and compare outcome fingerprints.
pub fn verify_determinism(
    config: &SimulationConfig,
    data: &SimulationData,
    runs: u32,
) -> DeterminismReport {
    let fingerprints: Vec<u64> = (0..runs)
        .map(|_| run_simulation(config, data).outcome().fingerprint())
        .collect();
    let deterministic = fingerprints.windows(2).all(|w| w[0] == w[1]);
    info!(runs, deterministic, "Determinism check finished");
    DeterminismReport {
        runs,
        fingerprints,
        deterministic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_test_utils::fixtures::{generous_config, quick_config};

    #[test]
    fn test_run_simulation_builtin() {
        let result = run_simulation(&generous_config(), &SimulationData::builtin());
        assert!(result.success, "{}", result.summary());
    }

    #[test]
    fn test_invalid_config_becomes_failed_result() {
        let config = quick_config(3).with_max_waves(0);
        let result = run_simulation(&config, &SimulationData::builtin());
        assert!(!result.success);
        assert!(result.wave_results.is_empty());
        let reason = result.failure_reason.unwrap_or_default();
        assert!(reason.starts_with("Configuration error"), "{reason}");
    }

    #[test]
    fn test_metrics_match_result() {
        let (result, metrics) =
            run_simulation_with_metrics(&quick_config(3), &SimulationData::builtin(), "quick");
        assert_eq!(metrics.label, "quick");
        assert_eq!(metrics.waves.len(), result.wave_results.len());
        assert_eq!(metrics.final_money, result.final_money());
    }

    #[test]
    fn test_verify_determinism_report() {
        let report = verify_determinism(&quick_config(2), &SimulationData::builtin(), 3);
        assert_eq!(report.runs, 3);
        assert_eq!(report.fingerprints.len(), 3);
        assert!(report.deterministic);
    }

    #[tokio::test]
    async fn test_async_run_matches_sync() {
        let data = Arc::new(SimulationData::builtin());
        let config = quick_config(3);
        let sync = run_simulation(&config, &data);
        let async_result = run_simulation_async(config, Arc::clone(&data)).await;
        assert_eq!(sync.outcome(), async_result.outcome());
    }
}
