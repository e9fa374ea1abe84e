//! Headless balance runner for the tower-defense simulator.
//!
//! Wraps [`td_core`] with everything a balance pass needs outside the core
//! wave loop:
//!
//! - **Config loading**: stat, placement and wave-set JSON from a directory
//! - **Metrics**: per-wave difficulty and a run balance score, exported as JSON
//! - **Scenarios**: RON-described configs with expected outcomes
//! - **Batch sweeps**: one config over many seeds, in parallel
//!
//! # Example
//!
//! ```bash
//! # Single run against the built-in data
//! cargo run -p td_headless -- run --waves 5
//!
//! # Run against a config directory and export metrics
//! cargo run -p td_headless -- --config-dir data run --metrics out/metrics.json
//!
//! # Seed sweep
//! cargo run -p td_headless -- batch --count 200 --output results/
//! ```

pub mod analyzer;
pub mod batch;
pub mod config_loader;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use analyzer::{analyze_batch, analyze_run, DifficultyBand, Severity, TuningAnalysis, TuningIssue};
pub use batch::{run_batch, BatchConfig, BatchError, BatchResults};
pub use config_loader::{ConfigLoadError, ConfigLocator, SimulationData};
pub use metrics::{
    BatchSummary, EnemySpawnTiming, ExportError, MetricsCollector, SimulationMetrics, WaveMetrics,
};
pub use runner::{
    run_simulation, run_simulation_async, run_simulation_with_metrics, verify_determinism,
    DeterminismReport,
};
pub use scenario::{run_scenarios, Scenario, ScenarioError, ScenarioExpectation, ScenarioOutcome};
