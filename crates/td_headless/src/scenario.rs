//! Scenario loading and checking.
//!
//! A scenario is a named [`SimulationConfig`] plus the outcome it is expected
//! to produce. Scenario files are RON; every config field is optional:
//!
//! ```ron
//! (
//!     name: "Generous",
//!     description: "Plenty of money against weakened enemies",
//!     config: (
//!         starting_money: 1000,
//!         enemy_health_multiplier: 0.5,
//!         building_cost_multiplier: 0.5,
//!         max_waves: 5,
//!     ),
//!     expect: (victory: Some(true), min_waves_completed: Some(5)),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use td_core::config::SimulationConfig;
use td_core::result::SimulationResult;

use crate::config_loader::SimulationData;
use crate::runner::run_simulation;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Expected outcome of a scenario. Unset fields are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioExpectation {
    /// Whether the run should be won.
    pub victory: Option<bool>,
    /// Lower bound on waves completed.
    pub min_waves_completed: Option<u32>,
    /// Upper bound on waves completed.
    pub max_waves_completed: Option<u32>,
    /// Lower bound on lives at the end.
    pub min_final_lives: Option<u32>,
}

impl ScenarioExpectation {
    /// Describe every way `result` misses the expectation.
    #[must_use]
    pub fn mismatches(&self, result: &SimulationResult) -> Vec<String> {
        let mut found = Vec::new();
        if let Some(victory) = self.victory {
            if result.victory != victory {
                found.push(format!("expected victory = {victory}, got {}", result.victory));
            }
        }
        if let Some(min) = self.min_waves_completed {
            if result.waves_completed < min {
                found.push(format!(
                    "expected at least {min} waves completed, got {}",
                    result.waves_completed
                ));
            }
        }
        if let Some(max) = self.max_waves_completed {
            if result.waves_completed > max {
                found.push(format!(
                    "expected at most {max} waves completed, got {}",
                    result.waves_completed
                ));
            }
        }
        if let Some(min) = self.min_final_lives {
            if result.final_lives() < min {
                found.push(format!(
                    "expected at least {min} lives left, got {}",
                    result.final_lives()
                ));
            }
        }
        found
    }
}

/// A named configuration with an expected outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Run configuration.
    #[serde(default)]
    pub config: SimulationConfig,
    /// Expected outcome.
    #[serde(default)]
    pub expect: ScenarioExpectation,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(ron)?)
    }

    /// Load every `*.ron` in `dir`, sorted by file name.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Self>, ScenarioError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ScenarioError::FileNotFound(dir.display().to_string()));
        }
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
            .collect();
        paths.sort();
        paths.iter().map(Self::load).collect()
    }

    /// Plenty of money, half-health enemies, half-price towers, five waves.
    ///
    /// Expected to win every wave.
    #[must_use]
    pub fn generous() -> Self {
        Self {
            name: "generous".to_string(),
            description: "Ample money against weakened enemies".to_string(),
            config: SimulationConfig::default()
                .with_starting_money(1000)
                .with_enemy_health_multiplier(0.5)
                .with_building_cost_multiplier(0.5)
                .with_max_waves(5),
            expect: ScenarioExpectation {
                victory: Some(true),
                min_waves_completed: Some(5),
                min_final_lives: Some(1),
                ..ScenarioExpectation::default()
            },
        }
    }

    /// One tower's worth of money against ten-fold enemy health.
    ///
    /// Expected to fail well before wave ten.
    #[must_use]
    pub fn starved() -> Self {
        Self {
            name: "starved".to_string(),
            description: "One tower against ten-fold enemy health".to_string(),
            config: SimulationConfig::default()
                .with_starting_money(50)
                .with_enemy_health_multiplier(10.0)
                .with_max_waves(10),
            expect: ScenarioExpectation {
                victory: Some(false),
                max_waves_completed: Some(9),
                ..ScenarioExpectation::default()
            },
        }
    }

    /// The built-in scenario pair.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![Self::generous(), Self::starved()]
    }
}

/// Result of playing one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    /// Scenario name.
    pub name: String,
    /// The run result.
    pub result: SimulationResult,
    /// Expectation mismatches; empty when the scenario passed.
    pub mismatches: Vec<String>,
}

impl ScenarioOutcome {
    /// Whether the run met every expectation.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Play scenarios one at a time, in order.
pub fn run_scenarios(data: &SimulationData, scenarios: &[Scenario]) -> Vec<ScenarioOutcome> {
    scenarios
        .iter()
        .map(|scenario| {
            debug!(scenario = %scenario.name, "Running scenario");
            let result = run_simulation(&scenario.config, data);
            let mismatches = scenario.expect.mismatches(&result);
            if mismatches.is_empty() {
                info!(scenario = %scenario.name, summary = %result.summary(), "Scenario passed");
            } else {
                warn!(
                    scenario = %scenario.name,
                    mismatches = mismatches.len(),
                    summary = %result.summary(),
                    "Scenario failed"
                );
            }
            ScenarioOutcome {
                name: scenario.name.clone(),
                result,
                mismatches,
            }
        })
        .collect()
}
