//! Output records of a run.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use crate::session::SessionSnapshot;

/// Outcome of one wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveResult {
    /// 1-based wave number.
    pub wave_number: u32,
    /// Whether every enemy was dealt with and lives remain.
    pub completed: bool,
    /// Enemies spawned.
    pub enemies_spawned: u32,
    /// Enemies killed by towers.
    pub enemies_killed: u32,
    /// Enemies that reached the goal.
    pub enemies_leaked: u32,
    /// Lives lost during the wave.
    pub lives_lost: u32,
    /// Money gained from kills and the completion bonus.
    pub money_earned: u32,
    /// Score gained from kills and the completion bonus.
    pub score_earned: u64,
    /// Money spent on placement at wave start.
    pub money_spent: u32,
    /// Ticks run.
    pub ticks: u64,
    /// Simulated seconds, including pre/post delays unless in fast mode.
    pub simulated_seconds: f64,
    /// Wall-clock time spent on the wave.
    pub duration: Duration,
}

/// Outcome of a full run.
///
/// Always produced, even when the run could not start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Whether the run reached its last wave with lives remaining.
    pub success: bool,
    /// Whether the session was won.
    pub victory: bool,
    /// Why the run failed.
    pub failure_reason: Option<String>,
    /// Session counters at the end of the run.
    pub final_state: SessionSnapshot,
    /// Waves completed successfully.
    pub waves_completed: u32,
    /// Per-wave results in order, including a failed final wave.
    pub wave_results: Vec<WaveResult>,
    /// Ticks across all waves.
    pub total_ticks: u64,
    /// Simulated seconds across all waves.
    pub simulated_seconds: f64,
    /// Wall-clock time of the run.
    pub duration: Duration,
}

impl SimulationResult {
    /// A failed run that never got past setup.
    #[must_use]
    pub fn aborted(reason: impl Into<String>, final_state: SessionSnapshot) -> Self {
        Self {
            success: false,
            victory: false,
            failure_reason: Some(reason.into()),
            final_state,
            waves_completed: 0,
            wave_results: Vec::new(),
            total_ticks: 0,
            simulated_seconds: 0.0,
            duration: Duration::ZERO,
        }
    }

    /// Money at the end of the run.
    #[must_use]
    pub const fn final_money(&self) -> u32 {
        self.final_state.money
    }

    /// Lives at the end of the run.
    #[must_use]
    pub const fn final_lives(&self) -> u32 {
        self.final_state.lives
    }

    /// Score at the end of the run.
    #[must_use]
    pub const fn final_score(&self) -> u64 {
        self.final_state.score
    }

    /// Total enemies killed.
    #[must_use]
    pub fn total_kills(&self) -> u32 {
        self.wave_results.iter().map(|w| w.enemies_killed).sum()
    }

    /// Total enemies leaked.
    #[must_use]
    pub fn total_leaks(&self) -> u32 {
        self.wave_results.iter().map(|w| w.enemies_leaked).sum()
    }

    /// One-line human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.success {
            format!(
                "SUCCESS: Completed {} waves with {} lives remaining (money {}, score {})",
                self.waves_completed,
                self.final_lives(),
                self.final_money(),
                self.final_score()
            )
        } else {
            format!(
                "FAILURE: {} (Wave {}, {} lives, money {})",
                self.failure_reason.as_deref().unwrap_or("unknown failure"),
                self.final_state.current_wave,
                self.final_lives(),
                self.final_money()
            )
        }
    }

    /// The wall-clock independent part of the result.
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            success: self.success,
            victory: self.victory,
            final_money: self.final_money(),
            final_lives: self.final_lives(),
            final_score: self.final_score(),
            waves_completed: self.waves_completed,
            kills_per_wave: self.wave_results.iter().map(|w| w.enemies_killed).collect(),
            leaks_per_wave: self.wave_results.iter().map(|w| w.enemies_leaked).collect(),
            total_ticks: self.total_ticks,
        }
    }
}

/// Everything that must match between two runs of the same config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    /// Run succeeded.
    pub success: bool,
    /// Run won.
    pub victory: bool,
    /// Final money.
    pub final_money: u32,
    /// Final lives.
    pub final_lives: u32,
    /// Final score.
    pub final_score: u64,
    /// Waves completed.
    pub waves_completed: u32,
    /// Kills per wave, in order.
    pub kills_per_wave: Vec<u32>,
    /// Leaks per wave, in order.
    pub leaks_per_wave: Vec<u32>,
    /// Ticks across all waves.
    pub total_ticks: u64,
}

impl RunOutcome {
    /// Hash of the outcome for quick comparison.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(money: u32, lives: u32, wave: u32) -> SessionSnapshot {
        SessionSnapshot {
            money,
            lives,
            score: 40,
            current_wave: wave,
            tower_count: 4,
            enemy_count: 0,
            game_over: true,
            victory: lives > 0,
        }
    }

    #[test]
    fn test_success_summary() {
        let mut result = SimulationResult::aborted("unused", snapshot(120, 17, 5));
        result.success = true;
        result.victory = true;
        result.failure_reason = None;
        result.waves_completed = 5;
        assert_eq!(
            result.summary(),
            "SUCCESS: Completed 5 waves with 17 lives remaining (money 120, score 40)"
        );
    }

    #[test]
    fn test_failure_summary() {
        let result = SimulationResult::aborted("Lives depleted", snapshot(3, 0, 3));
        assert_eq!(result.summary(), "FAILURE: Lives depleted (Wave 3, 0 lives, money 3)");
    }

    #[test]
    fn test_fingerprint_ignores_wall_clock() {
        let a = SimulationResult::aborted("x", snapshot(1, 1, 1));
        let mut b = a.clone();
        b.duration = Duration::from_millis(250);
        assert_eq!(a.outcome().fingerprint(), b.outcome().fingerprint());
        b.final_state.money = 2;
        assert_ne!(a.outcome(), b.outcome());
    }
}
