//! Run observation hooks.
//!
//! Observers see every spawn, kill and leak as it happens. They receive
//! shared references only and cannot influence the run.

use crate::combat::KillEvent;
use crate::config::SimulationConfig;
use crate::movement::LeakEvent;
use crate::result::{SimulationResult, WaveResult};
use crate::session::LiveEnemy;

/// Receives simulation events. All methods default to no-ops.
///
/// `time` arguments are simulated seconds since the start of the wave.
pub trait SimulationObserver {
    /// A run is about to start.
    fn on_run_started(&mut self, _config: &SimulationConfig) {}

    /// A wave is starting with `enemy_count` enemies planned.
    fn on_wave_started(&mut self, _wave: u32, _enemy_count: usize) {}

    /// An enemy entered the map.
    fn on_enemy_spawned(&mut self, _wave: u32, _enemy: &LiveEnemy) {}

    /// An enemy was killed.
    fn on_enemy_killed(&mut self, _wave: u32, _kill: &KillEvent, _time: f64) {}

    /// An enemy reached the goal.
    fn on_enemy_leaked(&mut self, _wave: u32, _leak: &LeakEvent, _time: f64) {}

    /// A wave ended, successfully or not.
    fn on_wave_finished(&mut self, _result: &WaveResult) {}

    /// The run ended.
    fn on_run_finished(&mut self, _result: &SimulationResult) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SimulationObserver for NoopObserver {}
