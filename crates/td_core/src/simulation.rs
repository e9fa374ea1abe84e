//! The wave loop.
//!
//! [`SimulationRunner`] owns the stat providers and placement strategy for
//! a configuration and plays a whole session from them:
//!
//! ```text
//! NotStarted -> WaveInProgress -> WaveComplete -> WaveInProgress ... -> Finished
//! ```
//!
//! Each wave places towers, then ticks spawning, combat and movement until
//! every enemy has entered and left the map, lives run out or the tick
//! budget is spent. Enemies enter on the first tick at or after their spawn
//! time. A wave that ends without lives, or over budget, finishes the run
//! as a failure.
//!
//! Every tick either lowers the health left on the map, moves every enemy
//! closer to the goal or brings the next spawn closer, so a wave ends within
//! roughly `spawn window + health / min damage + distance / min speed` ticks.
//! The tick budget caps it regardless.
//!
//! # Determinism
//!
//! - All per-tick math is fixed-point ([`Fixed`](crate::math::Fixed))
//! - The only randomness is the run's seeded [`Spawner`]
//! - Towers and enemies are processed in insertion order
//!
//! # Example
//!
//! ```
//! use td_core::prelude::*;
//!
//! let mut runner = SimulationRunner::new(
//!     SimulationConfig::default().with_max_waves(2),
//!     BuildingCatalog::builtin(),
//!     EnemyCatalog::builtin(),
//!     PlacementConfig::default(),
//! )
//! .unwrap();
//!
//! let result = runner.run();
//! assert!(result.wave_results.len() <= 2);
//! println!("{}", result.summary());
//! ```

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::combat::resolve_combat;
use crate::config::{SimulationConfig, TickParams};
use crate::data::{PlacementConfig, WaveSet};
use crate::error::{Result, SimError};
use crate::movement::resolve_movement;
use crate::observer::{NoopObserver, SimulationObserver};
use crate::placement::PlacementStrategy;
use crate::providers::{BuildingCatalog, EnemyCatalog};
use crate::result::{SimulationResult, WaveResult};
use crate::session::{LiveEnemy, SessionState};
use crate::spawning::{SpawnPlan, Spawner};

/// Slack when comparing a spawn time against the tick clock.
const SPAWN_TIME_EPSILON: f64 = 1e-9;

/// Where the runner is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// No run has started.
    NotStarted,
    /// A wave is being played.
    WaveInProgress(u32),
    /// A wave finished with lives remaining.
    WaveComplete(u32),
    /// The run is over.
    Finished {
        /// Whether it ended in victory.
        victory: bool,
    },
}

/// Plays full sessions for one configuration.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    config: SimulationConfig,
    params: TickParams,
    buildings: BuildingCatalog,
    enemies: EnemyCatalog,
    placement: PlacementStrategy,
    wave_set: Option<WaveSet>,
    phase: RunPhase,
}

/// How a single wave ended.
struct WaveOutcome {
    result: WaveResult,
    failure: Option<String>,
}

impl SimulationRunner {
    /// Create a runner. The catalogs receive the config's multipliers.
    ///
    /// Fails with a configuration error if the config is invalid.
    pub fn new(
        config: SimulationConfig,
        buildings: BuildingCatalog,
        enemies: EnemyCatalog,
        placement: PlacementConfig,
    ) -> Result<Self> {
        config.validate()?;
        placement.validate()?;
        let params = config.tick_params()?;
        Ok(Self {
            buildings: buildings.with_multipliers(config.building_multipliers()),
            enemies: enemies.with_multipliers(config.enemy_multipliers()),
            placement: PlacementStrategy::new(placement),
            wave_set: None,
            phase: RunPhase::NotStarted,
            params,
            config,
        })
    }

    /// Register the authored wave set named by the config.
    pub fn with_wave_set(mut self, wave_set: WaveSet) -> Result<Self> {
        wave_set.validate()?;
        self.wave_set = Some(wave_set);
        Ok(self)
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current state machine phase.
    #[must_use]
    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Play a full session.
    pub fn run(&mut self) -> SimulationResult {
        self.run_with_observer(&mut NoopObserver)
    }

    /// Play a full session, reporting events to `observer`.
    ///
    /// Never fails: errors raised mid-run become a failure result carrying
    /// the error message.
    pub fn run_with_observer(&mut self, observer: &mut dyn SimulationObserver) -> SimulationResult {
        let started = Instant::now();
        let mut session = SessionState::new(self.config.starting_money, self.config.starting_lives);
        let mut waves = Vec::new();
        self.phase = RunPhase::NotStarted;

        info!(
            seed = self.config.random_seed,
            max_waves = self.config.max_waves,
            money = self.config.starting_money,
            lives = self.config.starting_lives,
            "Starting simulation"
        );
        observer.on_run_started(&self.config);

        let failure = match self.play(&mut session, &mut waves, observer) {
            Ok(failure) => failure,
            Err(err) => {
                warn!(error = %err, "Simulation aborted");
                Some(err.to_string())
            }
        };

        let victory = failure.is_none() && session.is_victory();
        self.phase = RunPhase::Finished { victory };

        let waves_completed = waves.iter().filter(|w| w.completed).count() as u32;
        let result = SimulationResult {
            success: victory,
            victory,
            failure_reason: failure.or_else(|| {
                (!victory).then(|| "Run ended before the final wave".to_string())
            }),
            final_state: session.snapshot(),
            waves_completed,
            total_ticks: waves.iter().map(|w| w.ticks).sum(),
            simulated_seconds: waves.iter().map(|w| w.simulated_seconds).sum(),
            wave_results: waves,
            duration: started.elapsed(),
        };

        info!(summary = %result.summary(), "Simulation finished");
        observer.on_run_finished(&result);
        result
    }

    /// Drive the wave loop. Returns the failure reason of a failed run.
    fn play(
        &mut self,
        session: &mut SessionState,
        waves: &mut Vec<WaveResult>,
        observer: &mut dyn SimulationObserver,
    ) -> Result<Option<String>> {
        self.check_wave_set()?;
        let mut spawner = Spawner::new(
            self.config.random_seed,
            self.config.spawn_point,
            self.params.spawn_jitter,
        );

        for wave in 1..=self.config.max_waves {
            self.phase = RunPhase::WaveInProgress(wave);
            let WaveOutcome { result, failure } =
                self.play_wave(wave, session, &mut spawner, observer)?;
            observer.on_wave_finished(&result);
            waves.push(result);

            if failure.is_some() {
                return Ok(failure);
            }
            self.phase = RunPhase::WaveComplete(wave);
            if session.is_victory() {
                break;
            }
        }
        Ok(None)
    }

    fn check_wave_set(&self) -> Result<()> {
        match (&self.config.wave_set, &self.wave_set) {
            (None, _) => Ok(()),
            (Some(id), Some(set)) if *id == set.set_name => Ok(()),
            (Some(id), _) => Err(SimError::UnknownWaveSet(id.clone())),
        }
    }

    fn spawn_plan(&self, wave: u32) -> SpawnPlan {
        let authored = self
            .config
            .wave_set
            .as_ref()
            .and(self.wave_set.as_ref())
            .and_then(|set| set.wave(wave));
        match authored {
            Some(definition) => SpawnPlan::from_definition(definition),
            None => SpawnPlan::procedural(
                wave,
                self.config.base_enemy_count,
                self.config.enemies_per_wave,
                self.config.enemy_count_multiplier,
            ),
        }
    }

    fn play_wave(
        &self,
        wave: u32,
        session: &mut SessionState,
        spawner: &mut Spawner,
        observer: &mut dyn SimulationObserver,
    ) -> Result<WaveOutcome> {
        let started = Instant::now();
        session.start_wave(wave);
        let lives_before = session.lives();

        let placement = self.placement.apply(session, &self.buildings, wave)?;
        let plan = self.spawn_plan(wave);

        if self.config.fast_mode {
            debug!(wave, enemies = plan.len(), towers = session.towers().len(), "Wave started");
        } else {
            info!(wave, enemies = plan.len(), towers = session.towers().len(), "Wave started");
        }
        observer.on_wave_started(wave, plan.len());

        let mut queued = spawner.spawn_wave(&plan, &self.enemies)?;
        // Stable sort: equal spawn times keep plan order.
        queued.sort_by(|a, b| a.spawn_time.total_cmp(&b.spawn_time));
        let mut pending = queued.into_iter().peekable();

        let mut enemies_spawned: u32 = 0;
        let mut ticks: u64 = 0;
        let mut kills: u32 = 0;
        let mut leaks: u32 = 0;
        let mut money_earned: u32 = 0;
        let mut score_earned: u64 = 0;
        let mut failure = None;

        while (pending.peek().is_some() || !session.enemies().is_empty()) && session.lives() > 0 {
            if ticks >= self.config.max_ticks_per_wave {
                failure = Some(format!(
                    "Wave {wave} exceeded the tick budget of {}",
                    self.config.max_ticks_per_wave
                ));
                break;
            }
            let now = ticks as f64 * self.config.tick_delta;
            while let Some(enemy) =
                pending.next_if(|e: &LiveEnemy| e.spawn_time <= now + SPAWN_TIME_EPSILON)
            {
                observer.on_enemy_spawned(wave, &enemy);
                session.spawn_enemy(enemy);
                enemies_spawned += 1;
            }
            ticks += 1;
            let time = ticks as f64 * self.config.tick_delta;

            for kill in resolve_combat(session, self.params.dt, self.params.fire_window) {
                kills += 1;
                money_earned = money_earned.saturating_add(kill.gold);
                score_earned = score_earned.saturating_add(u64::from(kill.xp));
                observer.on_enemy_killed(wave, &kill, time);
            }
            for leak in resolve_movement(
                session,
                self.params.dt,
                self.config.goal_point,
                self.params.leak_epsilon,
            ) {
                leaks += 1;
                observer.on_enemy_leaked(wave, &leak, time);
            }
        }

        if failure.is_none() && session.lives() == 0 {
            failure = Some(format!("Lives depleted during wave {wave}"));
        }

        let completed = failure.is_none();
        // No completion bonus when every enemy leaked.
        let bonus_earned = kills > 0 || enemies_spawned == 0;
        if completed && bonus_earned {
            let bonus = kills
                .saturating_mul(self.config.per_enemy_bonus)
                .saturating_add(wave.saturating_mul(self.config.wave_bonus))
                .saturating_add(plan.bonus_money);
            session.add_money(bonus);
            session.add_score(u64::from(bonus));
            money_earned = money_earned.saturating_add(bonus);
            score_earned = score_earned.saturating_add(u64::from(bonus));
        }
        if completed {
            session.complete_wave(self.config.max_waves);
        }

        let mut simulated_seconds = ticks as f64 * self.config.tick_delta;
        if !self.config.fast_mode {
            simulated_seconds += plan.pre_wave_delay + plan.post_wave_delay;
        }

        let result = WaveResult {
            wave_number: wave,
            completed,
            enemies_spawned,
            enemies_killed: kills,
            enemies_leaked: leaks,
            lives_lost: lives_before.saturating_sub(session.lives()),
            money_earned,
            score_earned,
            money_spent: placement.spent,
            ticks,
            simulated_seconds,
            duration: started.elapsed(),
        };

        if self.config.fast_mode {
            debug!(wave, completed, kills, leaks, money = session.money(), "Wave finished");
        } else {
            info!(wave, completed, kills, leaks, money = session.money(), "Wave finished");
        }

        Ok(WaveOutcome { result, failure })
    }
}
