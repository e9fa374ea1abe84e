//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::{checked_fixed, Fixed, Vec2Fixed};
use crate::stats::{BuildingMultipliers, EnemyMultipliers};

/// Immutable parameters of one simulated session.
///
/// Every field has a default, so scenario files only need to name what
/// they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Money at the start of the run.
    pub starting_money: u32,
    /// Lives at the start of the run.
    pub starting_lives: u32,
    /// Number of waves to survive for victory.
    pub max_waves: u32,
    /// Seed for the run's RNG.
    pub random_seed: u64,
    /// Multiplies enemy max health.
    pub enemy_health_multiplier: f64,
    /// Multiplies enemy speed.
    pub enemy_speed_multiplier: f64,
    /// Multiplies procedural enemy counts.
    pub enemy_count_multiplier: f64,
    /// Multiplies tower cost.
    pub building_cost_multiplier: f64,
    /// Multiplies tower damage.
    pub building_damage_multiplier: f64,
    /// Authored wave set to use, if any.
    pub wave_set: Option<String>,
    /// Quieter logging and no pre/post wave delays.
    pub fast_mode: bool,
    /// Simulated seconds per tick.
    pub tick_delta: f64,
    /// Where enemies appear.
    pub spawn_point: Vec2Fixed,
    /// Where enemies leak.
    pub goal_point: Vec2Fixed,
    /// Maximum vertical spawn offset.
    pub spawn_jitter: f64,
    /// Distance to the goal that counts as a leak.
    pub leak_epsilon: f64,
    /// Procedural enemy count of wave 1.
    pub base_enemy_count: u32,
    /// Procedural enemies added per wave.
    pub enemies_per_wave: u32,
    /// Completion bonus per enemy killed.
    pub per_enemy_bonus: u32,
    /// Completion bonus per wave number.
    pub wave_bonus: u32,
    /// Time span a tower's fire rate refers to.
    pub fire_window: f64,
    /// A wave still running after this many ticks fails.
    pub max_ticks_per_wave: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            starting_money: 200,
            starting_lives: 20,
            max_waves: 10,
            random_seed: 12345,
            enemy_health_multiplier: 1.0,
            enemy_speed_multiplier: 1.0,
            enemy_count_multiplier: 1.0,
            building_cost_multiplier: 1.0,
            building_damage_multiplier: 1.0,
            wave_set: None,
            fast_mode: false,
            tick_delta: 0.1,
            spawn_point: Vec2Fixed::from_ints(0, 5),
            goal_point: Vec2Fixed::from_ints(20, 5),
            spawn_jitter: 0.0,
            leak_epsilon: 0.05,
            base_enemy_count: 5,
            enemies_per_wave: 2,
            per_enemy_bonus: 5,
            wave_bonus: 10,
            fire_window: 1.0,
            max_ticks_per_wave: 100_000,
        }
    }
}

/// Fixed-point tick parameters derived from a validated config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickParams {
    /// Tick length.
    pub dt: Fixed,
    /// Fire-rate time span.
    pub fire_window: Fixed,
    /// Leak distance.
    pub leak_epsilon: Fixed,
    /// Spawn offset bound.
    pub spawn_jitter: Fixed,
}

impl SimulationConfig {
    /// Set starting money.
    #[must_use]
    pub fn with_starting_money(mut self, money: u32) -> Self {
        self.starting_money = money;
        self
    }

    /// Set starting lives.
    #[must_use]
    pub fn with_starting_lives(mut self, lives: u32) -> Self {
        self.starting_lives = lives;
        self
    }

    /// Set the number of waves.
    #[must_use]
    pub fn with_max_waves(mut self, waves: u32) -> Self {
        self.max_waves = waves;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Set the enemy health multiplier.
    #[must_use]
    pub fn with_enemy_health_multiplier(mut self, multiplier: f64) -> Self {
        self.enemy_health_multiplier = multiplier;
        self
    }

    /// Set the enemy speed multiplier.
    #[must_use]
    pub fn with_enemy_speed_multiplier(mut self, multiplier: f64) -> Self {
        self.enemy_speed_multiplier = multiplier;
        self
    }

    /// Set the enemy count multiplier.
    #[must_use]
    pub fn with_enemy_count_multiplier(mut self, multiplier: f64) -> Self {
        self.enemy_count_multiplier = multiplier;
        self
    }

    /// Set the building cost multiplier.
    #[must_use]
    pub fn with_building_cost_multiplier(mut self, multiplier: f64) -> Self {
        self.building_cost_multiplier = multiplier;
        self
    }

    /// Set the building damage multiplier.
    #[must_use]
    pub fn with_building_damage_multiplier(mut self, multiplier: f64) -> Self {
        self.building_damage_multiplier = multiplier;
        self
    }

    /// Use an authored wave set.
    #[must_use]
    pub fn with_wave_set(mut self, id: impl Into<String>) -> Self {
        self.wave_set = Some(id.into());
        self
    }

    /// Toggle fast mode.
    #[must_use]
    pub fn with_fast_mode(mut self, fast: bool) -> Self {
        self.fast_mode = fast;
        self
    }

    /// Multipliers for the building catalog.
    #[must_use]
    pub const fn building_multipliers(&self) -> BuildingMultipliers {
        BuildingMultipliers {
            cost: self.building_cost_multiplier,
            damage: self.building_damage_multiplier,
        }
    }

    /// Multipliers for the enemy catalog.
    #[must_use]
    pub const fn enemy_multipliers(&self) -> EnemyMultipliers {
        EnemyMultipliers {
            health: self.enemy_health_multiplier,
            speed: self.enemy_speed_multiplier,
        }
    }

    /// Check every field that could make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("enemy_health_multiplier", self.enemy_health_multiplier),
            ("enemy_speed_multiplier", self.enemy_speed_multiplier),
            ("enemy_count_multiplier", self.enemy_count_multiplier),
            ("tick_delta", self.tick_delta),
            ("fire_window", self.fire_window),
            ("leak_epsilon", self.leak_epsilon),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::Configuration(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("building_cost_multiplier", self.building_cost_multiplier),
            ("building_damage_multiplier", self.building_damage_multiplier),
            ("spawn_jitter", self.spawn_jitter),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::Configuration(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }

        if self.max_waves == 0 {
            return Err(SimError::Configuration("max_waves must be at least 1".into()));
        }
        if self.max_ticks_per_wave == 0 {
            return Err(SimError::Configuration(
                "max_ticks_per_wave must be at least 1".into(),
            ));
        }
        if self.spawn_point == self.goal_point {
            return Err(SimError::Configuration(
                "spawn_point and goal_point must differ".into(),
            ));
        }
        self.spawn_point.check_bounds()?;
        self.goal_point.check_bounds()?;

        self.tick_params().map(|_| ())
    }

    /// Convert the float tick parameters to fixed-point.
    pub fn tick_params(&self) -> Result<TickParams> {
        let convert = |name: &str, value: f64| {
            checked_fixed(value).ok_or_else(|| {
                SimError::Configuration(format!("{name} = {value} is not representable"))
            })
        };
        let params = TickParams {
            dt: convert("tick_delta", self.tick_delta)?,
            fire_window: convert("fire_window", self.fire_window)?,
            leak_epsilon: convert("leak_epsilon", self.leak_epsilon)?,
            spawn_jitter: convert("spawn_jitter", self.spawn_jitter)?,
        };
        if params.dt <= Fixed::ZERO {
            return Err(SimError::Configuration(format!(
                "tick_delta = {} rounds to zero",
                self.tick_delta
            )));
        }
        Ok(params)
    }
}
