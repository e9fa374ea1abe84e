//! Resolved stat records handed out by the stat providers.
//!
//! These are the post-multiplier values the simulation actually uses. The
//! raw per-type numbers live in [`crate::data`].

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// Stats for one building type after cost/damage multipliers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingStats {
    /// Placement cost.
    pub cost: u32,
    /// Damage per shot.
    pub damage: u32,
    /// Attack range.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Shots per fire window.
    #[serde(with = "fixed_serde")]
    pub fire_rate: Fixed,
    /// Projectile speed.
    #[serde(with = "fixed_serde")]
    pub bullet_speed: Fixed,
    /// Sound key played when firing.
    pub shoot_sound: String,
    /// Sound key played on impact.
    pub impact_sound: String,
    /// Human-readable description.
    pub description: String,
}

/// Stats for one enemy type after health/speed multipliers and, when
/// requested, wave scaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyStats {
    /// Maximum health.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Movement speed in world units per time unit.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Damage on leak.
    pub damage: u32,
    /// Gold granted on kill.
    pub gold_reward: u32,
    /// Score granted on kill.
    pub xp_reward: u32,
    /// Human-readable description.
    pub description: String,
}

/// Cost and damage multipliers for building stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingMultipliers {
    /// Multiplies placement cost.
    pub cost: f64,
    /// Multiplies damage per shot.
    pub damage: f64,
}

impl Default for BuildingMultipliers {
    fn default() -> Self {
        Self {
            cost: 1.0,
            damage: 1.0,
        }
    }
}

/// Health and speed multipliers for enemy stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyMultipliers {
    /// Multiplies max health.
    pub health: f64,
    /// Multiplies movement speed.
    pub speed: f64,
}

impl Default for EnemyMultipliers {
    fn default() -> Self {
        Self {
            health: 1.0,
            speed: 1.0,
        }
    }
}
