//! Enemy stats file schema, including wave scaling coefficients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Top-level enemy stats file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyStatsFile {
    /// Schema version string.
    #[serde(default)]
    pub version: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Stats keyed by enemy type.
    pub enemies: BTreeMap<String, EnemyStatsEntry>,
    /// Per-wave scaling coefficients.
    #[serde(default)]
    pub wave_scaling: WaveScaling,
}

/// Raw stats for one enemy type, before multipliers and wave scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyStatsEntry {
    /// Maximum health at wave 1.
    pub max_health: u32,
    /// Movement speed in world units per time unit.
    pub speed: f64,
    /// Damage dealt on leak (informational; a leak always costs one life).
    #[serde(default)]
    pub damage: u32,
    /// Gold granted on kill.
    #[serde(default)]
    pub reward_gold: u32,
    /// Experience (score) granted on kill.
    #[serde(default)]
    pub reward_xp: u32,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl EnemyStatsEntry {
    /// Check `max_health > 0` and `speed > 0`.
    pub fn validate(&self, key: &str) -> Result<()> {
        if self.max_health == 0 {
            return Err(SimError::InvalidStat {
                key: key.to_string(),
                field: "maxHealth",
                value: 0.0,
            });
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(SimError::InvalidStat {
                key: key.to_string(),
                field: "speed",
                value: self.speed,
            });
        }
        Ok(())
    }
}

/// Wave scaling coefficients applied on top of base stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveScaling {
    /// Fractional health increase per wave after the first.
    pub health_per_wave: f64,
    /// Fractional speed increase per wave after the first.
    pub speed_per_wave: f64,
    /// Flat damage +1 every N waves.
    pub damage_every_n_waves: u32,
    /// Fractional reward increase per wave after the first.
    pub reward_per_wave: f64,
}

impl Default for WaveScaling {
    fn default() -> Self {
        Self {
            health_per_wave: 0.15,
            speed_per_wave: 0.02,
            damage_every_n_waves: 3,
            reward_per_wave: 0.1,
        }
    }
}

impl WaveScaling {
    /// Reject coefficients that would make scaled stats degenerate.
    pub fn validate(&self) -> Result<()> {
        if self.damage_every_n_waves == 0 {
            return Err(SimError::Configuration(
                "waveScaling.damageEveryNWaves must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("healthPerWave", self.health_per_wave),
            ("speedPerWave", self.speed_per_wave),
            ("rewardPerWave", self.reward_per_wave),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::Configuration(format!(
                    "waveScaling.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_scaling() {
        let json = r#"{
            "enemies": {
                "basic": { "maxHealth": 100, "speed": 1.0, "rewardGold": 10, "rewardXp": 5 }
            },
            "waveScaling": {
                "healthPerWave": 0.2, "speedPerWave": 0.0,
                "damageEveryNWaves": 2, "rewardPerWave": 0.05
            }
        }"#;
        let file: EnemyStatsFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.enemies["basic"].reward_gold, 10);
        assert_eq!(file.wave_scaling.damage_every_n_waves, 2);
    }

    #[test]
    fn test_missing_scaling_uses_defaults() {
        let json = r#"{ "enemies": {} }"#;
        let file: EnemyStatsFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.wave_scaling, WaveScaling::default());
    }

    #[test]
    fn test_zero_damage_interval_rejected() {
        let scaling = WaveScaling {
            damage_every_n_waves: 0,
            ..WaveScaling::default()
        };
        assert!(scaling.validate().is_err());
    }

    #[test]
    fn test_entry_validation() {
        let entry = EnemyStatsEntry {
            max_health: 0,
            speed: 1.0,
            damage: 1,
            reward_gold: 0,
            reward_xp: 0,
            description: String::new(),
        };
        assert!(entry.validate("ghost").is_err());
    }
}
