//! Authored wave set schema.
//!
//! A wave set replaces the procedural enemy count and typing rules for the
//! waves it defines. Waves it does not define fall back to the procedural
//! rules.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// A named, authored list of waves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveSet {
    /// Identifier matched against `SimulationConfig::wave_set`.
    pub set_name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Wave definitions in any order.
    pub waves: Vec<WaveDefinition>,
}

/// One authored wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveDefinition {
    /// 1-based wave number.
    pub wave_number: u32,
    /// Display name.
    #[serde(default)]
    pub wave_name: String,
    /// Simulated seconds before the wave starts.
    #[serde(default)]
    pub pre_wave_delay: f64,
    /// Simulated seconds after the wave ends.
    #[serde(default)]
    pub post_wave_delay: f64,
    /// Extra money granted when the wave completes.
    #[serde(default)]
    pub bonus_money: u32,
    /// Enemy groups spawned in declaration order.
    pub enemy_groups: Vec<EnemyGroup>,
}

/// A homogeneous group of enemies inside a wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyGroup {
    /// Enemy type key.
    pub enemy_type: String,
    /// Number of enemies.
    pub count: u32,
    /// Simulated seconds between consecutive spawns (timestamps only).
    #[serde(default)]
    pub spawn_interval: f64,
    /// Simulated seconds from wave start to the first spawn (timestamps only).
    #[serde(default)]
    pub start_delay: f64,
    /// Extra health multiplier on top of wave scaling.
    #[serde(default = "default_multiplier")]
    pub health_multiplier: f64,
    /// Extra speed multiplier on top of wave scaling.
    #[serde(default = "default_multiplier")]
    pub speed_multiplier: f64,
    /// Overrides the scaled gold reward when present.
    #[serde(default)]
    pub money_reward: Option<u32>,
}

const fn default_multiplier() -> f64 {
    1.0
}

impl WaveSet {
    /// Find the definition for a wave.
    #[must_use]
    pub fn wave(&self, wave_number: u32) -> Option<&WaveDefinition> {
        self.waves.iter().find(|w| w.wave_number == wave_number)
    }

    /// Check group multipliers and delays.
    pub fn validate(&self) -> Result<()> {
        for wave in &self.waves {
            if wave.wave_number == 0 {
                return Err(SimError::Configuration(format!(
                    "wave set '{}': wave numbers are 1-based",
                    self.set_name
                )));
            }
            for delay in [wave.pre_wave_delay, wave.post_wave_delay] {
                if !delay.is_finite() || delay < 0.0 {
                    return Err(SimError::Configuration(format!(
                        "wave set '{}' wave {}: delays must be non-negative",
                        self.set_name, wave.wave_number
                    )));
                }
            }
            for group in &wave.enemy_groups {
                let multipliers_ok = group.health_multiplier.is_finite()
                    && group.health_multiplier > 0.0
                    && group.speed_multiplier.is_finite()
                    && group.speed_multiplier > 0.0;
                let timing_ok = group.spawn_interval.is_finite()
                    && group.spawn_interval >= 0.0
                    && group.start_delay.is_finite()
                    && group.start_delay >= 0.0;
                if !multipliers_ok || !timing_ok {
                    return Err(SimError::Configuration(format!(
                        "wave set '{}' wave {}: invalid group '{}'",
                        self.set_name, wave.wave_number, group.enemy_type
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "setName": "classic",
        "description": "Hand-tuned opening",
        "waves": [
            {
                "waveNumber": 1,
                "waveName": "Scouts",
                "preWaveDelay": 2.0,
                "postWaveDelay": 1.0,
                "bonusMoney": 25,
                "enemyGroups": [
                    { "enemyType": "fast", "count": 3, "spawnInterval": 0.5, "startDelay": 0.0,
                      "healthMultiplier": 1.0, "speedMultiplier": 1.1, "moneyReward": 4 }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_wave_set() {
        let set: WaveSet = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(set.set_name, "classic");
        let wave = set.wave(1).unwrap();
        assert_eq!(wave.bonus_money, 25);
        assert_eq!(wave.enemy_groups[0].money_reward, Some(4));
        assert!(set.wave(2).is_none());
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_speed_multiplier() {
        let mut set: WaveSet = serde_json::from_str(SAMPLE).unwrap();
        set.waves[0].enemy_groups[0].speed_multiplier = 0.0;
        assert!(set.validate().is_err());
    }
}
