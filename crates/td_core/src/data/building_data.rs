//! Building stats file schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Top-level building stats file.
///
/// # Example JSON
///
/// ```json
/// {
///   "version": "1.0",
///   "description": "Tower stats",
///   "buildings": {
///     "basic": {
///       "cost": 50, "damage": 10, "range": 4.5, "fireRate": 4.0,
///       "bulletSpeed": 12.0, "shootSound": "shoot_basic",
///       "impactSound": "impact_basic", "description": "Cheap all-rounder"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingStatsFile {
    /// Schema version string.
    #[serde(default)]
    pub version: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Stats keyed by building type.
    pub buildings: BTreeMap<String, BuildingStatsEntry>,
}

/// Raw stats for one building type, before multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingStatsEntry {
    /// Placement cost.
    pub cost: u32,
    /// Damage per shot.
    pub damage: u32,
    /// Attack range in world units.
    pub range: f64,
    /// Shots per fire window.
    pub fire_rate: f64,
    /// Projectile speed (presentation only; hits are instant in the simulator).
    #[serde(default)]
    pub bullet_speed: f64,
    /// Sound key played when firing.
    #[serde(default)]
    pub shoot_sound: String,
    /// Sound key played on impact.
    #[serde(default)]
    pub impact_sound: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl BuildingStatsEntry {
    /// Check `range > 0` and `fire_rate > 0`; cost and damage are unsigned.
    pub fn validate(&self, key: &str) -> Result<()> {
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(SimError::InvalidStat {
                key: key.to_string(),
                field: "range",
                value: self.range,
            });
        }
        if !(self.fire_rate.is_finite() && self.fire_rate > 0.0) {
            return Err(SimError::InvalidStat {
                key: key.to_string(),
                field: "fireRate",
                value: self.fire_rate,
            });
        }
        if !self.bullet_speed.is_finite() || self.bullet_speed < 0.0 {
            return Err(SimError::InvalidStat {
                key: key.to_string(),
                field: "bulletSpeed",
                value: self.bullet_speed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> BuildingStatsEntry {
        BuildingStatsEntry {
            cost: 50,
            damage: 10,
            range: 4.5,
            fire_rate: 4.0,
            bullet_speed: 12.0,
            shoot_sound: String::new(),
            impact_sound: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_parse_camel_case() {
        let json = r#"{
            "version": "1.0",
            "buildings": {
                "basic": { "cost": 50, "damage": 10, "range": 4.5, "fireRate": 4.0 }
            }
        }"#;
        let file: BuildingStatsFile = serde_json::from_str(json).unwrap();
        let basic = &file.buildings["basic"];
        assert_eq!(basic.cost, 50);
        assert!((basic.fire_rate - 4.0).abs() < f64::EPSILON);
        assert!(basic.shoot_sound.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_range() {
        let mut bad = entry();
        bad.range = 0.0;
        assert!(matches!(
            bad.validate("basic"),
            Err(SimError::InvalidStat { field: "range", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_fire_rate() {
        let mut bad = entry();
        bad.fire_rate = 0.0;
        assert!(bad.validate("basic").is_err());
        assert!(entry().validate("basic").is_ok());
    }
}
