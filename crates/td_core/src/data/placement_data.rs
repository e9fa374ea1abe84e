//! Placement strategy file schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::Vec2Fixed;

/// Top-level placement strategy file.
///
/// # Example JSON
///
/// ```json
/// {
///   "strategies": {
///     "initialWave": {
///       "buildingCategory": "basic",
///       "positions": [[4, 6], [8, 4]],
///       "maxCostPerBuilding": 100
///     },
///     "waveUpgrades": {
///       "wave_2": { "category": "cannon", "costThreshold": 150, "position": [10, 6] }
///     }
///   },
///   "fallbackStrategy": {
///     "useDefaultType": true, "useCheapestType": true, "emergencyFallback": "basic"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConfig {
    /// Initial and per-wave placement rules.
    pub strategies: PlacementStrategies,
    /// How to substitute unknown building types.
    #[serde(default)]
    pub fallback_strategy: FallbackStrategy,
}

/// Initial and per-wave placement rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementStrategies {
    /// Towers placed before the first wave.
    pub initial_wave: InitialWavePlacement,
    /// Conditional upgrades keyed by `wave_<N>`.
    #[serde(default)]
    pub wave_upgrades: BTreeMap<String, WaveUpgrade>,
}

/// Towers placed at the start of wave 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialWavePlacement {
    /// Preferred building type.
    pub building_category: String,
    /// One tower per position.
    pub positions: Vec<Vec2Fixed>,
    /// Types costing more than this (after multipliers) are not used.
    pub max_cost_per_building: u32,
}

/// A single conditional tower added at the start of a later wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveUpgrade {
    /// Preferred building type.
    pub category: String,
    /// Minimum money before the upgrade is attempted.
    pub cost_threshold: u32,
    /// Tower position.
    pub position: Vec2Fixed,
}

/// Substitution order for unknown building types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackStrategy {
    /// Try the catalog's default type first.
    pub use_default_type: bool,
    /// Then try the cheapest known type.
    pub use_cheapest_type: bool,
    /// Last resort key.
    pub emergency_fallback: String,
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        Self {
            use_default_type: true,
            use_cheapest_type: true,
            emergency_fallback: "basic".to_string(),
        }
    }
}

impl PlacementConfig {
    /// Check that every tower position lies on the map.
    pub fn validate(&self) -> Result<()> {
        for position in &self.strategies.initial_wave.positions {
            position.check_bounds()?;
        }
        for upgrade in self.strategies.wave_upgrades.values() {
            upgrade.position.check_bounds()?;
        }
        Ok(())
    }

    /// Upgrade rule for the given wave, if any.
    #[must_use]
    pub fn upgrade_for_wave(&self, wave: u32) -> Option<&WaveUpgrade> {
        self.strategies.wave_upgrades.get(&format!("wave_{wave}"))
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        let upgrade = |category: &str, cost_threshold: u32, x: i32, y: i32| WaveUpgrade {
            category: category.to_string(),
            cost_threshold,
            position: Vec2Fixed::from_ints(x, y),
        };

        let wave_upgrades = [
            ("wave_2", upgrade("cannon", 150, 10, 6)),
            ("wave_3", upgrade("sniper", 200, 10, 3)),
            ("wave_4", upgrade("rapid", 180, 6, 4)),
            ("wave_5", upgrade("cannon", 150, 14, 6)),
            ("wave_6", upgrade("sniper", 200, 4, 3)),
            ("wave_7", upgrade("rapid", 180, 18, 6)),
            ("wave_8", upgrade("sniper", 250, 14, 3)),
            ("wave_9", upgrade("cannon", 150, 6, 7)),
            ("wave_10", upgrade("sniper", 250, 18, 3)),
        ]
        .into_iter()
        .map(|(key, rule)| (key.to_string(), rule))
        .collect();

        Self {
            strategies: PlacementStrategies {
                initial_wave: InitialWavePlacement {
                    building_category: "basic".to_string(),
                    positions: vec![
                        Vec2Fixed::from_ints(4, 6),
                        Vec2Fixed::from_ints(8, 4),
                        Vec2Fixed::from_ints(12, 6),
                        Vec2Fixed::from_ints(16, 4),
                    ],
                    max_cost_per_building: 100,
                },
                wave_upgrades,
            },
            fallback_strategy: FallbackStrategy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_placement_config() {
        let json = r#"{
            "strategies": {
                "initialWave": {
                    "buildingCategory": "basic",
                    "positions": [[4, 6], [8.5, 4]],
                    "maxCostPerBuilding": 100
                },
                "waveUpgrades": {
                    "wave_3": { "category": "sniper", "costThreshold": 200, "position": [10, 3] }
                }
            }
        }"#;
        let config: PlacementConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.strategies.initial_wave.positions.len(), 2);
        assert_eq!(config.upgrade_for_wave(3).unwrap().category, "sniper");
        assert!(config.upgrade_for_wave(2).is_none());
        assert_eq!(config.fallback_strategy, FallbackStrategy::default());
    }

    #[test]
    fn test_default_has_four_initial_towers() {
        let config = PlacementConfig::default();
        assert_eq!(config.strategies.initial_wave.positions.len(), 4);
        assert_eq!(config.upgrade_for_wave(2).unwrap().category, "cannon");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_off_map_upgrade_position_is_rejected() {
        let mut config = PlacementConfig::default();
        if let Some(rule) = config.strategies.wave_upgrades.get_mut("wave_2") {
            rule.position = Vec2Fixed::from_ints(0, 50_000);
        }
        assert!(config.validate().is_err());
    }
}
