//! Config-driven tower placement.
//!
//! Wave 1 places the initial tower set. Later waves add at most one
//! upgrade tower once money reaches the configured threshold. Placement
//! only happens when the session can afford the resolved type; anything
//! else is skipped and reported.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::PlacementConfig;
use crate::error::Result;
use crate::math::Vec2Fixed;
use crate::providers::BuildingStatProvider;
use crate::session::{PlacedTower, SessionState};

/// A building type picked for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedType {
    /// Key that will be placed.
    pub key: String,
    /// Whether it differs from the configured type.
    pub fell_back: bool,
}

/// One tower the strategy wants to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    /// Type named in the placement config.
    pub requested_type: String,
    /// Type after fallback resolution.
    pub building_type: ResolvedType,
    /// Tower position.
    pub position: Vec2Fixed,
}

/// What [`PlacementStrategy::apply`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReport {
    /// Towers placed, in order.
    pub placed: Vec<PlacedTower>,
    /// Requests that could not be afforded.
    pub skipped: Vec<PlacementRequest>,
    /// Total money spent.
    pub spent: u32,
}

/// Decides where and when towers go.
#[derive(Debug, Clone, Default)]
pub struct PlacementStrategy {
    config: PlacementConfig,
}

impl PlacementStrategy {
    /// Create a strategy from a placement config.
    #[must_use]
    pub const fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    /// The underlying config.
    #[must_use]
    pub const fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Resolve a configured type: the type itself when known, then the
    /// catalog default, then the cheapest type, then the emergency key.
    pub fn resolve_type<B>(&self, preferred: &str, buildings: &B) -> ResolvedType
    where
        B: BuildingStatProvider + ?Sized,
    {
        if buildings.has_building(preferred) {
            return ResolvedType {
                key: preferred.to_string(),
                fell_back: false,
            };
        }

        let fallback = &self.config.fallback_strategy;
        let substitute = fallback
            .use_default_type
            .then(|| buildings.default_building_key())
            .flatten()
            .or_else(|| {
                fallback
                    .use_cheapest_type
                    .then(|| buildings.cheapest_building_key())
                    .flatten()
            })
            .unwrap_or(fallback.emergency_fallback.as_str())
            .to_string();

        warn!(requested = preferred, substitute = %substitute, "Building type not found, using fallback");
        ResolvedType {
            key: substitute,
            fell_back: true,
        }
    }

    /// Requests for `wave` given the money currently held.
    pub fn plan<B>(&self, wave: u32, money: u32, buildings: &B) -> Result<Vec<PlacementRequest>>
    where
        B: BuildingStatProvider + ?Sized,
    {
        if wave == 1 {
            return self.plan_initial(buildings);
        }

        let Some(upgrade) = self.config.upgrade_for_wave(wave) else {
            return Ok(Vec::new());
        };
        if money < upgrade.cost_threshold {
            debug!(wave, money, threshold = upgrade.cost_threshold, "Upgrade threshold not reached");
            return Ok(Vec::new());
        }

        Ok(vec![PlacementRequest {
            requested_type: upgrade.category.clone(),
            building_type: self.resolve_type(&upgrade.category, buildings),
            position: upgrade.position,
        }])
    }

    fn plan_initial<B>(&self, buildings: &B) -> Result<Vec<PlacementRequest>>
    where
        B: BuildingStatProvider + ?Sized,
    {
        let initial = &self.config.strategies.initial_wave;
        let mut resolved = self.resolve_type(&initial.building_category, buildings);

        if buildings.building_stats(&resolved.key)?.cost > initial.max_cost_per_building {
            match buildings.cheapest_building_key() {
                Some(cheapest)
                    if buildings.building_stats(cheapest)?.cost <= initial.max_cost_per_building =>
                {
                    resolved = ResolvedType {
                        key: cheapest.to_string(),
                        fell_back: true,
                    };
                }
                _ => {
                    warn!(
                        max_cost = initial.max_cost_per_building,
                        "No building type fits the initial cost cap"
                    );
                    return Ok(Vec::new());
                }
            }
        }

        Ok(initial
            .positions
            .iter()
            .map(|position| PlacementRequest {
                requested_type: initial.building_category.clone(),
                building_type: resolved.clone(),
                position: *position,
            })
            .collect())
    }

    /// Place every affordable request for `wave`.
    pub fn apply<B>(&self, session: &mut SessionState, buildings: &B, wave: u32) -> Result<PlacementReport>
    where
        B: BuildingStatProvider + ?Sized,
    {
        let mut report = PlacementReport::default();

        for request in self.plan(wave, session.money(), buildings)? {
            let stats = buildings.building_stats(&request.building_type.key)?;
            if !session.can_afford(stats.cost) {
                debug!(
                    building = %request.building_type.key,
                    cost = stats.cost,
                    money = session.money(),
                    "Skipping unaffordable placement"
                );
                report.skipped.push(request);
                continue;
            }

            session.spend_money(stats.cost)?;
            let tower = PlacedTower::new(request.building_type.key, request.position, &stats);
            debug!(building = %tower.building_type, cost = tower.cost, "Placed tower");
            session.place_tower(tower.clone());
            report.spent += stats.cost;
            report.placed.push(tower);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::WaveUpgrade;
    use crate::providers::BuildingCatalog;
    use crate::stats::BuildingMultipliers;

    #[test]
    fn test_wave_one_places_all_affordable_initial_towers() {
        let strategy = PlacementStrategy::default();
        let buildings = BuildingCatalog::builtin();
        let mut session = SessionState::new(200, 20);

        let report = strategy.apply(&mut session, &buildings, 1).unwrap();
        assert_eq!(report.placed.len(), 4);
        assert_eq!(report.spent, 200);
        assert_eq!(session.money(), 0);
        assert_eq!(session.towers().len(), 4);
    }

    #[test]
    fn test_unaffordable_requests_are_skipped() {
        let strategy = PlacementStrategy::default();
        let buildings = BuildingCatalog::builtin();
        let mut session = SessionState::new(120, 20);

        let report = strategy.apply(&mut session, &buildings, 1).unwrap();
        assert_eq!(report.placed.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(session.money(), 20);
    }

    #[test]
    fn test_upgrade_requires_threshold() {
        let strategy = PlacementStrategy::default();
        let buildings = BuildingCatalog::builtin();
        assert!(strategy.plan(2, 149, &buildings).unwrap().is_empty());
        let requests = strategy.plan(2, 150, &buildings).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].building_type.key, "cannon");
        assert!(!requests[0].building_type.fell_back);
        // No upgrade configured past wave 10.
        assert!(strategy.plan(11, 10_000, &buildings).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_type_falls_back_to_default() {
        let mut config = PlacementConfig::default();
        config.strategies.wave_upgrades.insert(
            "wave_2".to_string(),
            WaveUpgrade {
                category: "laser".to_string(),
                cost_threshold: 0,
                position: Vec2Fixed::from_ints(1, 1),
            },
        );
        let strategy = PlacementStrategy::new(config);
        let requests = strategy.plan(2, 0, &BuildingCatalog::builtin()).unwrap();
        assert_eq!(
            requests[0].building_type,
            ResolvedType {
                key: "basic".to_string(),
                fell_back: true
            }
        );
    }

    #[test]
    fn test_fallback_respects_disabled_steps() {
        let mut config = PlacementConfig::default();
        config.fallback_strategy.use_default_type = false;
        config.fallback_strategy.use_cheapest_type = false;
        config.fallback_strategy.emergency_fallback = "sniper".to_string();
        let strategy = PlacementStrategy::new(config);
        let resolved = strategy.resolve_type("laser", &BuildingCatalog::builtin());
        assert_eq!(resolved.key, "sniper");
        assert!(resolved.fell_back);
    }

    #[test]
    fn test_initial_cost_cap_uses_cheapest_type() {
        let mut config = PlacementConfig::default();
        config.strategies.initial_wave.building_category = "sniper".to_string();
        let strategy = PlacementStrategy::new(config);
        let requests = strategy.plan(1, 1_000, &BuildingCatalog::builtin()).unwrap();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].building_type.key, "basic");
    }

    #[test]
    fn test_cost_multiplier_changes_spend() {
        let strategy = PlacementStrategy::default();
        let buildings = BuildingCatalog::builtin().with_multipliers(BuildingMultipliers {
            cost: 0.5,
            damage: 1.0,
        });
        let mut session = SessionState::new(1_000, 20);
        let report = strategy.apply(&mut session, &buildings, 1).unwrap();
        assert_eq!(report.spent, 100);
        assert_eq!(session.money(), 900);
    }
}
