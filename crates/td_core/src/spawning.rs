//! Enemy spawning: wave sizes, enemy typing and spawn orders.
//!
//! A [`SpawnPlan`] lists every enemy a wave will spawn, either derived from
//! the procedural rules or copied from an authored [`WaveDefinition`]. The
//! [`Spawner`] turns a plan into [`LiveEnemy`] values with wave-scaled stats.

use serde::{Deserialize, Serialize};

use crate::data::WaveDefinition;
use crate::error::{Result, SimError};
use crate::math::{checked_fixed, Fixed, Vec2Fixed};
use crate::providers::EnemyStatProvider;
use crate::session::{EnemyId, LiveEnemy};

/// Seconds between procedural spawns. Only affects recorded timestamps.
pub const PROCEDURAL_SPAWN_INTERVAL: f64 = 0.5;

/// Number of enemies in a procedural wave.
///
/// `max(1, trunc((base + (wave - 1) * per_wave) * count_multiplier))`
#[must_use]
pub fn enemy_count_for_wave(wave: u32, base: u32, per_wave: u32, count_multiplier: f64) -> u32 {
    let raw = base.saturating_add(wave.saturating_sub(1).saturating_mul(per_wave));
    let scaled = (f64::from(raw) * count_multiplier) as u32;
    scaled.max(1)
}

/// Enemy category picked by the procedural typing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyCategory {
    /// Default walker.
    Basic,
    /// Quick runner.
    Fast,
    /// Slow and sturdy.
    Tank,
    /// Armored veteran.
    Elite,
    /// Wave leader.
    Boss,
}

impl EnemyCategory {
    /// Category for the `index`-th enemy (0-based) of `wave`.
    ///
    /// Rules are checked in priority order and the first match wins:
    /// boss, elite, tank, fast, basic.
    #[must_use]
    pub const fn for_spawn(wave: u32, index: u32) -> Self {
        if wave >= 8 && index == 0 {
            Self::Boss
        } else if wave >= 6 && index % 4 == 0 {
            Self::Elite
        } else if wave >= 4 && index % 3 == 0 {
            Self::Tank
        } else if wave >= 2 && index % 2 == 0 {
            Self::Fast
        } else {
            Self::Basic
        }
    }

    /// Stat catalog key for this category.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Fast => "fast",
            Self::Tank => "tank",
            Self::Elite => "elite",
            Self::Boss => "boss",
        }
    }

    /// Parse a catalog key. Unknown keys have no category.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "basic" => Some(Self::Basic),
            "fast" => Some(Self::Fast),
            "tank" => Some(Self::Tank),
            "elite" => Some(Self::Elite),
            "boss" => Some(Self::Boss),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnemyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Seeded linear-congruential generator.
///
/// One instance per run. Draws happen in spawn order, so the sequence is a
/// pure function of the seed and the wave layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a generator from a seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Next raw value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.state
    }

    /// Next value in `[0, 1)` as fixed-point.
    pub fn next_unit(&mut self) -> Fixed {
        let high = (self.next_u64() >> 32) as u32;
        Fixed::from_bits(i64::from(high))
    }
}

/// One enemy to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnOrder {
    /// Requested enemy type key.
    pub enemy_type: String,
    /// Category used for reporting.
    pub category: EnemyCategory,
    /// Seconds after wave start.
    pub spawn_time: f64,
    /// Extra health multiplier on top of wave scaling.
    pub health_multiplier: f64,
    /// Extra speed multiplier on top of wave scaling.
    pub speed_multiplier: f64,
    /// Replaces the scaled gold reward when set.
    pub money_reward: Option<u32>,
}

impl SpawnOrder {
    fn procedural(wave: u32, index: u32) -> Self {
        let category = EnemyCategory::for_spawn(wave, index);
        Self {
            enemy_type: category.key().to_string(),
            category,
            spawn_time: f64::from(index) * PROCEDURAL_SPAWN_INTERVAL,
            health_multiplier: 1.0,
            speed_multiplier: 1.0,
            money_reward: None,
        }
    }
}

/// Every enemy of one wave, in spawn order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnPlan {
    /// Wave number.
    pub wave: u32,
    /// Orders in spawn order.
    pub orders: Vec<SpawnOrder>,
    /// Money added on completion on top of the standard bonus.
    pub bonus_money: u32,
    /// Simulated seconds before the wave starts.
    pub pre_wave_delay: f64,
    /// Simulated seconds after the wave ends.
    pub post_wave_delay: f64,
}

impl SpawnPlan {
    /// Plan a wave from the procedural count and typing rules.
    #[must_use]
    pub fn procedural(wave: u32, base: u32, per_wave: u32, count_multiplier: f64) -> Self {
        let count = enemy_count_for_wave(wave, base, per_wave, count_multiplier);
        Self {
            wave,
            orders: (0..count).map(|index| SpawnOrder::procedural(wave, index)).collect(),
            bonus_money: 0,
            pre_wave_delay: 0.0,
            post_wave_delay: 0.0,
        }
    }

    /// Plan a wave from an authored definition. Groups spawn in declaration
    /// order; counts are taken as authored.
    #[must_use]
    pub fn from_definition(definition: &WaveDefinition) -> Self {
        let orders = definition
            .enemy_groups
            .iter()
            .flat_map(|group| {
                let category =
                    EnemyCategory::from_key(&group.enemy_type).unwrap_or(EnemyCategory::Basic);
                (0..group.count).map(move |i| SpawnOrder {
                    enemy_type: group.enemy_type.clone(),
                    category,
                    spawn_time: group.start_delay + f64::from(i) * group.spawn_interval,
                    health_multiplier: group.health_multiplier,
                    speed_multiplier: group.speed_multiplier,
                    money_reward: group.money_reward,
                })
            })
            .collect();

        Self {
            wave: definition.wave_number,
            orders,
            bonus_money: definition.bonus_money,
            pre_wave_delay: definition.pre_wave_delay,
            post_wave_delay: definition.post_wave_delay,
        }
    }

    /// Number of enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the wave spawns nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Turns spawn orders into live enemies.
#[derive(Debug, Clone)]
pub struct Spawner {
    rng: SimRng,
    next_id: EnemyId,
    spawn_point: Vec2Fixed,
    jitter: Fixed,
}

impl Spawner {
    /// Create a spawner. `jitter` is the maximum vertical offset from the
    /// spawn point.
    #[must_use]
    pub const fn new(seed: u64, spawn_point: Vec2Fixed, jitter: Fixed) -> Self {
        Self {
            rng: SimRng::new(seed),
            next_id: 0,
            spawn_point,
            jitter,
        }
    }

    /// Spawn every order in `plan` with stats scaled for `plan.wave`.
    pub fn spawn_wave<E>(&mut self, plan: &SpawnPlan, enemies: &E) -> Result<Vec<LiveEnemy>>
    where
        E: EnemyStatProvider + ?Sized,
    {
        plan.orders
            .iter()
            .map(|order| self.spawn_one(plan.wave, order, enemies))
            .collect()
    }

    fn spawn_one<E>(&mut self, wave: u32, order: &SpawnOrder, enemies: &E) -> Result<LiveEnemy>
    where
        E: EnemyStatProvider + ?Sized,
    {
        let mut stats = enemies.scaled_stats_for_wave(&order.enemy_type, wave)?;
        let resolved = enemies
            .resolve_enemy(&order.enemy_type)
            .key()
            .unwrap_or(order.enemy_type.as_str())
            .to_string();

        stats.max_health = apply_multiplier(
            stats.max_health,
            order.health_multiplier,
            &resolved,
            "healthMultiplier",
        )?;
        stats.speed = apply_multiplier(
            stats.speed,
            order.speed_multiplier,
            &resolved,
            "speedMultiplier",
        )?;
        if let Some(reward) = order.money_reward {
            stats.gold_reward = reward;
        }

        // Always draw, so the sequence does not depend on the jitter setting.
        let unit = self.rng.next_unit();
        let offset = (unit * Fixed::from_num(2) - Fixed::ONE).saturating_mul(self.jitter);
        let position = Vec2Fixed::new(self.spawn_point.x, self.spawn_point.y.saturating_add(offset));

        let id = self.next_id;
        self.next_id += 1;
        Ok(LiveEnemy::new(id, resolved, order.category, &stats, position, order.spawn_time))
    }
}

fn apply_multiplier(value: Fixed, multiplier: f64, key: &str, field: &'static str) -> Result<Fixed> {
    if (multiplier - 1.0).abs() < f64::EPSILON {
        return Ok(value);
    }
    let factor = checked_fixed(multiplier).filter(|m| *m > Fixed::ZERO).ok_or_else(|| {
        SimError::InvalidStat {
            key: key.to_string(),
            field,
            value: multiplier,
        }
    })?;
    Ok(value.saturating_mul(factor).max(Fixed::DELTA))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EnemyGroup;
    use crate::providers::EnemyCatalog;

    #[test]
    fn test_wave_six_index_four_is_elite() {
        assert_eq!(EnemyCategory::for_spawn(6, 4), EnemyCategory::Elite);
    }

    #[test]
    fn test_category_priority() {
        assert_eq!(EnemyCategory::for_spawn(1, 0), EnemyCategory::Basic);
        assert_eq!(EnemyCategory::for_spawn(2, 0), EnemyCategory::Fast);
        assert_eq!(EnemyCategory::for_spawn(2, 1), EnemyCategory::Basic);
        assert_eq!(EnemyCategory::for_spawn(4, 3), EnemyCategory::Tank);
        // index 0 matches tank before fast
        assert_eq!(EnemyCategory::for_spawn(4, 0), EnemyCategory::Tank);
        assert_eq!(EnemyCategory::for_spawn(7, 0), EnemyCategory::Elite);
        assert_eq!(EnemyCategory::for_spawn(8, 0), EnemyCategory::Boss);
        assert_eq!(EnemyCategory::for_spawn(8, 8), EnemyCategory::Elite);
    }

    #[test]
    fn test_enemy_count_formula() {
        assert_eq!(enemy_count_for_wave(1, 5, 2, 1.0), 5);
        assert_eq!(enemy_count_for_wave(4, 5, 2, 1.0), 11);
        assert_eq!(enemy_count_for_wave(4, 5, 2, 0.5), 5);
        assert_eq!(enemy_count_for_wave(1, 5, 2, 0.01), 1);
    }

    #[test]
    fn test_rng_is_seeded() {
        let mut a = SimRng::new(42);
        let mut b = SimRng::new(42);
        let mut c = SimRng::new(43);
        let first = a.next_u64();
        assert_eq!(first, b.next_u64());
        assert_ne!(first, c.next_u64());
        let unit = a.next_unit();
        assert!(unit >= Fixed::ZERO && unit < Fixed::ONE);
    }

    #[test]
    fn test_procedural_plan() {
        let plan = SpawnPlan::procedural(2, 5, 2, 1.0);
        assert_eq!(plan.len(), 7);
        assert_eq!(plan.orders[0].category, EnemyCategory::Fast);
        assert_eq!(plan.orders[1].enemy_type, "basic");
        assert!((plan.orders[2].spawn_time - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_from_definition() {
        let definition = WaveDefinition {
            wave_number: 3,
            wave_name: "Mixed".to_string(),
            pre_wave_delay: 1.0,
            post_wave_delay: 0.5,
            bonus_money: 40,
            enemy_groups: vec![
                EnemyGroup {
                    enemy_type: "tank".to_string(),
                    count: 2,
                    spawn_interval: 1.5,
                    start_delay: 2.0,
                    health_multiplier: 2.0,
                    speed_multiplier: 1.0,
                    money_reward: Some(99),
                },
                EnemyGroup {
                    enemy_type: "ghost".to_string(),
                    count: 1,
                    spawn_interval: 0.0,
                    start_delay: 0.0,
                    health_multiplier: 1.0,
                    speed_multiplier: 1.0,
                    money_reward: None,
                },
            ],
        };
        let plan = SpawnPlan::from_definition(&definition);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.bonus_money, 40);
        assert!((plan.orders[1].spawn_time - 3.5).abs() < 1e-9);
        assert_eq!(plan.orders[2].category, EnemyCategory::Basic);

        let mut spawner = Spawner::new(1, Vec2Fixed::from_ints(0, 5), Fixed::ZERO);
        let spawned = spawner.spawn_wave(&plan, &EnemyCatalog::builtin()).unwrap();
        // 300 * (1 + 2 * 0.15) * 2
        assert!((spawned[0].max_health.to_num::<f64>() - 780.0).abs() < 1e-6);
        assert_eq!(spawned[0].gold_reward, 99);
        // Unknown type falls back to the catalog default.
        assert_eq!(spawned[2].enemy_type, "basic");
        assert_eq!(spawned[2].id, 2);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let plan = SpawnPlan::procedural(3, 10, 0, 1.0);
        let jitter = Fixed::from_num(0.5);
        let mut spawner = Spawner::new(7, Vec2Fixed::from_ints(0, 5), jitter);
        let spawned = spawner.spawn_wave(&plan, &EnemyCatalog::builtin()).unwrap();
        for enemy in spawned {
            let dy = (enemy.position.y - Fixed::from_num(5)).abs();
            assert!(dy <= jitter);
            assert_eq!(enemy.position.x, Fixed::ZERO);
        }
    }
}
