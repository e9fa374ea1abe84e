//! Stat providers: resolve a type key to a stat record.
//!
//! Each catalog wraps an immutable, shared map loaded once. Multipliers are
//! per-run provider state applied at read time, so the stored map is never
//! mutated and the same catalog can back many runs.
//!
//! # Key resolution
//!
//! Unknown keys never fail silently. [`KeyResolution`] tells the caller
//! whether the requested type was used or a substitute was picked:
//!
//! 1. exact key match
//! 2. the first of [`DEFAULT_KEYS`] present in the map
//! 3. the first entry in key order
//!
//! An empty catalog cannot be constructed.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::data::{BuildingStatsEntry, BuildingStatsFile, EnemyStatsEntry, EnemyStatsFile, WaveScaling};
use crate::error::{Result, SimError};
use crate::math::{checked_fixed, Fixed};
use crate::stats::{BuildingMultipliers, BuildingStats, EnemyMultipliers, EnemyStats};

/// Keys treated as the catalog default, in priority order.
pub const DEFAULT_KEYS: [&str; 2] = ["default", "basic"];

/// Outcome of resolving a type key against a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResolution<'a> {
    /// The requested key exists.
    Found(&'a str),
    /// The requested key is unknown; this key was substituted.
    FellBackTo(&'a str),
    /// Nothing to resolve to.
    NotFound,
}

impl<'a> KeyResolution<'a> {
    /// The resolved key, if any.
    #[must_use]
    pub const fn key(&self) -> Option<&'a str> {
        match self {
            Self::Found(key) | Self::FellBackTo(key) => Some(key),
            Self::NotFound => None,
        }
    }

    /// Whether a substitute was used.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::FellBackTo(_))
    }
}

/// Resolve `key` against any string-keyed map.
pub fn resolve_key<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> KeyResolution<'a> {
    if let Some((found, _)) = map.get_key_value(key) {
        return KeyResolution::Found(found.as_str());
    }
    for default in DEFAULT_KEYS {
        if let Some((found, _)) = map.get_key_value(default) {
            return KeyResolution::FellBackTo(found.as_str());
        }
    }
    match map.keys().next() {
        Some(first) => KeyResolution::FellBackTo(first.as_str()),
        None => KeyResolution::NotFound,
    }
}

/// Read access to building stats.
pub trait BuildingStatProvider {
    /// Resolve a building key.
    fn resolve_building(&self, key: &str) -> KeyResolution<'_>;

    /// Stats for a key, resolved through the fallback chain, with
    /// multipliers applied.
    fn building_stats(&self, key: &str) -> Result<BuildingStats>;

    /// Whether the key exists verbatim.
    fn has_building(&self, key: &str) -> bool {
        matches!(self.resolve_building(key), KeyResolution::Found(_))
    }

    /// The catalog default type, if one of [`DEFAULT_KEYS`] exists.
    fn default_building_key(&self) -> Option<&str>;

    /// The cheapest type after multipliers (ties broken by key order).
    fn cheapest_building_key(&self) -> Option<&str>;
}

/// Read access to enemy stats.
pub trait EnemyStatProvider {
    /// Resolve an enemy key.
    fn resolve_enemy(&self, key: &str) -> KeyResolution<'_>;

    /// Stats for a key with health/speed multipliers applied.
    fn enemy_stats(&self, key: &str) -> Result<EnemyStats>;

    /// Stats for a key with multipliers and wave scaling applied.
    fn scaled_stats_for_wave(&self, key: &str, wave: u32) -> Result<EnemyStats>;
}

/// Immutable building stat catalog.
#[derive(Debug, Clone)]
pub struct BuildingCatalog {
    entries: Arc<BTreeMap<String, BuildingStatsEntry>>,
    multipliers: BuildingMultipliers,
}

impl BuildingCatalog {
    /// Build a catalog from raw entries, validating each one.
    pub fn new(entries: BTreeMap<String, BuildingStatsEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(SimError::EmptyCatalog { kind: "building" });
        }
        for (key, entry) in &entries {
            entry.validate(key)?;
        }
        Ok(Self {
            entries: Arc::new(entries),
            multipliers: BuildingMultipliers::default(),
        })
    }

    /// Build a catalog from a parsed stats file.
    pub fn from_file(file: BuildingStatsFile) -> Result<Self> {
        Self::new(file.buildings)
    }

    /// A copy sharing the same map with different multipliers.
    #[must_use]
    pub fn with_multipliers(&self, multipliers: BuildingMultipliers) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            multipliers,
        }
    }

    /// Current multipliers.
    #[must_use]
    pub const fn multipliers(&self) -> BuildingMultipliers {
        self.multipliers
    }

    /// Known keys in iteration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn scaled_cost(&self, entry: &BuildingStatsEntry) -> u32 {
        (entry.cost as f64 * self.multipliers.cost) as u32
    }

    fn apply(&self, key: &str, entry: &BuildingStatsEntry) -> Result<BuildingStats> {
        let invalid = |field: &'static str, value: f64| SimError::InvalidStat {
            key: key.to_string(),
            field,
            value,
        };
        Ok(BuildingStats {
            cost: self.scaled_cost(entry),
            damage: (entry.damage as f64 * self.multipliers.damage) as u32,
            range: checked_fixed(entry.range).ok_or_else(|| invalid("range", entry.range))?,
            fire_rate: checked_fixed(entry.fire_rate)
                .ok_or_else(|| invalid("fireRate", entry.fire_rate))?,
            bullet_speed: checked_fixed(entry.bullet_speed)
                .ok_or_else(|| invalid("bulletSpeed", entry.bullet_speed))?,
            shoot_sound: entry.shoot_sound.clone(),
            impact_sound: entry.impact_sound.clone(),
            description: entry.description.clone(),
        })
    }

    /// The built-in tower set used when no stats file is supplied.
    #[must_use]
    pub fn builtin() -> Self {
        let entry = |cost, damage, range, fire_rate, bullet_speed, name: &str, desc: &str| {
            BuildingStatsEntry {
                cost,
                damage,
                range,
                fire_rate,
                bullet_speed,
                shoot_sound: format!("shoot_{name}"),
                impact_sound: format!("impact_{name}"),
                description: desc.to_string(),
            }
        };
        let entries: BTreeMap<String, BuildingStatsEntry> = [
            ("basic", entry(50, 10, 4.5, 4.0, 12.0, "basic", "Cheap all-round tower")),
            ("cannon", entry(100, 25, 3.5, 1.5, 8.0, "cannon", "Slow, heavy hitter")),
            ("rapid", entry(120, 6, 4.0, 8.0, 16.0, "rapid", "High fire rate, low damage")),
            ("sniper", entry(150, 40, 8.0, 1.0, 30.0, "sniper", "Long range precision")),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

        Self {
            entries: Arc::new(entries),
            multipliers: BuildingMultipliers::default(),
        }
    }
}

impl BuildingStatProvider for BuildingCatalog {
    fn resolve_building(&self, key: &str) -> KeyResolution<'_> {
        resolve_key(&self.entries, key)
    }

    fn building_stats(&self, key: &str) -> Result<BuildingStats> {
        let resolved = match self.resolve_building(key) {
            KeyResolution::Found(found) => found,
            KeyResolution::FellBackTo(substitute) => {
                warn!(requested = key, substitute, "Unknown building type, using fallback");
                substitute
            }
            KeyResolution::NotFound => return Err(SimError::EmptyCatalog { kind: "building" }),
        };
        let entry = self
            .entries
            .get(resolved)
            .ok_or(SimError::EmptyCatalog { kind: "building" })?;
        self.apply(resolved, entry)
    }

    fn default_building_key(&self) -> Option<&str> {
        DEFAULT_KEYS
            .iter()
            .find_map(|key| self.entries.get_key_value(*key).map(|(k, _)| k.as_str()))
    }

    fn cheapest_building_key(&self) -> Option<&str> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| self.scaled_cost(entry))
            .map(|(key, _)| key.as_str())
    }
}

/// Immutable enemy stat catalog with wave scaling coefficients.
#[derive(Debug, Clone)]
pub struct EnemyCatalog {
    entries: Arc<BTreeMap<String, EnemyStatsEntry>>,
    scaling: WaveScaling,
    multipliers: EnemyMultipliers,
}

impl EnemyCatalog {
    /// Build a catalog from raw entries, validating each one.
    pub fn new(entries: BTreeMap<String, EnemyStatsEntry>, scaling: WaveScaling) -> Result<Self> {
        if entries.is_empty() {
            return Err(SimError::EmptyCatalog { kind: "enemy" });
        }
        for (key, entry) in &entries {
            entry.validate(key)?;
        }
        scaling.validate()?;
        Ok(Self {
            entries: Arc::new(entries),
            scaling,
            multipliers: EnemyMultipliers::default(),
        })
    }

    /// Build a catalog from a parsed stats file.
    pub fn from_file(file: EnemyStatsFile) -> Result<Self> {
        Self::new(file.enemies, file.wave_scaling)
    }

    /// A copy sharing the same map with different multipliers.
    #[must_use]
    pub fn with_multipliers(&self, multipliers: EnemyMultipliers) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            scaling: self.scaling,
            multipliers,
        }
    }

    /// Current multipliers.
    #[must_use]
    pub const fn multipliers(&self) -> EnemyMultipliers {
        self.multipliers
    }

    /// Wave scaling coefficients.
    #[must_use]
    pub const fn scaling(&self) -> WaveScaling {
        self.scaling
    }

    /// Known keys in iteration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn lookup(&self, key: &str) -> Result<(&str, &EnemyStatsEntry)> {
        let resolved = match self.resolve_enemy(key) {
            KeyResolution::Found(found) => found,
            KeyResolution::FellBackTo(substitute) => {
                warn!(requested = key, substitute, "Unknown enemy type, using fallback");
                substitute
            }
            KeyResolution::NotFound => return Err(SimError::EmptyCatalog { kind: "enemy" }),
        };
        self.entries
            .get_key_value(resolved)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or(SimError::EmptyCatalog { kind: "enemy" })
    }

    /// Build the record from float health/speed, rejecting unrepresentable
    /// or non-positive results.
    fn finish(
        key: &str,
        entry: &EnemyStatsEntry,
        health: f64,
        speed: f64,
        damage: u32,
        gold: u32,
        xp: u32,
    ) -> Result<EnemyStats> {
        let max_health = checked_fixed(health)
            .filter(|h| *h > Fixed::ZERO)
            .ok_or_else(|| SimError::InvalidStat {
                key: key.to_string(),
                field: "maxHealth",
                value: health,
            })?;
        let speed_fixed = checked_fixed(speed)
            .filter(|s| *s > Fixed::ZERO)
            .ok_or_else(|| SimError::InvalidStat {
                key: key.to_string(),
                field: "speed",
                value: speed,
            })?;
        Ok(EnemyStats {
            max_health,
            speed: speed_fixed,
            damage,
            gold_reward: gold,
            xp_reward: xp,
            description: entry.description.clone(),
        })
    }

    /// The built-in enemy set used when no stats file is supplied.
    #[must_use]
    pub fn builtin() -> Self {
        let entry = |max_health, speed, damage, reward_gold, reward_xp, desc: &str| {
            EnemyStatsEntry {
                max_health,
                speed,
                damage,
                reward_gold,
                reward_xp,
                description: desc.to_string(),
            }
        };
        let entries: BTreeMap<String, EnemyStatsEntry> = [
            ("basic", entry(100, 1.0, 1, 10, 5, "Standard walker")),
            ("boss", entry(1000, 0.5, 5, 100, 60, "Wave leader")),
            ("elite", entry(250, 1.2, 2, 30, 20, "Armored veteran")),
            ("fast", entry(60, 2.0, 1, 8, 4, "Quick runner")),
            ("tank", entry(300, 0.6, 2, 20, 12, "Slow and sturdy")),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

        Self {
            entries: Arc::new(entries),
            scaling: WaveScaling::default(),
            multipliers: EnemyMultipliers::default(),
        }
    }
}

impl EnemyStatProvider for EnemyCatalog {
    fn resolve_enemy(&self, key: &str) -> KeyResolution<'_> {
        resolve_key(&self.entries, key)
    }

    fn enemy_stats(&self, key: &str) -> Result<EnemyStats> {
        let (resolved, entry) = self.lookup(key)?;
        Self::finish(
            resolved,
            entry,
            entry.max_health as f64 * self.multipliers.health,
            entry.speed * self.multipliers.speed,
            entry.damage,
            entry.reward_gold,
            entry.reward_xp,
        )
    }

    fn scaled_stats_for_wave(&self, key: &str, wave: u32) -> Result<EnemyStats> {
        let (resolved, entry) = self.lookup(key)?;
        let waves_past_first = wave.saturating_sub(1);
        let steps = waves_past_first as f64;
        let scaling = &self.scaling;

        let health = entry.max_health as f64
            * self.multipliers.health
            * (1.0 + steps * scaling.health_per_wave);
        let speed = entry.speed * self.multipliers.speed * (1.0 + steps * scaling.speed_per_wave);
        let damage = entry.damage + waves_past_first / scaling.damage_every_n_waves;
        let reward_factor = 1.0 + steps * scaling.reward_per_wave;
        let gold = (entry.reward_gold as f64 * reward_factor) as u32;
        let xp = (entry.reward_xp as f64 * reward_factor) as u32;

        Self::finish(resolved, entry, health, speed, damage, gold, xp)
    }
}
