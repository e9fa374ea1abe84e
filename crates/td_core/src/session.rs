//! Mutable state of one simulated session.
//!
//! A [`SessionState`] is owned by exactly one runner for the duration of one
//! run. All mutation goes through its methods, which keep the money, lives
//! and score invariants intact.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::spawning::EnemyCategory;
use crate::stats::{BuildingStats, EnemyStats};

/// Identifier of a live enemy, unique within a run.
pub type EnemyId = u64;

/// A tower placed on the map.
///
/// Stats are copied from the post-multiplier [`BuildingStats`] at placement
/// time and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTower {
    /// Resolved building type key.
    pub building_type: String,
    /// World position.
    pub position: Vec2Fixed,
    /// Damage per shot.
    pub damage: u32,
    /// Attack range.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Shots per fire window.
    #[serde(with = "fixed_serde")]
    pub fire_rate: Fixed,
    /// Price paid.
    pub cost: u32,
    /// Time until the tower may fire again.
    #[serde(with = "fixed_serde")]
    pub cooldown: Fixed,
}

impl PlacedTower {
    /// Create a ready-to-fire tower from resolved stats.
    #[must_use]
    pub fn new(building_type: impl Into<String>, position: Vec2Fixed, stats: &BuildingStats) -> Self {
        Self {
            building_type: building_type.into(),
            position,
            damage: stats.damage,
            range: stats.range,
            fire_rate: stats.fire_rate,
            cost: stats.cost,
            cooldown: Fixed::ZERO,
        }
    }

    /// Whether the cooldown has elapsed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cooldown <= Fixed::ZERO
    }

    /// Time between shots for the given fire window.
    #[must_use]
    pub fn reload_time(&self, fire_window: Fixed) -> Fixed {
        fire_window.checked_div(self.fire_rate).unwrap_or(Fixed::ZERO)
    }

    /// Whether `point` lies within range (inclusive).
    #[must_use]
    pub fn in_range(&self, point: Vec2Fixed) -> bool {
        self.position.distance_squared(point) <= self.range.saturating_mul(self.range)
    }
}

/// An enemy currently on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEnemy {
    /// Unique id within the run.
    pub id: EnemyId,
    /// Resolved enemy type key.
    pub enemy_type: String,
    /// Category chosen by the spawn rules.
    pub category: EnemyCategory,
    /// Current health.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Maximum health.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Movement speed.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Gold granted on kill.
    pub gold_reward: u32,
    /// Score granted on kill.
    pub xp_reward: u32,
    /// World position.
    pub position: Vec2Fixed,
    /// Simulated seconds since wave start at which it spawned.
    pub spawn_time: f64,
}

impl LiveEnemy {
    /// Create an enemy at `position` with full health.
    #[must_use]
    pub fn new(
        id: EnemyId,
        enemy_type: impl Into<String>,
        category: EnemyCategory,
        stats: &EnemyStats,
        position: Vec2Fixed,
        spawn_time: f64,
    ) -> Self {
        Self {
            id,
            enemy_type: enemy_type.into(),
            category,
            health: stats.max_health,
            max_health: stats.max_health,
            speed: stats.speed,
            gold_reward: stats.gold_reward,
            xp_reward: stats.xp_reward,
            position,
            spawn_time,
        }
    }

    /// Whether health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > Fixed::ZERO
    }

    /// Apply damage; returns true if this shot killed the enemy.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        self.health = self.health.saturating_sub(Fixed::from_num(amount));
        !self.is_alive()
    }
}

/// Read-only copy of the session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Money held.
    pub money: u32,
    /// Lives remaining.
    pub lives: u32,
    /// Score accumulated.
    pub score: u64,
    /// Current wave (0 before the first wave).
    pub current_wave: u32,
    /// Number of towers placed.
    pub tower_count: usize,
    /// Number of enemies on the map.
    pub enemy_count: usize,
    /// Game over flag.
    pub game_over: bool,
    /// Victory flag.
    pub victory: bool,
}

/// Money, lives, score, wave counter, towers and enemies of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    money: u32,
    lives: u32,
    score: u64,
    current_wave: u32,
    towers: Vec<PlacedTower>,
    enemies: Vec<LiveEnemy>,
    game_over: bool,
    victory: bool,
}

impl SessionState {
    /// Fresh session with the given starting money and lives.
    #[must_use]
    pub fn new(money: u32, lives: u32) -> Self {
        Self {
            money,
            lives,
            score: 0,
            current_wave: 0,
            towers: Vec::new(),
            enemies: Vec::new(),
            game_over: lives == 0,
            victory: false,
        }
    }

    /// Whether `amount` can be spent.
    #[must_use]
    pub const fn can_afford(&self, amount: u32) -> bool {
        amount <= self.money
    }

    /// Spend money, failing without mutation if the session cannot afford it.
    pub fn spend_money(&mut self, amount: u32) -> Result<()> {
        if !self.can_afford(amount) {
            return Err(SimError::InsufficientFunds {
                required: amount,
                available: self.money,
            });
        }
        self.money -= amount;
        Ok(())
    }

    /// Add money.
    pub fn add_money(&mut self, amount: u32) {
        self.money = self.money.saturating_add(amount);
    }

    /// Add score.
    pub fn add_score(&mut self, amount: u64) {
        self.score = self.score.saturating_add(amount);
    }

    /// Lose one life. Sets game over when lives reach zero.
    pub fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.game_over = true;
        }
    }

    /// Enter wave `wave`, clearing any leftover enemies.
    pub fn start_wave(&mut self, wave: u32) {
        self.current_wave = wave;
        self.enemies.clear();
    }

    /// Mark the current wave complete; flags victory after the last wave.
    pub fn complete_wave(&mut self, max_waves: u32) {
        if self.current_wave >= max_waves && self.lives > 0 {
            self.victory = true;
            self.game_over = true;
        }
    }

    /// Append a tower.
    pub fn place_tower(&mut self, tower: PlacedTower) {
        self.towers.push(tower);
    }

    /// Append an enemy.
    pub fn spawn_enemy(&mut self, enemy: LiveEnemy) {
        self.enemies.push(enemy);
    }

    /// Money held.
    #[must_use]
    pub const fn money(&self) -> u32 {
        self.money
    }

    /// Lives remaining.
    #[must_use]
    pub const fn lives(&self) -> u32 {
        self.lives
    }

    /// Score accumulated.
    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    /// Current wave.
    #[must_use]
    pub const fn current_wave(&self) -> u32 {
        self.current_wave
    }

    /// Placed towers in placement order.
    #[must_use]
    pub fn towers(&self) -> &[PlacedTower] {
        &self.towers
    }

    /// Live enemies in spawn order.
    #[must_use]
    pub fn enemies(&self) -> &[LiveEnemy] {
        &self.enemies
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Whether the session ended in victory.
    #[must_use]
    pub const fn is_victory(&self) -> bool {
        self.victory
    }

    pub(crate) fn towers_and_enemies_mut(&mut self) -> (&mut [PlacedTower], &mut Vec<LiveEnemy>) {
        (&mut self.towers, &mut self.enemies)
    }

    pub(crate) fn enemies_mut(&mut self) -> &mut Vec<LiveEnemy> {
        &mut self.enemies
    }

    /// Copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            money: self.money,
            lives: self.lives,
            score: self.score,
            current_wave: self.current_wave,
            tower_count: self.towers.len(),
            enemy_count: self.enemies.len(),
            game_over: self.game_over,
            victory: self.victory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{BuildingCatalog, BuildingStatProvider, EnemyCatalog, EnemyStatProvider};

    #[test]
    fn test_spend_money_rejects_overdraft() {
        let mut session = SessionState::new(100, 20);
        assert!(session.spend_money(60).is_ok());
        assert_eq!(session.money(), 40);
        assert_eq!(
            session.spend_money(50),
            Err(SimError::InsufficientFunds {
                required: 50,
                available: 40
            })
        );
        assert_eq!(session.money(), 40);
    }

    #[test]
    fn test_lose_life_saturates_and_ends_game() {
        let mut session = SessionState::new(0, 2);
        session.lose_life();
        assert!(!session.is_game_over());
        session.lose_life();
        session.lose_life();
        assert_eq!(session.lives(), 0);
        assert!(session.is_game_over());
        assert!(!session.is_victory());
    }

    #[test]
    fn test_complete_final_wave_is_victory() {
        let mut session = SessionState::new(0, 5);
        session.start_wave(2);
        session.complete_wave(3);
        assert!(!session.is_game_over());
        session.start_wave(3);
        session.complete_wave(3);
        assert!(session.is_victory());
        assert!(session.is_game_over());
    }

    #[test]
    fn test_start_wave_clears_enemies() {
        let enemies = EnemyCatalog::builtin();
        let stats = enemies.enemy_stats("basic").unwrap();
        let mut session = SessionState::new(0, 5);
        session.spawn_enemy(LiveEnemy::new(
            0,
            "basic",
            EnemyCategory::Basic,
            &stats,
            Vec2Fixed::ZERO,
            0.0,
        ));
        assert_eq!(session.snapshot().enemy_count, 1);
        session.start_wave(1);
        assert!(session.enemies().is_empty());
        assert_eq!(session.current_wave(), 1);
    }

    #[test]
    fn test_tower_reload_and_range() {
        let stats = BuildingCatalog::builtin().building_stats("basic").unwrap();
        let tower = PlacedTower::new("basic", Vec2Fixed::from_ints(0, 0), &stats);
        assert!(tower.is_ready());
        // 1.0 / 4.0
        assert_eq!(tower.reload_time(Fixed::ONE), Fixed::from_num(0.25));
        assert!(tower.in_range(Vec2Fixed::from_ints(4, 0)));
        assert!(!tower.in_range(Vec2Fixed::from_ints(5, 0)));
    }

    #[test]
    fn test_enemy_take_damage() {
        let stats = EnemyCatalog::builtin().enemy_stats("fast").unwrap();
        let mut enemy = LiveEnemy::new(1, "fast", EnemyCategory::Fast, &stats, Vec2Fixed::ZERO, 0.0);
        assert!(!enemy.take_damage(59));
        assert!(enemy.take_damage(1));
        assert!(!enemy.is_alive());
    }
}
