//! Per-tick tower fire.
//!
//! Towers fire in placement order. Each ready tower shoots the nearest
//! living enemy in range, at most once per tick. Kills are removed and paid
//! out before the next tower acts.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::math::Fixed;
use crate::session::{EnemyId, LiveEnemy, PlacedTower, SessionState};
use crate::spawning::EnemyCategory;

/// An enemy killed by a tower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillEvent {
    /// Killed enemy.
    pub enemy_id: EnemyId,
    /// Its type key.
    pub enemy_type: String,
    /// Its category.
    pub category: EnemyCategory,
    /// Index of the tower that landed the final shot.
    pub tower_index: usize,
    /// Gold paid out.
    pub gold: u32,
    /// Score paid out.
    pub xp: u32,
}

/// Index of the nearest living enemy within `tower`'s range.
///
/// Ties keep the enemy that comes first in spawn order.
#[must_use]
pub fn nearest_in_range(tower: &PlacedTower, enemies: &[LiveEnemy]) -> Option<usize> {
    let mut best: Option<(usize, Fixed)> = None;
    for (index, enemy) in enemies.iter().enumerate() {
        if !enemy.is_alive() || !tower.in_range(enemy.position) {
            continue;
        }
        let distance = tower.position.distance_squared(enemy.position);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

/// Run one tick of combat.
///
/// `dt` is the tick length and `fire_window` the time span that a tower's
/// fire rate is expressed in.
pub fn resolve_combat(session: &mut SessionState, dt: Fixed, fire_window: Fixed) -> Vec<KillEvent> {
    let mut kills = Vec::new();
    let tower_count = session.towers().len();

    for tower_index in 0..tower_count {
        let (towers, enemies) = session.towers_and_enemies_mut();
        let Some(tower) = towers.get_mut(tower_index) else {
            continue;
        };

        tower.cooldown = tower.cooldown.saturating_sub(dt);
        if !tower.is_ready() {
            continue;
        }
        let Some(target) = nearest_in_range(tower, enemies) else {
            // Idle time is not banked.
            tower.cooldown = Fixed::ZERO;
            continue;
        };

        // Carry the part of the tick past the ready point into the next reload.
        tower.cooldown = tower
            .cooldown
            .saturating_add(tower.reload_time(fire_window))
            .max(Fixed::ZERO);
        let damage = tower.damage;
        let killed = enemies
            .get_mut(target)
            .is_some_and(|enemy| enemy.take_damage(damage));
        if !killed {
            continue;
        }

        let enemy = enemies.remove(target);
        trace!(enemy = enemy.id, tower = tower_index, "Enemy killed");
        session.add_money(enemy.gold_reward);
        session.add_score(u64::from(enemy.xp_reward));
        kills.push(KillEvent {
            enemy_id: enemy.id,
            enemy_type: enemy.enemy_type,
            category: enemy.category,
            tower_index,
            gold: enemy.gold_reward,
            xp: enemy.xp_reward,
        });
    }

    kills
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Fixed;
    use crate::providers::{BuildingCatalog, BuildingStatProvider, EnemyCatalog, EnemyStatProvider};

    fn enemy(id: EnemyId, key: &str, x: i32, y: i32) -> LiveEnemy {
        let stats = EnemyCatalog::builtin().enemy_stats(key).unwrap();
        let category = EnemyCategory::from_key(key).unwrap();
        LiveEnemy::new(id, key, category, &stats, Vec2Fixed::from_ints(x, y), 0.0)
    }

    fn tower(key: &str, x: i32, y: i32) -> PlacedTower {
        let stats = BuildingCatalog::builtin().building_stats(key).unwrap();
        PlacedTower::new(key, Vec2Fixed::from_ints(x, y), &stats)
    }

    fn dt() -> Fixed {
        Fixed::from_num(0.1)
    }

    #[test]
    fn test_targets_nearest_with_first_found_tie_break() {
        let t = tower("basic", 5, 5);
        let enemies = vec![
            enemy(0, "basic", 8, 5),
            enemy(1, "basic", 3, 5),
            enemy(2, "basic", 7, 5),
        ];
        // Enemies 1 and 2 are both 2 away; 1 was spawned first.
        assert_eq!(nearest_in_range(&t, &enemies), Some(1));
    }

    #[test]
    fn test_out_of_range_enemies_are_ignored() {
        let t = tower("basic", 0, 0);
        let enemies = vec![enemy(0, "basic", 10, 0)];
        assert_eq!(nearest_in_range(&t, &enemies), None);
    }

    #[test]
    fn test_one_shot_per_tower_per_tick() {
        let mut session = SessionState::new(0, 10);
        session.place_tower(tower("sniper", 5, 5));
        session.spawn_enemy(enemy(0, "fast", 6, 5));
        session.spawn_enemy(enemy(1, "fast", 7, 5));

        let kills = resolve_combat(&mut session, dt(), Fixed::ONE);
        assert!(kills.is_empty());
        assert_eq!(session.enemies()[0].health, Fixed::from_num(20));
        assert_eq!(session.enemies()[1].health, Fixed::from_num(60));
    }

    #[test]
    fn test_cooldown_limits_fire_rate() {
        let mut session = SessionState::new(0, 10);
        session.place_tower(tower("sniper", 5, 5));
        session.spawn_enemy(enemy(0, "boss", 6, 5));

        // Sniper reloads in one time unit: two shots in twelve ticks.
        for _ in 0..12 {
            resolve_combat(&mut session, dt(), Fixed::ONE);
        }
        assert_eq!(session.enemies()[0].health, Fixed::from_num(920));
    }

    #[test]
    fn test_fire_rate_holds_when_reload_is_not_a_tick_multiple() {
        let mut session = SessionState::new(0, 10);
        // Basic towers fire 4 times per window: a 0.25 reload against 0.1 ticks.
        let basic = tower("basic", 5, 5);
        assert_eq!(basic.fire_rate, Fixed::from_num(4));
        let damage = basic.damage;
        session.place_tower(basic);
        let mut target = enemy(0, "boss", 6, 5);
        target.health = Fixed::from_num(100_000);
        session.spawn_enemy(target);

        for _ in 0..40 {
            resolve_combat(&mut session, dt(), Fixed::ONE);
        }
        let dealt = Fixed::from_num(100_000) - session.enemies()[0].health;
        let shots: i64 = (dealt / Fixed::from_num(damage)).to_num();
        // Four seconds at four shots a second.
        assert!((15..=17).contains(&shots), "fired {shots} shots");
    }

    #[test]
    fn test_kill_pays_immediately_and_frees_target() {
        let mut session = SessionState::new(0, 10);
        session.place_tower(tower("sniper", 5, 5));
        session.place_tower(tower("sniper", 5, 6));
        let mut weak = enemy(0, "basic", 6, 5);
        weak.health = Fixed::from_num(30);
        session.spawn_enemy(weak);
        session.spawn_enemy(enemy(1, "basic", 9, 5));

        let kills = resolve_combat(&mut session, dt(), Fixed::ONE);
        assert_eq!(kills.len(), 1);
        assert_eq!(kills[0].tower_index, 0);
        assert_eq!(session.money(), 10);
        assert_eq!(session.score(), 5);
        // The second tower shot the remaining enemy.
        assert_eq!(session.enemies().len(), 1);
        assert_eq!(session.enemies()[0].health, Fixed::from_num(60));
    }
}
