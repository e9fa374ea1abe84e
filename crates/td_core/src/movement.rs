//! Per-tick enemy movement and leak detection.
//!
//! Enemies walk a straight line from their spawn point to the goal. This is
//! an approximation of a tile path and does not model obstacles.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::math::{Fixed, Vec2Fixed};
use crate::session::{EnemyId, SessionState};
use crate::spawning::EnemyCategory;

/// An enemy that reached the goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeakEvent {
    /// Leaked enemy.
    pub enemy_id: EnemyId,
    /// Its type key.
    pub enemy_type: String,
    /// Its category.
    pub category: EnemyCategory,
}

/// Advance every enemy towards `goal` and remove those within
/// `leak_epsilon` of it. Each leak costs one life.
pub fn resolve_movement(
    session: &mut SessionState,
    dt: Fixed,
    goal: Vec2Fixed,
    leak_epsilon: Fixed,
) -> Vec<LeakEvent> {
    let epsilon_sq = leak_epsilon.saturating_mul(leak_epsilon);
    let enemies = session.enemies_mut();

    for enemy in enemies.iter_mut() {
        let step = enemy.speed.saturating_mul(dt);
        enemy.position = enemy.position.move_towards(goal, step);
    }

    let mut leaks = Vec::new();
    enemies.retain(|enemy| {
        if enemy.position.distance_squared(goal) > epsilon_sq {
            return true;
        }
        trace!(enemy = enemy.id, "Enemy leaked");
        leaks.push(LeakEvent {
            enemy_id: enemy.id,
            enemy_type: enemy.enemy_type.clone(),
            category: enemy.category,
        });
        false
    });

    for _ in &leaks {
        session.lose_life();
    }
    leaks
}
