//! # TD Core
//!
//! Deterministic balance simulation core for the tower-defense game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (one seeded RNG per run)
//! - Fixed-point math for everything evaluated per tick
//!
//! A run replays a whole session from configuration data: towers are
//! placed by a config-driven strategy, waves spawn with wave-scaled stats,
//! and ticks of combat and movement decide kills, leaks and rewards.
//!
//! ## Crate Structure
//!
//! - [`config`] - Run configuration
//! - [`data`] - Config file schemas
//! - [`providers`] - Stat catalogs with fallback resolution and wave scaling
//! - [`session`] - Money, lives, score, towers and enemies of a run
//! - [`placement`] - Tower placement strategy
//! - [`spawning`] - Wave sizes, enemy typing, seeded spawner
//! - [`combat`] / [`movement`] - Per-tick resolution
//! - [`simulation`] - The wave loop
//! - [`observer`] - Event hooks for metrics
//! - [`result`] - Output records

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod config;
pub mod data;
pub mod error;
pub mod math;
pub mod movement;
pub mod observer;
pub mod placement;
pub mod providers;
pub mod result;
pub mod session;
pub mod simulation;
pub mod spawning;
pub mod stats;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::KillEvent;
    pub use crate::config::SimulationConfig;
    pub use crate::data::{
        BuildingStatsFile, EnemyStatsFile, PlacementConfig, WaveDefinition, WaveSet,
    };
    pub use crate::error::{Result, SimError};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::LeakEvent;
    pub use crate::observer::{NoopObserver, SimulationObserver};
    pub use crate::placement::{PlacementReport, PlacementStrategy};
    pub use crate::providers::{
        BuildingCatalog, BuildingStatProvider, EnemyCatalog, EnemyStatProvider, KeyResolution,
    };
    pub use crate::result::{RunOutcome, SessionSnapshot, SimulationResult, WaveResult};
    pub use crate::session::{LiveEnemy, PlacedTower, SessionState};
    pub use crate::simulation::{RunPhase, SimulationRunner};
    pub use crate::spawning::{EnemyCategory, SimRng, SpawnPlan};
    pub use crate::stats::{BuildingStats, EnemyStats};
}
