//! Data structures for simulation configuration files.
//!
//! This module contains pure data structures that mirror the JSON config
//! schemas (building stats, enemy stats, placement strategy, wave sets).
//! All field names are camelCase on the wire.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `td_headless`.

mod building_data;
mod enemy_data;
mod placement_data;
mod wave_set_data;

pub use building_data::{BuildingStatsEntry, BuildingStatsFile};
pub use enemy_data::{EnemyStatsEntry, EnemyStatsFile, WaveScaling};
pub use placement_data::{
    FallbackStrategy, InitialWavePlacement, PlacementConfig, PlacementStrategies, WaveUpgrade,
};
pub use wave_set_data::{EnemyGroup, WaveDefinition, WaveSet};
