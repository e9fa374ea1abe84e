//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a simulated session produces
//! identical outcomes given identical inputs.
//!
//! # Testing Strategy
//!
//! Balance numbers are only comparable if a config always plays out the same
//! way. Sources of non-determinism include:
//!
//! - **Floating-point math**: per-tick math uses [`td_core::math::Fixed`].
//!   Floats only appear in one-off stat scaling and reporting.
//!
//! - **Map iteration order**: catalogs are `BTreeMap`s, so fallback to the
//!   "first entry" is stable.
//!
//! - **System randomness**: the only RNG is the seeded spawner.
//!
//! - **Wall-clock time**: durations are recorded but never compared; use
//!   [`td_core::result::RunOutcome`] rather than the full result.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual resolvers (combat, movement, spawning)
//! 2. **Property tests**: random configs must still replay identically
//! 3. **Parallel tests**: running N sessions on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use td_core::config::SimulationConfig;
use td_core::result::{RunOutcome, SimulationResult};

use crate::fixtures::builtin_runner;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical outcomes.
    pub is_deterministic: bool,
    /// Outcome fingerprint of each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>) -> Self {
        Self {
            is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
            hashes,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different fingerprints.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Unique fingerprints: {} (expected 1)\n\
                 All fingerprints: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Play a session `runs` times and compare the outcome fingerprints.
///
/// # Example
///
/// ```
/// use td_core::config::SimulationConfig;
/// use td_test_utils::determinism::verify_determinism;
/// use td_test_utils::fixtures::builtin_runner;
///
/// let config = SimulationConfig::default().with_max_waves(2);
/// let result = verify_determinism(3, || builtin_runner(config.clone()).run());
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<F>(runs: usize, play: F) -> DeterminismResult
where
    F: Fn() -> SimulationResult,
{
    let hashes = (0..runs).map(|_| play().outcome().fingerprint()).collect();
    DeterminismResult::from_hashes(hashes)
}

/// Run `config` twice against the built-in data and compare outcomes.
#[must_use]
pub fn verify_config_determinism(config: &SimulationConfig) -> bool {
    verify_determinism(2, || builtin_runner(config.clone()).run()).is_deterministic
}

/// Play `num_runs` sessions of `config` on scoped threads.
///
/// Catches state accidentally shared between runs.
#[must_use]
pub fn run_parallel_sessions(config: &SimulationConfig, num_runs: usize) -> DeterminismResult {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| s.spawn(|| builtin_runner(config.clone()).run().outcome().fingerprint()))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });
    DeterminismResult::from_hashes(hashes)
}

/// First wave (1-based) at which two outcomes disagree.
///
/// Returns `None` when the per-wave kill and leak counts match; a mismatch
/// in totals alone is reported as wave 0.
#[must_use]
pub fn find_first_divergent_wave(a: &RunOutcome, b: &RunOutcome) -> Option<u32> {
    let per_wave_a = a.kills_per_wave.iter().zip(&a.leaks_per_wave);
    let per_wave_b = b.kills_per_wave.iter().zip(&b.leaks_per_wave);
    for (index, (wa, wb)) in per_wave_a.zip(per_wave_b).enumerate() {
        if wa != wb {
            return Some(index as u32 + 1);
        }
    }
    if a.kills_per_wave.len() != b.kills_per_wave.len() {
        let shorter = a.kills_per_wave.len().min(b.kills_per_wave.len());
        return Some(shorter as u32 + 1);
    }
    (a != b).then_some(0)
}

/// Compute hash of any hashable value.
#[must_use]
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Property-based testing strategies.
pub mod strategies {
    use proptest::prelude::*;
    use td_core::config::SimulationConfig;
    use td_core::math::{Fixed, Vec2Fixed};

    /// Generate arbitrary fixed-point positions within a reasonable range.
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-1000i32..1000i32).prop_map(Fixed::from_num)
    }

    /// Generate arbitrary movement speeds (0.1 to 10 units per time unit).
    pub fn arb_fixed_speed() -> impl Strategy<Value = Fixed> {
        (1i32..100i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(10))
    }

    /// Generate arbitrary 2D positions.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a positive multiplier between 0.25 and 4.0.
    pub fn arb_multiplier() -> impl Strategy<Value = f64> {
        (1u32..=16u32).prop_map(|n| f64::from(n) * 0.25)
    }

    /// Generate a wave number in 1..=30.
    pub fn arb_wave() -> impl Strategy<Value = u32> {
        1u32..=30u32
    }

    /// Generate a short, fast-mode run configuration.
    pub fn arb_config() -> impl Strategy<Value = SimulationConfig> {
        (
            any::<u64>(),
            0u32..2000u32,
            1u32..30u32,
            1u32..6u32,
            arb_multiplier(),
            arb_multiplier(),
            arb_multiplier(),
            (0u32..=4u32).prop_map(|n| f64::from(n) * 0.25),
        )
            .prop_map(|(seed, money, lives, waves, health, speed, cost, jitter)| {
                SimulationConfig {
                    spawn_jitter: jitter,
                    ..SimulationConfig::default()
                        .with_seed(seed)
                        .with_starting_money(money)
                        .with_starting_lives(lives)
                        .with_max_waves(waves)
                        .with_enemy_health_multiplier(health)
                        .with_enemy_speed_multiplier(speed)
                        .with_building_cost_multiplier(cost)
                        .with_fast_mode(true)
                }
            })
    }
}
