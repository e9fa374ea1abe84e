//! Fixed-point math utilities for deterministic simulation.
//!
//! Positions, ranges, speeds and health all live in fixed-point so a run
//! produces bit-identical results on every platform. Config values arrive
//! as floats and are converted exactly once, through checked conversions.

use fixed::types::I32F32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SimError};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Largest coordinate magnitude accepted for a map position.
///
/// Keeps squared distances between any two positions inside [`Fixed`].
pub const MAX_COORDINATE: f64 = 10_000.0;

/// Convert a config float into [`Fixed`], rejecting NaN, infinities and
/// values outside the representable range.
pub fn checked_fixed(value: f64) -> Option<Fixed> {
    Fixed::checked_from_num(value)
}

/// Fixed-point 2D vector.
///
/// Serialized as a `[x, y]` pair of floats so config files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vec2Fixed {
    /// X coordinate.
    pub x: Fixed,
    /// Y coordinate.
    pub y: Fixed,
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Create a vector from float coordinates.
    ///
    /// Fails with [`SimError::InvalidPosition`] on NaN, infinite or
    /// input beyond [`MAX_COORDINATE`]: such values indicate a bug upstream.
    pub fn try_from_f64(x: f64, y: f64) -> Result<Self> {
        let in_bounds = |v: f64| v.abs() <= MAX_COORDINATE;
        match (checked_fixed(x), checked_fixed(y)) {
            (Some(fx), Some(fy)) if in_bounds(x) && in_bounds(y) => Ok(Self::new(fx, fy)),
            _ => Err(SimError::InvalidPosition { x, y }),
        }
    }

    /// Reject positions built in code that lie outside the map bounds.
    pub fn check_bounds(self) -> Result<Self> {
        let limit = Fixed::from_num(MAX_COORDINATE);
        if self.x.abs() <= limit && self.y.abs() <= limit {
            Ok(self)
        } else {
            let (x, y) = self.to_f64();
            Err(SimError::InvalidPosition { x, y })
        }
    }

    /// Coordinates as floats (for reports only).
    #[must_use]
    pub fn to_f64(self) -> (f64, f64) {
        (self.x.to_num::<f64>(), self.y.to_num::<f64>())
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Exact for positions within [`MAX_COORDINATE`]; saturates beyond.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let diff = self - other;
        diff.x
            .saturating_mul(diff.x)
            .saturating_add(diff.y.saturating_mul(diff.y))
    }

    /// Vector length, computed without squaring the larger component.
    #[must_use]
    pub fn length(self) -> Fixed {
        let (ax, ay) = (self.x.saturating_abs(), self.y.saturating_abs());
        let (major, minor) = if ax >= ay { (ax, ay) } else { (ay, ax) };
        if minor == Fixed::ZERO {
            return major;
        }
        let ratio = minor / major;
        major.saturating_mul(fixed_sqrt(Fixed::ONE + ratio * ratio))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        (self - other).length()
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len)
    }

    /// Move up to `step` units in a straight line towards `goal`.
    ///
    /// Never overshoots: when `step` covers the remaining distance the
    /// result is exactly `goal`.
    #[must_use]
    pub fn move_towards(self, goal: Self, step: Fixed) -> Self {
        let remaining = self.distance(goal);
        if step >= remaining || remaining == Fixed::ZERO {
            return goal;
        }

        let direction = (goal - self).normalize();
        Self::new(
            self.x.saturating_add(direction.x * step),
            self.y.saturating_add(direction.y * step),
        )
    }
}

/// Computes the square root of a fixed-point number using binary search.
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    // 32 fractional bits plus up to 31 integer bits of search range.
    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x.saturating_sub(rhs.x),
            y: self.y.saturating_sub(rhs.y),
        }
    }
}

impl Serialize for Vec2Fixed {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_f64().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Vec2Fixed {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (x, y) = <(f64, f64)>::deserialize(deserializer)?;
        Self::try_from_f64(x, y).map_err(serde::de::Error::custom)
    }
}

/// Serde support for a bare [`Fixed`] stored as a float.
pub mod fixed_serde {
    use super::{checked_fixed, Fixed};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a float.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a float.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        checked_fixed(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} is not representable")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_distance_is_close_to_exact() {
        let a = Vec2Fixed::from_ints(0, 0);
        let b = Vec2Fixed::from_ints(3, 4);
        let epsilon = Fixed::ONE / Fixed::from_num(10_000);
        assert!((a.distance(b) - Fixed::from_num(5)).abs() < epsilon);
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }

    #[test]
    fn test_try_from_f64_rejects_non_finite() {
        assert!(matches!(
            Vec2Fixed::try_from_f64(f64::NAN, 1.0),
            Err(SimError::InvalidPosition { .. })
        ));
        assert!(Vec2Fixed::try_from_f64(1.0, f64::INFINITY).is_err());
        assert!(Vec2Fixed::try_from_f64(1e12, 0.0).is_err());
        assert!(Vec2Fixed::try_from_f64(2.5, -3.0).is_ok());
    }

    #[test]
    fn test_move_towards_partial_step() {
        let start = Vec2Fixed::from_ints(0, 5);
        let goal = Vec2Fixed::from_ints(20, 5);
        let moved = start.move_towards(goal, Fixed::from_num(2));
        let epsilon = Fixed::ONE / Fixed::from_num(10_000);
        assert!((moved.x - Fixed::from_num(2)).abs() < epsilon);
        assert_eq!(moved.y, Fixed::from_num(5));
    }

    #[test]
    fn test_move_towards_never_overshoots() {
        let start = Vec2Fixed::from_ints(19, 5);
        let goal = Vec2Fixed::from_ints(20, 5);
        assert_eq!(start.move_towards(goal, Fixed::from_num(3)), goal);
    }

    #[test]
    fn test_coordinates_beyond_map_bounds_are_rejected() {
        assert!(Vec2Fixed::try_from_f64(MAX_COORDINATE, -MAX_COORDINATE).is_ok());
        assert!(Vec2Fixed::try_from_f64(100_000.0, 0.0).is_err());
        assert!(Vec2Fixed::from_ints(100_000, 0).check_bounds().is_err());
        assert!(Vec2Fixed::from_ints(20, 5).check_bounds().is_ok());
    }

    #[test]
    fn test_distance_does_not_saturate_on_large_vectors() {
        let a = Vec2Fixed::from_ints(-100_000, 0);
        let b = Vec2Fixed::from_ints(100_000, 0);
        assert_eq!(a.distance(b), Fixed::from_num(200_000));

        let moved = a.move_towards(b, Fixed::ONE);
        let epsilon = Fixed::ONE / Fixed::from_num(10_000);
        assert!((moved.x - Fixed::from_num(-99_999)).abs() < epsilon);
    }

    #[test]
    fn test_normalize() {
        let unit = Vec2Fixed::from_ints(3, 4).normalize();
        let epsilon = Fixed::ONE / Fixed::from_num(10_000);
        assert!((unit.x - Fixed::from_num(0.6)).abs() < epsilon);
        assert!((unit.y - Fixed::from_num(0.8)).abs() < epsilon);
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_vec2_serializes_as_float_pair() {
        let v = Vec2Fixed::try_from_f64(1.5, -2.0).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[1.5,-2.0]");
        let back: Vec2Fixed = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
