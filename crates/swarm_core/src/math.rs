//! Fixed-point math utilities for deterministic decisions.
//!
//! All geometry in the pipeline uses fixed-point arithmetic so that the same
//! snapshot sequence always produces the same command batches, independent
//! of the CPU the agent runs on. Engine positions arrive as floats and are
//! converted once at the boundary.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all geometry.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Number of entries in the compass table used for polar layouts.
pub const COMPASS_STEPS: usize = 16;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Unit vectors at 22.5 degree steps, counter-clockwise from +X.
///
/// Stored as raw bits so the table is usable in const context and never
/// touches trigonometry at runtime.
pub const COMPASS: [Vec2Fixed; COMPASS_STEPS] = [
    compass(4_294_967_296, 0),
    compass(3_968_032_378, 1_643_612_827),
    compass(3_037_000_500, 3_037_000_500),
    compass(1_643_612_827, 3_968_032_378),
    compass(0, 4_294_967_296),
    compass(-1_643_612_827, 3_968_032_378),
    compass(-3_037_000_500, 3_037_000_500),
    compass(-3_968_032_378, 1_643_612_827),
    compass(-4_294_967_296, 0),
    compass(-3_968_032_378, -1_643_612_827),
    compass(-3_037_000_500, -3_037_000_500),
    compass(-1_643_612_827, -3_968_032_378),
    compass(0, -4_294_967_296),
    compass(1_643_612_827, -3_968_032_378),
    compass(3_037_000_500, -3_037_000_500),
    compass(3_968_032_378, -1_643_612_827),
];

const fn compass(x_bits: i64, y_bits: i64) -> Vec2Fixed {
    Vec2Fixed::new(Fixed::from_bits(x_bits), Fixed::from_bits(y_bits))
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Check whether `other` lies within `radius` of this point.
    #[must_use]
    pub fn is_within(self, other: Self, radius: Fixed) -> bool {
        self.distance_squared(other) <= radius.saturating_mul(radius)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Move `distance` from this point towards `target`.
    ///
    /// Returns `self` unchanged when the two points coincide.
    #[must_use]
    pub fn towards(self, target: Self, distance: Fixed) -> Self {
        let dir = (target - self).normalize();
        self + dir.scale(distance)
    }

    /// Rotate by `steps` compass steps (22.5 degrees each, counter-clockwise).
    #[must_use]
    pub fn rotate_steps(self, steps: usize) -> Self {
        let r = COMPASS[steps % COMPASS_STEPS];
        Self::new(self.x * r.x - self.y * r.y, self.x * r.y + self.y * r.x)
    }

    /// Index of the compass direction closest to this vector.
    ///
    /// The zero vector maps to direction 0.
    #[must_use]
    pub fn compass_index(self) -> usize {
        let dir = self.normalize();
        if dir == Self::ZERO {
            return 0;
        }
        let mut best = 0;
        let mut best_dot = Fixed::MIN;
        for (i, c) in COMPASS.iter().enumerate() {
            let d = dir.dot(*c);
            if d > best_dot {
                best_dot = d;
                best = i;
            }
        }
        best
    }
}

/// Arithmetic mean of a set of points.
///
/// Returns `None` for an empty input instead of dividing by zero.
#[must_use]
pub fn centroid<I>(points: I) -> Option<Vec2Fixed>
where
    I: IntoIterator<Item = Vec2Fixed>,
{
    let mut sum = Vec2Fixed::ZERO;
    let mut count: i32 = 0;
    for p in points {
        sum = sum + p;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let n = Fixed::from_num(count);
    Some(Vec2Fixed::new(sum.x / n, sum.y / n))
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..64 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epsilon() -> Fixed {
        Fixed::from_num(1) / Fixed::from_num(1000)
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
        assert!((a.distance(b) - Fixed::from_num(5)).abs() < epsilon());
    }

    #[test]
    fn test_is_within() {
        let a = Vec2Fixed::from_ints(0, 0);
        assert!(a.is_within(Vec2Fixed::from_ints(3, 4), Fixed::from_num(5)));
        assert!(!a.is_within(Vec2Fixed::from_ints(3, 5), Fixed::from_num(5)));
    }

    #[test]
    fn test_centroid_empty_is_none() {
        assert_eq!(centroid(Vec::new()), None);
        let c = centroid(vec![Vec2Fixed::from_ints(0, 0), Vec2Fixed::from_ints(4, 2)]);
        assert_eq!(c, Some(Vec2Fixed::from_ints(2, 1)));
    }

    #[test]
    fn test_compass_is_unit_length() {
        for dir in COMPASS {
            let len_sq = dir.dot(dir);
            assert!((len_sq - Fixed::from_num(1)).abs() < epsilon());
        }
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = Vec2Fixed::from_ints(2, 0);
        let r = v.rotate_steps(4);
        assert!(r.x.abs() < epsilon());
        assert!((r.y - Fixed::from_num(2)).abs() < epsilon());
    }

    #[test]
    fn test_compass_index() {
        assert_eq!(Vec2Fixed::from_ints(5, 0).compass_index(), 0);
        assert_eq!(Vec2Fixed::from_ints(0, 5).compass_index(), 4);
        assert_eq!(Vec2Fixed::from_ints(-3, -3).compass_index(), 10);
        assert_eq!(Vec2Fixed::ZERO.compass_index(), 0);
    }

    #[test]
    fn test_towards() {
        let a = Vec2Fixed::from_ints(0, 0);
        let moved = a.towards(Vec2Fixed::from_ints(10, 0), Fixed::from_num(3));
        assert!((moved.x - Fixed::from_num(3)).abs() < epsilon());
        assert_eq!(a.towards(a, Fixed::from_num(3)), a);
    }
}
