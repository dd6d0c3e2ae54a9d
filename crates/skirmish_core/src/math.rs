//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation quantities use fixed-point arithmetic so that two runs
//! fed the same commands produce bit-identical state on every platform.
//! World points are three dimensional with `y` as the vertical axis;
//! "horizontal" always means the x/z plane.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Tolerance for approximate point equality (1/10000).
pub const EPSILON: Fixed = Fixed::from_bits(429_497);

/// Directions shorter than this (0.001) are treated as zero.
pub const DIRECTION_EPSILON: Fixed = Fixed::from_bits(4_294_967);

/// Horizontal speed above which an entity counts as moving (0.01).
pub const MOVING_THRESHOLD: Fixed = Fixed::from_bits(42_949_673);

/// Distance to a waypoint at which a unit stops steering (0.1).
pub const ARRIVAL_EPSILON: Fixed = Fixed::from_bits(429_496_730);

/// Serde support for fixed-point numbers in data files and event output.
///
/// Values are written as decimal numbers so scenario files and JSON event
/// streams stay readable. Reading converts the decimal back to the nearest
/// representable fixed-point value once, at load time.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| de::Error::custom(format!("{value} is out of fixed-point range")))
    }
}

/// Serde support for `Option<Fixed>`, written as an optional decimal.
pub mod option_fixed_serde {
    use super::Fixed;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_num::<f64>()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<f64>::deserialize(deserializer)? {
            Some(value) => Fixed::checked_from_num(value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("{value} is out of fixed-point range"))),
            None => Ok(None),
        }
    }
}

/// Fixed-point 3D vector. `y` is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y (vertical) coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Z coordinate.
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

impl Vec3Fixed {
    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Create a point on the ground plane (`y = 0`).
    #[must_use]
    pub const fn ground(x: Fixed, z: Fixed) -> Self {
        Self::new(x, Fixed::ZERO, z)
    }

    /// This vector projected onto the x/z plane.
    #[must_use]
    pub const fn horizontal(self) -> Self {
        Self::new(self.x, Fixed::ZERO, self.z)
    }

    /// Copy of this vector with a different vertical component.
    #[must_use]
    pub const fn with_y(self, y: Fixed) -> Self {
        Self::new(self.x, y, self.z)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Squared length (avoids sqrt for comparisons).
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Length using the deterministic square root.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Full 3D distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        (other - self).length()
    }

    /// Distance to another point measured on the x/z plane only.
    #[must_use]
    pub fn horizontal_distance(self, other: Self) -> Fixed {
        (other - self).horizontal().length()
    }

    /// Multiply every component by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Unit-length copy of this vector, or `None` if it is too short to
    /// have a meaningful direction.
    #[must_use]
    pub fn try_normalize(self) -> Option<Self> {
        let len = self.length();
        if len <= DIRECTION_EPSILON {
            return None;
        }
        Some(Self::new(self.x / len, self.y / len, self.z / len))
    }

    /// Normalize, returning zero for degenerate vectors.
    #[must_use]
    pub fn normalize(self) -> Self {
        self.try_normalize().unwrap_or(Self::ZERO)
    }

    /// Whether every component is within [`EPSILON`] of `other`.
    #[must_use]
    pub fn is_equal_approx(self, other: Self) -> bool {
        (self.x - other.x).abs() <= EPSILON
            && (self.y - other.y).abs() <= EPSILON
            && (self.z - other.z).abs() <= EPSILON
    }
}

impl std::ops::Add for Vec3Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3Fixed {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Neg for Vec3Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// Deterministic on every platform; negative input yields zero.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    // sqrt(v) <= (v + 1) / 2 for all v >= 0
    let mut low = Fixed::ZERO;
    let mut high = (value.saturating_add(Fixed::ONE)) / Fixed::from_num(2);

    for _ in 0..48 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}
