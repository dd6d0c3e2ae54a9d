//! Shared component definitions.
//!
//! Components here are plain data used by several systems: the spatial
//! body every unit owns, its facing, and the settle sub-state that gates
//! navigation queries after a component is attached.

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec3Fixed};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Ticks a freshly attached component waits before querying navigation.
pub const SETTLE_TICKS: u32 = 3;

// ============================================================================
// Spatial Components
// ============================================================================

/// Yaw-only orientation, stored as a unit forward vector on the x/z plane.
///
/// Defaults to looking down negative Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Facing {
    forward: Vec3Fixed,
}

impl Default for Facing {
    fn default() -> Self {
        Self {
            forward: Vec3Fixed::ground(Fixed::ZERO, -Fixed::ONE),
        }
    }
}

impl Facing {
    /// Facing along a direction's horizontal component.
    ///
    /// Returns `None` when the direction has no meaningful horizontal part.
    #[must_use]
    pub fn toward(direction: Vec3Fixed) -> Option<Self> {
        direction
            .horizontal()
            .try_normalize()
            .map(|forward| Self { forward })
    }

    /// Unit forward vector on the x/z plane.
    #[must_use]
    pub const fn forward(&self) -> Vec3Fixed {
        self.forward
    }

    /// Yaw in radians, zero when looking down negative Z.
    ///
    /// Presentation only; the simulation never reads this back.
    #[must_use]
    pub fn yaw_radians(&self) -> f64 {
        let x = self.forward.x.to_num::<f64>();
        let z = self.forward.z.to_num::<f64>();
        (-x).atan2(-z)
    }
}

/// Kinematic body of an entity: the spatial representation the physics
/// step reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Body {
    /// World position.
    pub position: Vec3Fixed,
    /// Velocity in units per second.
    pub velocity: Vec3Fixed,
    /// Current facing.
    pub facing: Facing,
}

impl Body {
    /// Body at rest at a position.
    #[must_use]
    pub fn at(position: Vec3Fixed) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Replace horizontal velocity, keeping the vertical component.
    pub fn set_horizontal_velocity(&mut self, horizontal: Vec3Fixed) {
        self.velocity = horizontal.with_y(self.velocity.y);
    }

    /// Zero horizontal velocity, keeping the vertical component.
    pub fn stop_horizontal(&mut self) {
        self.velocity = Vec3Fixed::ZERO.with_y(self.velocity.y);
    }

    /// Turn to face along a direction. Degenerate directions are ignored.
    pub fn face(&mut self, direction: Vec3Fixed) {
        if let Some(facing) = Facing::toward(direction) {
            self.facing = facing;
        }
    }

    /// Apply velocity for one step.
    pub fn integrate(&mut self, delta: Fixed) {
        self.position += self.velocity.scale(delta);
    }

    /// Whether horizontal speed is above the moving threshold.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.velocity.horizontal().length() > crate::math::MOVING_THRESHOLD
    }
}

// ============================================================================
// Activation
// ============================================================================

/// Settle sub-state for components that depend on navigation.
///
/// Navigation backing needs a few ticks after attachment before it answers
/// queries. Components count ticks instead of measuring wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Activation {
    /// Not yet advanced since attachment.
    #[default]
    Uninitialized,
    /// Counting settle ticks.
    Settling(u32),
    /// Navigation may be queried.
    Ready,
}

impl Activation {
    /// Advance by one tick. Returns `true` once ready.
    ///
    /// With `settle_ticks` of 3 the component is ready on the third call.
    pub fn advance(&mut self, settle_ticks: u32) -> bool {
        *self = match *self {
            Self::Ready => Self::Ready,
            Self::Uninitialized if settle_ticks <= 1 => Self::Ready,
            Self::Uninitialized => Self::Settling(1),
            Self::Settling(n) if n + 1 >= settle_ticks => Self::Ready,
            Self::Settling(n) => Self::Settling(n + 1),
        };
        self.is_ready()
    }

    /// Whether navigation may be queried.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Return to the uninitialized state (entity re-attached).
    pub fn reset(&mut self) {
        *self = Self::Uninitialized;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_settles_after_three_ticks() {
        let mut activation = Activation::default();
        assert!(!activation.advance(SETTLE_TICKS));
        assert_eq!(activation, Activation::Settling(1));
        assert!(!activation.advance(SETTLE_TICKS));
        assert!(activation.advance(SETTLE_TICKS));
        assert!(activation.advance(SETTLE_TICKS));

        activation.reset();
        assert!(!activation.is_ready());
    }

    #[test]
    fn test_activation_zero_settle_is_immediate() {
        let mut activation = Activation::default();
        assert!(activation.advance(0));
    }

    #[test]
    fn test_facing_yaw() {
        let default = Facing::default();
        assert!(default.yaw_radians().abs() < 1e-9);

        let east = Facing::toward(Vec3Fixed::ground(Fixed::ONE, Fixed::ZERO)).unwrap();
        assert!((east.yaw_radians() + std::f64::consts::FRAC_PI_2).abs() < 1e-6);

        assert!(Facing::toward(Vec3Fixed::new(Fixed::ZERO, Fixed::ONE, Fixed::ZERO)).is_none());
    }

    #[test]
    fn test_body_stop_keeps_vertical_velocity() {
        let mut body = Body::at(Vec3Fixed::ZERO);
        body.velocity = Vec3Fixed::new(Fixed::from_num(3), Fixed::from_num(-2), Fixed::ONE);
        body.stop_horizontal();
        assert_eq!(body.velocity, Vec3Fixed::new(Fixed::ZERO, Fixed::from_num(-2), Fixed::ZERO));
        assert!(!body.is_moving());
    }

    #[test]
    fn test_body_integrate() {
        let mut body = Body::at(Vec3Fixed::ZERO);
        body.set_horizontal_velocity(Vec3Fixed::ground(Fixed::from_num(4), Fixed::ZERO));
        body.integrate(Fixed::from_num(0.5));
        assert_eq!(body.position.x, Fixed::from_num(2));
        assert!(body.is_moving());
    }
}
