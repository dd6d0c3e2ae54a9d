//! Waypoint-to-velocity translation.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::components::{Activation, EntityId};
use crate::events::{CoreEvent, EventQueue};
use crate::math::{fixed_serde, Fixed, Vec3Fixed, ARRIVAL_EPSILON, MOVING_THRESHOLD};
use crate::navigation::NavigationProvider;
use crate::unit::OrderKind;

/// Velocity and facing chosen for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Steering {
    /// Horizontal velocity.
    pub velocity: Vec3Fixed,
    /// Direction to face, if any.
    pub facing: Option<Vec3Fixed>,
}

impl Steering {
    /// Stand still without changing facing.
    #[must_use]
    pub const fn halt() -> Self {
        Self {
            velocity: Vec3Fixed::ZERO,
            facing: None,
        }
    }
}

/// Steer from `from` toward `waypoint` at up to `speed`.
///
/// Returns `None` when already within the arrival epsilon. The speed is
/// reduced on the final step so the mover lands on the waypoint instead of
/// overshooting it.
#[must_use]
pub fn steer_toward(from: Vec3Fixed, waypoint: Vec3Fixed, speed: Fixed, delta: Fixed) -> Option<Steering> {
    let displacement = (waypoint - from).horizontal();
    let distance = displacement.length();
    if distance < ARRIVAL_EPSILON {
        return None;
    }
    let direction = displacement.try_normalize()?;
    let speed = if delta > Fixed::ZERO {
        speed.min(distance / delta)
    } else {
        speed
    };
    Some(Steering {
        velocity: direction.scale(speed),
        facing: Some(direction),
    })
}

/// Where a mover wants to go this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    /// Mover's current position.
    pub position: Vec3Fixed,
    /// Destination point.
    pub destination: Vec3Fixed,
    /// Order driving the move.
    pub order: OrderKind,
    /// Attack range, used as the arrival distance for attack orders.
    pub attack_range: Fixed,
}

impl MoveRequest {
    /// Arrival distance to request from navigation: attack range for attack
    /// orders, zero otherwise.
    #[must_use]
    pub fn arrival_distance(&self) -> Fixed {
        if self.order == OrderKind::Attack {
            self.attack_range
        } else {
            Fixed::ZERO
        }
    }
}

/// Locomotion for a unit: speed tuning plus movement-started/stopped edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementComponent {
    #[serde(with = "fixed_serde")]
    speed: Fixed,
    #[serde(with = "fixed_serde")]
    rotation_speed: Fixed,
    activation: Activation,
    was_moving: bool,
}

impl Default for MovementComponent {
    fn default() -> Self {
        Self::new(Fixed::from_num(5), Fixed::from_num(10))
    }
}

impl MovementComponent {
    /// Component with the given speeds, clamped to non-negative.
    #[must_use]
    pub fn new(speed: Fixed, rotation_speed: Fixed) -> Self {
        Self {
            speed: speed.max(Fixed::ZERO),
            rotation_speed: rotation_speed.max(Fixed::ZERO),
            activation: Activation::Uninitialized,
            was_moving: false,
        }
    }

    /// Linear speed in units per second.
    #[must_use]
    pub const fn speed(&self) -> Fixed {
        self.speed
    }

    /// Change linear speed. Negative values count as zero.
    pub fn set_speed(&mut self, speed: Fixed) {
        self.speed = speed.max(Fixed::ZERO);
    }

    /// Turn rate in radians per second, for presentation smoothing.
    #[must_use]
    pub const fn rotation_speed(&self) -> Fixed {
        self.rotation_speed
    }

    /// Settle state.
    #[must_use]
    pub const fn activation(&self) -> Activation {
        self.activation
    }

    /// Whether the last steering result was above the moving threshold.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.was_moving
    }

    /// Restart the settle period (owner re-attached).
    pub fn reset_activation(&mut self) {
        self.activation.reset();
    }

    /// Count one settle tick. Returns whether the component is ready.
    pub fn advance_activation(&mut self, settle_ticks: u32) -> bool {
        self.activation.advance(settle_ticks)
    }

    /// Choose this tick's velocity toward the request's destination.
    ///
    /// Holds still until settled or while navigation is not ready.
    pub fn process_movement(
        &mut self,
        owner: EntityId,
        request: MoveRequest,
        nav: &mut dyn NavigationProvider,
        delta: Fixed,
        events: &mut EventQueue,
    ) -> Steering {
        if !self.activation.is_ready() {
            return self.record(owner, Steering::halt(), events);
        }

        let arrival = request.arrival_distance();
        if nav.desired_arrival_distance() != arrival {
            nav.set_desired_arrival_distance(arrival);
        }
        if !nav.target().is_equal_approx(request.destination) {
            nav.set_target(request.destination);
        }

        let steering = match nav.next_waypoint(request.position) {
            None => Steering::halt(),
            Some(waypoint) => steer_toward(request.position, waypoint, self.speed, delta)
                .unwrap_or(Steering {
                    velocity: Vec3Fixed::ZERO,
                    facing: (request.destination - request.position)
                        .horizontal()
                        .try_normalize(),
                }),
        };
        trace!(entity = owner, velocity = ?steering.velocity, "movement steering");
        self.record(owner, steering, events)
    }

    /// Record a tick spent standing still.
    pub fn halt(&mut self, owner: EntityId, events: &mut EventQueue) {
        self.record(owner, Steering::halt(), events);
    }

    fn record(&mut self, owner: EntityId, steering: Steering, events: &mut EventQueue) -> Steering {
        let moving = steering.velocity.horizontal().length() > MOVING_THRESHOLD;
        if moving != self.was_moving {
            events.push(if moving {
                CoreEvent::MovementStarted { entity: owner }
            } else {
                CoreEvent::MovementStopped { entity: owner }
            });
            self.was_moving = moving;
        }
        steering
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SETTLE_TICKS;
    use crate::navigation::DirectAgent;

    fn point(x: i32, z: i32) -> Vec3Fixed {
        Vec3Fixed::ground(Fixed::from_num(x), Fixed::from_num(z))
    }

    fn request(destination: Vec3Fixed, order: OrderKind) -> MoveRequest {
        MoveRequest {
            position: Vec3Fixed::ZERO,
            destination,
            order,
            attack_range: Fixed::from_num(3),
        }
    }

    fn settled() -> MovementComponent {
        let mut movement = MovementComponent::default();
        for _ in 0..SETTLE_TICKS {
            movement.advance_activation(SETTLE_TICKS);
        }
        movement
    }

    #[test]
    fn test_steer_toward_lands_on_waypoint() {
        let delta = Fixed::from_num(0.05);
        let far = steer_toward(Vec3Fixed::ZERO, point(10, 0), Fixed::from_num(5), delta).unwrap();
        assert_eq!(far.velocity, point(5, 0));

        let near = Vec3Fixed::ground(Fixed::from_num(0.2), Fixed::ZERO);
        let last = steer_toward(Vec3Fixed::ZERO, near, Fixed::from_num(5), delta).unwrap();
        assert!(last.velocity.x <= Fixed::from_num(4.001));

        let arrived = Vec3Fixed::ground(Fixed::from_num(0.05), Fixed::ZERO);
        assert!(steer_toward(Vec3Fixed::ZERO, arrived, Fixed::from_num(5), delta).is_none());
    }

    #[test]
    fn test_holds_until_settled() {
        let mut movement = MovementComponent::default();
        let mut nav = DirectAgent::with_warmup(0);
        let mut events = EventQueue::new();

        movement.advance_activation(SETTLE_TICKS);
        let steering = movement.process_movement(
            1,
            request(point(10, 0), OrderKind::Move),
            &mut nav,
            Fixed::from_num(0.05),
            &mut events,
        );
        assert_eq!(steering, Steering::halt());
        assert!(events.is_empty());
    }

    #[test]
    fn test_arrival_distance_by_order() {
        let mut movement = settled();
        let mut nav = DirectAgent::with_warmup(0);
        let mut events = EventQueue::new();
        let delta = Fixed::from_num(0.05);

        movement.process_movement(1, request(point(10, 0), OrderKind::Attack), &mut nav, delta, &mut events);
        assert_eq!(nav.desired_arrival_distance(), Fixed::from_num(3));

        movement.process_movement(1, request(point(10, 0), OrderKind::Move), &mut nav, delta, &mut events);
        assert_eq!(nav.desired_arrival_distance(), Fixed::ZERO);
        assert_eq!(nav.target(), point(10, 0));
    }

    #[test]
    fn test_movement_edges_published_once() {
        let mut movement = settled();
        let mut nav = DirectAgent::with_warmup(0);
        let mut events = EventQueue::new();
        let delta = Fixed::from_num(0.05);

        for _ in 0..3 {
            movement.process_movement(1, request(point(10, 0), OrderKind::Move), &mut nav, delta, &mut events);
        }
        assert_eq!(events.drain(), vec![CoreEvent::MovementStarted { entity: 1 }]);
        assert!(movement.is_moving());

        movement.halt(1, &mut events);
        movement.halt(1, &mut events);
        assert_eq!(events.drain(), vec![CoreEvent::MovementStopped { entity: 1 }]);
    }

    #[test]
    fn test_arrived_faces_destination_without_moving() {
        let mut movement = settled();
        let mut nav = DirectAgent::with_warmup(0);
        let mut events = EventQueue::new();

        let steering = movement.process_movement(
            1,
            request(point(2, 0), OrderKind::Attack),
            &mut nav,
            Fixed::from_num(0.05),
            &mut events,
        );
        assert_eq!(steering.velocity, Vec3Fixed::ZERO);
        assert_eq!(steering.facing, Some(point(1, 0)));
    }
}
