//! Unit order state machine.
//!
//! A [`Unit`] holds exactly one [`Order`] at a time and re-evaluates it
//! every tick: chase the attack target, hold and swing once in range, walk
//! to a point, or walk to an interactable. Orders are replaced wholesale
//! through the `issue_*` methods and [`Unit::stop_order`]; a change is
//! published only when the order kind or its entity target differs.
//!
//! # Attack ranges
//!
//! With attack range `r` and buffer `b`, a unit attacking a target at
//! horizontal distance `d`:
//! - `d <= r`: faces the target, stands still, and swings.
//! - `r < d <= r + b`: keeps facing the target while closing in.
//! - `d > r + b`: chases through navigation.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::attack::AttackComponent;
use crate::components::{Activation, Body, EntityId};
use crate::events::{CoreEvent, EventQueue};
use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::movement::{steer_toward, MoveRequest, MovementComponent, Steering};
use crate::navigation::NavigationProvider;
use crate::world::WorldView;

// ============================================================================
// Orders
// ============================================================================

/// Discriminant of an [`Order`], used in notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Idle.
    #[default]
    None,
    /// Walking to a point.
    Move,
    /// Fighting another unit.
    Attack,
    /// Walking to an interactable.
    Interact,
}

/// What a unit is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Order {
    /// Idle; a valid resting state.
    #[default]
    None,
    /// Walk to a point.
    Move(Vec3Fixed),
    /// Chase and fight a unit.
    Attack(EntityId),
    /// Walk to an interactable.
    Interact(EntityId),
}

impl Order {
    /// Discriminant of this order.
    #[must_use]
    pub const fn kind(&self) -> OrderKind {
        match self {
            Self::None => OrderKind::None,
            Self::Move(_) => OrderKind::Move,
            Self::Attack(_) => OrderKind::Attack,
            Self::Interact(_) => OrderKind::Interact,
        }
    }

    /// Entity this order refers to, if any.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        match self {
            Self::Attack(id) | Self::Interact(id) => Some(*id),
            Self::None | Self::Move(_) => None,
        }
    }
}

// ============================================================================
// Tuning
// ============================================================================

/// Movement and engagement tuning for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitTuning {
    /// Linear speed when moving without a movement component.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Turn rate in radians per second, for presentation smoothing.
    #[serde(with = "fixed_serde")]
    pub rotation_speed: Fixed,
    /// Attack range used when the unit has no attack component.
    #[serde(with = "fixed_serde")]
    pub auto_attack_range: Fixed,
    /// Width of the band beyond attack range in which the unit keeps
    /// facing its target while closing in.
    #[serde(with = "fixed_serde")]
    pub attack_buffer_range: Fixed,
}

impl Default for UnitTuning {
    fn default() -> Self {
        Self {
            speed: Fixed::from_num(5),
            rotation_speed: Fixed::from_num(10),
            auto_attack_range: Fixed::from_num(2.5),
            attack_buffer_range: Fixed::from_num(0.5),
        }
    }
}

impl UnitTuning {
    /// Set linear speed (non-negative).
    #[must_use]
    pub fn with_speed(mut self, speed: Fixed) -> Self {
        self.speed = speed.max(Fixed::ZERO);
        self
    }

    /// Set turn rate (non-negative).
    #[must_use]
    pub fn with_rotation_speed(mut self, rotation_speed: Fixed) -> Self {
        self.rotation_speed = rotation_speed.max(Fixed::ZERO);
        self
    }

    /// Set fallback attack range (non-negative).
    #[must_use]
    pub fn with_auto_attack_range(mut self, range: Fixed) -> Self {
        self.auto_attack_range = range.max(Fixed::ZERO);
        self
    }

    /// Set the hysteresis buffer (non-negative).
    #[must_use]
    pub fn with_attack_buffer_range(mut self, buffer: Fixed) -> Self {
        self.attack_buffer_range = buffer.max(Fixed::ZERO);
        self
    }
}

// ============================================================================
// Unit
// ============================================================================

/// Everything a unit touches during its tick.
///
/// The unit's own components are borrowed out of its entity; other entities
/// are reached only through `world`.
#[derive(Debug)]
pub struct UnitTick<'a> {
    /// The unit's entity id.
    pub id: EntityId,
    /// Seconds per tick.
    pub delta: Fixed,
    /// Settle period after attachment.
    pub settle_ticks: u32,
    /// The unit's spatial body.
    pub body: &'a mut Body,
    /// The unit's attack component, if it can fight.
    pub attack: Option<&'a mut AttackComponent>,
    /// The unit's movement component, if it has one.
    pub movement: Option<&'a mut MovementComponent>,
    /// Read access to the rest of the world.
    pub world: &'a dyn WorldView,
    /// Event sink.
    pub events: &'a mut EventQueue,
}

/// How an attack order resolved this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pursuit {
    /// In range: stand and swing.
    Hold,
    /// Out of range: move toward the target.
    Chase,
    /// Target invalid or unit misconfigured: drop the order.
    Abort,
}

/// A controllable unit.
#[derive(Debug)]
pub struct Unit {
    faction_id: i32,
    order: Order,
    desired_location: Vec3Fixed,
    tuning: UnitTuning,
    activation: Activation,
    /// Attack range seen on the last tick, used between ticks.
    effective_range: Fixed,
    navigation: Option<Box<dyn NavigationProvider>>,
}

impl Unit {
    /// Idle unit. Without a navigation provider the unit never acts.
    #[must_use]
    pub fn new(
        faction_id: i32,
        tuning: UnitTuning,
        navigation: Option<Box<dyn NavigationProvider>>,
    ) -> Self {
        Self {
            faction_id,
            order: Order::None,
            desired_location: Vec3Fixed::ZERO,
            effective_range: tuning.auto_attack_range,
            tuning,
            activation: Activation::Uninitialized,
            navigation,
        }
    }

    /// Faction id used for ally/enemy checks.
    #[must_use]
    pub const fn faction_id(&self) -> i32 {
        self.faction_id
    }

    /// Whether another faction id is friendly.
    #[must_use]
    pub const fn is_ally_of(&self, faction_id: i32) -> bool {
        self.faction_id == faction_id
    }

    /// Current order.
    #[must_use]
    pub const fn order(&self) -> Order {
        self.order
    }

    /// Point the unit is trying to reach.
    #[must_use]
    pub const fn desired_location(&self) -> Vec3Fixed {
        self.desired_location
    }

    /// Tuning values.
    #[must_use]
    pub const fn tuning(&self) -> &UnitTuning {
        &self.tuning
    }

    /// Replace tuning values.
    pub fn set_tuning(&mut self, tuning: UnitTuning) {
        self.tuning = tuning;
    }

    /// Settle state.
    #[must_use]
    pub const fn activation(&self) -> Activation {
        self.activation
    }

    /// Restart the settle period (unit re-attached).
    pub fn reset_activation(&mut self) {
        self.activation.reset();
    }

    /// Navigation provider, if resolved.
    #[must_use]
    pub fn navigation(&self) -> Option<&dyn NavigationProvider> {
        self.navigation.as_deref()
    }

    /// Swap the navigation provider. Restarts the settle period.
    pub fn set_navigation(&mut self, navigation: Option<Box<dyn NavigationProvider>>) {
        self.navigation = navigation;
        self.activation.reset();
    }

    /// Seed the destination without issuing an order (e.g. at spawn).
    pub fn set_desired_location(&mut self, point: Vec3Fixed) {
        self.desired_location = point;
        if let Some(nav) = self.navigation.as_deref_mut() {
            nav.set_target(point);
        }
    }

    /// Walk to a point.
    pub fn issue_move_order(&mut self, id: EntityId, point: Vec3Fixed, events: &mut EventQueue) {
        self.set_order(id, Order::Move(point), events);
        self.desired_location = point;
        if self.activation.is_ready() {
            if let Some(nav) = self.navigation.as_deref_mut() {
                nav.set_target(point);
            }
        }
    }

    /// Chase and fight `target`, currently at `target_position` if live.
    pub fn issue_attack_order(
        &mut self,
        id: EntityId,
        target: EntityId,
        target_position: Option<Vec3Fixed>,
        events: &mut EventQueue,
    ) {
        self.set_order(id, Order::Attack(target), events);
        if let Some(position) = target_position {
            self.desired_location = position;
        }
    }

    /// Walk to the interactable `target`, currently at `target_position`.
    pub fn issue_interact_order(
        &mut self,
        id: EntityId,
        target: EntityId,
        target_position: Option<Vec3Fixed>,
        events: &mut EventQueue,
    ) {
        self.set_order(id, Order::Interact(target), events);
        if let Some(position) = target_position {
            self.desired_location = position;
        }
    }

    /// Go idle.
    pub fn stop_order(&mut self, id: EntityId, events: &mut EventQueue) {
        self.set_order(id, Order::None, events);
    }

    fn set_order(&mut self, id: EntityId, order: Order, events: &mut EventQueue) {
        let previous = std::mem::take(&mut self.order);
        self.order = order;

        if previous.kind() != order.kind() || previous.target() != order.target() {
            events.push(CoreEvent::OrderChanged {
                unit: id,
                previous: previous.kind(),
                current: order.kind(),
                target: order.target(),
            });
        }

        if self.activation.is_ready() {
            let arrival = self.arrival_distance(self.effective_range);
            if let Some(nav) = self.navigation.as_deref_mut() {
                nav.set_desired_arrival_distance(arrival);
            }
        }
    }

    fn arrival_distance(&self, attack_range: Fixed) -> Fixed {
        if self.order.kind() == OrderKind::Attack {
            attack_range
        } else {
            Fixed::ZERO
        }
    }

    fn attack_range(&self, attack: Option<&AttackComponent>) -> Fixed {
        attack.map_or(self.tuning.auto_attack_range, |a| a.stats().range())
    }

    /// Run one tick of order evaluation and movement.
    ///
    /// A unit without a navigation provider does nothing.
    pub fn update(&mut self, mut ctx: UnitTick<'_>) {
        let Some(mut nav) = self.navigation.take() else {
            return;
        };
        self.step(nav.as_mut(), &mut ctx);
        self.navigation = Some(nav);
    }

    fn step(&mut self, nav: &mut dyn NavigationProvider, ctx: &mut UnitTick<'_>) {
        nav.tick();
        if let Some(movement) = ctx.movement.as_deref_mut() {
            movement.advance_activation(ctx.settle_ticks);
        }

        let was_ready = self.activation.is_ready();
        if !self.activation.advance(ctx.settle_ticks) {
            return;
        }
        let range = self.attack_range(ctx.attack.as_deref());
        self.effective_range = range;
        let arrival = self.arrival_distance(range);
        if !was_ready || nav.desired_arrival_distance() != arrival {
            nav.set_desired_arrival_distance(arrival);
        }

        match self.order {
            Order::None => {
                Self::hold(ctx);
                return;
            }
            Order::Move(_) => {}
            Order::Attack(target) => match self.pursue(target, range, nav, ctx) {
                Pursuit::Hold => {
                    Self::hold(ctx);
                    return;
                }
                Pursuit::Chase => {}
                Pursuit::Abort => {
                    self.stop_order(ctx.id, ctx.events);
                    Self::hold(ctx);
                    return;
                }
            },
            Order::Interact(target) => match ctx.world.interactable_position(target) {
                Some(position) => self.desired_location = position,
                None => {
                    debug!(unit = ctx.id, target, "interact target gone");
                    self.stop_order(ctx.id, ctx.events);
                    Self::hold(ctx);
                    return;
                }
            },
        }

        self.drive(nav, range, ctx);
    }

    fn pursue(
        &mut self,
        target: EntityId,
        range: Fixed,
        nav: &mut dyn NavigationProvider,
        ctx: &mut UnitTick<'_>,
    ) -> Pursuit {
        if !ctx.world.health(target).is_some_and(|h| !h.is_dead()) {
            debug!(unit = ctx.id, target, "attack target gone or without living health");
            return Pursuit::Abort;
        }
        let Some(target_position) = ctx.world.position(target) else {
            return Pursuit::Abort;
        };
        self.desired_location = target_position;

        let to_target = (target_position - ctx.body.position).horizontal();
        let distance = to_target.length();

        if distance <= range {
            ctx.body.face(to_target);
            if !nav.target().is_equal_approx(target_position) {
                nav.set_target(target_position);
            }
            let Some(attack) = ctx.attack.as_deref_mut() else {
                error!(unit = ctx.id, "attack order on a unit without an attack component");
                return Pursuit::Abort;
            };
            attack.try_fire_at(ctx.id, target, ctx.world, ctx.events);
            return Pursuit::Hold;
        }

        if distance <= range + self.tuning.attack_buffer_range {
            ctx.body.face(to_target);
            if !nav.target().is_equal_approx(target_position) {
                nav.set_target(target_position);
            }
        }
        Pursuit::Chase
    }

    fn drive(&self, nav: &mut dyn NavigationProvider, range: Fixed, ctx: &mut UnitTick<'_>) {
        let request = MoveRequest {
            position: ctx.body.position,
            destination: self.desired_location,
            order: self.order.kind(),
            attack_range: range,
        };

        let steering = match ctx.movement.as_deref_mut() {
            Some(movement) => movement.process_movement(ctx.id, request, nav, ctx.delta, ctx.events),
            None => self.steer(nav, request, ctx.delta),
        };

        if let Some(direction) = steering.facing {
            ctx.body.face(direction);
        }
        ctx.body.set_horizontal_velocity(steering.velocity);
        ctx.body.integrate(ctx.delta);
    }

    /// Built-in locomotion for units without a movement component.
    fn steer(&self, nav: &mut dyn NavigationProvider, request: MoveRequest, delta: Fixed) -> Steering {
        let arrival = request.arrival_distance();
        if nav.desired_arrival_distance() != arrival {
            nav.set_desired_arrival_distance(arrival);
        }
        if !nav.target().is_equal_approx(request.destination) {
            nav.set_target(request.destination);
        }

        nav.next_waypoint(request.position)
            .and_then(|waypoint| steer_toward(request.position, waypoint, self.tuning.speed, delta))
            .unwrap_or_else(Steering::halt)
    }

    fn hold(ctx: &mut UnitTick<'_>) {
        ctx.body.stop_horizontal();
        if let Some(movement) = ctx.movement.as_deref_mut() {
            movement.halt(ctx.id, ctx.events);
        }
        ctx.body.integrate(ctx.delta);
    }
}
