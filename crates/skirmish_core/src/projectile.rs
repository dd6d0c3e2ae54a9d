//! Homing projectiles.
//!
//! A projectile is its own entity. It re-homes on its target's current
//! position every tick, applies damage once on arrival, and is destroyed
//! right after. Only ids are held for the attacker and target, so both are
//! re-validated before each use.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::EntityId;
use crate::events::{CoreEvent, EventQueue};
use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::world::CombatWorld;

/// Outcome of one projectile step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileStep {
    /// Still travelling.
    InFlight,
    /// Reached a living target and applied damage.
    Hit {
        /// Whether the hit was lethal.
        killed: bool,
    },
    /// Reached a target that was already dead; no damage.
    Spent,
    /// Target stopped being live; no damage.
    Expired,
}

impl ProjectileStep {
    /// Whether the projectile should be destroyed.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::InFlight)
    }
}

/// A homing projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    attacker: Option<EntityId>,
    target: EntityId,
    #[serde(with = "fixed_serde")]
    damage: Fixed,
    #[serde(with = "fixed_serde")]
    speed: Fixed,
    #[serde(with = "fixed_serde")]
    hit_radius: Fixed,
    position: Vec3Fixed,
    direction: Vec3Fixed,
    #[serde(with = "fixed_serde")]
    travel_distance: Fixed,
}

impl Projectile {
    /// Launch from `origin` toward a target currently at `target_position`.
    #[must_use]
    pub fn launch(
        attacker: Option<EntityId>,
        origin: Vec3Fixed,
        target: EntityId,
        target_position: Vec3Fixed,
        damage: Fixed,
        speed: Fixed,
        hit_radius: Fixed,
    ) -> Self {
        Self {
            attacker,
            target,
            damage: damage.max(Fixed::ZERO),
            speed: speed.max(Fixed::ZERO),
            hit_radius: hit_radius.max(Fixed::ZERO),
            position: origin,
            direction: (target_position - origin).normalize(),
            travel_distance: Fixed::ZERO,
        }
    }

    /// Who fired it.
    #[must_use]
    pub const fn attacker(&self) -> Option<EntityId> {
        self.attacker
    }

    /// What it homes on.
    #[must_use]
    pub const fn target(&self) -> EntityId {
        self.target
    }

    /// Damage applied on hit.
    #[must_use]
    pub const fn damage(&self) -> Fixed {
        self.damage
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3Fixed {
        self.position
    }

    /// Current unit heading.
    #[must_use]
    pub const fn direction(&self) -> Vec3Fixed {
        self.direction
    }

    /// Distance covered since launch.
    #[must_use]
    pub const fn travel_distance(&self) -> Fixed {
        self.travel_distance
    }

    /// Advance one tick.
    ///
    /// `id` is this projectile's own entity id, used in published events.
    pub fn advance(
        &mut self,
        id: EntityId,
        delta: Fixed,
        world: &mut dyn CombatWorld,
        events: &mut EventQueue,
    ) -> ProjectileStep {
        let target_position = match world.position(self.target) {
            Some(position) if world.is_live(self.target) => position,
            _ => {
                debug!(projectile = id, target = self.target, "projectile target lost");
                events.push(CoreEvent::ProjectileExpired {
                    projectile: id,
                    target: self.target,
                });
                return ProjectileStep::Expired;
            }
        };

        let to_target = target_position - self.position;
        let distance = to_target.length();

        if distance <= self.hit_radius {
            return self.resolve_hit(id, world, events);
        }

        if let Some(direction) = to_target.try_normalize() {
            self.direction = direction;
        }
        let step = self.speed * delta;
        if step >= distance {
            // land exactly on the target instead of rounding short of it
            self.position = target_position;
            self.travel_distance += distance;
        } else {
            self.position += self.direction.scale(step);
            self.travel_distance += step;
        }
        ProjectileStep::InFlight
    }

    fn resolve_hit(
        &self,
        id: EntityId,
        world: &mut dyn CombatWorld,
        events: &mut EventQueue,
    ) -> ProjectileStep {
        if !world.is_alive(self.target) {
            debug!(projectile = id, target = self.target, "target already dead");
            return ProjectileStep::Spent;
        }

        let killed = world
            .apply_damage(self.target, self.damage, self.attacker, events)
            .unwrap_or(false);
        events.push(CoreEvent::ProjectileHit {
            projectile: id,
            attacker: self.attacker,
            target: self.target,
            damage: self.damage,
        });
        ProjectileStep::Hit { killed }
    }
}
