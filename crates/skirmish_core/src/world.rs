//! World access seams used by components during a tick.
//!
//! Components hold only [`EntityId`]s for other entities and must
//! re-validate through these traits before every use: the referenced entity
//! may have died, been detached, or been despawned since the last tick.

use std::fmt;

use crate::components::EntityId;
use crate::events::EventQueue;
use crate::health::HealthComponent;
use crate::math::{Fixed, Vec3Fixed};
use crate::projectile::Projectile;

/// Read-only queries about other entities.
pub trait WorldView: fmt::Debug {
    /// Whether the entity exists and is attached to the live simulation.
    fn is_live(&self, id: EntityId) -> bool;

    /// World position of a live entity with a body.
    fn position(&self, id: EntityId) -> Option<Vec3Fixed>;

    /// Health of a live entity.
    fn health(&self, id: EntityId) -> Option<&HealthComponent>;

    /// Position of a live interactable.
    fn interactable_position(&self, id: EntityId) -> Option<Vec3Fixed>;

    /// Live, has health, and that health is above zero.
    fn is_alive(&self, id: EntityId) -> bool {
        self.health(id).is_some_and(|h| !h.is_dead())
    }

    /// Live and its health reports dead.
    fn is_dead(&self, id: EntityId) -> bool {
        self.health(id).is_some_and(HealthComponent::is_dead)
    }
}

/// Mutating operations available to attacks and projectiles.
pub trait CombatWorld: WorldView {
    /// Damage a live entity's health.
    ///
    /// Returns `None` if the target has no health, otherwise whether this hit
    /// killed it. A kill immediately runs the death consequences.
    fn apply_damage(
        &mut self,
        target: EntityId,
        amount: Fixed,
        source: Option<EntityId>,
        events: &mut EventQueue,
    ) -> Option<bool>;

    /// Add a projectile entity to the world and return its id.
    fn spawn_projectile(&mut self, projectile: Projectile) -> EntityId;
}
