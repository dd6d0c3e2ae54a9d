//! Health pool: the sole authority on life and death.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::components::EntityId;
use crate::events::{CoreEvent, EventQueue};
use crate::math::{fixed_serde, Fixed};

/// Default maximum health.
pub const DEFAULT_MAX_HEALTH: i32 = 100;

/// Clamped health value.
///
/// `current` always lies in `[0, max]`. Reaching zero publishes
/// [`CoreEvent::Died`] exactly once per life; further lethal hits on a
/// dead entity still clamp and notify but never repeat the death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HealthComponent {
    #[serde(with = "fixed_serde")]
    current: Fixed,
    #[serde(with = "fixed_serde")]
    max: Fixed,
}

impl Default for HealthComponent {
    fn default() -> Self {
        Self::new(Fixed::from_num(DEFAULT_MAX_HEALTH))
    }
}

impl HealthComponent {
    /// Full health pool. Negative maxima are clamped to zero.
    #[must_use]
    pub fn new(max: Fixed) -> Self {
        let max = max.max(Fixed::ZERO);
        Self { current: max, max }
    }

    /// Pool with an explicit starting value, clamped into `[0, max]`.
    #[must_use]
    pub fn with_current(max: Fixed, current: Fixed) -> Self {
        let max = max.max(Fixed::ZERO);
        Self {
            current: current.clamp(Fixed::ZERO, max),
            max,
        }
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> Fixed {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> Fixed {
        self.max
    }

    /// Whether health has reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= Fixed::ZERO
    }

    /// Current health as a fraction of max (zero when max is zero).
    #[must_use]
    pub fn fraction(&self) -> Fixed {
        if self.max <= Fixed::ZERO {
            Fixed::ZERO
        } else {
            self.current / self.max
        }
    }

    /// Subtract damage and publish the change.
    ///
    /// Negative amounts count as zero. Returns `true` only if this hit
    /// killed an entity that was alive before it.
    pub fn apply_damage(
        &mut self,
        owner: EntityId,
        amount: Fixed,
        source: Option<EntityId>,
        events: &mut EventQueue,
    ) -> bool {
        let amount = amount.max(Fixed::ZERO);
        let was_alive = !self.is_dead();

        self.current = (self.current - amount).max(Fixed::ZERO);

        events.push(CoreEvent::DamageTaken {
            entity: owner,
            amount,
            source,
        });
        self.publish_changed(owner, events);

        if was_alive && self.is_dead() {
            info!(entity = owner, source = ?source, "unit died");
            events.push(CoreEvent::Died {
                entity: owner,
                source,
            });
            return true;
        }
        false
    }

    /// Restore health up to max. Negative amounts count as zero.
    ///
    /// Healing a dead entity above zero starts a new life.
    pub fn heal(&mut self, owner: EntityId, amount: Fixed, events: &mut EventQueue) {
        let amount = amount.max(Fixed::ZERO);
        self.current = (self.current + amount).min(self.max);
        self.publish_changed(owner, events);
    }

    /// Change the ceiling, re-clamping current health beneath it.
    ///
    /// Returns `true` if the new ceiling killed a living entity.
    pub fn set_max_health(&mut self, owner: EntityId, value: Fixed, events: &mut EventQueue) -> bool {
        let was_alive = !self.is_dead();
        self.max = value.max(Fixed::ZERO);
        self.current = self.current.min(self.max);
        self.publish_changed(owner, events);
        self.publish_death_edge(owner, was_alive, events)
    }

    /// Overwrite current health, clamped into `[0, max]`.
    ///
    /// Returns `true` on an alive-to-dead transition.
    pub fn set_current_health(
        &mut self,
        owner: EntityId,
        value: Fixed,
        events: &mut EventQueue,
    ) -> bool {
        let was_alive = !self.is_dead();
        self.current = value.clamp(Fixed::ZERO, self.max);
        self.publish_changed(owner, events);
        self.publish_death_edge(owner, was_alive, events)
    }

    fn publish_changed(&self, owner: EntityId, events: &mut EventQueue) {
        events.push(CoreEvent::HealthChanged {
            entity: owner,
            current: self.current,
            max: self.max,
        });
    }

    fn publish_death_edge(&self, owner: EntityId, was_alive: bool, events: &mut EventQueue) -> bool {
        if was_alive && self.is_dead() {
            info!(entity = owner, "unit died");
            events.push(CoreEvent::Died {
                entity: owner,
                source: None,
            });
            true
        } else {
            false
        }
    }
}
