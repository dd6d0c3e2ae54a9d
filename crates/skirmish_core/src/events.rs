//! Outbound notifications.
//!
//! Components publish [`CoreEvent`]s into an [`EventQueue`] as things
//! happen. Delivery is synchronous and in publish order; consumers
//! (presentation, audio, the headless runner) drain the queue after each
//! tick. Nothing in the core reads events back.

use serde::Serialize;

use crate::attack::AttackDelivery;
use crate::components::EntityId;
use crate::math::{fixed_serde, Fixed};
use crate::unit::OrderKind;

/// A notification published by the simulation core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    /// A unit's order kind or target changed.
    OrderChanged {
        /// Unit whose order changed.
        unit: EntityId,
        /// Kind before the change.
        previous: OrderKind,
        /// Kind after the change.
        current: OrderKind,
        /// Entity target of the new order, if any.
        target: Option<EntityId>,
    },
    /// Health value changed (including no-op clamps).
    HealthChanged {
        /// Entity whose health changed.
        entity: EntityId,
        /// New current health.
        #[serde(with = "fixed_serde")]
        current: Fixed,
        /// Maximum health.
        #[serde(with = "fixed_serde")]
        max: Fixed,
    },
    /// Damage was applied.
    DamageTaken {
        /// Damaged entity.
        entity: EntityId,
        /// Amount after clamping negatives to zero.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
        /// Who dealt it.
        source: Option<EntityId>,
    },
    /// Health reached zero. Published once per life.
    Died {
        /// Entity that died.
        entity: EntityId,
        /// Who dealt the killing blow.
        source: Option<EntityId>,
    },
    /// A windup began.
    AttackStarted {
        /// Attacking unit.
        attacker: EntityId,
        /// Target of the swing.
        target: EntityId,
    },
    /// Playback-rate hint: `base_attack_time / attack_interval`.
    AttackSpeedChanged {
        /// Attacking unit.
        attacker: EntityId,
        /// Speed multiplier relative to baseline.
        #[serde(with = "fixed_serde")]
        multiplier: Fixed,
    },
    /// Windup completed against a valid target.
    AttackPointReached {
        /// Attacking unit.
        attacker: EntityId,
        /// Target of the swing.
        target: EntityId,
    },
    /// Damage was delivered (melee) or launched (projectile).
    AttackHit {
        /// Attacking unit.
        attacker: EntityId,
        /// Target of the attack.
        target: EntityId,
        /// Damage dealt or carried.
        #[serde(with = "fixed_serde")]
        damage: Fixed,
        /// Melee or projectile.
        delivery: AttackDelivery,
    },
    /// A projectile entity was created.
    ProjectileSpawned {
        /// New projectile entity.
        projectile: EntityId,
        /// Unit that fired it.
        attacker: EntityId,
        /// Unit it homes on.
        target: EntityId,
    },
    /// A projectile reached a living target and applied damage.
    ProjectileHit {
        /// Projectile entity (destroyed after this event).
        projectile: EntityId,
        /// Unit that fired it.
        attacker: Option<EntityId>,
        /// Unit that was hit.
        target: EntityId,
        /// Damage applied.
        #[serde(with = "fixed_serde")]
        damage: Fixed,
    },
    /// A projectile lost its target and was destroyed without effect.
    ProjectileExpired {
        /// Projectile entity.
        projectile: EntityId,
        /// Target it was homing on.
        target: EntityId,
    },
    /// Horizontal speed rose above the moving threshold.
    MovementStarted {
        /// Moving entity.
        entity: EntityId,
    },
    /// Horizontal speed fell to or below the moving threshold.
    MovementStopped {
        /// Entity that stopped.
        entity: EntityId,
    },
    /// A resource pool value changed.
    ValueChanged {
        /// Pool owner.
        entity: EntityId,
        /// Pool identifier, e.g. `"mana"`.
        pool: String,
        /// New current value.
        #[serde(with = "fixed_serde")]
        current: Fixed,
        /// Maximum value.
        #[serde(with = "fixed_serde")]
        max: Fixed,
    },
    /// A unit used an interactable.
    Interacted {
        /// Unit that interacted.
        unit: EntityId,
        /// Interactable that was used.
        interactable: EntityId,
    },
}

/// Ordered buffer of published events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQueue {
    events: Vec<CoreEvent>,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event.
    pub fn push(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    /// Events published so far, in order.
    #[must_use]
    pub fn as_slice(&self) -> &[CoreEvent] {
        &self.events
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take all buffered events, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    /// Consume the queue.
    #[must_use]
    pub fn into_vec(self) -> Vec<CoreEvent> {
        self.events
    }
}

impl Extend<CoreEvent> for EventQueue {
    fn extend<T: IntoIterator<Item = CoreEvent>>(&mut self, iter: T) {
        self.events.extend(iter);
    }
}
