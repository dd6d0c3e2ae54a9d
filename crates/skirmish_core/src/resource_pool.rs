//! Clamped counters for ability resources such as mana or energy.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::events::{CoreEvent, EventQueue};
use crate::math::{fixed_serde, Fixed};

/// A named resource pool with `current` in `[0, max]`.
///
/// Every mutation publishes [`CoreEvent::ValueChanged`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePool {
    pool_id: String,
    #[serde(with = "fixed_serde")]
    current: Fixed,
    #[serde(with = "fixed_serde")]
    max: Fixed,
}

impl ResourcePool {
    /// Full pool.
    #[must_use]
    pub fn new(pool_id: impl Into<String>, max: Fixed) -> Self {
        let max = max.max(Fixed::ZERO);
        Self {
            pool_id: pool_id.into(),
            current: max,
            max,
        }
    }

    /// Identifier used to look the pool up.
    #[must_use]
    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    /// Current value.
    #[must_use]
    pub const fn current(&self) -> Fixed {
        self.current
    }

    /// Maximum value.
    #[must_use]
    pub const fn max(&self) -> Fixed {
        self.max
    }

    /// Whether `amount` could be spent right now.
    #[must_use]
    pub fn can_spend(&self, amount: Fixed) -> bool {
        amount >= Fixed::ZERO && amount <= self.current
    }

    /// Spend `amount` if available. Returns whether it was spent.
    pub fn try_spend(&mut self, owner: EntityId, amount: Fixed, events: &mut EventQueue) -> bool {
        if !self.can_spend(amount) {
            return false;
        }
        self.current -= amount;
        self.publish(owner, events);
        true
    }

    /// Refill by `amount` up to max. Negative amounts count as zero.
    pub fn restore(&mut self, owner: EntityId, amount: Fixed, events: &mut EventQueue) {
        self.current = (self.current + amount.max(Fixed::ZERO)).min(self.max);
        self.publish(owner, events);
    }

    /// Change the ceiling, re-clamping the current value beneath it.
    pub fn set_max_value(&mut self, owner: EntityId, value: Fixed, events: &mut EventQueue) {
        self.max = value.max(Fixed::ZERO);
        self.current = self.current.min(self.max);
        self.publish(owner, events);
    }

    /// Overwrite the current value, clamped into `[0, max]`.
    pub fn set_current_value(&mut self, owner: EntityId, value: Fixed, events: &mut EventQueue) {
        self.current = value.clamp(Fixed::ZERO, self.max);
        self.publish(owner, events);
    }

    fn publish(&self, owner: EntityId, events: &mut EventQueue) {
        events.push(CoreEvent::ValueChanged {
            entity: owner,
            pool: self.pool_id.clone(),
            current: self.current,
            max: self.max,
        });
    }
}
