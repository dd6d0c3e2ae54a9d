//! Interactable objects units can walk up to and use.
//!
//! The tick only tracks where an interactable is. Whether a unit may use it
//! and what happens when it does is decided here and invoked by the command
//! layer through [`Simulation::try_interact`](crate::simulation::Simulation::try_interact).

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::components::EntityId;
use crate::events::{CoreEvent, EventQueue};
use crate::math::{fixed_serde, Fixed};

/// Who is asking to interact, and from how far away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    /// The unit's entity id.
    pub unit: EntityId,
    /// The unit's faction id.
    pub faction_id: i32,
    /// Horizontal distance from the unit to the interactable.
    pub distance: Fixed,
}

/// A usable object placed in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactable {
    name: String,
    enabled: bool,
    #[serde(with = "fixed_serde")]
    range: Fixed,
    faction_id: Option<i32>,
    uses: u32,
}

impl Interactable {
    /// Enabled interactable usable by anyone within `range`.
    #[must_use]
    pub fn new(name: impl Into<String>, range: Fixed) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            range: range.max(Fixed::ZERO),
            faction_id: None,
            uses: 0,
        }
    }

    /// Restrict use to one faction.
    #[must_use]
    pub const fn with_faction(mut self, faction_id: i32) -> Self {
        self.faction_id = Some(faction_id);
        self
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether it accepts interactions at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Maximum use distance.
    #[must_use]
    pub const fn range(&self) -> Fixed {
        self.range
    }

    /// Number of successful interactions.
    #[must_use]
    pub const fn uses(&self) -> u32 {
        self.uses
    }

    /// Whether the requesting unit may use this now.
    #[must_use]
    pub fn can_interact(&self, request: &Interaction) -> bool {
        self.enabled
            && request.distance <= self.range
            && self.faction_id.map_or(true, |f| f == request.faction_id)
    }

    /// Use it. Callers check [`Self::can_interact`] first.
    pub fn interact(&mut self, id: EntityId, request: &Interaction, events: &mut EventQueue) {
        self.uses += 1;
        info!(unit = request.unit, interactable = id, name = %self.name, "interacted");
        events.push(CoreEvent::Interacted {
            unit: request.unit,
            interactable: id,
        });
    }
}
