//! A set of unit definitions keyed by id.

use serde::{Deserialize, Serialize};

use super::unit_data::UnitDefinition;
use crate::attack::AttackDelivery;
use crate::error::{GameError, Result};

/// All unit types available to a scenario.
///
/// # Example RON
///
/// ```ron
/// UnitCatalog(
///     units: [
///         UnitDefinition(id: "footman", name: "Footman", max_health: 120.0),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCatalog {
    /// Unit definitions in file order.
    #[serde(default)]
    pub units: Vec<UnitDefinition>,
}

impl UnitCatalog {
    /// Parse a catalog from RON source. `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text is not a valid
    /// catalog.
    pub fn from_ron_str(source: &str, origin: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: origin.to_owned(),
            message: e.to_string(),
        })
    }

    /// Get a unit definition by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&UnitDefinition> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Whether a definition exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Get all units with a tag.
    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a UnitDefinition> {
        self.units.iter().filter(move |u| u.has_tag(tag))
    }

    /// Validate cross-field consistency.
    ///
    /// Checks that:
    /// - Unit IDs are unique
    /// - Projectile attacks carry a hit radius
    /// - Pool IDs are unique within a unit
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (index, unit) in self.units.iter().enumerate() {
            if self.units[..index].iter().any(|u| u.id == unit.id) {
                errors.push(format!("Duplicate unit id '{}'", unit.id));
            }

            if let Some(attack) = &unit.attack {
                if attack.delivery == AttackDelivery::Projectile && attack.projectile_hit_radius.is_none() {
                    errors.push(format!(
                        "Unit '{}' fires projectiles but has no projectile_hit_radius",
                        unit.id
                    ));
                }
            }

            for (pool_index, pool) in unit.resource_pools.iter().enumerate() {
                if unit.resource_pools[..pool_index].iter().any(|p| p.id == pool.id) {
                    errors.push(format!("Unit '{}' has duplicate pool '{}'", unit.id, pool.id));
                }
            }
        }

        errors
    }
}
