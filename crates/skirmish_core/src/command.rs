//! Command layer: turns a player's click into an order.
//!
//! Clicking the ground moves, clicking an enemy attacks, clicking an
//! interactable walks over to it. Clicks on the unit itself or on an ally
//! are ignored. Actually using an interactable is a separate step,
//! [`Simulation::try_interact`], which the tick never calls.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::EntityId;
use crate::error::{GameError, Result};
use crate::interactable::Interaction;
use crate::math::Vec3Fixed;
use crate::simulation::Simulation;
use crate::world::WorldView;

/// What the player clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandTarget {
    /// A point on the terrain.
    Ground(Vec3Fixed),
    /// Another unit.
    Unit(EntityId),
    /// An interactable.
    Interactable(EntityId),
}

/// Why a command produced no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The unit clicked itself.
    SelfTarget,
    /// The clicked unit is on the same faction.
    Ally,
}

/// Order produced by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Move order issued.
    Moved,
    /// Attack order issued.
    Attacking(EntityId),
    /// Interact order issued.
    Interacting(EntityId),
    /// Nothing happened.
    Ignored(IgnoreReason),
}

impl Simulation {
    fn faction_of(&self, id: EntityId) -> Result<i32> {
        let entity = self.get_entity(id).ok_or(GameError::EntityNotFound(id))?;
        entity
            .unit
            .as_ref()
            .map(crate::unit::Unit::faction_id)
            .ok_or(GameError::MissingComponent {
                entity: id,
                component: "unit",
            })
    }

    /// Issue the order a click on `target` implies.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] or [`GameError::MissingComponent`]
    /// when `unit` is not a unit or the clicked entity is not what the target
    /// kind claims.
    pub fn issue_command(&mut self, unit: EntityId, target: CommandTarget) -> Result<CommandOutcome> {
        match target {
            CommandTarget::Ground(point) => {
                self.issue_move_order(unit, point)?;
                Ok(CommandOutcome::Moved)
            }
            CommandTarget::Unit(other) => {
                if other == unit {
                    debug!(unit, "ignoring command on self");
                    return Ok(CommandOutcome::Ignored(IgnoreReason::SelfTarget));
                }
                if self.faction_of(unit)? == self.faction_of(other)? {
                    debug!(unit, other, "ignoring command on ally");
                    return Ok(CommandOutcome::Ignored(IgnoreReason::Ally));
                }
                self.issue_attack_order(unit, other)?;
                Ok(CommandOutcome::Attacking(other))
            }
            CommandTarget::Interactable(other) => {
                self.issue_interact_order(unit, other)?;
                Ok(CommandOutcome::Interacting(other))
            }
        }
    }

    /// Issue the same command to several units, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Same as [`issue_command`](Self::issue_command).
    pub fn issue_commands(&mut self, units: &[EntityId], target: CommandTarget) -> Result<Vec<CommandOutcome>> {
        units.iter().map(|&unit| self.issue_command(unit, target)).collect()
    }

    /// Use an interactable if it allows this unit to. Returns whether the
    /// interaction happened.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingComponent`] if `unit` is not a unit or
    /// `interactable` is not an interactable.
    pub fn try_interact(&mut self, unit: EntityId, interactable: EntityId) -> Result<bool> {
        let faction_id = self.faction_of(unit)?;
        let unit_position = self
            .position(unit)
            .ok_or_else(|| GameError::InvalidState(format!("unit {unit} is not live")))?;
        let target_position =
            self.interactable_position(interactable)
                .ok_or(GameError::MissingComponent {
                    entity: interactable,
                    component: "interactable",
                })?;

        let request = Interaction {
            unit,
            faction_id,
            distance: unit_position.horizontal_distance(target_position),
        };

        let (entity, events) = self.entity_and_events(interactable)?;
        let Some(object) = entity.interactable.as_mut() else {
            return Err(GameError::MissingComponent {
                entity: interactable,
                component: "interactable",
            });
        };
        if !object.can_interact(&request) {
            debug!(unit, interactable, "interaction refused");
            return Ok(false);
        }
        object.interact(interactable, &request, events);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CoreEvent;
    use crate::interactable::Interactable;
    use crate::math::Fixed;
    use crate::simulation::UnitSpawnParams;
    use crate::unit::Order;

    fn point(x: f64, z: f64) -> Vec3Fixed {
        Vec3Fixed::ground(Fixed::from_num(x), Fixed::from_num(z))
    }

    fn spawn(sim: &mut Simulation, faction_id: i32, position: Vec3Fixed) -> EntityId {
        sim.spawn_unit(UnitSpawnParams {
            faction_id,
            position,
            ..Default::default()
        })
    }

    fn order_of(sim: &Simulation, id: EntityId) -> Order {
        sim.get_entity(id).unwrap().unit.as_ref().unwrap().order()
    }

    #[test]
    fn test_ground_click_moves() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        let outcome = sim.issue_command(a, CommandTarget::Ground(point(4.0, 4.0))).unwrap();
        assert_eq!(outcome, CommandOutcome::Moved);
        assert_eq!(order_of(&sim, a), Order::Move(point(4.0, 4.0)));
    }

    #[test]
    fn test_enemy_click_attacks_ally_click_ignored() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        let ally = spawn(&mut sim, 0, point(1.0, 0.0));
        let enemy = spawn(&mut sim, 1, point(5.0, 0.0));

        assert_eq!(
            sim.issue_command(a, CommandTarget::Unit(ally)).unwrap(),
            CommandOutcome::Ignored(IgnoreReason::Ally)
        );
        assert_eq!(
            sim.issue_command(a, CommandTarget::Unit(a)).unwrap(),
            CommandOutcome::Ignored(IgnoreReason::SelfTarget)
        );
        assert_eq!(order_of(&sim, a), Order::None);

        assert_eq!(
            sim.issue_command(a, CommandTarget::Unit(enemy)).unwrap(),
            CommandOutcome::Attacking(enemy)
        );
        assert_eq!(order_of(&sim, a), Order::Attack(enemy));
    }

    #[test]
    fn test_interactable_click_and_use() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        let chest = sim.spawn_interactable(point(6.0, 0.0), Interactable::new("chest", Fixed::from_num(1)));

        assert_eq!(
            sim.issue_command(a, CommandTarget::Interactable(chest)).unwrap(),
            CommandOutcome::Interacting(chest)
        );
        assert!(!sim.try_interact(a, chest).unwrap());

        for _ in 0..60 {
            sim.tick();
        }
        assert!(sim.try_interact(a, chest).unwrap());
        assert!(sim
            .take_events()
            .contains(&CoreEvent::Interacted { unit: a, interactable: chest }));
    }

    #[test]
    fn test_wrong_target_kind_errors() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        let b = spawn(&mut sim, 1, point(3.0, 0.0));
        assert!(matches!(
            sim.issue_command(a, CommandTarget::Interactable(b)),
            Err(GameError::MissingComponent { .. })
        ));
        assert!(matches!(
            sim.issue_command(a, CommandTarget::Unit(99)),
            Err(GameError::EntityNotFound(99))
        ));
    }

    #[test]
    fn test_group_command() {
        let mut sim = Simulation::new();
        let a = spawn(&mut sim, 0, Vec3Fixed::ZERO);
        let b = spawn(&mut sim, 0, point(1.0, 0.0));
        let outcomes = sim
            .issue_commands(&[a, b], CommandTarget::Ground(point(8.0, 8.0)))
            .unwrap();
        assert_eq!(outcomes, vec![CommandOutcome::Moved; 2]);
    }
}
