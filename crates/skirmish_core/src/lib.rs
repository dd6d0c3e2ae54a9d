//! # Skirmish Core
//!
//! Deterministic command-and-combat simulation for a real-time unit-control
//! game: where units move, when they swing, how damage lands, and how they
//! die.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`unit`] - Order state machine
//! - [`attack`] - Windup/cooldown timer and strike delivery
//! - [`movement`] - Waypoint-to-velocity translation
//! - [`health`] - Damage and death
//! - [`projectile`] - Homing projectiles
//! - [`navigation`] - Navigation providers over [`pathfinding`]
//! - [`simulation`] - Entity storage and the tick loop
//! - [`command`] - Click-to-order translation
//! - [`data`] - RON unit definitions
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod attack;
pub mod command;
pub mod components;
pub mod data;
pub mod error;
pub mod events;
pub mod health;
pub mod interactable;
pub mod math;
pub mod movement;
pub mod navigation;
pub mod pathfinding;
pub mod projectile;
pub mod resource_pool;
pub mod simulation;
pub mod unit;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attack::{AttackComponent, AttackDelivery, AttackStats, ProjectileTemplate};
    pub use crate::command::{CommandOutcome, CommandTarget, IgnoreReason};
    pub use crate::components::{Activation, Body, EntityId, Facing, SETTLE_TICKS};
    pub use crate::data::{UnitCatalog, UnitDefinition};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{CoreEvent, EventQueue};
    pub use crate::health::HealthComponent;
    pub use crate::interactable::Interactable;
    pub use crate::math::{Fixed, Vec3Fixed};
    pub use crate::movement::MovementComponent;
    pub use crate::navigation::{DirectAgent, GridAgent, NavigationProvider};
    pub use crate::pathfinding::{CellType, GridCell, NavGrid};
    pub use crate::resource_pool::ResourcePool;
    pub use crate::simulation::{NavigationChoice, Simulation, SimulationConfig, UnitSpawnParams};
    pub use crate::unit::{Order, OrderKind, UnitTuning};
    pub use crate::world::{CombatWorld, WorldView};
}
