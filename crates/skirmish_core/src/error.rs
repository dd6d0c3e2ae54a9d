//! Error types for the skirmish simulation.
//!
//! Only the public [`Simulation`](crate::simulation::Simulation) API returns
//! these. Nothing raised inside a tick propagates: misconfiguration is logged
//! and the affected unit degrades to an inert state instead.

use thiserror::Error;

use crate::components::EntityId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Entity exists but lacks a component the operation needs.
    #[error("Entity {entity} has no {component} component")]
    MissingComponent {
        /// Entity that was addressed.
        entity: EntityId,
        /// Name of the missing component.
        component: &'static str,
    },

    /// A command named a target that cannot receive it.
    #[error("Invalid target {target} for entity {entity}: {reason}")]
    InvalidTarget {
        /// Entity receiving the command.
        entity: EntityId,
        /// Offending target.
        target: EntityId,
        /// Why the target was rejected.
        reason: &'static str,
    },

    /// No walkable route between two points.
    #[error("No path from ({from_x}, {from_z}) to ({to_x}, {to_z})")]
    NoPath {
        /// Start cell column.
        from_x: u32,
        /// Start cell row.
        from_z: u32,
        /// Goal cell column.
        to_x: u32,
        /// Goal cell row.
        to_z: u32,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}
