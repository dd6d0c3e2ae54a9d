//! Data structures for unit configuration.
//!
//! This module contains pure data structures that define unit types. All
//! structs are designed to be deserialized from RON.
//!
//! **Note:** This module contains no IO - it only parses strings. File
//! loading is handled by `skirmish_headless`.

mod catalog;
mod unit_data;

pub use catalog::UnitCatalog;
pub use unit_data::{AttackDefinition, NavigationKind, PoolDefinition, UnitDefinition};
