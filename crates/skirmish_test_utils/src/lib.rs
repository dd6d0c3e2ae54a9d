//! # Skirmish Test Utilities
//!
//! Shared testing utilities for the workspace:
//! - Determinism harness
//! - Unit and battle fixtures
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
