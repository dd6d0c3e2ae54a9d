//! Headless scenario runner for scripted skirmishes and CI verification.
//!
//! Loads a RON [`Scenario`], drives the core simulation tick by tick while
//! issuing scripted commands, and writes every published event to stdout as
//! a JSON line. Logs go to stderr.
//!
//! # Example
//!
//! ```bash
//! # Run until nothing is happening
//! cargo run -p skirmish_headless -- run --scenario scenarios/duel.ron --until-idle
//!
//! # Check a scenario without running it
//! cargo run -p skirmish_headless -- validate --scenario scenarios/duel.ron
//!
//! # Replay a scenario several times and compare outcomes
//! cargo run -p skirmish_headless -- verify --scenario scenarios/duel.ron --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod protocol;
pub mod runner;
pub mod scenario;

pub use protocol::{EventLine, RunSummary};
pub use runner::{verify_determinism, RunOptions, ScenarioRunner};
pub use scenario::{Scenario, ScenarioError};
