//! JSON lines written to stdout by the runner.
//!
//! One object per line. Every published event becomes an event line; the
//! run ends with a single summary line.
//!
//! ```text
//! {"tick":0,"event":{"type":"order_changed","unit":1,"previous":"none","current":"attack","target":2}}
//! {"tick":7,"event":{"type":"attack_started","attacker":1,"target":2}}
//! {"summary":{"ticks":120,"alive":{"0":1},"state_hash":1234,"events":57,"idle":true}}
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use skirmish_core::events::CoreEvent;

/// One published event, stamped with the tick that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct EventLine<'a> {
    /// Tick number the event was published during.
    pub tick: u64,
    /// The event.
    pub event: &'a CoreEvent,
}

/// End-of-run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ticks simulated.
    pub ticks: u64,
    /// Living units per faction id.
    pub alive: BTreeMap<i32, usize>,
    /// Final state hash.
    pub state_hash: u64,
    /// Total events published.
    pub events: usize,
    /// Whether the simulation was idle when the run stopped.
    pub idle: bool,
}

/// Wrapper giving the summary its own top-level key.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryLine<'a> {
    /// The report.
    pub summary: &'a RunSummary,
}
