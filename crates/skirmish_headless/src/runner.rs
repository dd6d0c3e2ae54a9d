//! Drives a scenario tick by tick and streams events as JSON lines.

use std::io::Write;

use tracing::{debug, info, warn};

use skirmish_core::command::CommandTarget;
use skirmish_core::components::EntityId;
use skirmish_core::error::GameError;
use skirmish_core::events::CoreEvent;
use skirmish_core::simulation::Simulation;

use crate::protocol::{EventLine, RunSummary, SummaryLine};
use crate::scenario::{Scenario, ScenarioError, ScheduledCommand, ScriptCommand};

/// When a run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Hard tick limit.
    pub max_ticks: u64,
    /// Stop early once the simulation is idle and the script is exhausted.
    pub until_idle: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_ticks: 1200,
            until_idle: false,
        }
    }
}

/// Headless driver for one scenario.
#[derive(Debug)]
pub struct ScenarioRunner {
    sim: Simulation,
    script: Vec<ScheduledCommand>,
    next_command: usize,
    events_published: usize,
}

impl ScenarioRunner {
    /// Build the scenario's simulation.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let sim = scenario.build()?;
        let mut script = scenario.commands.clone();
        script.sort_by_key(|c| c.tick);
        Ok(Self {
            sim,
            script,
            next_command: 0,
            events_published: 0,
        })
    }

    /// The simulation being driven.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether scripted commands remain.
    #[must_use]
    pub fn has_pending_commands(&self) -> bool {
        self.next_command < self.script.len()
    }

    /// Issue every scripted command due at the current tick, then tick once.
    pub fn step(&mut self) -> Vec<CoreEvent> {
        let now = self.sim.get_tick();
        while let Some(command) = self.script.get(self.next_command) {
            if command.tick > now {
                break;
            }
            if let Err(e) = dispatch(&mut self.sim, command) {
                warn!(tick = now, unit = %command.unit, error = %e, "scripted command failed");
            }
            self.next_command += 1;
        }

        let events = self.sim.tick();
        self.events_published += events.len();
        events
    }

    /// Run to completion, writing event lines and a summary line to `out`.
    pub fn run<W: Write>(&mut self, options: RunOptions, out: &mut W) -> Result<RunSummary, ScenarioError> {
        let mut ticks = 0;
        while ticks < options.max_ticks {
            let tick = self.sim.get_tick();
            for event in &self.step() {
                serde_json::to_writer(&mut *out, &EventLine { tick, event })?;
                writeln!(out)?;
            }
            ticks += 1;

            if options.until_idle && !self.has_pending_commands() && self.sim.is_idle() {
                debug!(tick, "simulation idle");
                break;
            }
        }

        let summary = self.summary(ticks);
        serde_json::to_writer(&mut *out, &SummaryLine { summary: &summary })?;
        writeln!(out)?;
        out.flush()?;

        info!(
            ticks = summary.ticks,
            events = summary.events,
            hash = summary.state_hash,
            "run finished"
        );
        Ok(summary)
    }

    /// Report on the current state.
    #[must_use]
    pub fn summary(&self, ticks: u64) -> RunSummary {
        RunSummary {
            ticks,
            alive: self.sim.alive_units_by_faction(),
            state_hash: self.sim.state_hash(),
            events: self.events_published,
            idle: self.sim.is_idle(),
        }
    }
}

fn resolve(sim: &Simulation, label: &str) -> Result<EntityId, GameError> {
    sim.find_by_label(label)
        .ok_or_else(|| GameError::InvalidState(format!("no entity labelled '{label}'")))
}

fn dispatch(sim: &mut Simulation, scheduled: &ScheduledCommand) -> Result<(), GameError> {
    let unit = resolve(sim, &scheduled.unit)?;
    let target = match &scheduled.command {
        ScriptCommand::Move(point) => CommandTarget::Ground(*point),
        ScriptCommand::Attack(label) => CommandTarget::Unit(resolve(sim, label)?),
        ScriptCommand::Interact(label) => CommandTarget::Interactable(resolve(sim, label)?),
        ScriptCommand::Use(label) => {
            let used = sim.try_interact(unit, resolve(sim, label)?)?;
            debug!(unit, target = %label, used, "use");
            return Ok(());
        }
        ScriptCommand::Stop => return sim.stop_order(unit),
    };
    let outcome = sim.issue_command(unit, target)?;
    debug!(unit, ?outcome, "command issued");
    Ok(())
}

/// Run a scenario `runs` times and check every run ends identically.
pub fn verify_determinism(scenario: &Scenario, runs: u32, options: RunOptions) -> Result<bool, ScenarioError> {
    let mut first: Option<RunSummary> = None;
    for run in 0..runs {
        let summary = ScenarioRunner::new(scenario)?.run(options, &mut std::io::sink())?;
        match &first {
            None => first = Some(summary),
            Some(expected) if *expected != summary => {
                warn!(run, expected = expected.state_hash, actual = summary.state_hash, "run diverged");
                return Ok(false);
            }
            Some(_) => {}
        }
    }
    Ok(true)
}
