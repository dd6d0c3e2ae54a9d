//! Headless skirmish runner.
//!
//! # Usage
//!
//! ```bash
//! skirmish_headless run --scenario scenarios/duel.ron --ticks 600 --until-idle
//! skirmish_headless validate --scenario scenarios/duel.ron
//! skirmish_headless verify --scenario scenarios/duel.ron --runs 5
//! ```
//!
//! Events (stdout): JSON lines, one per event, then a summary line.
//! Logs (stderr): human-readable; `RUST_LOG` overrides the level.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_headless::{verify_determinism, RunOptions, Scenario, ScenarioError, ScenarioRunner};

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless skirmish runner for scripted scenarios and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and stream its events
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Maximum ticks to simulate
        #[arg(short, long, default_value = "1200")]
        ticks: u64,

        /// Stop once the simulation is idle and the script is done
        #[arg(long)]
        until_idle: bool,
    },

    /// Parse and cross-check a scenario without running it
    Validate {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,
    },

    /// Run a scenario several times and compare the outcomes
    Verify {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of runs
        #[arg(short, long, default_value = "3")]
        runs: u32,

        /// Ticks per run
        #[arg(short, long, default_value = "1200")]
        ticks: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs to stderr; stdout carries events
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            ticks,
            until_idle,
        } => cmd_run(&scenario, RunOptions { max_ticks: ticks, until_idle }),
        Commands::Validate { scenario } => cmd_validate(&scenario),
        Commands::Verify {
            scenario,
            runs,
            ticks,
        } => cmd_verify(&scenario, runs, ticks),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Run a scenario, events to stdout
fn cmd_run(path: &Path, options: RunOptions) -> Result<ExitCode, ScenarioError> {
    let scenario = Scenario::load(path)?;
    tracing::info!(name = %scenario.name, max_ticks = options.max_ticks, "starting run");

    let mut runner = ScenarioRunner::new(&scenario)?;
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    runner.run(options, &mut out)?;
    Ok(ExitCode::SUCCESS)
}

/// Validate a scenario
fn cmd_validate(path: &Path) -> Result<ExitCode, ScenarioError> {
    let scenario = Scenario::load(path)?;
    let errors = scenario.validate();
    if errors.is_empty() {
        eprintln!("OK: {} ({} units, {} commands)", scenario.name, scenario.placements.len(), scenario.commands.len());
        return Ok(ExitCode::SUCCESS);
    }
    for error in &errors {
        eprintln!("ERROR: {error}");
    }
    Ok(ExitCode::FAILURE)
}

/// Verify determinism
fn cmd_verify(path: &Path, runs: u32, ticks: u64) -> Result<ExitCode, ScenarioError> {
    let scenario = Scenario::load(path)?;
    tracing::info!(name = %scenario.name, runs, ticks, "verifying determinism");

    let options = RunOptions {
        max_ticks: ticks,
        until_idle: false,
    };
    if verify_determinism(&scenario, runs, options)? {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        Ok(ExitCode::FAILURE)
    }
}
