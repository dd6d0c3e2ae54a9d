//! Scenario loading and validation.
//!
//! A scenario describes a skirmish to run headless: simulation settings, an
//! optional nav grid, the unit types in play, where units and interactables
//! start, and a script of commands issued at fixed ticks.
//!
//! # Example RON
//!
//! ```ron
//! Scenario(
//!     name: "duel",
//!     units: [
//!         UnitDefinition(id: "footman", name: "Footman", max_health: 100.0,
//!             attack: Some(AttackDefinition(range: 2.5, damage: 10.0))),
//!     ],
//!     placements: [
//!         UnitPlacement(unit: "footman", label: "red", faction: 0,
//!             position: (x: 0.0, y: 0.0, z: 0.0)),
//!         UnitPlacement(unit: "footman", label: "blue", faction: 1,
//!             position: (x: 6.0, y: 0.0, z: 0.0)),
//!     ],
//!     commands: [
//!         ScheduledCommand(tick: 0, unit: "red", command: Attack("blue")),
//!     ],
//! )
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use skirmish_core::data::{NavigationKind, UnitCatalog, UnitDefinition};
use skirmish_core::error::GameError;
use skirmish_core::interactable::Interactable;
use skirmish_core::math::{fixed_serde, Fixed, Vec3Fixed};
use skirmish_core::pathfinding::{CellType, GridCell, NavGrid};
use skirmish_core::simulation::{Simulation, SimulationConfig};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read a file or write output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The core rejected part of the scenario.
    #[error("Simulation error: {0}")]
    Core(#[from] GameError),
    /// Cross-reference checks failed.
    #[error("Invalid scenario: {}", .0.join("; "))]
    Invalid(Vec<String>),
    /// Failed to write output.
    #[error("Failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Nav grid layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavGridSetup {
    /// Cells along x.
    pub columns: u32,
    /// Cells along z.
    pub rows: u32,
    /// Cell edge length in world units.
    #[serde(with = "fixed_serde")]
    pub cell_size: Fixed,
    /// World position of the grid's minimum corner.
    #[serde(default)]
    pub origin: Vec3Fixed,
    /// Impassable cells as `(column, row)`.
    #[serde(default)]
    pub blocked: Vec<(u32, u32)>,
    /// Double-cost cells as `(column, row)`.
    #[serde(default)]
    pub slow: Vec<(u32, u32)>,
}

impl NavGridSetup {
    /// Build the grid.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] for empty grids or cells out of
    /// bounds.
    pub fn build(&self) -> Result<NavGrid, GameError> {
        let mut grid = NavGrid::new(self.columns, self.rows, self.cell_size)?.with_origin(self.origin);
        let marks = self
            .blocked
            .iter()
            .map(|&cell| (cell, CellType::Blocked))
            .chain(self.slow.iter().map(|&cell| (cell, CellType::SlowTerrain)));
        for ((col, row), kind) in marks {
            if !grid.set_cell(GridCell::new(col, row), kind) {
                return Err(GameError::InvalidState(format!(
                    "nav grid cell ({col}, {row}) is outside {}x{}",
                    self.columns, self.rows
                )));
            }
        }
        Ok(grid)
    }
}

/// One unit in the starting layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit definition id.
    pub unit: String,
    /// Unique label scripted commands refer to.
    pub label: String,
    /// Faction id.
    pub faction: i32,
    /// Spawn position.
    pub position: Vec3Fixed,
}

/// One interactable in the starting layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractablePlacement {
    /// Unique label, also the interactable's name.
    pub label: String,
    /// World position.
    pub position: Vec3Fixed,
    /// Use range.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Only this faction may use it.
    #[serde(default)]
    pub faction: Option<i32>,
}

/// A scripted command. Entity references are labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptCommand {
    /// Click on the ground.
    Move(Vec3Fixed),
    /// Click on a unit.
    Attack(String),
    /// Click on an interactable.
    Interact(String),
    /// Try to use an interactable right now.
    Use(String),
    /// Clear the order.
    Stop,
}

impl ScriptCommand {
    fn target_label(&self) -> Option<&str> {
        match self {
            Self::Attack(label) | Self::Interact(label) | Self::Use(label) => Some(label),
            Self::Move(_) | Self::Stop => None,
        }
    }
}

/// A command issued before the given tick runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    /// Tick number the command is issued before.
    pub tick: u64,
    /// Label of the commanded unit.
    pub unit: String,
    /// What to do.
    pub command: ScriptCommand,
}

/// A complete scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Simulation settings.
    #[serde(default)]
    pub config: SimulationConfig,
    /// Nav grid for grid-navigating units.
    #[serde(default)]
    pub nav_grid: Option<NavGridSetup>,
    /// Catalog file merged into `units`, relative to the scenario file.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Inline unit definitions.
    #[serde(default)]
    pub units: Vec<UnitDefinition>,
    /// Starting units.
    #[serde(default)]
    pub placements: Vec<UnitPlacement>,
    /// Starting interactables.
    #[serde(default)]
    pub interactables: Vec<InteractablePlacement>,
    /// Command script.
    #[serde(default)]
    pub commands: Vec<ScheduledCommand>,
}

impl Scenario {
    /// Load a scenario from a RON file, merging its catalog file if any.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&contents)?;
        scenario.merge_catalog(path.parent())?;
        info!(name = %scenario.name, path = %path.display(), "scenario loaded");
        Ok(scenario)
    }

    /// Parse from a RON string. The catalog file, if any, is not read.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(ron)?)
    }

    /// Read the catalog file and append its definitions to `units`.
    pub fn merge_catalog(&mut self, base_dir: Option<&Path>) -> Result<(), ScenarioError> {
        let Some(relative) = self.catalog.take() else {
            return Ok(());
        };
        let path = base_dir.map_or_else(|| relative.clone(), |dir| dir.join(&relative));
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let source = std::fs::read_to_string(&path)?;
        let catalog = UnitCatalog::from_ron_str(&source, &path.display().to_string())?;
        debug!(path = %path.display(), count = catalog.units.len(), "catalog merged");
        self.units.extend(catalog.units);
        Ok(())
    }

    /// All unit definitions in play.
    #[must_use]
    pub fn unit_catalog(&self) -> UnitCatalog {
        UnitCatalog {
            units: self.units.clone(),
        }
    }

    /// Check cross-references. Returns one message per problem.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let catalog = self.unit_catalog();
        let mut errors = catalog.validate();

        let mut labels = HashSet::new();
        let mut unit_labels = HashSet::new();
        let mut interactable_labels = HashSet::new();

        for placement in &self.placements {
            if !labels.insert(placement.label.as_str()) {
                errors.push(format!("Duplicate label '{}'", placement.label));
            }
            unit_labels.insert(placement.label.as_str());
            match catalog.get(&placement.unit) {
                None => errors.push(format!(
                    "Placement '{}' uses unknown unit '{}'",
                    placement.label, placement.unit
                )),
                Some(definition) if definition.navigation == NavigationKind::Grid && self.nav_grid.is_none() => {
                    errors.push(format!(
                        "Placement '{}' uses grid navigation but the scenario has no nav_grid",
                        placement.label
                    ));
                }
                Some(_) => {}
            }
        }
        for object in &self.interactables {
            if !labels.insert(object.label.as_str()) {
                errors.push(format!("Duplicate label '{}'", object.label));
            }
            interactable_labels.insert(object.label.as_str());
        }

        for command in &self.commands {
            if !unit_labels.contains(command.unit.as_str()) {
                errors.push(format!(
                    "Command at tick {} addresses unknown unit '{}'",
                    command.tick, command.unit
                ));
            }
            let Some(target) = command.command.target_label() else {
                continue;
            };
            let known = match command.command {
                ScriptCommand::Attack(_) => unit_labels.contains(target),
                _ => interactable_labels.contains(target),
            };
            if !known {
                errors.push(format!(
                    "Command at tick {} targets unknown '{}'",
                    command.tick, target
                ));
            }
        }

        if let Some(grid) = &self.nav_grid {
            if let Err(e) = grid.build() {
                errors.push(e.to_string());
            }
        }
        errors
    }

    /// Validate, then create the simulation with every placement spawned.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ScenarioError::Invalid(errors));
        }

        let mut sim = Simulation::with_config(self.config);
        if let Some(setup) = &self.nav_grid {
            sim = sim.with_nav_grid(setup.build()?);
        }

        let catalog = self.unit_catalog();
        for placement in &self.placements {
            let definition = catalog
                .get(&placement.unit)
                .ok_or_else(|| ScenarioError::Invalid(vec![format!("unknown unit '{}'", placement.unit)]))?;
            sim.spawn_unit(definition.to_spawn_params(
                placement.faction,
                placement.position,
                Some(placement.label.clone()),
            ));
        }
        for object in &self.interactables {
            let mut interactable = Interactable::new(object.label.clone(), object.range);
            if let Some(faction) = object.faction {
                interactable = interactable.with_faction(faction);
            }
            sim.spawn_interactable(object.position, interactable);
        }

        info!(
            name = %self.name,
            units = self.placements.len(),
            interactables = self.interactables.len(),
            "scenario built"
        );
        Ok(sim)
    }

    /// Last tick any scripted command is issued at.
    #[must_use]
    pub fn last_command_tick(&self) -> Option<u64> {
        self.commands.iter().map(|c| c.tick).max()
    }
}
