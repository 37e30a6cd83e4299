//! Mining strategies and their registry.
//!
//! A strategy extracts blocks around an anchor toward a requirement, one
//! locked world call at a time, and polls the agent's [`Control`] between
//! block checks so pause and stop take effect within one step.
//!
//! Each call to [`MiningStrategy::mine`] reports only what it collected in
//! that call; the caller owns the inventory and credits the report.

mod grid;
mod vertical;

use craftbots_types::{Inventory, Material, Position, Requirements};
use craftbots_world::SharedWorld;
use serde::Serialize;
use tracing::warn;

pub use self::grid::GridStrategy;
pub use self::vertical::VerticalStrategy;
use crate::catalog::Catalog;
use crate::config::MinerSettings;
use crate::control::Control;
use crate::error::AgentError;
use crate::inventory::{add_material, satisfies, still_needed};

/// Inputs of one mining invocation.
#[derive(Debug, Clone, Copy)]
pub struct MiningJob<'a> {
    /// The shared world.
    pub world: &'a SharedWorld,
    /// Pause and stop signals of the owning agent.
    pub control: &'a Control,
    /// Scan origin.
    pub anchor: Position,
    /// What the caller already holds.
    pub inventory: &'a Inventory,
    /// What the caller is mining for. Empty means "anything".
    pub requirements: &'a Requirements,
}

/// How a mining invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MiningOutcome {
    /// Held plus collected now covers every requirement.
    Satisfied,
    /// A full pass finished short of the requirements; move the anchor down.
    Exhausted,
    /// The stop signal was observed.
    Stopped,
    /// The strategy cannot dig any deeper from this anchor.
    FloorReached,
}

/// Result of one mining invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningReport {
    /// Materials collected by this call only.
    pub collected: Inventory,
    /// Blocks cleared by this call.
    pub blocks_mined: u32,
    /// Why the call returned.
    pub outcome: MiningOutcome,
}

/// Snapshot of a strategy for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyStatus {
    /// Strategy name.
    pub name: &'static str,
    /// Last inspected position.
    pub position: Option<Position>,
    /// Materials collected since the last reset.
    pub collected: Inventory,
    /// Blocks cleared since the last reset.
    pub blocks_mined: u32,
    /// Whether the pause signal is raised.
    pub paused: bool,
    /// Whether the stop signal is raised.
    pub stopped: bool,
}

/// A resource extraction algorithm.
pub trait MiningStrategy: Send + core::fmt::Debug {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Run one invocation from `job.anchor`.
    fn mine(&mut self, job: &MiningJob<'_>) -> Result<MiningReport, AgentError>;

    /// Clear counters for a new session.
    fn reset(&mut self);

    /// Status snapshot; pause and stop come from `control`.
    fn status(&self, control: &Control) -> StrategyStatus;

    /// How far the anchor moves down after an [`MiningOutcome::Exhausted`]
    /// pass.
    fn descent(&self) -> i32;
}

// ---------------------------------------------------------------------------
// Shared stepping
// ---------------------------------------------------------------------------

/// Cumulative counters every strategy keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub position: Option<Position>,
    pub collected: Inventory,
    pub blocks_mined: u32,
}

impl Tally {
    pub(crate) fn status(&self, name: &'static str, control: &Control) -> StrategyStatus {
        StrategyStatus {
            name,
            position: self.position,
            collected: self.collected.clone(),
            blocks_mined: self.blocks_mined,
            paused: control.is_paused(),
            stopped: control.is_stopped(),
        }
    }
}

/// Collection state of a single invocation.
#[derive(Debug)]
pub(crate) struct Session<'j, 'a> {
    job: &'j MiningJob<'a>,
    held: Inventory,
    pub collected: Inventory,
    pub blocks_mined: u32,
}

/// What a single inspected block turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Harvested and credited.
    Harvested(Material),
    /// Cleared to make way, nothing credited.
    Cleared,
    /// Left in place.
    Skipped,
    /// Bedrock.
    Blocked,
}

impl<'j, 'a> Session<'j, 'a> {
    pub(crate) fn new(job: &'j MiningJob<'a>) -> Self {
        Self {
            job,
            held: job.inventory.clone(),
            collected: Inventory::new(),
            blocks_mined: 0,
        }
    }

    /// Hold while paused. `false` once the caller must unwind.
    pub(crate) fn proceed(&self) -> bool {
        self.job.control.wait_while_paused() && !self.job.control.is_halted()
    }

    /// Whether held plus collected meets every requirement line.
    pub(crate) fn satisfied(&self) -> bool {
        !self.job.requirements.is_empty() && satisfies(&self.held, self.job.requirements)
    }

    fn useful(&self, material: Material) -> bool {
        still_needed(&self.held, self.job.requirements, material)
    }

    fn credit(&mut self, material: Material) -> Result<(), AgentError> {
        add_material(&mut self.held, material, 1)?;
        add_material(&mut self.collected, material, 1)
    }

    fn clear(&mut self, pos: Position) -> Result<(), AgentError> {
        self.job.world.set_material(pos, Material::Air)?;
        self.blocks_mined = self.blocks_mined.saturating_add(1);
        Ok(())
    }

    /// Inspect `pos`; harvest it when it yields something still needed. When
    /// `dig_through` is set, anything breakable that is not needed (including
    /// unknown block ids) is cleared anyway.
    pub(crate) fn inspect(&mut self, pos: Position, dig_through: bool) -> Result<Step, AgentError> {
        let material = self.job.world.get_material(pos)?;
        if material == Some(Material::Bedrock) {
            return Ok(Step::Blocked);
        }
        match material.and_then(Material::harvest_yield) {
            Some(found) if self.useful(found) => {
                self.clear(pos)?;
                self.credit(found)?;
                Ok(Step::Harvested(found))
            }
            _ if dig_through && material.is_none_or(Material::is_breakable) => {
                self.clear(pos)?;
                Ok(Step::Cleared)
            }
            _ => Ok(Step::Skipped),
        }
    }

    pub(crate) fn finish(
        self,
        outcome: MiningOutcome,
        tally: &mut Tally,
    ) -> Result<MiningReport, AgentError> {
        for (material, qty) in &self.collected {
            add_material(&mut tally.collected, *material, *qty)?;
        }
        tally.blocks_mined = tally.blocks_mined.saturating_add(self.blocks_mined);
        Ok(MiningReport {
            collected: self.collected,
            blocks_mined: self.blocks_mined,
            outcome,
        })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A strategy factory.
#[derive(Debug, Clone, Copy)]
pub struct StrategyEntry {
    /// Registry name.
    pub name: &'static str,
    /// Build a fresh instance.
    pub build: fn(&MinerSettings) -> Box<dyn MiningStrategy>,
}

/// Every strategy the miner can switch to, in listing order.
pub static STRATEGIES: &[StrategyEntry] = &[
    StrategyEntry {
        name: GridStrategy::NAME,
        build: build_grid,
    },
    StrategyEntry {
        name: VerticalStrategy::NAME,
        build: build_vertical,
    },
];

fn build_grid(settings: &MinerSettings) -> Box<dyn MiningStrategy> {
    Box::new(GridStrategy::new(settings.grid_spacing, settings.grid_size))
}

fn build_vertical(settings: &MinerSettings) -> Box<dyn MiningStrategy> {
    Box::new(VerticalStrategy::new(settings.vertical_floor_y))
}

/// Runtime selection over [`STRATEGIES`].
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    catalog: Catalog,
    settings: MinerSettings,
}

impl StrategyRegistry {
    /// A registry with `settings.strategy` selected when it names a known
    /// strategy, the first one otherwise.
    pub fn new(settings: MinerSettings) -> Self {
        let mut catalog = Catalog::new(STRATEGIES.iter().map(|entry| entry.name));
        if catalog.select_name(&settings.strategy).is_none() {
            warn!(strategy = %settings.strategy, "unknown strategy configured, using the default");
        }
        Self { catalog, settings }
    }

    /// Strategy names in listing order.
    pub fn list(&self) -> &[String] {
        self.catalog.list()
    }

    /// Name of the selected strategy.
    pub fn selected(&self) -> &str {
        self.catalog.selected().unwrap_or(GridStrategy::NAME)
    }

    /// Select by position in [`Self::list`].
    pub fn select_index(&mut self, index: usize) -> Result<&str, AgentError> {
        self.catalog
            .select_index(index)
            .ok_or_else(|| AgentError::UnknownStrategy(format!("index {index}")))
    }

    /// Select by name, case-insensitively.
    pub fn select_name(&mut self, name: &str) -> Result<&str, AgentError> {
        self.catalog
            .select_name(name)
            .ok_or_else(|| AgentError::UnknownStrategy(name.to_owned()))
    }

    /// Advance to the next strategy, wrapping around.
    pub fn cycle(&mut self) -> &str {
        self.catalog.cycle().unwrap_or(GridStrategy::NAME)
    }

    /// Build a fresh instance of the selected strategy.
    pub fn build(&self) -> Result<Box<dyn MiningStrategy>, AgentError> {
        let name = self.selected();
        STRATEGIES
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| (entry.build)(&self.settings))
            .ok_or_else(|| AgentError::UnknownStrategy(name.to_owned()))
    }
}
