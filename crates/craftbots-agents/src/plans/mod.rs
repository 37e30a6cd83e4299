//! Build plans and the plan registry.
//!
//! A plan turns an origin into an ordered list of [`PlannedBlock`]s. The
//! built-in plans are generated in code; extra plans are loaded from CSV
//! files with `dx,dy,dz,material` rows.

mod castle;
mod chess;
mod loaded;
mod platform;

use std::collections::BTreeMap;
use std::path::Path;

use craftbots_types::{PlannedBlock, Position, Requirements};
use tracing::{info, warn};

pub use self::castle::CastlePlan;
pub use self::chess::ChessPlan;
pub use self::loaded::CsvPlan;
pub use self::platform::PlatformPlan;
use crate::catalog::Catalog;
use crate::error::AgentError;
use crate::inventory::add_material;

/// A structure the builder can realize.
pub trait BuildPlan: Send + core::fmt::Debug {
    /// Registry name.
    fn name(&self) -> &str;

    /// Blocks to place relative to `origin`, in placement order.
    fn generate(&self, origin: Position) -> Vec<PlannedBlock>;

    /// Bill of materials: how much of each material the plan consumes.
    fn bom(&self) -> Result<Requirements, AgentError> {
        bom_of(&self.generate(Position::new(0, 0, 0)))
    }
}

/// Count the materials of a block list.
pub fn bom_of(blocks: &[PlannedBlock]) -> Result<Requirements, AgentError> {
    let mut bom = Requirements::new();
    for block in blocks {
        add_material(&mut bom, block.material, 1)?;
    }
    Ok(bom)
}

/// A built-in plan factory.
#[derive(Debug, Clone, Copy)]
pub struct PlanEntry {
    /// Registry name.
    pub name: &'static str,
    /// Build an instance.
    pub build: fn() -> Box<dyn BuildPlan>,
}

/// Built-in plans, in listing order.
pub static PLANS: &[PlanEntry] = &[
    PlanEntry {
        name: PlatformPlan::NAME,
        build: build_platform,
    },
    PlanEntry {
        name: ChessPlan::NAME,
        build: build_chess,
    },
    PlanEntry {
        name: CastlePlan::NAME,
        build: build_castle,
    },
];

fn build_platform() -> Box<dyn BuildPlan> {
    Box::new(PlatformPlan)
}

fn build_chess() -> Box<dyn BuildPlan> {
    Box::new(ChessPlan)
}

fn build_castle() -> Box<dyn BuildPlan> {
    Box::new(CastlePlan)
}

/// Runtime selection over the built-in plans plus any loaded CSV plans.
#[derive(Debug, Clone)]
pub struct PlanRegistry {
    catalog: Catalog,
    loaded: BTreeMap<String, CsvPlan>,
}

impl Default for PlanRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanRegistry {
    /// The built-in plans, first one selected.
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(PLANS.iter().map(|entry| entry.name)),
            loaded: BTreeMap::new(),
        }
    }

    /// Add a loaded plan. A plan with a built-in name is ignored.
    pub fn register(&mut self, plan: CsvPlan) -> bool {
        if PLANS.iter().any(|entry| entry.name.eq_ignore_ascii_case(plan.name())) {
            warn!(plan = %plan.name(), "plan file shadows a built-in plan, ignoring");
            return false;
        }
        self.catalog.insert(plan.name());
        self.loaded.insert(plan.name().to_owned(), plan);
        true
    }

    /// Load every `*.csv` file in `dir` as a plan named after the file stem.
    /// Unreadable files are logged and skipped. Returns how many were added.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, AgentError> {
        let entries = std::fs::read_dir(dir).map_err(|err| AgentError::PlanLoad {
            path: dir.to_path_buf(),
            reason: err.to_string(),
        })?;
        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
            .collect();
        paths.sort();

        let mut added: usize = 0;
        for path in paths {
            match CsvPlan::load(&path) {
                Ok(plan) => {
                    if self.register(plan) {
                        added = added.saturating_add(1);
                    }
                }
                Err(err) => warn!(path = %path.display(), error = %err, "skipping plan file"),
            }
        }
        info!(dir = %dir.display(), added, "loaded plan files");
        Ok(added)
    }

    /// Plan names in listing order.
    pub fn list(&self) -> &[String] {
        self.catalog.list()
    }

    /// Name of the selected plan.
    pub fn selected(&self) -> &str {
        self.catalog.selected().unwrap_or(PlatformPlan::NAME)
    }

    /// Select by position in [`Self::list`].
    pub fn select_index(&mut self, index: usize) -> Result<&str, AgentError> {
        self.catalog
            .select_index(index)
            .ok_or_else(|| AgentError::UnknownPlan(format!("index {index}")))
    }

    /// Select by name, case-insensitively.
    pub fn select_name(&mut self, name: &str) -> Result<&str, AgentError> {
        self.catalog
            .select_name(name)
            .ok_or_else(|| AgentError::UnknownPlan(name.to_owned()))
    }

    /// Advance to the next plan, wrapping around.
    pub fn cycle(&mut self) -> &str {
        self.catalog.cycle().unwrap_or(PlatformPlan::NAME)
    }

    /// An instance of the selected plan.
    pub fn build(&self) -> Result<Box<dyn BuildPlan>, AgentError> {
        let name = self.selected();
        if let Some(entry) = PLANS.iter().find(|entry| entry.name == name) {
            return Ok((entry.build)());
        }
        self.loaded
            .get(name)
            .map(|plan| Box::new(plan.clone()) as Box<dyn BuildPlan>)
            .ok_or_else(|| AgentError::UnknownPlan(name.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use craftbots_types::Material;

    use super::*;

    #[test]
    fn builtin_boms() {
        let platform = PlatformPlan.bom().unwrap();
        assert_eq!(platform.get(&Material::Dirt), Some(&8));
        assert_eq!(platform.get(&Material::Stone), Some(&8));
        let chess = ChessPlan.bom().unwrap();
        assert_eq!(chess.get(&Material::Dirt), Some(&18));
        assert_eq!(chess.get(&Material::Stone), Some(&18));
        let castle = CastlePlan.bom().unwrap();
        assert_eq!(castle.get(&Material::Sandstone), Some(&25));
        assert_eq!(castle.get(&Material::Stone), Some(&45));
    }

    #[test]
    fn registry_selects_and_builds() {
        let mut registry = PlanRegistry::new();
        assert_eq!(registry.list(), ["platform", "chess", "castle"]);
        assert_eq!(registry.cycle(), "chess");
        assert_eq!(registry.build().unwrap().name(), "chess");
        assert_eq!(registry.select_name("CASTLE").unwrap(), "castle");
        assert!(registry.select_name("pyramid").is_err());
        assert_eq!(registry.cycle(), "platform");
    }

    #[test]
    fn loaded_plan_is_registered_once() {
        let mut registry = PlanRegistry::new();
        let plan = CsvPlan::parse("tower", "dx,dy,dz,material\n0,1,0,stone\n".as_bytes()).unwrap();
        assert!(registry.register(plan.clone()));
        assert!(registry.register(plan));
        assert_eq!(registry.list().len(), 4);
        registry.select_name("tower").unwrap();
        assert_eq!(registry.build().unwrap().generate(Position::new(0, 0, 0)).len(), 1);
        let shadow = CsvPlan::parse("platform", "dx,dy,dz,material\n".as_bytes()).unwrap();
        assert!(!registry.register(shadow));
    }
}
