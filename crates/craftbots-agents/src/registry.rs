//! Agent factories keyed by agent name.
//!
//! The table is static: adding an agent type means adding a row here.

use crate::builder::{BUILDER, BuilderBot};
use crate::config::AgentSettings;
use crate::error::AgentError;
use crate::explorer::{EXPLORER, ExplorerBot};
use crate::miner::{MINER, MinerBot};
use crate::runtime::Agent;

/// One agent type: its name and how to build it.
#[derive(Debug, Clone, Copy)]
pub struct AgentEntry {
    /// Agent name, also its routing target.
    pub name: &'static str,
    /// Short lowercase alias used as a command prefix.
    pub alias: &'static str,
    /// Factory.
    pub build: fn(&AgentSettings) -> Result<Box<dyn Agent>, AgentError>,
}

/// Every agent type, in startup order.
pub const AGENTS: [AgentEntry; 3] = [
    AgentEntry {
        name: EXPLORER,
        alias: "explorer",
        build: build_explorer,
    },
    AgentEntry {
        name: MINER,
        alias: "miner",
        build: build_miner,
    },
    AgentEntry {
        name: BUILDER,
        alias: "builder",
        build: build_builder,
    },
];

fn build_explorer(settings: &AgentSettings) -> Result<Box<dyn Agent>, AgentError> {
    Ok(Box::new(ExplorerBot::new(
        settings.exploration.clone(),
        settings.markers,
    )))
}

fn build_miner(settings: &AgentSettings) -> Result<Box<dyn Agent>, AgentError> {
    Ok(Box::new(MinerBot::new(settings.mining.clone(), settings.markers)?))
}

fn build_builder(settings: &AgentSettings) -> Result<Box<dyn Agent>, AgentError> {
    Ok(Box::new(BuilderBot::new(settings.building.clone(), settings.markers)?))
}

/// Look up an agent type by name or alias, case-insensitively.
pub fn find(name: &str) -> Result<&'static AgentEntry, AgentError> {
    AGENTS
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name) || entry.alias.eq_ignore_ascii_case(name))
        .ok_or_else(|| AgentError::UnknownAgent(name.to_owned()))
}

/// Build the behavior for agent `name`.
pub fn create(name: &str, settings: &AgentSettings) -> Result<Box<dyn Agent>, AgentError> {
    (find(name)?.build)(settings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_alias() {
        assert_eq!(find("MinerBot").unwrap().alias, "miner");
        assert_eq!(find("builder").unwrap().name, BUILDER);
        assert_eq!(find("EXPLORER").unwrap().name, EXPLORER);
        assert!(matches!(find("farmer"), Err(AgentError::UnknownAgent(_))));
    }

    #[test]
    fn every_entry_builds() {
        let settings = AgentSettings::default();
        for entry in &AGENTS {
            let agent = create(entry.name, &settings).unwrap();
            assert!(!agent.command_names().is_empty());
        }
    }
}
