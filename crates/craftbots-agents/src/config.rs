//! Tunables for the three agents.
//!
//! These structs are embedded in the `craftbots.yaml` configuration and
//! every field has a default, so a partial (or missing) file still yields a
//! complete configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for `MinerBot` and its strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerSettings {
    /// Strategy selected at startup (`grid` or `vertical`).
    pub strategy: String,
    /// Stride of the grid scan.
    pub grid_spacing: u32,
    /// Edge length of the grid scan cube.
    pub grid_size: u32,
    /// Lowest y the vertical drill reaches.
    pub vertical_floor_y: i32,
    /// The miner reports a dead end instead of descending below this y.
    pub floor_y: i32,
}

impl Default for MinerSettings {
    fn default() -> Self {
        Self {
            strategy: "grid".to_owned(),
            grid_spacing: 1,
            grid_size: 4,
            vertical_floor_y: 6,
            floor_y: 6,
        }
    }
}

/// Settings for `BuilderBot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderSettings {
    /// Plan selected at startup.
    pub plan: String,
    /// Directory scanned for extra `*.csv` plans.
    pub plans_dir: Option<PathBuf>,
    /// Minimum gap between two material requests, in milliseconds.
    pub request_cooldown_ms: u64,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            plan: "platform".to_owned(),
            plans_dir: None,
            request_cooldown_ms: 2000,
        }
    }
}

/// Settings for `ExplorerBot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerSettings {
    /// Scan ranges cycled by `explorer switchrange`.
    pub ranges: Vec<u32>,
    /// Consecutive equal-height columns that make a flat run.
    pub flat_run: u32,
    /// Half width of the perpendicular confirmation cross.
    pub cross_half_width: u32,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            ranges: vec![40, 20, 80],
            flat_run: 7,
            cross_half_width: 3,
        }
    }
}

/// Everything the agent factories need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Miner settings.
    pub mining: MinerSettings,
    /// Builder settings.
    pub building: BuilderSettings,
    /// Explorer settings.
    pub exploration: ExplorerSettings,
    /// Place wool markers and announce them in chat.
    pub markers: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            mining: MinerSettings::default(),
            building: BuilderSettings::default(),
            exploration: ExplorerSettings::default(),
            markers: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = AgentSettings::default();
        assert_eq!(s.mining.grid_spacing, 1);
        assert_eq!(s.mining.grid_size, 4);
        assert_eq!(s.mining.vertical_floor_y, 6);
        assert_eq!(s.building.request_cooldown_ms, 2000);
        assert_eq!(s.exploration.ranges, vec![40, 20, 80]);
        assert_eq!(s.exploration.flat_run, 7);
        assert!(s.markers);
    }
}
