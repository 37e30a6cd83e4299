//! Enumeration types shared across the workspace.
//!
//! [`Material`] is the closed set of block kinds the agents read, harvest and
//! place; [`AgentState`] is the finite-state-machine state every agent is in.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

// ---------------------------------------------------------------------------
// Materials
// ---------------------------------------------------------------------------

/// A block kind in the world.
///
/// Each variant maps to the block id used by the Minecraft Pi protocol.
/// Names serialize in `snake_case` (`"wood_planks"`, `"coal_ore"`), which is
/// also the form used in message payloads and plan files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// Empty space.
    Air,
    /// Smooth stone.
    Stone,
    /// Grass-topped dirt. Harvests into [`Material::Dirt`].
    Grass,
    /// Plain dirt.
    Dirt,
    /// Cobblestone.
    Cobblestone,
    /// Wooden planks.
    WoodPlanks,
    /// Unbreakable floor of the world.
    Bedrock,
    /// Sand.
    Sand,
    /// Gravel.
    Gravel,
    /// Gold ore.
    GoldOre,
    /// Iron ore.
    IronOre,
    /// Coal ore.
    CoalOre,
    /// Tree trunk.
    Wood,
    /// Lapis lazuli ore.
    LapisOre,
    /// Sandstone.
    Sandstone,
    /// Coloured wool, used for position markers.
    Wool,
    /// Diamond ore.
    DiamondOre,
    /// Redstone ore.
    RedstoneOre,
}

impl Material {
    /// Every material, in block id order.
    pub const ALL: [Self; 18] = [
        Self::Air,
        Self::Stone,
        Self::Grass,
        Self::Dirt,
        Self::Cobblestone,
        Self::WoodPlanks,
        Self::Bedrock,
        Self::Sand,
        Self::Gravel,
        Self::GoldOre,
        Self::IronOre,
        Self::CoalOre,
        Self::Wood,
        Self::LapisOre,
        Self::Sandstone,
        Self::Wool,
        Self::DiamondOre,
        Self::RedstoneOre,
    ];

    /// Block id of this material in the Minecraft Pi protocol.
    pub const fn block_id(self) -> u16 {
        match self {
            Self::Air => 0,
            Self::Stone => 1,
            Self::Grass => 2,
            Self::Dirt => 3,
            Self::Cobblestone => 4,
            Self::WoodPlanks => 5,
            Self::Bedrock => 7,
            Self::Sand => 12,
            Self::Gravel => 13,
            Self::GoldOre => 14,
            Self::IronOre => 15,
            Self::CoalOre => 16,
            Self::Wood => 17,
            Self::LapisOre => 21,
            Self::Sandstone => 24,
            Self::Wool => 35,
            Self::DiamondOre => 56,
            Self::RedstoneOre => 73,
        }
    }

    /// Look up a material by block id. Unknown ids return `None`.
    pub const fn from_block_id(id: u16) -> Option<Self> {
        match id {
            0 => Some(Self::Air),
            1 => Some(Self::Stone),
            2 => Some(Self::Grass),
            3 => Some(Self::Dirt),
            4 => Some(Self::Cobblestone),
            5 => Some(Self::WoodPlanks),
            7 => Some(Self::Bedrock),
            12 => Some(Self::Sand),
            13 => Some(Self::Gravel),
            14 => Some(Self::GoldOre),
            15 => Some(Self::IronOre),
            16 => Some(Self::CoalOre),
            17 => Some(Self::Wood),
            21 => Some(Self::LapisOre),
            24 => Some(Self::Sandstone),
            35 => Some(Self::Wool),
            56 => Some(Self::DiamondOre),
            73 => Some(Self::RedstoneOre),
            _ => None,
        }
    }

    /// The `snake_case` name used on the wire and in plan files.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Stone => "stone",
            Self::Grass => "grass",
            Self::Dirt => "dirt",
            Self::Cobblestone => "cobblestone",
            Self::WoodPlanks => "wood_planks",
            Self::Bedrock => "bedrock",
            Self::Sand => "sand",
            Self::Gravel => "gravel",
            Self::GoldOre => "gold_ore",
            Self::IronOre => "iron_ore",
            Self::CoalOre => "coal_ore",
            Self::Wood => "wood",
            Self::LapisOre => "lapis_ore",
            Self::Sandstone => "sandstone",
            Self::Wool => "wool",
            Self::DiamondOre => "diamond_ore",
            Self::RedstoneOre => "redstone_ore",
        }
    }

    /// What harvesting a block of this material yields.
    ///
    /// Air, bedrock and marker wool yield nothing. Grass yields dirt. Every
    /// other material yields one unit of itself.
    pub const fn harvest_yield(self) -> Option<Self> {
        match self {
            Self::Air | Self::Bedrock | Self::Wool => None,
            Self::Grass => Some(Self::Dirt),
            other => Some(other),
        }
    }

    /// Whether the block can be broken by a mining strategy.
    pub const fn is_breakable(self) -> bool {
        !matches!(self, Self::Air | Self::Bedrock)
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Material {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| TypeError::UnknownMaterial(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Agent state
// ---------------------------------------------------------------------------

/// The finite-state-machine state of an agent.
///
/// Exactly one state is active per agent at any instant. [`Stopped`] and
/// [`Error`] are terminal for normal operation.
///
/// [`Stopped`]: AgentState::Stopped
/// [`Error`]: AgentState::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    /// Created or reset, not doing anything.
    Idle,
    /// Actively ticking perceive, decide, act.
    Running,
    /// Suspended by an operator; ticks are skipped.
    Paused,
    /// Blocked on an external condition; still ticks to react to messages.
    Waiting,
    /// Stopped for good (until an explicit reset).
    Stopped,
    /// Halted by an unhandled fault.
    Error,
}

impl AgentState {
    /// Upper-case name used in logs and status output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Waiting => "WAITING",
            Self::Stopped => "STOPPED",
            Self::Error => "ERROR",
        }
    }

    /// `true` for the states that release world claims on entry.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }

    /// `true` for the states in which the tick loop runs the agent cycle.
    pub const fn is_ticking(self) -> bool {
        matches!(self, Self::Running | Self::Waiting)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_ids_round_trip_for_every_material() {
        for material in Material::ALL {
            assert_eq!(Material::from_block_id(material.block_id()), Some(material));
        }
    }

    #[test]
    fn unknown_block_id_is_none() {
        assert_eq!(Material::from_block_id(999), None);
        assert_eq!(Material::from_block_id(6), None);
    }

    #[test]
    fn grass_harvests_into_dirt() {
        assert_eq!(Material::Grass.harvest_yield(), Some(Material::Dirt));
        assert_eq!(Material::Stone.harvest_yield(), Some(Material::Stone));
        assert_eq!(Material::Air.harvest_yield(), None);
        assert_eq!(Material::Bedrock.harvest_yield(), None);
    }

    #[test]
    fn parse_material_names() {
        assert_eq!("stone".parse::<Material>().ok(), Some(Material::Stone));
        assert_eq!(" Wood_Planks ".parse::<Material>().ok(), Some(Material::WoodPlanks));
        assert!("obsidian".parse::<Material>().is_err());
    }

    #[test]
    fn material_serializes_snake_case() {
        let json = serde_json::to_string(&Material::CoalOre).unwrap_or_default();
        assert_eq!(json, "\"coal_ore\"");
    }

    #[test]
    fn terminal_and_ticking_states() {
        assert!(AgentState::Stopped.is_terminal());
        assert!(AgentState::Error.is_terminal());
        assert!(!AgentState::Paused.is_terminal());
        assert!(AgentState::Running.is_ticking());
        assert!(AgentState::Waiting.is_ticking());
        assert!(!AgentState::Paused.is_ticking());
        assert!(!AgentState::Idle.is_ticking());
    }

    #[test]
    fn agent_state_serializes_upper_case() {
        let json = serde_json::to_string(&AgentState::Waiting).unwrap_or_default();
        assert_eq!(json, "\"WAITING\"");
        assert_eq!(AgentState::Running.to_string(), "RUNNING");
    }
}
