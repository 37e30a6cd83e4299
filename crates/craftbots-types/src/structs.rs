//! Core data structs: positions, planned blocks, transitions and checkpoints.
//!
//! Inventories and requirements are plain ordered maps from [`Material`] to
//! an unsigned quantity, so "never negative" holds by construction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{AgentState, Material};

/// Quantities held by an agent, keyed by material.
pub type Inventory = BTreeMap<Material, u32>;

/// Quantities required by a plan or requested by another agent.
pub type Requirements = BTreeMap<Material, u32>;

/// An integer block coordinate in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// East-west axis.
    pub x: i32,
    /// Height.
    pub y: i32,
    /// North-south axis.
    pub z: i32,
}

impl Position {
    /// Build a position from its three coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Offset this position, saturating at the `i32` bounds.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    /// The same column one block higher.
    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One entry of a generated build plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedBlock {
    /// Absolute world position to place the block at.
    pub position: Position,
    /// Material to place.
    pub material: Material,
}

/// A recorded FSM transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Name of the agent that transitioned.
    pub agent: String,
    /// State before the transition.
    pub from: AgentState,
    /// State after the transition.
    pub to: AgentState,
    /// Why the transition happened (command name, fault text, ...).
    pub reason: String,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

/// Snapshot saved before pausing or stopping, restored on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// State at the time the checkpoint was taken.
    pub state: AgentState,
    /// When the checkpoint was taken.
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    /// Take a checkpoint of `state` now.
    pub fn now(state: AgentState) -> Self {
        Self {
            state,
            timestamp: Utc::now(),
        }
    }
}

/// A chat line read back from the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPost {
    /// Entity id of the poster, when the server reports one.
    pub entity_id: Option<i64>,
    /// Raw message text.
    pub message: String,
}
