//! Coloured wool markers that show where agents are working.

use craftbots_types::{Material, Position};

use crate::control::SharedWorld;
use crate::error::WorldError;

/// Wool data values used by the agents.
pub mod colors {
    /// Miner anchor marker.
    pub const ORANGE: u8 = 1;
    /// Builder site marker.
    pub const LIME: u8 = 5;
    /// Explorer scan marker.
    pub const BLUE: u8 = 11;
}

/// Place a wool block of `color` at `pos`.
pub fn place_marker(world: &SharedWorld, pos: Position, color: u8) -> Result<(), WorldError> {
    world.set_block(pos, Material::Wool.block_id(), Some(color))
}

/// Place a marker and announce it in chat as `[label]`.
pub fn mark(world: &SharedWorld, pos: Position, color: u8, label: &str) -> Result<(), WorldError> {
    place_marker(world, pos, color)?;
    world.post_chat(&format!("[{label}] marker placed at {pos}"))
}
