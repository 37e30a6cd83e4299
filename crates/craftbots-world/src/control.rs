//! The world-control interface and its shared, lock-protected handle.
//!
//! Agents run on separate threads but the game connection is a single
//! stream, so every call goes through [`SharedWorld`], which takes one mutex
//! for exactly one external call.

use std::sync::{Arc, Mutex};

use craftbots_types::{ChatPost, Material, Position};

use crate::error::WorldError;

/// Operations the agents need from the game world.
pub trait WorldControl: Send {
    /// Block id at `pos`.
    fn get_block(&mut self, pos: Position) -> Result<u16, WorldError>;

    /// Place block `block` (with optional data value) at `pos`.
    fn set_block(&mut self, pos: Position, block: u16, data: Option<u8>) -> Result<(), WorldError>;

    /// Y of the highest non-air block in column (`x`, `z`).
    fn get_height(&mut self, x: i32, z: i32) -> Result<i32, WorldError>;

    /// Tile position of the player.
    fn player_position(&mut self) -> Result<Position, WorldError>;

    /// Post a line to the in-game chat.
    fn post_chat(&mut self, text: &str) -> Result<(), WorldError>;

    /// Chat lines posted by players since the last poll.
    fn poll_chat(&mut self) -> Result<Vec<ChatPost>, WorldError> {
        Ok(Vec::new())
    }
}

/// Cloneable handle that serializes all world access behind one mutex.
#[derive(Clone)]
pub struct SharedWorld {
    inner: Arc<Mutex<Box<dyn WorldControl>>>,
}

impl core::fmt::Debug for SharedWorld {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedWorld").finish_non_exhaustive()
    }
}

impl SharedWorld {
    /// Wrap a world implementation.
    pub fn new(world: impl WorldControl + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(world))),
        }
    }

    fn call<T>(
        &self,
        f: impl FnOnce(&mut dyn WorldControl) -> Result<T, WorldError>,
    ) -> Result<T, WorldError> {
        let mut guard = self.inner.lock().map_err(|_poisoned| WorldError::LockPoisoned)?;
        f(guard.as_mut())
    }

    /// Block id at `pos`.
    pub fn get_block(&self, pos: Position) -> Result<u16, WorldError> {
        self.call(|w| w.get_block(pos))
    }

    /// Material at `pos`, or `None` for ids outside the known set.
    pub fn get_material(&self, pos: Position) -> Result<Option<Material>, WorldError> {
        self.get_block(pos).map(Material::from_block_id)
    }

    /// Place a raw block id.
    pub fn set_block(&self, pos: Position, block: u16, data: Option<u8>) -> Result<(), WorldError> {
        self.call(|w| w.set_block(pos, block, data))
    }

    /// Place a material.
    pub fn set_material(&self, pos: Position, material: Material) -> Result<(), WorldError> {
        self.set_block(pos, material.block_id(), None)
    }

    /// Y of the highest non-air block in a column.
    pub fn get_height(&self, x: i32, z: i32) -> Result<i32, WorldError> {
        self.call(|w| w.get_height(x, z))
    }

    /// Tile position of the player.
    // A method path is not general over the trait object's lifetime.
    #[allow(clippy::redundant_closure_for_method_calls)]
    pub fn player_position(&self) -> Result<Position, WorldError> {
        self.call(|w| w.player_position())
    }

    /// Post a chat line.
    pub fn post_chat(&self, text: &str) -> Result<(), WorldError> {
        self.call(|w| w.post_chat(text))
    }

    /// Drain incoming chat lines.
    // A method path is not general over the trait object's lifetime.
    #[allow(clippy::redundant_closure_for_method_calls)]
    pub fn poll_chat(&self) -> Result<Vec<ChatPost>, WorldError> {
        self.call(|w| w.poll_chat())
    }
}
