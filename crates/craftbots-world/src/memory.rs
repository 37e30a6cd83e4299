//! In-memory world used by tests and offline runs.
//!
//! Terrain is generated from a per-column surface height: bedrock at and
//! below y = 0, stone up to three blocks under the surface, dirt, then a
//! grass top. Explicit block writes override the generated terrain.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use craftbots_types::{ChatPost, Material, Position};

use crate::control::WorldControl;
use crate::error::WorldError;

/// Lowest y the height scan will look at.
const MIN_Y: i32 = -64;

/// Dirt layers between the grass top and the stone below.
const DIRT_DEPTH: i32 = 3;

/// Shared view of the chat traffic of a [`MemoryWorld`].
#[derive(Debug, Clone, Default)]
pub struct ChatHandle {
    inner: Arc<Mutex<ChatLog>>,
}

#[derive(Debug, Default)]
struct ChatLog {
    posted: Vec<String>,
    incoming: VecDeque<ChatPost>,
}

impl ChatHandle {
    /// Every line posted to chat so far.
    pub fn posted(&self) -> Vec<String> {
        self.lock().posted.clone()
    }

    /// Whether any posted line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lock().posted.iter().any(|line| line.contains(needle))
    }

    /// Queue a line as if a player typed it.
    pub fn say(&self, text: impl Into<String>) {
        self.lock().incoming.push_back(ChatPost {
            entity_id: None,
            message: text.into(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChatLog> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A deterministic block world held in memory.
#[derive(Debug, Clone)]
pub struct MemoryWorld {
    default_surface: i32,
    surfaces: BTreeMap<(i32, i32), i32>,
    blocks: BTreeMap<Position, u16>,
    data: BTreeMap<Position, u8>,
    player: (i32, i32),
    chat: ChatHandle,
}

impl MemoryWorld {
    /// A flat world whose grass top sits at `surface_y` everywhere, with the
    /// player at the origin column.
    pub fn flat(surface_y: i32) -> Self {
        Self {
            default_surface: surface_y,
            surfaces: BTreeMap::new(),
            blocks: BTreeMap::new(),
            data: BTreeMap::new(),
            player: (0, 0),
            chat: ChatHandle::default(),
        }
    }

    /// Override the surface height of one column.
    #[must_use]
    pub fn with_surface(mut self, x: i32, z: i32, surface_y: i32) -> Self {
        self.surfaces.insert((x, z), surface_y);
        self
    }

    /// Place a block before the world is shared.
    #[must_use]
    pub fn with_block(mut self, pos: Position, material: Material) -> Self {
        self.blocks.insert(pos, material.block_id());
        self
    }

    /// Move the player to column (`x`, `z`).
    #[must_use]
    pub const fn with_player(mut self, x: i32, z: i32) -> Self {
        self.player = (x, z);
        self
    }

    /// Handle onto this world's chat traffic. Stays valid after the world is
    /// moved into a [`SharedWorld`](crate::SharedWorld).
    pub fn chat(&self) -> ChatHandle {
        self.chat.clone()
    }

    fn surface(&self, x: i32, z: i32) -> i32 {
        self.surfaces
            .get(&(x, z))
            .copied()
            .unwrap_or(self.default_surface)
    }

    fn natural_block(&self, pos: Position) -> Material {
        let surface = self.surface(pos.x, pos.z);
        if pos.y <= 0 {
            Material::Bedrock
        } else if pos.y > surface {
            Material::Air
        } else if pos.y == surface {
            Material::Grass
        } else if pos.y >= surface.saturating_sub(DIRT_DEPTH) {
            Material::Dirt
        } else {
            Material::Stone
        }
    }

    fn block_at(&self, pos: Position) -> u16 {
        self.blocks
            .get(&pos)
            .copied()
            .unwrap_or_else(|| self.natural_block(pos).block_id())
    }

    fn height_at(&self, x: i32, z: i32) -> i32 {
        let placed_top = self
            .blocks
            .iter()
            .filter(|(p, id)| p.x == x && p.z == z && **id != Material::Air.block_id())
            .map(|(p, _)| p.y)
            .max();
        let surface = self.surface(x, z);
        let mut y = placed_top.map_or(surface, |top| top.max(surface));
        while y > MIN_Y {
            if self.block_at(Position::new(x, y, z)) != Material::Air.block_id() {
                return y;
            }
            y = y.saturating_sub(1);
        }
        MIN_Y
    }
}

impl WorldControl for MemoryWorld {
    fn get_block(&mut self, pos: Position) -> Result<u16, WorldError> {
        Ok(self.block_at(pos))
    }

    fn set_block(&mut self, pos: Position, block: u16, data: Option<u8>) -> Result<(), WorldError> {
        self.blocks.insert(pos, block);
        match data {
            Some(value) => self.data.insert(pos, value),
            None => self.data.remove(&pos),
        };
        Ok(())
    }

    fn get_height(&mut self, x: i32, z: i32) -> Result<i32, WorldError> {
        Ok(self.height_at(x, z))
    }

    fn player_position(&mut self) -> Result<Position, WorldError> {
        let (x, z) = self.player;
        let feet = self
            .height_at(x, z)
            .checked_add(1)
            .ok_or(WorldError::ArithmeticOverflow)?;
        Ok(Position::new(x, feet, z))
    }

    fn post_chat(&mut self, text: &str) -> Result<(), WorldError> {
        self.chat.lock().posted.push(text.to_owned());
        Ok(())
    }

    fn poll_chat(&mut self) -> Result<Vec<ChatPost>, WorldError> {
        Ok(self.chat.lock().incoming.drain(..).collect())
    }
}
