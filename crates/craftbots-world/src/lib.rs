//! The world the craftbots agents act on.
//!
//! Agents see the game only through the [`WorldControl`] trait, always via a
//! [`SharedWorld`] handle that serializes calls behind one mutex. Two
//! implementations ship with the crate: a [`McpiConnection`] to a real game
//! server and a deterministic [`MemoryWorld`].
//!
//! # Modules
//!
//! - [`control`] -- The [`WorldControl`] trait and the [`SharedWorld`] handle.
//! - [`claims`] -- [`ClaimRegistry`] of per-agent anchor positions.
//! - [`memory`] -- In-memory terrain for tests and offline runs.
//! - [`mcpi`] -- TCP client for the Minecraft Pi text protocol.
//! - [`markers`] -- Wool markers and chat announcements.
//! - [`error`] -- Error types for world access.

pub mod claims;
pub mod control;
pub mod error;
pub mod markers;
pub mod mcpi;
pub mod memory;

// Re-export primary types at crate root.
pub use claims::ClaimRegistry;
pub use control::{SharedWorld, WorldControl};
pub use error::WorldError;
pub use markers::{colors, mark, place_marker};
pub use mcpi::{DEFAULT_PORT, McpiConnection};
pub use memory::{ChatHandle, MemoryWorld};
