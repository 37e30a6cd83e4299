//! Shared type definitions for the craftbots multi-agent system.
//!
//! This crate is the single source of truth for the data that flows between
//! agents, the message bus and the world: materials, positions, FSM states
//! and the message record itself.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers (message and subscription ids)
//! - [`enums`] -- [`Material`] and [`AgentState`]
//! - [`structs`] -- Positions, planned blocks, transitions, checkpoints
//! - [`message`] -- The bus message record, message kinds and typed payloads
//! - [`error`] -- Parse and validation errors

pub mod enums;
pub mod error;
pub mod ids;
pub mod message;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AgentState, Material};
pub use error::{MessageError, TypeError};
pub use ids::{MessageId, SubscriptionId};
pub use message::{
    BROADCAST_TARGET, BuildCompletePayload, BuildProgressPayload, InventoryPayload, MapPayload,
    Message, REQUIRED_FIELDS, RequirementsPayload, STATUS_SUCCESS, kinds, now_timestamp,
};
pub use structs::{
    ChatPost, Checkpoint, Inventory, PlannedBlock, Position, Requirements, StateTransition,
};
