//! Error types for the craftbots-agents crate.
//!
//! All operations that can fail return typed errors rather than panicking.
//! A tick that returns one of these moves the agent into ERROR.

use std::path::PathBuf;

use craftbots_events::BusError;
use craftbots_types::{AgentState, Material, MessageError};
use craftbots_world::WorldError;

/// Errors that can occur in agent, strategy and plan operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Attempted to remove more of a material than the inventory holds.
    #[error("insufficient material: wanted {requested} of {material} but only have {available}")]
    InsufficientMaterial {
        /// The material being removed.
        material: Material,
        /// The quantity the caller attempted to remove.
        requested: u32,
        /// The quantity actually held.
        available: u32,
    },

    /// An arithmetic overflow occurred.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },

    /// A lifecycle command is not valid from the current state.
    #[error("cannot {command} from state {state}")]
    InvalidTransition {
        /// The rejected command.
        command: String,
        /// The state the agent was in.
        state: AgentState,
    },

    /// No mining strategy with this name or index.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// No build plan with this name or index.
    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    /// No agent type with this name in the registry.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// The agent has no command with this name.
    #[error("{agent} does not handle `{command}`")]
    UnknownCommand {
        /// Agent the command was sent to.
        agent: String,
        /// The unhandled command.
        command: String,
    },

    /// A command argument was missing or had the wrong type.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A plan file could not be read.
    #[error("failed to load plan {path}: {reason}")]
    PlanLoad {
        /// File that failed.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The agent thread could not be spawned.
    #[error("failed to spawn agent thread: {source}")]
    Spawn {
        /// Underlying OS error.
        #[from]
        source: std::io::Error,
    },

    /// A world call failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Publishing on the bus failed.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// A message could not be built or decoded.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// A panic was caught inside an agent callback.
    #[error("agent panicked: {0}")]
    Panicked(String),
}
