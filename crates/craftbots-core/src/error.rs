//! Error types for the craftbots-core crate.

use craftbots_agents::AgentError;
use craftbots_events::BusError;
use craftbots_world::WorldError;

use crate::config::ConfigError;

/// Errors raised while registering chat command handlers.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Command names must be non-empty lowercase words separated by single
    /// spaces.
    #[error("invalid command name {0:?}")]
    InvalidName(String),

    /// A handler is already registered under this name.
    #[error("command {0:?} is already registered")]
    Duplicate(String),
}

/// Errors from starting, driving or stopping the agent system.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// An agent operation failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The bus could not be started or refused a message.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// A world call failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Built-in command registration failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// An agent the system depends on is not registered.
    #[error("agent {0} is not running in this system")]
    MissingAgent(String),
}
