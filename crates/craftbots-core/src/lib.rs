//! Configuration, chat commands and orchestration for craftbots.
//!
//! This crate wires the agents of `craftbots-agents` into one running
//! system around a shared bus and world, and turns chat lines into agent
//! commands.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `craftbots.yaml` with
//!   environment overrides.
//! - [`commands`] -- Chat command parsing and longest-prefix dispatch.
//! - [`error`] -- [`SystemError`] and [`CommandError`].
//! - [`system`] -- [`AgentSystem`]: agent startup, built-in commands, the
//!   workflow run and shutdown.
//!
//! [`SystemError`]: error::SystemError
//! [`CommandError`]: error::CommandError
//! [`AgentSystem`]: system::AgentSystem

pub mod commands;
pub mod config;
pub mod error;
pub mod system;

pub use commands::{ChatCommand, CommandDispatcher, Dispatch, Handler};
pub use config::{ConfigError, CraftbotsConfig, LoggingConfig, RuntimeConfig, WorldConfig};
pub use error::{CommandError, SystemError};
pub use system::{AgentSystem, SYSTEM_SOURCE};
