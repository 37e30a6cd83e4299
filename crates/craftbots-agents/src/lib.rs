//! Agents, their runtime, mining strategies and build plans.
//!
//! Three agents cooperate only through the message bus: `ExplorerBot` finds
//! a flat zone, `BuilderBot` turns its selected plan into material
//! requirements and places blocks, and `MinerBot` mines exactly what the
//! builder asked for.
//!
//! # Modules
//!
//! - [`runtime`] -- [`Agent`] trait, [`AgentContext`] and the per-agent
//!   tick thread behind [`AgentHandle`].
//! - [`fsm`] -- Lifecycle commands and the state machine.
//! - [`control`] -- Pause, stop and shutdown signals.
//! - [`explorer`], [`miner`], [`builder`] -- The three agents.
//! - [`mining`] -- Grid and vertical mining strategies.
//! - [`plans`] -- Built-in and CSV build plans.
//! - [`registry`] -- Agent factories by name.
//! - [`inventory`] -- Checked inventory arithmetic.
//! - [`command`] -- Command arguments.
//! - [`catalog`] -- Cyclic name selection shared by strategies and plans.
//! - [`config`] -- Agent tunables.
//! - [`error`] -- [`AgentError`].

pub mod builder;
pub mod catalog;
pub mod command;
pub mod config;
pub mod control;
pub mod error;
pub mod explorer;
pub mod fsm;
pub mod inventory;
pub mod miner;
pub mod mining;
pub mod plans;
pub mod registry;
pub mod runtime;

pub use builder::{BUILDER, BuilderBot};
pub use command::{ArgValue, CommandArgs};
pub use config::{AgentSettings, BuilderSettings, ExplorerSettings, MinerSettings};
pub use control::Control;
pub use error::AgentError;
pub use explorer::{EXPLORER, ExplorerBot};
pub use fsm::{LifecycleCommand, StateMachine};
pub use miner::{MINER, MinerBot};
pub use mining::{MiningOutcome, MiningStrategy, StrategyRegistry};
pub use plans::{BuildPlan, PlanRegistry};
pub use registry::{AGENTS, AgentEntry};
pub use runtime::{
    Agent, AgentContext, AgentDeps, AgentHandle, AgentStatus, DEFAULT_JOIN_TIMEOUT,
    DEFAULT_TICK_INTERVAL, SystemFlags,
};
