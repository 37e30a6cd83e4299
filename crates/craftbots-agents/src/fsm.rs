//! The per-agent finite state machine.
//!
//! [`StateMachine::set_state`] is the only mutator of the state and always
//! records a [`StateTransition`]. Operator commands go through
//! [`StateMachine::apply`], which validates them first:
//!
//! | Command  | From                              | To      |
//! |----------|-----------------------------------|---------|
//! | `start`  | IDLE, WAITING                     | RUNNING |
//! | `pause`  | RUNNING                           | PAUSED  |
//! | `resume` | PAUSED                            | RUNNING |
//! | `stop`   | IDLE, RUNNING, PAUSED, WAITING    | STOPPED |
//! | `reset`  | any                               | IDLE    |

use std::collections::VecDeque;

use chrono::Utc;
use craftbots_types::{AgentState, Checkpoint, StateTransition};
use tracing::{info, warn};

use crate::error::AgentError;

/// Transitions kept for status queries.
pub const HISTORY_LIMIT: usize = 64;

/// A lifecycle command that changes FSM state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Begin active work.
    Start,
    /// Suspend active work, keeping a checkpoint.
    Pause,
    /// Continue after a pause.
    Resume,
    /// Stop for good.
    Stop,
    /// Return to IDLE from anything.
    Reset,
}

impl LifecycleCommand {
    /// Command name, also used as the transition reason.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Reset => "reset",
        }
    }

    /// Parse a command name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "pause" => Some(Self::Pause),
            "resume" => Some(Self::Resume),
            "stop" => Some(Self::Stop),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }

    /// State this command leads to from `from`, or `None` if invalid.
    pub const fn target(self, from: AgentState) -> Option<AgentState> {
        match (self, from) {
            (Self::Start, AgentState::Idle | AgentState::Waiting)
            | (Self::Resume, AgentState::Paused) => Some(AgentState::Running),
            (Self::Pause, AgentState::Running) => Some(AgentState::Paused),
            (
                Self::Stop,
                AgentState::Idle | AgentState::Running | AgentState::Paused | AgentState::Waiting,
            ) => Some(AgentState::Stopped),
            (Self::Reset, _) => Some(AgentState::Idle),
            _ => None,
        }
    }
}

/// State, reason, checkpoint and bounded transition history of one agent.
#[derive(Debug, Clone)]
pub struct StateMachine {
    agent: String,
    state: AgentState,
    reason: String,
    checkpoint: Option<Checkpoint>,
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// A machine in IDLE.
    pub fn new(agent: impl Into<String>) -> Self {
        let agent = agent.into();
        info!(agent = %agent, state = %AgentState::Idle, "agent initialized");
        Self {
            agent,
            state: AgentState::Idle,
            reason: "created".to_owned(),
            checkpoint: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    /// Current state.
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// Reason given for the last transition.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Last saved checkpoint.
    pub const fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    /// Recorded transitions, oldest first.
    pub const fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Move to `to`, recording and logging the transition.
    pub fn set_state(&mut self, to: AgentState, reason: impl Into<String>) -> StateTransition {
        let reason = reason.into();
        let transition = StateTransition {
            agent: self.agent.clone(),
            from: self.state,
            to,
            reason: reason.clone(),
            timestamp: Utc::now(),
        };
        info!(
            agent = %self.agent,
            from = %transition.from,
            to = %to,
            reason = %reason,
            "state transition"
        );
        self.state = to;
        self.reason = reason;
        if self.history.len() >= HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(transition.clone());
        transition
    }

    /// Save a checkpoint of the current state.
    pub fn save_checkpoint(&mut self) {
        self.checkpoint = Some(Checkpoint::now(self.state));
    }

    /// Apply a validated lifecycle command.
    ///
    /// An invalid command is logged as a warning and returned as
    /// [`AgentError::InvalidTransition`] without changing anything.
    pub fn apply(&mut self, command: LifecycleCommand) -> Result<StateTransition, AgentError> {
        let Some(to) = command.target(self.state) else {
            warn!(
                agent = %self.agent,
                command = command.name(),
                state = %self.state,
                "ignoring invalid lifecycle command"
            );
            return Err(AgentError::InvalidTransition {
                command: command.name().to_owned(),
                state: self.state,
            });
        };

        match command {
            LifecycleCommand::Pause | LifecycleCommand::Stop => self.save_checkpoint(),
            LifecycleCommand::Resume => match &self.checkpoint {
                Some(cp) => info!(
                    agent = %self.agent,
                    state = %cp.state,
                    saved_at = %cp.timestamp,
                    "restoring checkpoint"
                ),
                None => warn!(agent = %self.agent, "no checkpoint to restore"),
            },
            LifecycleCommand::Start | LifecycleCommand::Reset => {}
        }

        Ok(self.set_state(to, command.name()))
    }
}
