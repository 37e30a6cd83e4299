//! The agent runtime: one OS thread per agent ticking a shared FSM.
//!
//! An agent is split in two halves:
//!
//! - [`AgentContext`] holds everything other threads may touch without
//!   waiting for a tick to finish: the FSM, the control signals, and the
//!   shared bus, world and claim handles.
//! - The [`Agent`] behavior holds the agent's own mutable fields (inventory,
//!   zone, plan, strategy). It sits behind a per-agent mutex that both the
//!   tick thread and command handlers take.
//!
//! Bus callbacks never take the behavior lock. They push addressed messages
//! into a `flume` inbox that the tick thread drains at the start of every
//! iteration, so delivery never waits on a busy agent.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use craftbots_events::{DeliveryError, MessageBus, panic_text};
use craftbots_types::{
    AgentState, Checkpoint, Message, MessageId, Position, StateTransition, SubscriptionId,
};
use craftbots_world::{ClaimRegistry, SharedWorld};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::command::CommandArgs;
use crate::control::Control;
use crate::error::AgentError;
use crate::fsm::{LifecycleCommand, StateMachine};

/// Default gap between two ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Default bound on joining an agent thread.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

const JOIN_POLL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Shared handles
// ---------------------------------------------------------------------------

/// System-wide switches read by every agent.
#[derive(Debug, Clone, Default)]
pub struct SystemFlags {
    workflow: Arc<AtomicBool>,
}

impl SystemFlags {
    /// Flags with workflow mode off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether agents should auto-advance through the explore, mine and build
    /// pipeline.
    pub fn workflow_mode(&self) -> bool {
        self.workflow.load(Ordering::Acquire)
    }

    /// Turn workflow mode on or off.
    pub fn set_workflow_mode(&self, enabled: bool) {
        self.workflow.store(enabled, Ordering::Release);
    }
}

/// The shared collaborators every agent is built with.
#[derive(Debug, Clone)]
pub struct AgentDeps {
    /// Broadcast bus.
    pub bus: MessageBus,
    /// World behind its single lock.
    pub world: SharedWorld,
    /// Position claims on the world.
    pub claims: ClaimRegistry,
    /// System-wide switches.
    pub flags: SystemFlags,
}

// ---------------------------------------------------------------------------
// AgentContext
// ---------------------------------------------------------------------------

/// The thread-safe half of an agent.
#[derive(Debug)]
pub struct AgentContext {
    name: String,
    fsm: Mutex<StateMachine>,
    control: Control,
    deps: AgentDeps,
}

impl AgentContext {
    /// A context in IDLE with all signals clear.
    pub fn new(name: impl Into<String>, deps: AgentDeps) -> Self {
        let name = name.into();
        Self {
            fsm: Mutex::new(StateMachine::new(name.clone())),
            name,
            control: Control::new(),
            deps,
        }
    }

    fn machine(&self) -> std::sync::MutexGuard<'_, StateMachine> {
        self.fsm.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Agent name, also its routing target.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current FSM state.
    pub fn state(&self) -> AgentState {
        self.machine().state()
    }

    /// Reason for the last transition.
    pub fn reason(&self) -> String {
        self.machine().reason().to_owned()
    }

    /// Last saved checkpoint.
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.machine().checkpoint().copied()
    }

    /// Recorded transitions, oldest first.
    pub fn history(&self) -> Vec<StateTransition> {
        self.machine().history().iter().cloned().collect()
    }

    /// Control signals.
    pub const fn control(&self) -> &Control {
        &self.control
    }

    /// The shared bus.
    pub const fn bus(&self) -> &MessageBus {
        &self.deps.bus
    }

    /// The shared world.
    pub const fn world(&self) -> &SharedWorld {
        &self.deps.world
    }

    /// The shared claim registry.
    pub const fn claims(&self) -> &ClaimRegistry {
        &self.deps.claims
    }

    /// Whether workflow mode is on.
    pub fn workflow_mode(&self) -> bool {
        self.deps.flags.workflow_mode()
    }

    /// Move to `to` unconditionally.
    ///
    /// Entering STOPPED or ERROR releases this agent's world claims and raises
    /// the stop signal so in-flight strategy loops unwind.
    pub fn set_state(&self, to: AgentState, reason: impl Into<String>) -> StateTransition {
        let transition = self.machine().set_state(to, reason);
        if to.is_terminal() {
            self.release_resources();
        }
        transition
    }

    /// Move to `to` only while the state is one of `expected`.
    ///
    /// The check and the move happen under one FSM lock, so a transition
    /// decided on a tick never overwrites a lifecycle command that landed
    /// in between. Returns `None` when the state had already moved on.
    pub fn transition_if(
        &self,
        expected: &[AgentState],
        to: AgentState,
        reason: impl Into<String>,
    ) -> Option<StateTransition> {
        let transition = {
            let mut machine = self.machine();
            let current = machine.state();
            if !expected.contains(&current) {
                debug!(agent = %self.name, from = %current, to = %to, "transition skipped");
                return None;
            }
            machine.set_state(to, reason)
        };
        if to.is_terminal() {
            self.release_resources();
        }
        Some(transition)
    }

    /// Claim `position` for this agent only while the state is one of
    /// `expected` and no stop is raised.
    ///
    /// The claim is taken under the FSM lock. A stop applied afterwards
    /// releases it, so no claim outlives a terminal transition.
    pub fn claim_while(&self, expected: &[AgentState], position: Position) -> bool {
        let machine = self.machine();
        if !expected.contains(&machine.state()) || self.control.is_halted() {
            return false;
        }
        self.deps.claims.claim(&self.name, position);
        drop(machine);
        true
    }

    /// Apply a validated lifecycle command and its control side effects.
    pub fn apply(&self, command: LifecycleCommand) -> Result<StateTransition, AgentError> {
        let transition = self.machine().apply(command)?;
        match command {
            LifecycleCommand::Start | LifecycleCommand::Reset => self.control.clear(),
            LifecycleCommand::Pause => self.control.pause(),
            LifecycleCommand::Resume => self.control.resume(),
            LifecycleCommand::Stop => self.release_resources(),
        }
        Ok(transition)
    }

    /// Record a fault and enter ERROR.
    pub fn fault(&self, reason: &str) {
        error!(agent = %self.name, reason, "agent fault");
        self.set_state(AgentState::Error, reason);
    }

    fn release_resources(&self) {
        if let Some(position) = self.deps.claims.release(&self.name) {
            debug!(agent = %self.name, %position, "released world claim");
        }
        self.control.stop();
    }

    /// Publish `payload` as a `kind` message to `target`, with this agent's
    /// state as context.
    pub fn publish<T: Serialize>(
        &self,
        kind: &str,
        target: &str,
        payload: &T,
    ) -> Result<MessageId, AgentError> {
        let message = Message::with_payload(kind, self.name.as_str(), target, payload)?
            .context(json!({ "state": self.state().name() }));
        let id = self.deps.bus.publish(message)?;
        debug!(agent = %self.name, kind, target, message_id = %id, "published");
        Ok(id)
    }

    /// Post a chat line, logging instead of failing.
    pub fn chat(&self, text: &str) {
        if let Err(err) = self.deps.world.post_chat(text) {
            warn!(agent = %self.name, error = %err, "chat post failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Agent behavior
// ---------------------------------------------------------------------------

/// Behavior of one agent type.
///
/// The runtime calls `perceive`, `decide` and `act` in that order on every
/// tick while the agent is RUNNING or WAITING, and `on_message` for every
/// message addressed to the agent in any state. An `Err` or a panic from any
/// of them moves the agent to ERROR.
pub trait Agent: Send {
    /// Read whatever the next decision depends on.
    fn perceive(&mut self, ctx: &AgentContext) -> Result<(), AgentError>;

    /// Choose the next action.
    fn decide(&mut self, ctx: &AgentContext) -> Result<(), AgentError>;

    /// Carry out the chosen action.
    fn act(&mut self, ctx: &AgentContext) -> Result<(), AgentError>;

    /// React to a message addressed to this agent or to everyone.
    fn on_message(&mut self, ctx: &AgentContext, message: &Message) -> Result<(), AgentError>;

    /// Agent-specific commands this agent answers to.
    fn command_names(&self) -> &'static [&'static str];

    /// Run an agent-specific command. Returns an optional reply for the
    /// operator.
    fn handle_command(
        &mut self,
        ctx: &AgentContext,
        name: &str,
        args: &CommandArgs,
    ) -> Result<Option<String>, AgentError>;

    /// Drop all session state, as on `reset`.
    fn reset(&mut self, ctx: &AgentContext);

    /// Agent-specific status detail.
    fn status(&self, ctx: &AgentContext) -> Value;
}

/// Observable status of one agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    /// Agent name.
    pub name: String,
    /// Current state.
    pub state: AgentState,
    /// Reason for the last transition.
    pub reason: String,
    /// Last saved checkpoint.
    pub checkpoint: Option<Checkpoint>,
    /// Whether the tick thread is alive.
    pub running: bool,
    /// Agent-specific detail, `null` while a tick holds the agent.
    pub detail: Value,
}

// ---------------------------------------------------------------------------
// AgentHandle
// ---------------------------------------------------------------------------

struct Core {
    ctx: AgentContext,
    behavior: Mutex<Box<dyn Agent>>,
    commands: &'static [&'static str],
    inbox: flume::Receiver<Message>,
}

impl Core {
    fn guarded<F>(&self, phase: &str, f: F)
    where
        F: FnOnce(&mut dyn Agent, &AgentContext) -> Result<(), AgentError>,
    {
        let mut behavior = self.behavior.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = catch_unwind(AssertUnwindSafe(|| f(behavior.as_mut(), &self.ctx)));
        drop(behavior);
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(agent = %self.ctx.name, phase, error = %err, "tick failed");
                self.ctx.fault(&err.to_string());
            }
            Err(panic) => {
                let text = panic_text(panic.as_ref());
                self.ctx.fault(&format!("panic during {phase}: {text}"));
            }
        }
    }

    fn drain_inbox(&self) {
        while let Ok(message) = self.inbox.try_recv() {
            self.guarded("message", |agent, ctx| agent.on_message(ctx, &message));
        }
    }

    fn tick(&self) {
        self.drain_inbox();
        if !self.ctx.state().is_ticking() {
            return;
        }
        self.guarded("tick", |agent, ctx| {
            agent.perceive(ctx)?;
            agent.decide(ctx)?;
            agent.act(ctx)
        });
    }

    fn run(&self, interval: Duration) {
        info!(agent = %self.ctx.name, interval_ms = interval.as_millis(), "agent loop started");
        while !self.ctx.control.is_shutdown() {
            self.tick();
            if !self.ctx.control.sleep(interval) {
                break;
            }
        }
        info!(agent = %self.ctx.name, "agent loop exited");
    }
}

/// A running (or runnable) agent: its context, behavior, inbox, bus
/// subscription and tick thread.
pub struct AgentHandle {
    core: Arc<Core>,
    subscription: SubscriptionId,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl core::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("name", &self.core.ctx.name)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl AgentHandle {
    /// Wrap `behavior` as agent `name` and subscribe it to the bus. The tick
    /// thread is not started.
    pub fn new(name: impl Into<String>, behavior: Box<dyn Agent>, deps: AgentDeps) -> Self {
        let name = name.into();
        let (tx, rx) = flume::unbounded();
        let filter_name = name.clone();
        let subscription = deps.bus.subscribe(name.clone(), move |message: &Message| {
            if message.is_addressed_to(&filter_name) {
                tx.send(message.clone()).map_err(DeliveryError::new)?;
            }
            Ok(())
        });
        Self {
            core: Arc::new(Core {
                ctx: AgentContext::new(name, deps),
                commands: behavior.command_names(),
                behavior: Mutex::new(behavior),
                inbox: rx,
            }),
            subscription,
            thread: Mutex::new(None),
        }
    }

    /// Agent name.
    pub fn name(&self) -> &str {
        self.core.ctx.name()
    }

    /// The thread-safe half of the agent.
    pub fn context(&self) -> &AgentContext {
        &self.core.ctx
    }

    /// Current state.
    pub fn state(&self) -> AgentState {
        self.core.ctx.state()
    }

    /// Run one tick on the calling thread.
    pub fn tick(&self) {
        self.core.tick();
    }

    /// Handle every message already in the inbox on the calling thread,
    /// without running the agent cycle.
    pub fn deliver_pending(&self) {
        self.core.drain_inbox();
    }

    /// Run `f` with the behavior locked.
    pub fn with_agent<R>(&self, f: impl FnOnce(&mut dyn Agent, &AgentContext) -> R) -> R {
        let mut behavior = self.core.behavior.lock().unwrap_or_else(PoisonError::into_inner);
        f(behavior.as_mut(), &self.core.ctx)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Apply a lifecycle command.
    ///
    /// `reset` raises the stop signal first so a running strategy unwinds,
    /// then clears the behavior's session state and returns to IDLE.
    pub fn lifecycle(&self, command: LifecycleCommand) -> Result<StateTransition, AgentError> {
        if command != LifecycleCommand::Reset {
            return self.core.ctx.apply(command);
        }
        self.core.ctx.control.stop();
        self.with_agent(|agent, ctx| {
            agent.reset(ctx);
            ctx.apply(LifecycleCommand::Reset)
        })
    }

    /// Run a named command: the agent's own commands first, then lifecycle
    /// commands.
    ///
    /// Lifecycle commands other than `reset` never wait on a tick, so `pause`
    /// and `stop` reach a strategy loop that is mid-scan.
    pub fn command(&self, name: &str, args: &CommandArgs) -> Result<Option<String>, AgentError> {
        if self.core.commands.contains(&name) {
            return self.with_agent(|agent, ctx| agent.handle_command(ctx, name, args));
        }
        match LifecycleCommand::parse(name) {
            Some(command) => {
                let transition = self.lifecycle(command)?;
                Ok(Some(format!("{}: {} -> {}", self.name(), transition.from, transition.to)))
            }
            None => Err(AgentError::UnknownCommand {
                agent: self.name().to_owned(),
                command: name.to_owned(),
            }),
        }
    }

    /// Snapshot of state, reason, checkpoint and agent detail.
    ///
    /// Never waits on a tick in progress.
    pub fn status(&self) -> AgentStatus {
        let detail = self
            .core
            .behavior
            .try_lock()
            .map_or(Value::Null, |agent| agent.status(&self.core.ctx));
        AgentStatus {
            name: self.name().to_owned(),
            state: self.core.ctx.state(),
            reason: self.core.ctx.reason(),
            checkpoint: self.core.ctx.checkpoint(),
            running: self.is_running(),
            detail,
        }
    }

    // -----------------------------------------------------------------------
    // Thread
    // -----------------------------------------------------------------------

    /// Whether the tick thread is alive.
    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start the tick thread unless it is already alive.
    pub fn start_loop(&self, interval: Duration) -> Result<(), AgentError> {
        let mut slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }
        self.core.ctx.control.clear_shutdown();
        let core = Arc::clone(&self.core);
        let handle = thread::Builder::new()
            .name(format!("agent-{}", self.name()))
            .spawn(move || core.run(interval))?;
        *slot = Some(handle);
        Ok(())
    }

    /// Ask the tick thread to exit and join it within `timeout`.
    ///
    /// Returns `false` (after logging) if the thread did not finish in time;
    /// it is then left detached.
    pub fn stop_loop(&self, timeout: Duration) -> bool {
        self.core.ctx.control.request_shutdown();
        let Some(handle) = self.thread.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return true;
        };
        let deadline = Instant::now().checked_add(timeout);
        while !handle.is_finished() {
            if deadline.is_none_or(|d| Instant::now() >= d) {
                warn!(
                    agent = %self.name(),
                    timeout_ms = timeout.as_millis(),
                    "agent thread did not stop in time"
                );
                return false;
            }
            thread::sleep(JOIN_POLL);
        }
        if handle.join().is_err() {
            warn!(agent = %self.name(), "agent thread panicked");
        }
        true
    }
}

impl Drop for AgentHandle {
    fn drop(&mut self) {
        self.core.ctx.bus().unsubscribe(self.subscription);
        self.core.ctx.control.request_shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use craftbots_events::DEFAULT_POLL_INTERVAL;
    use craftbots_world::MemoryWorld;

    use super::*;

    #[derive(Default)]
    struct Counter {
        ticks: u32,
        messages: u32,
        fail_on_act: bool,
    }

    impl Agent for Counter {
        fn perceive(&mut self, _ctx: &AgentContext) -> Result<(), AgentError> {
            Ok(())
        }

        fn decide(&mut self, _ctx: &AgentContext) -> Result<(), AgentError> {
            Ok(())
        }

        fn act(&mut self, _ctx: &AgentContext) -> Result<(), AgentError> {
            if self.fail_on_act {
                return Err(AgentError::UnknownPlan("boom".to_owned()));
            }
            self.ticks = self.ticks.saturating_add(1);
            Ok(())
        }

        fn on_message(&mut self, _ctx: &AgentContext, _message: &Message) -> Result<(), AgentError> {
            self.messages = self.messages.saturating_add(1);
            Ok(())
        }

        fn command_names(&self) -> &'static [&'static str] {
            &["count"]
        }

        fn handle_command(
            &mut self,
            _ctx: &AgentContext,
            _name: &str,
            _args: &CommandArgs,
        ) -> Result<Option<String>, AgentError> {
            Ok(Some(self.ticks.to_string()))
        }

        fn reset(&mut self, _ctx: &AgentContext) {
            self.ticks = 0;
        }

        fn status(&self, _ctx: &AgentContext) -> Value {
            json!({ "ticks": self.ticks, "messages": self.messages })
        }
    }

    fn deps() -> AgentDeps {
        AgentDeps {
            bus: MessageBus::start(DEFAULT_POLL_INTERVAL).unwrap(),
            world: SharedWorld::new(MemoryWorld::flat(10)),
            claims: ClaimRegistry::new(),
            flags: SystemFlags::new(),
        }
    }

    #[test]
    fn ticks_only_while_running_or_waiting() {
        let handle = AgentHandle::new("Counter", Box::new(Counter::default()), deps());
        handle.tick();
        assert_eq!(handle.status().detail["ticks"], 0);
        handle.lifecycle(LifecycleCommand::Start).unwrap();
        handle.tick();
        handle.context().set_state(AgentState::Waiting, "blocked");
        handle.tick();
        assert_eq!(handle.status().detail["ticks"], 2);
        handle.lifecycle(LifecycleCommand::Start).unwrap();
        handle.lifecycle(LifecycleCommand::Pause).unwrap();
        handle.tick();
        assert_eq!(handle.status().detail["ticks"], 2);
    }

    #[test]
    fn tick_error_moves_to_error_state() {
        let agent = Counter {
            fail_on_act: true,
            ..Counter::default()
        };
        let handle = AgentHandle::new("Faulty", Box::new(agent), deps());
        handle.lifecycle(LifecycleCommand::Start).unwrap();
        handle.tick();
        assert_eq!(handle.state(), AgentState::Error);
        assert!(handle.context().reason().contains("boom"));
        handle.tick();
        assert_eq!(handle.state(), AgentState::Error);
    }

    #[test]
    fn terminal_state_releases_claims() {
        let handle = AgentHandle::new("Claimer", Box::new(Counter::default()), deps());
        let claims = handle.context().claims().clone();
        claims.claim("Claimer", Position::new(1, 2, 3));
        handle.lifecycle(LifecycleCommand::Start).unwrap();
        handle.lifecycle(LifecycleCommand::Stop).unwrap();
        assert_eq!(claims.get("Claimer"), None);
        assert!(handle.context().control().is_stopped());
    }

    #[test]
    fn transition_if_yields_to_a_landed_stop() {
        let ctx = AgentContext::new("Racer", deps());
        ctx.apply(LifecycleCommand::Start).unwrap();
        assert!(ctx.claim_while(&[AgentState::Running], Position::new(0, 9, 0)));

        ctx.apply(LifecycleCommand::Stop).unwrap();
        let moved = ctx.transition_if(&[AgentState::Running], AgentState::Waiting, "requirements met");
        assert!(moved.is_none());
        assert_eq!(ctx.state(), AgentState::Stopped);
        assert!(!ctx.claim_while(&[AgentState::Running], Position::new(0, 5, 0)));
        assert_eq!(ctx.claims().get("Racer"), None);
    }

    #[test]
    fn transition_if_moves_from_an_expected_state() {
        let ctx = AgentContext::new("Racer", deps());
        ctx.apply(LifecycleCommand::Start).unwrap();
        assert!(ctx.claim_while(&[AgentState::Running], Position::new(1, 2, 3)));
        let moved = ctx
            .transition_if(&[AgentState::Running], AgentState::Stopped, "dead end")
            .unwrap();
        assert_eq!(moved.from, AgentState::Running);
        assert_eq!(moved.to, AgentState::Stopped);
        assert_eq!(ctx.claims().get("Racer"), None);
        assert!(ctx.control().is_stopped());
    }

    #[test]
    fn reset_clears_behavior_and_signals() {
        let handle = AgentHandle::new("Counter", Box::new(Counter::default()), deps());
        handle.lifecycle(LifecycleCommand::Start).unwrap();
        handle.tick();
        handle.lifecycle(LifecycleCommand::Stop).unwrap();
        handle.lifecycle(LifecycleCommand::Reset).unwrap();
        assert_eq!(handle.state(), AgentState::Idle);
        assert!(!handle.context().control().is_stopped());
        assert_eq!(handle.status().detail["ticks"], 0);
    }

    #[test]
    fn unknown_command_is_reported() {
        let handle = AgentHandle::new("Counter", Box::new(Counter::default()), deps());
        assert_eq!(
            handle.command("count", &CommandArgs::new()).unwrap().as_deref(),
            Some("0")
        );
        assert!(matches!(
            handle.command("dance", &CommandArgs::new()),
            Err(AgentError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn addressed_messages_reach_inbox_in_any_state() {
        let deps = deps();
        let bus = deps.bus.clone();
        let handle = AgentHandle::new("Counter", Box::new(Counter::default()), deps);
        bus.publish(Message::new("ping", "Test", "Counter", json!({}))).unwrap();
        bus.publish(Message::new("ping", "Test", "all", json!({}))).unwrap();
        bus.publish(Message::new("ping", "Test", "Other", json!({}))).unwrap();
        assert!(bus.wait_idle(Duration::from_secs(2)));
        handle.tick();
        assert_eq!(handle.status().detail["messages"], 2);
        bus.shutdown();
    }

    #[test]
    fn loop_starts_and_stops() {
        let handle = AgentHandle::new("Counter", Box::new(Counter::default()), deps());
        handle.lifecycle(LifecycleCommand::Start).unwrap();
        handle.start_loop(Duration::from_millis(5)).unwrap();
        assert!(handle.is_running());
        thread::sleep(Duration::from_millis(60));
        assert!(handle.stop_loop(DEFAULT_JOIN_TIMEOUT));
        assert!(!handle.is_running());
        let ticks = handle.status().detail["ticks"].as_u64().unwrap();
        assert!(ticks > 0);
    }
}
