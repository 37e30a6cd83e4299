//! The running agent system: bus, agents, tick threads and chat commands.
//!
//! [`AgentSystem::start`] builds every registered agent around one shared
//! bus, world and claim registry, starts their tick threads and registers
//! the built-in chat commands. A monitor subscription on the bus records
//! every `build.complete.v1` so the binary can tell when a workflow run has
//! finished.

use std::time::Duration;

use craftbots_agents::registry::{self, AGENTS};
use craftbots_agents::{
    AgentDeps, AgentHandle, AgentStatus, BUILDER, CommandArgs, EXPLORER, LifecycleCommand, MINER,
    SystemFlags,
};
use craftbots_events::{DeliveryError, MessageBus};
use craftbots_types::{
    AgentState, BROADCAST_TARGET, BuildCompletePayload, Message, SubscriptionId, kinds,
};
use craftbots_world::{ClaimRegistry, SharedWorld};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::commands::{CommandDispatcher, Dispatch, Handler};
use crate::config::{CraftbotsConfig, RuntimeConfig};
use crate::error::SystemError;

/// Source name used for messages the system itself publishes.
pub const SYSTEM_SOURCE: &str = "System";

type SystemHandler = Handler<AgentSystem, SystemError>;

/// Built-in chat commands.
static BUILTIN_COMMANDS: &[(&str, SystemHandler)] = &[
    ("help", help),
    ("agent help", help),
    ("agent status", agent_status),
    ("agent stop", agent_stop),
    ("agent pause", agent_pause),
    ("agent resume", agent_resume),
    ("explorer start", explorer_start),
    ("explorer switchrange", explorer_switchrange),
    ("builder build", builder_build),
    ("builder switchplan", builder_switchplan),
    ("builder plan", builder_plan),
    ("miner start", miner_start),
    ("miner switch", miner_switch),
    ("miner strategy", miner_strategy),
    ("miner strategies", miner_strategies),
    ("workflow run", workflow_run),
];

/// Every agent plus the shared collaborators they were built with.
pub struct AgentSystem {
    deps: AgentDeps,
    agents: Vec<AgentHandle>,
    commands: CommandDispatcher<Self, SystemError>,
    runtime: RuntimeConfig,
    completions: flume::Receiver<BuildCompletePayload>,
    monitor: SubscriptionId,
}

impl core::fmt::Debug for AgentSystem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AgentSystem")
            .field("agents", &self.agents)
            .field("commands", &self.commands)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl AgentSystem {
    /// Build every registered agent on `world` and start their tick threads.
    pub fn start(config: &CraftbotsConfig, world: SharedWorld) -> Result<Self, SystemError> {
        let bus = MessageBus::start(config.runtime.bus_poll_interval())?;
        let flags = SystemFlags::new();
        flags.set_workflow_mode(config.workflow);
        let deps = AgentDeps {
            bus,
            world,
            claims: ClaimRegistry::new(),
            flags,
        };

        let (tx, completions) = flume::unbounded();
        let monitor = deps.bus.subscribe("WorkflowMonitor", move |message: &Message| {
            if message.is_kind(kinds::BUILD_COMPLETE) {
                let payload: BuildCompletePayload =
                    message.decode_payload().map_err(DeliveryError::new)?;
                tx.send(payload).map_err(DeliveryError::new)?;
            }
            Ok(())
        });

        let mut agents = Vec::with_capacity(AGENTS.len());
        for entry in &AGENTS {
            let behavior = (entry.build)(&config.agents)?;
            let handle = AgentHandle::new(entry.name, behavior, deps.clone());
            handle.start_loop(config.runtime.tick_interval())?;
            info!(agent = entry.name, "agent started");
            agents.push(handle);
        }

        let mut commands = CommandDispatcher::new();
        for (name, handler) in BUILTIN_COMMANDS {
            commands.register(name, *handler)?;
        }

        info!(
            agents = agents.len(),
            workflow = config.workflow,
            tick_ms = config.runtime.tick_interval_ms,
            "agent system started"
        );
        Ok(Self {
            deps,
            agents,
            commands,
            runtime: config.runtime.clone(),
            completions,
            monitor,
        })
    }

    /// All agents, in registry order.
    pub fn agents(&self) -> &[AgentHandle] {
        &self.agents
    }

    /// Agent by name or alias.
    pub fn agent(&self, name: &str) -> Option<&AgentHandle> {
        let entry = registry::find(name).ok()?;
        self.agents.iter().find(|handle| handle.name() == entry.name)
    }

    fn require(&self, name: &str) -> Result<&AgentHandle, SystemError> {
        self.agent(name)
            .ok_or_else(|| SystemError::MissingAgent(name.to_owned()))
    }

    /// The shared bus.
    pub const fn bus(&self) -> &MessageBus {
        &self.deps.bus
    }

    /// The shared world.
    pub const fn world(&self) -> &SharedWorld {
        &self.deps.world
    }

    /// Whether workflow mode is on.
    pub fn workflow_mode(&self) -> bool {
        self.deps.flags.workflow_mode()
    }

    /// Turn workflow mode on or off.
    pub fn set_workflow_mode(&self, enabled: bool) {
        info!(enabled, "workflow mode changed");
        self.deps.flags.set_workflow_mode(enabled);
    }

    /// Status of every agent.
    pub fn statuses(&self) -> Vec<AgentStatus> {
        self.agents.iter().map(AgentHandle::status).collect()
    }

    /// Post a line to the game chat, logging instead of failing.
    pub fn announce(&self, text: &str) {
        if let Err(err) = self.deps.world.post_chat(text) {
            warn!(error = %err, "chat post failed");
        }
    }

    /// Run one chat line through the command table.
    pub fn dispatch(&self, line: &str) -> Dispatch<SystemError> {
        self.commands.dispatch(self, line)
    }

    /// Run one chat line and post the outcome back to chat. Returns `false`
    /// when the line was a command nobody handles.
    pub fn respond(&self, line: &str) -> bool {
        match self.dispatch(line) {
            Dispatch::NotACommand => true,
            Dispatch::NotHandled(name) => {
                self.announce(&format!("Unknown command: -{name}. Try -help"));
                false
            }
            Dispatch::Handled { replies, .. } => {
                for reply in &replies {
                    self.announce(reply);
                }
                true
            }
            Dispatch::Failed { command, error } => {
                self.announce(&format!("-{command} failed: {error}"));
                true
            }
        }
    }

    /// Read chat posted since the last poll and answer every command in it.
    pub fn poll_chat(&self) -> Result<usize, SystemError> {
        let posts = self.deps.world.poll_chat()?;
        let mut handled: usize = 0;
        for post in posts {
            if !post.message.starts_with('-') {
                continue;
            }
            info!(message = %post.message, "chat command received");
            self.respond(&post.message);
            handled = handled.saturating_add(1);
        }
        Ok(handled)
    }

    /// Return every agent to IDLE with its session cleared.
    pub fn reset_all(&self) {
        for handle in &self.agents {
            if let Err(err) = handle.lifecycle(LifecycleCommand::Reset) {
                warn!(agent = handle.name(), error = %err, "reset failed");
            }
        }
    }

    fn ensure_running(&self, handle: &AgentHandle) -> Result<(), SystemError> {
        if !handle.is_running() {
            info!(agent = handle.name(), "restarting agent thread");
            handle.start_loop(self.runtime.tick_interval())?;
        }
        Ok(())
    }

    /// Start a fresh explore, mine and build session in workflow mode.
    ///
    /// Tick threads are stopped while the agents are reset and the
    /// `workflow.reset` broadcast is handled, so no stale tick can undo the
    /// explorer's start.
    pub fn run_workflow(&self) -> Result<Vec<String>, SystemError> {
        let explorer = self.require(EXPLORER)?;
        info!("workflow run requested");
        for handle in &self.agents {
            if !handle.stop_loop(self.runtime.join_timeout()) {
                warn!(agent = handle.name(), "agent thread still busy during workflow reset");
            }
        }
        self.reset_all();
        while self.completions.try_recv().is_ok() {}
        self.set_workflow_mode(true);

        let reset = Message::new(kinds::WORKFLOW_RESET, SYSTEM_SOURCE, BROADCAST_TARGET, json!({}));
        self.deps.bus.publish(reset)?;
        if !self.deps.bus.wait_idle(self.runtime.join_timeout()) {
            warn!("workflow reset not delivered in time");
        }
        for handle in &self.agents {
            handle.deliver_pending();
            handle.start_loop(self.runtime.tick_interval())?;
        }

        let mut lines = vec!["[Workflow] starting a new session".to_owned()];
        lines.extend(explorer.command("start", &CommandArgs::new())?);
        Ok(lines)
    }

    /// Wait up to `timeout` for a `build.complete.v1`.
    pub fn wait_for_completion(&self, timeout: Duration) -> Option<BuildCompletePayload> {
        self.completions.recv_timeout(timeout).ok()
    }

    /// A `build.complete.v1` seen since the last check, if any.
    pub fn try_completion(&self) -> Option<BuildCompletePayload> {
        self.completions.try_recv().ok()
    }

    /// Stop every agent, join the tick threads and shut the bus down.
    /// Returns `false` if any thread failed to join in time.
    pub fn shutdown(self) -> bool {
        info!("agent system shutting down");
        self.deps.flags.set_workflow_mode(false);
        let mut joined = true;
        for handle in &self.agents {
            if !handle.state().is_terminal() {
                if let Err(err) = handle.lifecycle(LifecycleCommand::Stop) {
                    debug!(agent = handle.name(), error = %err, "stop skipped");
                }
            }
            joined &= handle.stop_loop(self.runtime.join_timeout());
        }
        self.deps.bus.unsubscribe(self.monitor);
        drop(self.agents);
        self.deps.bus.shutdown();
        info!(joined, "agent system stopped");
        joined
    }
}

// ---------------------------------------------------------------------------
// Built-in command handlers
// ---------------------------------------------------------------------------

fn forward(
    system: &AgentSystem,
    agent: &str,
    command: &str,
    args: &CommandArgs,
) -> Result<Vec<String>, SystemError> {
    let reply = system.require(agent)?.command(command, args)?;
    Ok(reply.into_iter().collect())
}

/// Manual commands take the system out of workflow mode and make sure the
/// target agent's thread is alive before forwarding.
fn manual(
    system: &AgentSystem,
    agent: &str,
    command: &str,
    args: &CommandArgs,
) -> Result<Vec<String>, SystemError> {
    system.set_workflow_mode(false);
    system.ensure_running(system.require(agent)?)?;
    forward(system, agent, command, args)
}

#[allow(clippy::unnecessary_wraps)]
fn help(system: &AgentSystem, _args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    let mut lines = vec!["=== available commands ===".to_owned()];
    lines.extend(system.commands.names().map(|name| format!("-{name}")));
    Ok(lines)
}

#[allow(clippy::unnecessary_wraps)]
fn agent_status(system: &AgentSystem, _args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    let mut lines = vec!["=== agent status ===".to_owned()];
    lines.extend(
        system
            .statuses()
            .into_iter()
            .map(|status| format!("{}: {} ({})", status.name, status.state, status.reason)),
    );
    Ok(lines)
}

#[allow(clippy::unnecessary_wraps)]
fn agent_stop(system: &AgentSystem, _args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    system.set_workflow_mode(false);
    let mut lines = vec!["Stopping all agents".to_owned()];
    for handle in system.agents() {
        match handle.lifecycle(LifecycleCommand::Stop) {
            Ok(_) => lines.push(format!("[{}] stopped", handle.name())),
            Err(err) => lines.push(format!("[{}] {err}", handle.name())),
        }
    }
    Ok(lines)
}

fn transition_all(
    system: &AgentSystem,
    from: AgentState,
    command: LifecycleCommand,
    done: &str,
    none: &str,
) -> Vec<String> {
    let mut lines = Vec::new();
    for handle in system.agents().iter().filter(|h| h.state() == from) {
        match handle.lifecycle(command) {
            Ok(_) => lines.push(format!("[{}] {done}", handle.name())),
            Err(err) => lines.push(format!("[{}] {err}", handle.name())),
        }
    }
    if lines.is_empty() {
        lines.push(none.to_owned());
    }
    lines
}

#[allow(clippy::unnecessary_wraps)]
fn agent_pause(system: &AgentSystem, _args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    Ok(transition_all(
        system,
        AgentState::Running,
        LifecycleCommand::Pause,
        "paused",
        "No running agent to pause",
    ))
}

#[allow(clippy::unnecessary_wraps)]
fn agent_resume(system: &AgentSystem, _args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    Ok(transition_all(
        system,
        AgentState::Paused,
        LifecycleCommand::Resume,
        "resumed",
        "No paused agent to resume",
    ))
}

fn explorer_start(system: &AgentSystem, args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    system.reset_all();
    manual(system, EXPLORER, "start", args)
}

fn explorer_switchrange(system: &AgentSystem, args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    forward(system, EXPLORER, "switchrange", args)
}

fn builder_build(system: &AgentSystem, args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    manual(system, BUILDER, "build", args)
}

fn builder_switchplan(system: &AgentSystem, args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    forward(system, BUILDER, "switchplan", args)
}

fn builder_plan(system: &AgentSystem, args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    forward(system, BUILDER, "plan", args)
}

fn miner_start(system: &AgentSystem, args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    manual(system, MINER, "start", args)
}

fn miner_switch(system: &AgentSystem, args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    forward(system, MINER, "switch", args)
}

fn miner_strategy(system: &AgentSystem, args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    forward(system, MINER, "strategy", args)
}

fn miner_strategies(system: &AgentSystem, args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    forward(system, MINER, "strategies", args)
}

fn workflow_run(system: &AgentSystem, _args: &CommandArgs) -> Result<Vec<String>, SystemError> {
    system.run_workflow()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use craftbots_world::MemoryWorld;

    use super::*;

    fn offline(workflow: bool) -> (AgentSystem, craftbots_world::ChatHandle) {
        let world = MemoryWorld::flat(10);
        let chat = world.chat();
        let mut config = CraftbotsConfig::default();
        config.workflow = workflow;
        config.agents.markers = false;
        config.runtime.tick_interval_ms = 5;
        config.runtime.bus_poll_interval_ms = 10;
        (AgentSystem::start(&config, SharedWorld::new(world)).unwrap(), chat)
    }

    #[test]
    fn starts_every_registered_agent() {
        let (system, _chat) = offline(false);
        let names: Vec<_> = system.agents().iter().map(AgentHandle::name).collect();
        assert_eq!(names, vec![EXPLORER, MINER, BUILDER]);
        assert!(system.agents().iter().all(AgentHandle::is_running));
        assert_eq!(system.agent("miner").map(AgentHandle::name), Some(MINER));
        assert!(system.agent("farmer").is_none());
        assert!(system.shutdown());
    }

    #[test]
    fn help_lists_commands() {
        let (system, chat) = offline(false);
        assert!(system.respond("-help"));
        assert!(chat.contains("-workflow run"));
        assert!(chat.contains("-miner strategies"));
        assert!(!system.respond("-dance now"));
        assert!(chat.contains("Unknown command: -dance now"));
        assert!(system.shutdown());
    }

    #[test]
    fn status_and_pause_resume_without_running_agents() {
        let (system, chat) = offline(false);
        system.respond("-agent status");
        assert!(chat.contains("ExplorerBot: IDLE (created)"));
        system.respond("-agent pause");
        assert!(chat.contains("No running agent to pause"));
        system.respond("-agent resume");
        assert!(chat.contains("No paused agent to resume"));
        assert!(system.shutdown());
    }

    #[test]
    fn failed_command_is_reported() {
        let (system, chat) = offline(false);
        assert!(system.respond("-builder build"));
        assert!(chat.contains("-builder build failed"));
        assert!(system.respond("-miner strategy name=spiral"));
        assert!(chat.contains("unknown strategy: spiral"));
        assert!(system.shutdown());
    }

    #[test]
    fn manual_start_leaves_workflow_mode() {
        let (system, _chat) = offline(true);
        assert!(system.workflow_mode());
        system.respond("-miner start");
        assert!(!system.workflow_mode());
        assert!(system.shutdown());
    }

    #[test]
    fn agent_stop_stops_everyone() {
        let (system, chat) = offline(false);
        system.respond("-agent stop");
        assert!(chat.contains("[MinerBot] stopped"));
        assert!(system.agents().iter().all(|h| h.state() == AgentState::Stopped));
        assert!(system.shutdown());
    }
}
