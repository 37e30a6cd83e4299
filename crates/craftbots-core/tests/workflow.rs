//! End-to-end tests of the agent system on an in-memory world.
//!
//! Commands arrive the way a player would send them: typed into chat and
//! picked up by [`AgentSystem::poll_chat`].

#![allow(clippy::unwrap_used)]

use std::thread;
use std::time::{Duration, Instant};

use craftbots_core::{AgentSystem, CraftbotsConfig};
use craftbots_types::{AgentState, Material, Position};
use craftbots_world::{ChatHandle, MemoryWorld, SharedWorld};

const PATIENCE: Duration = Duration::from_secs(15);

fn offline() -> (AgentSystem, ChatHandle) {
    let world = MemoryWorld::flat(10);
    let chat = world.chat();
    let mut config = CraftbotsConfig::parse(
        "runtime:\n  tick_interval_ms: 5\n  bus_poll_interval_ms: 10\nagents:\n  markers: false\n",
    )
    .unwrap();
    config.workflow = false;
    (AgentSystem::start(&config, SharedWorld::new(world)).unwrap(), chat)
}

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let start = Instant::now();
    while !done() {
        assert!(start.elapsed() < PATIENCE, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn workflow_run_from_chat_builds_the_platform() {
    let (system, chat) = offline();
    chat.say("-workflow run");
    assert_eq!(system.poll_chat().unwrap(), 1);
    assert!(system.workflow_mode());
    assert!(chat.contains("[Workflow] starting a new session"));

    let done = system.wait_for_completion(PATIENCE).unwrap();
    assert_eq!(done.plan, "platform");
    assert_eq!(done.zone, Position::new(4, 10, 0));

    let world = system.world();
    for (x, z) in [(4, 0), (7, 0), (4, 3), (7, 3)] {
        assert_ne!(world.get_material(Position::new(x, 11, z)).unwrap(), Some(Material::Air));
    }

    wait_until("the miner to stop", || {
        system.agent("miner").unwrap().state() == AgentState::Stopped
    });
    assert!(system.try_completion().is_none());
    assert!(system.shutdown());
}

#[test]
fn manual_build_waits_for_a_zone() {
    let (system, chat) = offline();
    chat.say("-builder build");
    chat.say("hello there");
    assert_eq!(system.poll_chat().unwrap(), 1);
    assert!(chat.contains("-builder build failed"));
    assert_eq!(
        system.world().get_material(Position::new(4, 11, 0)).unwrap(),
        Some(Material::Air)
    );
    assert!(system.shutdown());
}

#[test]
fn manual_explore_then_stop_everyone() {
    let (system, chat) = offline();
    chat.say("-explorer start");
    system.poll_chat().unwrap();
    assert!(!system.workflow_mode());

    wait_until("the builder to adopt the zone", || {
        chat.contains("[BuilderBot] zone received")
            && system.agent("explorer").unwrap().state() == AgentState::Waiting
    });
    chat.say("-agent status");
    system.poll_chat().unwrap();
    assert!(chat.contains("ExplorerBot: WAITING"));
    assert!(chat.contains("BuilderBot: IDLE (zone received)"));

    chat.say("-agent stop");
    system.poll_chat().unwrap();
    assert!(system.statuses().iter().all(|s| s.state == AgentState::Stopped));
    assert!(system.shutdown());
}
