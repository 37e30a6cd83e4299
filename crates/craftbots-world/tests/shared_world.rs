//! Integration tests for concurrent access through [`SharedWorld`].

#![allow(clippy::unwrap_used)]

use std::thread;

use craftbots_types::{Material, Position};
use craftbots_world::{ClaimRegistry, MemoryWorld, SharedWorld, colors, mark};

#[test]
fn concurrent_writers_all_land() {
    let world = SharedWorld::new(MemoryWorld::flat(10));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let world = world.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    world
                        .set_material(Position::new(t, 20, i), Material::Stone)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    for t in 0..4 {
        for i in 0..50 {
            assert_eq!(
                world.get_material(Position::new(t, 20, i)).unwrap(),
                Some(Material::Stone)
            );
        }
    }
}

#[test]
fn marker_places_wool_and_announces() {
    let memory = MemoryWorld::flat(10);
    let chat = memory.chat();
    let world = SharedWorld::new(memory);
    let pos = Position::new(2, 11, 2);

    mark(&world, pos, colors::BLUE, "ExplorerBot").unwrap();

    assert_eq!(world.get_material(pos).unwrap(), Some(Material::Wool));
    assert!(chat.contains("[ExplorerBot] marker placed at (2, 11, 2)"));
}

#[test]
fn claims_release_from_another_thread() {
    let claims = ClaimRegistry::new();
    claims.claim("MinerBot", Position::new(0, 9, 0));
    let remote = claims.clone();
    thread::spawn(move || remote.release("MinerBot"))
        .join()
        .unwrap();
    assert_eq!(claims.get("MinerBot"), None);
}

#[test]
fn player_and_chat_reads_go_through_the_handle() {
    let memory = MemoryWorld::flat(10).with_player(3, -2);
    let chat = memory.chat();
    let world = SharedWorld::new(memory);

    assert_eq!(world.player_position().unwrap(), Position::new(3, 11, -2));
    chat.say("-agent status");
    let polled = world.poll_chat().unwrap();
    assert_eq!(polled.len(), 1);
    assert!(polled.iter().all(|post| post.message == "-agent status"));
    assert!(world.poll_chat().unwrap().is_empty());
}
