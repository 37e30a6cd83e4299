//! World claims: anchor positions agents hold on the shared world.
//!
//! Claims are keyed by agent name so that an FSM transition into STOPPED or
//! ERROR can release them synchronously from whichever thread made it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use craftbots_types::Position;
use tracing::debug;

/// Shared registry of per-agent anchor claims.
#[derive(Debug, Clone, Default)]
pub struct ClaimRegistry {
    claims: Arc<Mutex<BTreeMap<String, Position>>>,
}

impl ClaimRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `position` for `agent`, replacing any previous claim.
    /// Returns the replaced position.
    pub fn claim(&self, agent: &str, position: Position) -> Option<Position> {
        debug!(agent, position = %position, "anchor claimed");
        self.lock().insert(agent.to_owned(), position)
    }

    /// The position `agent` currently holds.
    pub fn get(&self, agent: &str) -> Option<Position> {
        self.lock().get(agent).copied()
    }

    /// Drop the claim `agent` holds. Returns the released position.
    pub fn release(&self, agent: &str) -> Option<Position> {
        let released = self.lock().remove(agent);
        if let Some(position) = released {
            debug!(agent, position = %position, "anchor released");
        }
        released
    }

    /// Every current claim, by agent name.
    pub fn snapshot(&self) -> BTreeMap<String, Position> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Position>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
