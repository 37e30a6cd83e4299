//! Cooperative control signals shared between an agent's thread, its
//! strategy loops and the command handlers running on other threads.
//!
//! Three independent flags live here:
//!
//! - `paused` -- strategy loops block between steps until resumed.
//! - `stopped` -- strategy loops unwind at the next step.
//! - `shutdown` -- the agent's tick thread exits.
//!
//! Flags are atomics for lock-free polling; waits use a [`Condvar`] so a
//! paused loop or an idle tick thread sleeps instead of spinning. Setters
//! take the gate mutex before notifying so a waiter never misses a wake-up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Pause, stop and shutdown flags for one agent.
#[derive(Debug, Default)]
pub struct Control {
    paused: AtomicBool,
    stopped: AtomicBool,
    shutdown: AtomicBool,
    gate: Mutex<()>,
    wake: Condvar,
}

impl Control {
    /// All flags clear.
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, flag: &AtomicBool, value: bool) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        flag.store(value, Ordering::Release);
        self.wake.notify_all();
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Whether strategy loops should hold.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Ask strategy loops to hold at their next step.
    pub fn pause(&self) {
        self.set(&self.paused, true);
    }

    /// Release held strategy loops.
    pub fn resume(&self) {
        self.set(&self.paused, false);
    }

    /// Block while paused. Returns `false` if the wait ended because of a
    /// stop or shutdown rather than a resume.
    pub fn wait_while_paused(&self) -> bool {
        let guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .wake
            .wait_while(guard, |_| {
                self.is_paused() && !self.is_stopped() && !self.is_shutdown()
            })
            .unwrap_or_else(PoisonError::into_inner);
        !self.is_stopped() && !self.is_shutdown()
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Whether strategy loops should unwind.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Whether a loop should unwind for any reason (stop or shutdown).
    pub fn is_halted(&self) -> bool {
        self.is_stopped() || self.is_shutdown()
    }

    /// Raise the cooperative stop signal.
    pub fn stop(&self) {
        self.set(&self.stopped, true);
    }

    /// Clear pause and stop, as on reset.
    pub fn clear(&self) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.paused.store(false, Ordering::Release);
        self.stopped.store(false, Ordering::Release);
        self.wake.notify_all();
    }

    // -----------------------------------------------------------------------
    // Thread shutdown
    // -----------------------------------------------------------------------

    /// Whether the tick thread should exit.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Ask the tick thread to exit and wake it.
    pub fn request_shutdown(&self) {
        self.set(&self.shutdown, true);
    }

    /// Allow a new tick thread to run.
    pub fn clear_shutdown(&self) {
        self.set(&self.shutdown, false);
    }

    /// Sleep for `interval`, returning early on shutdown. Returns `false`
    /// when woken by shutdown.
    pub fn sleep(&self, interval: Duration) -> bool {
        let guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let (_guard, _timeout) = self
            .wake
            .wait_timeout_while(guard, interval, |_| !self.is_shutdown())
            .unwrap_or_else(PoisonError::into_inner);
        !self.is_shutdown()
    }
}
