//! Asynchronous broadcast message bus for the craftbots agents.
//!
//! Agents never call each other directly. They publish [`Message`]s here and
//! every subscriber receives every valid message in FIFO order; target
//! filtering is each subscriber's job. Delivery is at-most-once, best-effort,
//! in memory only.
//!
//! # Modules
//!
//! - [`bus`] -- The [`MessageBus`] handle, its dispatch worker and counters
//! - [`error`] -- Publish and delivery errors
//!
//! [`Message`]: craftbots_types::Message

pub mod bus;
pub mod error;

pub use bus::{BusStats, Callback, DEFAULT_POLL_INTERVAL, MessageBus, panic_text};
pub use error::{BusError, DeliveryError};
