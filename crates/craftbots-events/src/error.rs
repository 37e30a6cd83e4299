//! Error types for the message bus.

use craftbots_types::MessageError;

/// Errors returned by [`MessageBus`](crate::MessageBus) operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The message failed validation and was not enqueued.
    #[error("message rejected: {source}")]
    Invalid {
        /// Validation failure.
        #[from]
        source: MessageError,
    },

    /// The bus has been shut down.
    #[error("message bus is shut down")]
    Closed,

    /// The dispatch worker thread could not be spawned.
    #[error("failed to spawn bus worker: {source}")]
    Spawn {
        /// Underlying OS error.
        #[from]
        source: std::io::Error,
    },
}

/// Failure reported by a subscriber callback for one delivery.
///
/// The bus logs it and carries on delivering to the remaining subscribers.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct DeliveryError(pub String);

impl DeliveryError {
    /// Wrap any displayable failure.
    pub fn new(reason: impl core::fmt::Display) -> Self {
        Self(reason.to_string())
    }
}
