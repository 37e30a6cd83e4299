//! Error types for the `craftbots-world` crate.
//!
//! Every world call returns [`WorldError`] on failure; agents turn it into
//! an ERROR transition.

/// Errors that can occur while talking to the world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The socket to the game server failed.
    #[error("world connection error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The server closed the connection.
    #[error("world connection closed by server")]
    Disconnected,

    /// The server answered with something that could not be parsed.
    #[error("unexpected response to {command}: {response:?}")]
    Protocol {
        /// The command that was sent.
        command: String,
        /// The raw response line.
        response: String,
    },

    /// A thread panicked while holding the world lock.
    #[error("world lock poisoned")]
    LockPoisoned,

    /// Arithmetic overflow in a coordinate calculation.
    #[error("arithmetic overflow in world calculation")]
    ArithmeticOverflow,
}
