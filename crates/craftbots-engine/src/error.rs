//! Error types for the craftbots binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during startup and the chat loop.

/// Top-level error for the craftbots binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: craftbots_core::ConfigError,
    },

    /// The game server could not be reached or dropped the connection.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: craftbots_world::WorldError,
    },

    /// The agent system failed to start or run.
    #[error("agent system error: {source}")]
    System {
        /// The underlying system error.
        #[from]
        source: craftbots_core::SystemError,
    },

    /// The JSON log file could not be opened or read.
    #[error("log file {}: {source}", path.display())]
    LogFile {
        /// The log file path.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Installing the Ctrl-C handler failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
