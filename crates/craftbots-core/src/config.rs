//! Configuration loading and typed config structures for craftbots.
//!
//! The configuration lives in `craftbots.yaml`. Every section and field has
//! a default, so a missing file, an empty file, or a file that sets only a
//! few keys all yield a complete [`CraftbotsConfig`].
//!
//! A few environment variables override the file after it is read:
//!
//! - `MC_HOST` overrides `world.host`
//! - `MC_PORT` overrides `world.port`
//! - `CRAFTBOTS_WORKFLOW` overrides `workflow` (`1`/`true`/`yes`/`on` or
//!   `0`/`false`/`no`/`off`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use craftbots_agents::AgentSettings;
use craftbots_world::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors the structure of `craftbots.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftbotsConfig {
    /// Game server connection.
    #[serde(default)]
    pub world: WorldConfig,

    /// Thread cadence and timeouts.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Start in workflow mode.
    #[serde(default)]
    pub workflow: bool,

    /// Log filter and format.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Agent tunables.
    #[serde(default)]
    pub agents: AgentSettings,
}

impl CraftbotsConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise. Environment overrides
    /// apply either way.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        info!(path = %path.display(), "config file not found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, without environment overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("MC_HOST") {
            self.world.host = host;
        }
        if let Some(raw) = lookup("MC_PORT") {
            self.world.port = raw.trim().parse().map_err(|_invalid| ConfigError::InvalidEnv {
                name: "MC_PORT",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup("CRAFTBOTS_WORKFLOW") {
            self.workflow = parse_flag(&raw).ok_or(ConfigError::InvalidEnv {
                name: "CRAFTBOTS_WORKFLOW",
                value: raw,
            })?;
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Game server connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Server host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl WorldConfig {
    /// Connect timeout as a [`Duration`].
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Thread cadence and timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Gap between two agent ticks, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Bound on joining an agent thread at shutdown, in milliseconds.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,

    /// How long the bus worker blocks before rechecking for shutdown.
    #[serde(default = "default_bus_poll_interval_ms")]
    pub bus_poll_interval_ms: u64,

    /// Gap between two chat polls, in milliseconds.
    #[serde(default = "default_chat_poll_interval_ms")]
    pub chat_poll_interval_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            join_timeout_ms: default_join_timeout_ms(),
            bus_poll_interval_ms: default_bus_poll_interval_ms(),
            chat_poll_interval_ms: default_chat_poll_interval_ms(),
        }
    }
}

impl RuntimeConfig {
    /// Tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Join timeout as a [`Duration`].
    pub const fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Bus poll interval as a [`Duration`].
    pub const fn bus_poll_interval(&self) -> Duration {
        Duration::from_millis(self.bus_poll_interval_ms)
    }

    /// Chat poll interval as a [`Duration`].
    pub const fn chat_poll_interval(&self) -> Duration {
        Duration::from_millis(self.chat_poll_interval_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Also append JSON lines to this file, for `craftbots analyze-logs`.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
            file: None,
        }
    }
}

fn default_host() -> String {
    String::from("localhost")
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_connect_timeout_ms() -> u64 {
    5000
}

const fn default_tick_interval_ms() -> u64 {
    200
}

const fn default_join_timeout_ms() -> u64 {
    2000
}

const fn default_bus_poll_interval_ms() -> u64 {
    100
}

const fn default_chat_poll_interval_ms() -> u64 {
    500
}

fn default_log_filter() -> String {
    String::from("info")
}
