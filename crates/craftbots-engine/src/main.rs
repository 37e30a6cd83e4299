//! Craftbots binary.
//!
//! Connects to a Minecraft Pi / `RaspberryJuice` game server (or builds an
//! in-memory world with `--offline`), starts the explorer, miner and builder
//! agents, and answers `-` commands typed into game chat until Ctrl-C.
//!
//! `craftbots analyze-logs <file>` instead summarizes a JSON log written with
//! `--log-file` and exits.
//!
//! # Startup Sequence
//!
//! 1. Parse command-line flags
//! 2. Load configuration from `craftbots.yaml` and apply overrides
//! 3. Initialize structured logging (tracing), plus the JSON log file if set
//! 4. Connect to the world
//! 5. Start the agent system
//! 6. Start a workflow run when workflow mode is on
//! 7. Poll chat until interrupted (or until the workflow completes)
//! 8. Stop every agent and shut the bus down

mod analyze;
mod error;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use craftbots_core::{AgentSystem, CraftbotsConfig, LoggingConfig};
use craftbots_world::{ChatHandle, McpiConnection, MemoryWorld, SharedWorld};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::EngineError;

/// Surface height of the offline world.
const OFFLINE_SURFACE_Y: i32 = 64;

/// Command-line flags. Anything set here wins over the config file.
#[derive(Debug, Parser)]
#[command(
    name = "craftbots",
    version,
    about = "Cooperating explorer, miner and builder agents for a Minecraft Pi server",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
    /// Path to the YAML config file
    #[arg(short, long, default_value = "craftbots.yaml")]
    config: PathBuf,
    /// Start a full explore, mine and build run and exit when it completes
    #[arg(long)]
    workflow: bool,
    /// Mining strategy to select at startup (grid or vertical)
    #[arg(long)]
    miner_strategy: Option<String>,
    /// Build plan to select at startup
    #[arg(long)]
    builder_plan: Option<String>,
    /// Run against an in-memory world; stdin lines act as chat
    #[arg(long)]
    offline: bool,
    /// Game server host
    #[arg(long)]
    host: Option<String>,
    /// Game server port
    #[arg(long)]
    port: Option<u16>,
    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
    /// Also append JSON logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Tools that run instead of the agents.
#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize a JSON log file written with --log-file
    AnalyzeLogs {
        /// Path to the JSON log file
        file: PathBuf,
        /// How many of the most recent errors to list
        #[arg(long, default_value_t = analyze::DEFAULT_RECENT_ERRORS)]
        errors: usize,
    },
}

/// Offline chat: stdin lines stand in for players and posted chat is
/// echoed to stdout.
struct Console {
    chat: ChatHandle,
    lines: Lines<BufReader<Stdin>>,
    printed: usize,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the world connection or the agent
/// system fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if let Some(Command::AnalyzeLogs { file, errors }) = &args.command {
        print!("{}", analyze::analyze_file(file, *errors)?);
        return Ok(());
    }
    let config = load_config(&args)?;
    init_tracing(&config.logging)?;

    info!(
        config = %args.config.display(),
        log_file = ?config.logging.file,
        host = %config.world.host,
        port = config.world.port,
        offline = args.offline,
        workflow = config.workflow,
        strategy = %config.agents.mining.strategy,
        plan = %config.agents.building.plan,
        "craftbots starting"
    );

    let (world, mut console) = connect_world(&args, &config)?;
    let system = AgentSystem::start(&config, world)?;
    system.announce("[craftbots] agents online; type -help for commands");

    if config.workflow {
        for line in system.run_workflow()? {
            system.announce(&line);
        }
    }

    let result = serve(&system, &config, console.as_mut()).await;
    let joined = system.shutdown();
    info!(joined, "craftbots shutdown complete");
    result?;
    Ok(())
}

/// Load the config file, then apply environment and flag overrides.
fn load_config(args: &Args) -> Result<CraftbotsConfig, EngineError> {
    let mut config = CraftbotsConfig::load(&args.config)?;
    if args.workflow {
        config.workflow = true;
    }
    if let Some(strategy) = &args.miner_strategy {
        config.agents.mining.strategy.clone_from(strategy);
    }
    if let Some(plan) = &args.builder_plan {
        config.agents.building.plan.clone_from(plan);
    }
    if let Some(host) = &args.host {
        config.world.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.world.port = port;
    }
    if args.log_json {
        config.logging.json = true;
    }
    if let Some(path) = &args.log_file {
        config.logging.file = Some(path.clone());
    }
    Ok(config)
}

/// Install the tracing subscriber. `RUST_LOG` wins over `logging.filter`.
///
/// Console output is plain or JSON per `logging.json`. When `logging.file`
/// is set, every event is also appended there as a JSON line.
fn init_tracing(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let console = if logging.json {
        fmt::layer().json().with_target(true).with_thread_names(true).boxed()
    } else {
        fmt::layer().with_target(true).with_thread_names(true).boxed()
    };
    let file = match &logging.file {
        Some(path) => {
            let sink = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| EngineError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_writer(Mutex::new(sink)),
            )
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}

fn connect_world(
    args: &Args,
    config: &CraftbotsConfig,
) -> Result<(SharedWorld, Option<Console>), EngineError> {
    if args.offline {
        let world = MemoryWorld::flat(OFFLINE_SURFACE_Y);
        let chat = world.chat();
        info!(surface_y = OFFLINE_SURFACE_Y, "using in-memory world");
        let console = Console {
            chat,
            lines: BufReader::new(tokio::io::stdin()).lines(),
            printed: 0,
        };
        return Ok((SharedWorld::new(world), Some(console)));
    }
    let connection = McpiConnection::connect(
        &config.world.host,
        config.world.port,
        config.world.connect_timeout(),
    )?;
    Ok((SharedWorld::new(connection), None))
}

/// Poll chat until Ctrl-C, or until the workflow completes when running
/// with workflow mode on.
async fn serve(
    system: &AgentSystem,
    config: &CraftbotsConfig,
    mut console: Option<&mut Console>,
) -> Result<(), EngineError> {
    let mut poll = tokio::time::interval(config.runtime.chat_poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            signal = &mut interrupt => {
                signal?;
                info!("interrupt received");
                return Ok(());
            }
            line = next_console_line(console.as_deref_mut()) => {
                if let (Some(console), Some(line)) = (console.as_deref(), line) {
                    console.chat.say(line);
                }
            }
            _ = poll.tick() => {
                if let Err(err) = system.poll_chat() {
                    warn!(error = %err, "chat poll failed");
                    if is_disconnect(&err) {
                        return Err(err.into());
                    }
                }
                echo_console(console.as_deref_mut());
                if let Some(done) = system.try_completion() {
                    info!(plan = %done.plan, zone = %done.zone, "build complete");
                    if config.workflow && system.workflow_mode() {
                        system.announce(&format!(
                            "[Workflow] {} built at {}",
                            done.plan, done.zone
                        ));
                        echo_console(console.as_deref_mut());
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Next stdin line in offline mode. Never resolves for a game connection or
/// once stdin is closed.
async fn next_console_line(console: Option<&mut Console>) -> Option<String> {
    let Some(console) = console else {
        return std::future::pending().await;
    };
    match console.lines.next_line().await {
        Ok(Some(line)) => Some(line),
        Ok(None) | Err(_) => std::future::pending().await,
    }
}

/// Print chat posted since the last call in offline mode.
fn echo_console(console: Option<&mut Console>) {
    if let Some(console) = console {
        let posted = console.chat.posted();
        for line in posted.iter().skip(console.printed) {
            println!("{line}");
        }
        console.printed = posted.len();
    }
}

const fn is_disconnect(err: &craftbots_core::SystemError) -> bool {
    matches!(
        err,
        craftbots_core::SystemError::World(
            craftbots_world::WorldError::Disconnected | craftbots_world::WorldError::Io { .. }
        )
    )
}
