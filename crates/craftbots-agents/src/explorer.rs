//! `ExplorerBot`: finds a flat zone near the player and hands it to the
//! builder.

use craftbots_types::{AgentState, MapPayload, Message, Position, kinds};
use craftbots_world::{colors, mark, place_marker};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::command::CommandArgs;
use crate::config::ExplorerSettings;
use crate::error::AgentError;
use crate::fsm::LifecycleCommand;
use crate::runtime::{Agent, AgentContext};

/// Registry name and routing target.
pub const EXPLORER: &str = "ExplorerBot";

/// Directions scanned from the player, in order.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Outcome of one terrain scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Found(Position),
    NotFound,
    Interrupted,
}

/// Scans outward from the player for a run of equal-height columns confirmed
/// by a perpendicular cross, then publishes it as `map.v1`.
#[derive(Debug)]
pub struct ExplorerBot {
    settings: ExplorerSettings,
    markers: bool,
    range_index: usize,
    found: Option<Position>,
    target: Option<Position>,
    map_sent: bool,
}

impl ExplorerBot {
    /// An idle explorer.
    pub const fn new(settings: ExplorerSettings, markers: bool) -> Self {
        Self {
            settings,
            markers,
            range_index: 0,
            found: None,
            target: None,
            map_sent: false,
        }
    }

    /// Current scan range.
    pub fn range(&self) -> u32 {
        self.settings.ranges.get(self.range_index).copied().unwrap_or(0)
    }

    /// Advance to the next configured range, wrapping around.
    pub fn cycle_range(&mut self) -> u32 {
        let next = self.range_index.saturating_add(1);
        self.range_index = if next >= self.settings.ranges.len() { 0 } else { next };
        let range = self.range();
        info!(agent = EXPLORER, range, "scan range changed");
        range
    }

    /// The zone last published or about to be.
    pub const fn zone(&self) -> Option<Position> {
        self.target
    }

    fn clear_session(&mut self) {
        self.found = None;
        self.target = None;
        self.map_sent = false;
    }

    fn column_height(&self, ctx: &AgentContext, x: i32, z: i32) -> Result<i32, AgentError> {
        let y = ctx.world().get_height(x, z)?;
        if self.markers {
            place_marker(ctx.world(), Position::new(x, y, z), colors::BLUE)?;
        }
        Ok(y)
    }

    fn cross_is_flat(
        &self,
        ctx: &AgentContext,
        center: Position,
        along_x: bool,
    ) -> Result<bool, AgentError> {
        let half = i32::try_from(self.settings.cross_half_width).unwrap_or(i32::MAX);
        for k in half.saturating_neg()..=half {
            if k == 0 {
                continue;
            }
            let (x, z) = if along_x {
                (center.x, center.z.saturating_add(k))
            } else {
                (center.x.saturating_add(k), center.z)
            };
            if self.column_height(ctx, x, z)? != center.y {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn scan(&self, ctx: &AgentContext) -> Result<Scan, AgentError> {
        let player = ctx.world().player_position()?;
        let range = i32::try_from(self.range()).unwrap_or(i32::MAX);
        let run = self.settings.flat_run.max(1);
        let back = i32::try_from(run / 2).unwrap_or(0);
        debug!(agent = EXPLORER, %player, range, "scanning for a flat zone");

        for (dx, dz) in DIRECTIONS {
            let mut count: u32 = 0;
            let mut last: Option<i32> = None;
            for i in 1..=range {
                if ctx.control().is_halted() {
                    return Ok(Scan::Interrupted);
                }
                let x = player.x.saturating_add(dx.saturating_mul(i));
                let z = player.z.saturating_add(dz.saturating_mul(i));
                let y = self.column_height(ctx, x, z)?;
                if last == Some(y) {
                    count = count.saturating_add(1);
                } else {
                    count = 1;
                    last = Some(y);
                }
                if count < run {
                    continue;
                }
                let offset = i.saturating_sub(back);
                let center = Position::new(
                    player.x.saturating_add(dx.saturating_mul(offset)),
                    y,
                    player.z.saturating_add(dz.saturating_mul(offset)),
                );
                if self.cross_is_flat(ctx, center, dx != 0)? {
                    if self.markers {
                        place_marker(ctx.world(), center.above(), colors::BLUE)?;
                    }
                    return Ok(Scan::Found(center));
                }
                count = 0;
            }
        }
        Ok(Scan::NotFound)
    }
}

impl Agent for ExplorerBot {
    fn perceive(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        if ctx.state() != AgentState::Running || self.map_sent || self.found.is_some() {
            return Ok(());
        }
        match self.scan(ctx)? {
            Scan::Found(zone) => {
                debug!(agent = EXPLORER, %zone, "flat zone perceived");
                self.found = Some(zone);
            }
            Scan::NotFound => {
                let stopped =
                    ctx.transition_if(&[AgentState::Running], AgentState::Stopped, "no flat zone found");
                if stopped.is_some() {
                    info!(agent = EXPLORER, range = self.range(), "no flat zone found");
                    ctx.chat(&format!(
                        "[{EXPLORER}] no flat zone found within {} blocks",
                        self.range()
                    ));
                }
            }
            Scan::Interrupted => debug!(agent = EXPLORER, "scan interrupted"),
        }
        Ok(())
    }

    fn decide(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        if ctx.state() == AgentState::Running && !self.map_sent {
            self.target = self.found;
        }
        Ok(())
    }

    fn act(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        if ctx.state() != AgentState::Running || self.map_sent {
            return Ok(());
        }
        let Some(zone) = self.target else {
            return Ok(());
        };
        if self.markers {
            mark(ctx.world(), zone, colors::BLUE, EXPLORER)?;
        }
        ctx.publish(kinds::MAP, crate::builder::BUILDER, &MapPayload { zone })?;
        info!(agent = EXPLORER, %zone, "map published");
        self.map_sent = true;
        ctx.transition_if(&[AgentState::Running], AgentState::Waiting, "map published");
        Ok(())
    }

    fn on_message(&mut self, ctx: &AgentContext, message: &Message) -> Result<(), AgentError> {
        if message.is_kind(kinds::WORKFLOW_RESET) {
            self.reset(ctx);
            ctx.apply(LifecycleCommand::Reset)?;
        }
        Ok(())
    }

    fn command_names(&self) -> &'static [&'static str] {
        &["start", "switchrange"]
    }

    fn handle_command(
        &mut self,
        ctx: &AgentContext,
        name: &str,
        _args: &CommandArgs,
    ) -> Result<Option<String>, AgentError> {
        match name {
            "start" => {
                self.clear_session();
                ctx.apply(LifecycleCommand::Start)?;
                Ok(Some(format!("{EXPLORER} exploring within {} blocks", self.range())))
            }
            "switchrange" => {
                let range = self.cycle_range();
                Ok(Some(format!("{EXPLORER} scan range is now {range}")))
            }
            other => Err(AgentError::UnknownCommand {
                agent: EXPLORER.to_owned(),
                command: other.to_owned(),
            }),
        }
    }

    fn reset(&mut self, _ctx: &AgentContext) {
        self.clear_session();
        debug!(agent = EXPLORER, "session cleared");
    }

    fn status(&self, _ctx: &AgentContext) -> Value {
        json!({
            "range": self.range(),
            "zone": self.target,
            "map_sent": self.map_sent,
        })
    }
}
