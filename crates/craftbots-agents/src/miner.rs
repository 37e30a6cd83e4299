//! `MinerBot`: mines toward the builder's requirements and hands over
//! exactly what was asked for.

use craftbots_types::{
    AgentState, Inventory, InventoryPayload, Message, Position, Requirements, RequirementsPayload,
    kinds,
};
use craftbots_world::{colors, mark};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::builder::BUILDER;
use crate::command::{CommandArgs, index_arg, text_arg};
use crate::config::MinerSettings;
use crate::error::AgentError;
use crate::fsm::LifecycleCommand;
use crate::inventory::{drain_all, merge, provided_for, satisfies};
use crate::mining::{MiningJob, MiningOutcome, MiningStrategy, StrategyRegistry};
use crate::runtime::{Agent, AgentContext};

/// Registry name and routing target.
pub const MINER: &str = "MinerBot";

/// What the next `act` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Nothing,
    Mine,
    Deliver,
}

/// Mines with the selected strategy around an anchor below the player.
#[derive(Debug)]
pub struct MinerBot {
    settings: MinerSettings,
    markers: bool,
    registry: StrategyRegistry,
    strategy: Box<dyn MiningStrategy>,
    requirements: Requirements,
    inventory: Inventory,
    anchor: Option<Position>,
    mining: bool,
    next: Plan,
}

impl MinerBot {
    /// An idle miner using the configured strategy.
    pub fn new(settings: MinerSettings, markers: bool) -> Result<Self, AgentError> {
        let registry = StrategyRegistry::new(settings.clone());
        let strategy = registry.build()?;
        Ok(Self {
            settings,
            markers,
            registry,
            strategy,
            requirements: Requirements::new(),
            inventory: Inventory::new(),
            anchor: None,
            mining: false,
            next: Plan::Nothing,
        })
    }

    /// Materials held.
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Materials asked for.
    pub const fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    /// Current dig anchor.
    pub const fn anchor(&self) -> Option<Position> {
        self.anchor
    }

    /// Name of the active strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    fn requirements_met(&self) -> bool {
        !self.requirements.is_empty() && satisfies(&self.inventory, &self.requirements)
    }

    fn drop_anchor(&mut self, ctx: &AgentContext) {
        self.anchor = None;
        ctx.claims().release(ctx.name());
    }

    /// The current anchor, or a new one below the player. `None` when the
    /// miner left RUNNING before the anchor could be claimed.
    fn ensure_anchor(&mut self, ctx: &AgentContext) -> Result<Option<Position>, AgentError> {
        if let Some(anchor) = self.anchor {
            return Ok(Some(anchor));
        }
        let player = ctx.world().player_position()?;
        let height = ctx.world().get_height(player.x, player.z)?;
        let anchor = Position::new(player.x, height.saturating_sub(1), player.z);
        Ok(self.set_anchor(ctx, anchor)?.then_some(anchor))
    }

    /// Claim `anchor` and move there. Refused once the miner is no longer
    /// RUNNING or a stop is raised.
    fn set_anchor(&mut self, ctx: &AgentContext, anchor: Position) -> Result<bool, AgentError> {
        if !ctx.claim_while(&[AgentState::Running], anchor) {
            debug!(agent = MINER, %anchor, state = %ctx.state(), "anchor not claimed");
            self.anchor = None;
            return Ok(false);
        }
        self.anchor = Some(anchor);
        info!(agent = MINER, %anchor, strategy = self.strategy.name(), "anchor set");
        if self.markers {
            mark(ctx.world(), anchor.offset(-2, 1, -2), colors::ORANGE, MINER)?;
        }
        Ok(true)
    }

    fn rebuild_strategy(&mut self) -> Result<&'static str, AgentError> {
        self.strategy = self.registry.build()?;
        info!(agent = MINER, strategy = self.strategy.name(), "strategy selected");
        Ok(self.strategy.name())
    }

    fn start_mining(&mut self, ctx: &AgentContext) -> Result<Option<String>, AgentError> {
        if self.requirements.is_empty() {
            warn!(agent = MINER, "start requested without requirements");
            return Ok(Some(format!(
                "{MINER} has no requirements yet; start the explorer and builder first"
            )));
        }
        self.mining = true;
        if ctx.state() != AgentState::Running {
            ctx.apply(LifecycleCommand::Start)?;
        }
        self.ensure_anchor(ctx)?;
        Ok(Some(format!("{MINER} mining with {}", self.strategy.name())))
    }

    fn mine_once(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        let Some(anchor) = self.ensure_anchor(ctx)? else {
            return Ok(());
        };
        let report = self.strategy.mine(&MiningJob {
            world: ctx.world(),
            control: ctx.control(),
            anchor,
            inventory: &self.inventory,
            requirements: &self.requirements,
        })?;
        merge(&mut self.inventory, &report.collected)?;
        if !report.collected.is_empty() {
            info!(agent = MINER, collected = ?report.collected, mined = report.blocks_mined, "collected");
        }
        ctx.publish(
            kinds::INVENTORY,
            BUILDER,
            &InventoryPayload {
                inventory: self.inventory.clone(),
                delivered: false,
            },
        )?;

        let state = ctx.state();
        if ctx.control().is_halted() || state != AgentState::Running {
            debug!(agent = MINER, %state, outcome = ?report.outcome, "pass ended outside RUNNING");
            if state.is_terminal() {
                self.anchor = None;
            }
            return Ok(());
        }
        match report.outcome {
            MiningOutcome::Satisfied => self.deliver(ctx)?,
            MiningOutcome::Exhausted => self.descend(ctx, anchor)?,
            MiningOutcome::FloorReached => self.dead_end(ctx, anchor),
            MiningOutcome::Stopped => debug!(agent = MINER, "mining interrupted"),
        }
        Ok(())
    }

    fn descend(&mut self, ctx: &AgentContext, anchor: Position) -> Result<(), AgentError> {
        let depth = self.strategy.descent();
        let next = anchor.offset(0, depth.saturating_neg(), 0);
        if depth <= 0 || next.y < self.settings.floor_y {
            self.dead_end(ctx, anchor);
            return Ok(());
        }
        debug!(agent = MINER, from = %anchor, to = %next, "descending");
        self.set_anchor(ctx, next)?;
        Ok(())
    }

    fn dead_end(&mut self, ctx: &AgentContext, anchor: Position) {
        self.anchor = None;
        if ctx
            .transition_if(&[AgentState::Running], AgentState::Stopped, format!("dead end at {anchor}"))
            .is_none()
        {
            return;
        }
        self.mining = false;
        warn!(agent = MINER, %anchor, inventory = ?self.inventory, "dead end");
        ctx.chat(&format!("[{MINER}] dead end at {anchor}: requirements not met"));
    }

    /// Hand over exactly the required quantities and discard the rest.
    /// Nothing is handed over once the miner has left RUNNING.
    fn deliver(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        if ctx
            .transition_if(&[AgentState::Running], AgentState::Waiting, "requirements met")
            .is_none()
        {
            return Ok(());
        }
        let provided = provided_for(&self.inventory, &self.requirements);
        let surplus = drain_all(&mut self.inventory);
        self.mining = false;
        self.drop_anchor(ctx);
        ctx.publish(
            kinds::INVENTORY,
            BUILDER,
            &InventoryPayload {
                inventory: provided.clone(),
                delivered: true,
            },
        )?;
        info!(agent = MINER, provided = ?provided, held = ?surplus, "materials delivered");
        Ok(())
    }

    fn adopt_requirements(
        &mut self,
        ctx: &AgentContext,
        payload: RequirementsPayload,
    ) -> Result<(), AgentError> {
        info!(agent = MINER, needs = ?payload.needs, "requirements received");
        self.requirements = payload.needs;
        self.drop_anchor(ctx);
        self.strategy.reset();
        let revived = ctx.transition_if(
            &[AgentState::Idle, AgentState::Waiting, AgentState::Stopped, AgentState::Error],
            AgentState::Idle,
            "requirements received",
        );
        if revived.is_some() {
            ctx.control().clear();
        }
        if ctx.workflow_mode() && ctx.state() != AgentState::Paused {
            self.start_mining(ctx)?;
        }
        Ok(())
    }
}

impl Agent for MinerBot {
    fn perceive(&mut self, _ctx: &AgentContext) -> Result<(), AgentError> {
        debug!(agent = MINER, inventory = ?self.inventory, "inventory");
        Ok(())
    }

    fn decide(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        self.next = if ctx.state() != AgentState::Running || !self.mining {
            Plan::Nothing
        } else if self.requirements_met() {
            Plan::Deliver
        } else {
            Plan::Mine
        };
        Ok(())
    }

    fn act(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        match core::mem::replace(&mut self.next, Plan::Nothing) {
            Plan::Nothing => Ok(()),
            Plan::Mine => self.mine_once(ctx),
            Plan::Deliver => self.deliver(ctx),
        }
    }

    fn on_message(&mut self, ctx: &AgentContext, message: &Message) -> Result<(), AgentError> {
        match message.kind.as_str() {
            kinds::MATERIALS_REQUIREMENTS => {
                let payload: RequirementsPayload = message.decode_payload()?;
                self.adopt_requirements(ctx, payload)
            }
            kinds::BUILD_COMPLETE => {
                info!(agent = MINER, "build complete, mining stopped");
                self.mining = false;
                ctx.transition_if(
                    &[AgentState::Idle, AgentState::Running, AgentState::Paused, AgentState::Waiting],
                    AgentState::Stopped,
                    "build complete",
                );
                Ok(())
            }
            kinds::WORKFLOW_RESET => {
                self.reset(ctx);
                ctx.apply(LifecycleCommand::Reset)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn command_names(&self) -> &'static [&'static str] {
        &["start", "switch", "strategy", "strategies"]
    }

    fn handle_command(
        &mut self,
        ctx: &AgentContext,
        name: &str,
        args: &CommandArgs,
    ) -> Result<Option<String>, AgentError> {
        match name {
            "start" => self.start_mining(ctx),
            "switch" => {
                self.registry.cycle();
                let selected = self.rebuild_strategy()?;
                Ok(Some(format!("{MINER} strategy is now {selected}")))
            }
            "strategy" => {
                if let Some(index) = index_arg(args, "index")? {
                    self.registry.select_index(index)?;
                } else if let Some(wanted) = text_arg(args, "name").or_else(|| text_arg(args, "arg0")) {
                    self.registry.select_name(&wanted)?;
                } else {
                    return Err(AgentError::InvalidArgument {
                        name: "name".to_owned(),
                        reason: "expected name=<strategy> or index=<n>".to_owned(),
                    });
                }
                let selected = self.rebuild_strategy()?;
                Ok(Some(format!("{MINER} strategy is now {selected}")))
            }
            "strategies" => {
                let selected = self.registry.selected();
                let listing: Vec<String> = self
                    .registry
                    .list()
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let marker = if name == selected { "*" } else { "" };
                        format!("{i}:{name}{marker}")
                    })
                    .collect();
                Ok(Some(format!("{MINER} strategies: {}", listing.join(", "))))
            }
            other => Err(AgentError::UnknownCommand {
                agent: MINER.to_owned(),
                command: other.to_owned(),
            }),
        }
    }

    fn reset(&mut self, ctx: &AgentContext) {
        self.requirements.clear();
        self.inventory.clear();
        self.drop_anchor(ctx);
        self.mining = false;
        self.next = Plan::Nothing;
        self.strategy.reset();
    }

    fn status(&self, ctx: &AgentContext) -> Value {
        json!({
            "strategy": self.strategy.status(ctx.control()),
            "requirements": self.requirements,
            "inventory": self.inventory,
            "anchor": self.anchor,
            "mining": self.mining,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use craftbots_events::{DEFAULT_POLL_INTERVAL, MessageBus};
    use craftbots_types::Material;
    use craftbots_world::{ClaimRegistry, MemoryWorld, SharedWorld};

    use super::*;
    use crate::command::ArgValue;
    use crate::runtime::{AgentDeps, SystemFlags};

    fn context(world: MemoryWorld, workflow: bool) -> AgentContext {
        let flags = SystemFlags::new();
        flags.set_workflow_mode(workflow);
        AgentContext::new(
            MINER,
            AgentDeps {
                bus: MessageBus::start(DEFAULT_POLL_INTERVAL).unwrap(),
                world: SharedWorld::new(world),
                claims: ClaimRegistry::new(),
                flags,
            },
        )
    }

    fn record(ctx: &AgentContext) -> Arc<Mutex<Vec<Message>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        ctx.bus().subscribe("recorder", move |m: &Message| {
            sink.lock().unwrap().push(m.clone());
            Ok(())
        });
        seen
    }

    fn tick(bot: &mut MinerBot, ctx: &AgentContext) {
        bot.perceive(ctx).unwrap();
        bot.decide(ctx).unwrap();
        bot.act(ctx).unwrap();
    }

    fn request(needs: Requirements) -> Message {
        Message::with_payload(
            kinds::MATERIALS_REQUIREMENTS,
            BUILDER,
            MINER,
            &RequirementsPayload { needs, zone: None },
        )
        .unwrap()
    }

    fn platform_needs() -> Requirements {
        Requirements::from([(Material::Dirt, 8), (Material::Stone, 8)])
    }

    #[test]
    fn delivers_exactly_what_was_asked() {
        let ctx = context(MemoryWorld::flat(10), false);
        let seen = record(&ctx);
        let mut bot = MinerBot::new(MinerSettings::default(), false).unwrap();
        bot.on_message(&ctx, &request(platform_needs())).unwrap();
        assert_eq!(ctx.state(), AgentState::Idle);

        bot.handle_command(&ctx, "start", &CommandArgs::new()).unwrap();
        assert_eq!(ctx.state(), AgentState::Running);
        assert_eq!(bot.anchor(), Some(Position::new(0, 9, 0)));
        assert_eq!(ctx.claims().get(MINER), Some(Position::new(0, 9, 0)));

        tick(&mut bot, &ctx);
        assert_eq!(ctx.state(), AgentState::Waiting);
        assert_eq!(ctx.reason(), "requirements met");
        assert!(bot.inventory().is_empty());
        assert_eq!(bot.anchor(), None);
        assert_eq!(ctx.claims().get(MINER), None);

        assert!(ctx.bus().wait_idle(Duration::from_secs(2)));
        let messages = seen.lock().unwrap();
        let delivery = messages
            .iter()
            .filter(|m| m.is_kind(kinds::INVENTORY))
            .map(|m| m.decode_payload::<InventoryPayload>().unwrap())
            .find(|p| p.delivered)
            .unwrap();
        assert_eq!(delivery.inventory, platform_needs());
    }

    #[test]
    fn delivery_after_a_stop_keeps_the_inventory() {
        let ctx = context(MemoryWorld::flat(10), false);
        let seen = record(&ctx);
        let mut bot = MinerBot::new(MinerSettings::default(), false).unwrap();
        bot.on_message(&ctx, &request(platform_needs())).unwrap();
        bot.handle_command(&ctx, "start", &CommandArgs::new()).unwrap();
        bot.inventory = platform_needs();

        ctx.apply(LifecycleCommand::Stop).unwrap();
        bot.deliver(&ctx).unwrap();
        assert_eq!(ctx.state(), AgentState::Stopped);
        assert_eq!(ctx.reason(), "stop");
        assert_eq!(bot.inventory(), &platform_needs());

        assert!(ctx.bus().wait_idle(Duration::from_secs(2)));
        assert!(!seen.lock().unwrap().iter().any(|m| m.is_kind(kinds::INVENTORY)));
    }

    #[test]
    fn start_without_requirements_only_replies() {
        let ctx = context(MemoryWorld::flat(10), false);
        let mut bot = MinerBot::new(MinerSettings::default(), false).unwrap();
        let reply = bot.handle_command(&ctx, "start", &CommandArgs::new()).unwrap().unwrap();
        assert!(reply.contains("no requirements"));
        assert_eq!(ctx.state(), AgentState::Idle);
    }

    #[test]
    fn exhausted_pass_moves_the_anchor_down() {
        let ctx = context(MemoryWorld::flat(10), false);
        let settings = MinerSettings {
            floor_y: 0,
            ..MinerSettings::default()
        };
        let mut bot = MinerBot::new(settings, false).unwrap();
        bot.on_message(&ctx, &request(Requirements::from([(Material::Stone, 100)])))
            .unwrap();
        bot.handle_command(&ctx, "start", &CommandArgs::new()).unwrap();
        tick(&mut bot, &ctx);

        assert_eq!(ctx.state(), AgentState::Running);
        assert_eq!(bot.inventory().get(&Material::Stone), Some(&16));
        assert_eq!(bot.anchor(), Some(Position::new(0, 5, 0)));
        assert_eq!(ctx.claims().get(MINER), Some(Position::new(0, 5, 0)));
    }

    #[test]
    fn dead_end_stops_and_reports() {
        let world = MemoryWorld::flat(10);
        let chat = world.chat();
        let ctx = context(world, false);
        let mut bot = MinerBot::new(MinerSettings::default(), false).unwrap();
        bot.on_message(&ctx, &request(Requirements::from([(Material::Stone, 100)])))
            .unwrap();
        bot.handle_command(&ctx, "start", &CommandArgs::new()).unwrap();
        tick(&mut bot, &ctx);

        assert_eq!(ctx.state(), AgentState::Stopped);
        assert_eq!(ctx.reason(), "dead end at (0, 9, 0)");
        assert!(chat.contains("dead end"));
        assert_eq!(ctx.claims().get(MINER), None);
    }

    #[test]
    fn workflow_starts_on_requirements() {
        let ctx = context(MemoryWorld::flat(10), true);
        let mut bot = MinerBot::new(MinerSettings::default(), false).unwrap();
        bot.on_message(&ctx, &request(platform_needs())).unwrap();
        assert_eq!(ctx.state(), AgentState::Running);
        tick(&mut bot, &ctx);
        assert_eq!(ctx.state(), AgentState::Waiting);
    }

    #[test]
    fn build_complete_stops_mining() {
        let ctx = context(MemoryWorld::flat(10), true);
        let mut bot = MinerBot::new(MinerSettings::default(), false).unwrap();
        bot.on_message(&ctx, &request(platform_needs())).unwrap();
        let done = Message::new(kinds::BUILD_COMPLETE, BUILDER, MINER, json!({}));
        bot.on_message(&ctx, &done).unwrap();
        assert_eq!(ctx.state(), AgentState::Stopped);
        assert_eq!(ctx.reason(), "build complete");
    }

    #[test]
    fn strategy_commands() {
        let ctx = context(MemoryWorld::flat(10), false);
        let mut bot = MinerBot::new(MinerSettings::default(), false).unwrap();
        let listing = bot
            .handle_command(&ctx, "strategies", &CommandArgs::new())
            .unwrap()
            .unwrap();
        assert!(listing.ends_with("0:grid*, 1:vertical"));

        let args = CommandArgs::from([("arg0".to_owned(), ArgValue::Text("vertical".to_owned()))]);
        bot.handle_command(&ctx, "strategy", &args).unwrap();
        assert_eq!(bot.strategy_name(), "vertical");

        bot.handle_command(&ctx, "switch", &CommandArgs::new()).unwrap();
        assert_eq!(bot.strategy_name(), "grid");

        let bad = CommandArgs::from([("index".to_owned(), ArgValue::Int(7))]);
        assert!(matches!(
            bot.handle_command(&ctx, "strategy", &bad),
            Err(AgentError::UnknownStrategy(_))
        ));
    }
}
