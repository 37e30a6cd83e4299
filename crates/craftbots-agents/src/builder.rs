//! `BuilderBot`: the build plan executor.
//!
//! One block is placed per RUNNING tick. The build index only moves forward
//! within a session and is the single record of progress. A shortage parks
//! the builder in WAITING; in workflow mode it re-requests what is missing
//! and resumes by itself once a delivery covers the rest of the plan.

use std::time::{Duration, Instant};

use craftbots_types::{
    AgentState, BROADCAST_TARGET, BuildCompletePayload, BuildProgressPayload, Inventory,
    InventoryPayload, MapPayload, Message, PlannedBlock, Position, Requirements,
    RequirementsPayload, kinds,
};
use craftbots_world::{colors, mark};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::command::{CommandArgs, index_arg, text_arg};
use crate::config::BuilderSettings;
use crate::error::AgentError;
use crate::fsm::LifecycleCommand;
use crate::inventory::{has_material, merge, outstanding, remove_material, satisfies};
use crate::miner::MINER;
use crate::plans::{PlanRegistry, bom_of};
use crate::runtime::{Agent, AgentContext};

/// Registry name and routing target.
pub const BUILDER: &str = "BuilderBot";

/// A generated plan and how far it got.
#[derive(Debug, Clone)]
struct Session {
    plan: String,
    blocks: Vec<PlannedBlock>,
    index: usize,
}

impl Session {
    fn remaining(&self) -> &[PlannedBlock] {
        self.blocks.get(self.index..).unwrap_or_default()
    }

    fn is_done(&self) -> bool {
        self.index >= self.blocks.len()
    }
}

/// What the next `act` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Nothing,
    Prepare,
    Place,
    Resume,
}

/// Places the selected plan at the zone published by the explorer.
#[derive(Debug)]
pub struct BuilderBot {
    settings: BuilderSettings,
    markers: bool,
    plans: PlanRegistry,
    zone: Option<Position>,
    session: Option<Session>,
    inventory: Inventory,
    completed: bool,
    last_request: Option<Instant>,
    next: Step,
}

impl BuilderBot {
    /// An idle builder. Extra plans are loaded from `settings.plans_dir`
    /// when it is set.
    pub fn new(settings: BuilderSettings, markers: bool) -> Result<Self, AgentError> {
        let mut plans = PlanRegistry::new();
        if let Some(dir) = &settings.plans_dir {
            plans.load_dir(dir)?;
        }
        if plans.select_name(&settings.plan).is_err() {
            warn!(plan = %settings.plan, "unknown plan configured, using the default");
        }
        Ok(Self {
            settings,
            markers,
            plans,
            zone: None,
            session: None,
            inventory: Inventory::new(),
            completed: false,
            last_request: None,
            next: Step::Nothing,
        })
    }

    /// Zone to build on.
    pub const fn zone(&self) -> Option<Position> {
        self.zone
    }

    /// Set the zone directly, as a `map.v1` would.
    pub fn set_zone(&mut self, zone: Position) {
        self.zone = Some(zone);
    }

    /// Materials on hand.
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Add delivered materials.
    pub fn receive(&mut self, delivered: &Inventory) -> Result<(), AgentError> {
        merge(&mut self.inventory, delivered)
    }

    /// Blocks placed in the current session.
    pub fn build_index(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.index)
    }

    /// Blocks in the current session's plan.
    pub fn plan_len(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.blocks.len())
    }

    /// Whether the last session finished.
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Name of the selected plan.
    pub fn plan_name(&self) -> &str {
        self.plans.selected()
    }

    /// Materials still needed for the rest of the plan: the whole bill of
    /// materials before a plan is generated.
    pub fn remaining_needs(&self) -> Result<Requirements, AgentError> {
        match &self.session {
            Some(session) => bom_of(session.remaining()),
            None => self.plans.build()?.bom(),
        }
    }

    /// Whether a zone is known and the inventory covers the rest of the plan.
    pub fn is_ready(&self) -> Result<bool, AgentError> {
        Ok(self.zone.is_some() && satisfies(&self.inventory, &self.remaining_needs()?))
    }

    fn clear_session(&mut self) {
        self.session = None;
        self.inventory.clear();
        self.completed = false;
        self.last_request = None;
        self.next = Step::Nothing;
    }

    fn prepare(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        let Some(zone) = self.zone else {
            ctx.transition_if(&[AgentState::Running], AgentState::Waiting, "no zone to build on");
            return Ok(());
        };
        let plan = self.plans.build()?;
        let blocks = plan.generate(zone);
        if self.markers {
            mark(ctx.world(), zone.offset(0, 2, 0), colors::LIME, BUILDER)?;
        }
        info!(agent = BUILDER, plan = plan.name(), blocks = blocks.len(), %zone, "build plan generated");
        self.session = Some(Session {
            plan: plan.name().to_owned(),
            blocks,
            index: 0,
        });
        self.completed = false;
        if !self.is_ready()?
            && ctx
                .transition_if(&[AgentState::Running], AgentState::Waiting, "waiting for materials")
                .is_some()
        {
            self.request_materials(ctx, true)?;
        }
        Ok(())
    }

    /// Ask the miner for what is still missing, at most once per cooldown
    /// unless `force` is set.
    fn request_materials(&mut self, ctx: &AgentContext, force: bool) -> Result<(), AgentError> {
        let cooldown = Duration::from_millis(self.settings.request_cooldown_ms);
        if !force && self.last_request.is_some_and(|at| at.elapsed() < cooldown) {
            debug!(agent = BUILDER, "material request suppressed by cooldown");
            return Ok(());
        }
        let needs = outstanding(&self.inventory, &self.remaining_needs()?);
        if needs.is_empty() {
            return Ok(());
        }
        info!(agent = BUILDER, needs = ?needs, "requesting materials");
        ctx.publish(
            kinds::MATERIALS_REQUIREMENTS,
            MINER,
            &RequirementsPayload {
                needs,
                zone: self.zone,
            },
        )?;
        self.last_request = Some(Instant::now());
        Ok(())
    }

    fn place_next(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let Some(block) = session.blocks.get(session.index).copied() else {
            return Ok(());
        };
        if !has_material(&self.inventory, block.material, 1) {
            warn!(agent = BUILDER, material = %block.material, index = session.index, "material shortage");
            let parked = ctx.transition_if(
                &[AgentState::Running],
                AgentState::Waiting,
                format!("short of {}", block.material),
            );
            if parked.is_some() && ctx.workflow_mode() {
                self.request_materials(ctx, false)?;
            }
            return Ok(());
        }

        ctx.world().set_material(block.position, block.material)?;
        remove_material(&mut self.inventory, block.material, 1)?;
        session.index = session.index.saturating_add(1);
        debug!(agent = BUILDER, material = %block.material, position = %block.position, "block placed");

        let progress = BuildProgressPayload {
            plan: session.plan.clone(),
            placed: session.index,
            total: session.blocks.len(),
        };
        let done = session.is_done();
        let plan = session.plan.clone();
        ctx.publish(kinds::BUILD_PROGRESS, BROADCAST_TARGET, &progress)?;
        if done {
            self.complete(ctx, plan)?;
        }
        Ok(())
    }

    fn complete(&mut self, ctx: &AgentContext, plan: String) -> Result<(), AgentError> {
        let Some(zone) = self.zone else {
            return Ok(());
        };
        info!(agent = BUILDER, plan = %plan, %zone, "build complete");
        self.completed = true;
        ctx.publish(kinds::BUILD_COMPLETE, MINER, &BuildCompletePayload { plan, zone })?;
        ctx.transition_if(&[AgentState::Running], AgentState::Waiting, "build complete");
        Ok(())
    }

    fn adopt_zone(&mut self, ctx: &AgentContext, zone: Position) -> Result<(), AgentError> {
        info!(agent = BUILDER, %zone, "zone received");
        self.zone = Some(zone);
        self.clear_session();
        ctx.control().clear();
        ctx.set_state(AgentState::Idle, "zone received");
        ctx.chat(&format!(
            "[{BUILDER}] zone received at {zone}; use -builder build to start"
        ));
        if ctx.workflow_mode() {
            ctx.apply(LifecycleCommand::Start)?;
            self.prepare(ctx)?;
        }
        Ok(())
    }

    fn can_resume(&self, ctx: &AgentContext) -> Result<bool, AgentError> {
        Ok(ctx.workflow_mode()
            && ctx.state() == AgentState::Waiting
            && !self.completed
            && self.session.is_some()
            && self.is_ready()?)
    }

    fn start_build(&mut self, ctx: &AgentContext) -> Result<Option<String>, AgentError> {
        let Some(zone) = self.zone else {
            return Err(AgentError::InvalidArgument {
                name: "zone".to_owned(),
                reason: "no zone yet; run -explorer start first".to_owned(),
            });
        };
        if self.completed {
            self.session = None;
            self.completed = false;
        }
        if ctx.state() != AgentState::Running {
            ctx.apply(LifecycleCommand::Start)?;
        }
        Ok(Some(format!("{BUILDER} building {} at {zone}", self.plans.selected())))
    }

    fn switch_plan(&mut self) -> String {
        self.session = None;
        self.completed = false;
        info!(agent = BUILDER, plan = self.plans.selected(), "plan selected");
        format!("{BUILDER} plan is now {}", self.plans.selected())
    }
}

impl Agent for BuilderBot {
    fn perceive(&mut self, _ctx: &AgentContext) -> Result<(), AgentError> {
        debug!(agent = BUILDER, inventory = ?self.inventory, "materials on hand");
        Ok(())
    }

    fn decide(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        self.next = match ctx.state() {
            AgentState::Running if self.completed => Step::Nothing,
            AgentState::Running if self.session.is_none() => Step::Prepare,
            AgentState::Running => Step::Place,
            AgentState::Waiting if self.can_resume(ctx)? => Step::Resume,
            _ => Step::Nothing,
        };
        Ok(())
    }

    fn act(&mut self, ctx: &AgentContext) -> Result<(), AgentError> {
        match core::mem::replace(&mut self.next, Step::Nothing) {
            Step::Nothing => Ok(()),
            Step::Prepare => self.prepare(ctx),
            Step::Place => self.place_next(ctx),
            Step::Resume => {
                ctx.transition_if(&[AgentState::Waiting], AgentState::Running, "materials received");
                Ok(())
            }
        }
    }

    fn on_message(&mut self, ctx: &AgentContext, message: &Message) -> Result<(), AgentError> {
        match message.kind.as_str() {
            kinds::MAP => {
                let payload: MapPayload = message.decode_payload()?;
                self.adopt_zone(ctx, payload.zone)
            }
            kinds::INVENTORY => {
                let payload: InventoryPayload = message.decode_payload()?;
                if !payload.delivered {
                    debug!(agent = BUILDER, progress = ?payload.inventory, "miner progress");
                    return Ok(());
                }
                self.receive(&payload.inventory)?;
                info!(agent = BUILDER, received = ?payload.inventory, "materials received");
                if self.can_resume(ctx)? {
                    ctx.transition_if(&[AgentState::Waiting], AgentState::Running, "materials received");
                }
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
        &["build", "switchplan", "plan"]
    }

    fn handle_command(
        &mut self,
        ctx: &AgentContext,
        name: &str,
        args: &CommandArgs,
    ) -> Result<Option<String>, AgentError> {
        match name {
            "build" => self.start_build(ctx),
            "switchplan" => {
                self.plans.cycle();
                Ok(Some(self.switch_plan()))
            }
            "plan" => {
                if let Some(index) = index_arg(args, "index")? {
                    self.plans.select_index(index)?;
                } else if let Some(wanted) = text_arg(args, "name").or_else(|| text_arg(args, "arg0")) {
                    self.plans.select_name(&wanted)?;
                } else {
                    return Ok(Some(format!(
                        "{BUILDER} plans: {} (selected: {})",
                        self.plans.list().join(", "),
                        self.plans.selected()
                    )));
                }
                Ok(Some(self.switch_plan()))
            }
            other => Err(AgentError::UnknownCommand {
                agent: BUILDER.to_owned(),
                command: other.to_owned(),
            }),
        }
    }

    fn reset(&mut self, _ctx: &AgentContext) {
        self.zone = None;
        self.clear_session();
    }

    fn status(&self, _ctx: &AgentContext) -> Value {
        json!({
            "plan": self.plans.selected(),
            "zone": self.zone,
            "build_index": self.build_index(),
            "plan_len": self.plan_len(),
            "inventory": self.inventory,
            "completed": self.completed,
        })
    }
}
