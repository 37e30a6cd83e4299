use tracing::debug;

use super::{MiningJob, MiningOutcome, MiningReport, MiningStrategy, Session, Step, StrategyStatus, Tally};
use crate::control::Control;
use crate::error::AgentError;

/// Drills the single column under the anchor.
///
/// Every breakable block on the way down is cleared; only useful yields are
/// credited. Drilling stops above `floor_y`, at bedrock, or once the
/// requirements are met.
#[derive(Debug, Clone)]
pub struct VerticalStrategy {
    floor_y: i32,
    tally: Tally,
}

impl VerticalStrategy {
    /// Registry name.
    pub const NAME: &'static str = "vertical";

    /// A drill that never goes below `floor_y`.
    pub fn new(floor_y: i32) -> Self {
        Self {
            floor_y,
            tally: Tally::default(),
        }
    }
}

impl MiningStrategy for VerticalStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn mine(&mut self, job: &MiningJob<'_>) -> Result<MiningReport, AgentError> {
        let mut session = Session::new(job);
        if session.satisfied() {
            return session.finish(MiningOutcome::Satisfied, &mut self.tally);
        }
        let mut pos = job.anchor;
        while pos.y > self.floor_y {
            if !session.proceed() {
                debug!(strategy = Self::NAME, %pos, "stopped mid-drill");
                return session.finish(MiningOutcome::Stopped, &mut self.tally);
            }
            self.tally.position = Some(pos);
            if session.inspect(pos, true)? == Step::Blocked {
                debug!(strategy = Self::NAME, %pos, "hit bedrock");
                return session.finish(MiningOutcome::FloorReached, &mut self.tally);
            }
            if session.satisfied() {
                return session.finish(MiningOutcome::Satisfied, &mut self.tally);
            }
            pos = pos.offset(0, -1, 0);
        }
        debug!(strategy = Self::NAME, floor_y = self.floor_y, "reached floor");
        session.finish(MiningOutcome::FloorReached, &mut self.tally)
    }

    fn reset(&mut self) {
        self.tally = Tally::default();
    }

    fn status(&self, control: &Control) -> StrategyStatus {
        self.tally.status(Self::NAME, control)
    }

    fn descent(&self) -> i32 {
        0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use craftbots_types::{Inventory, Material, Position, Requirements};
    use craftbots_world::{MemoryWorld, SharedWorld};

    use super::*;

    fn run(world: &SharedWorld, needs: &Requirements, floor_y: i32) -> MiningReport {
        let control = Control::new();
        let inventory = Inventory::new();
        VerticalStrategy::new(floor_y)
            .mine(&MiningJob {
                world,
                control: &control,
                anchor: Position::new(0, 10, 0),
                inventory: &inventory,
                requirements: needs,
            })
            .unwrap()
    }

    #[test]
    fn drills_to_floor_crediting_only_needed() {
        let world = SharedWorld::new(MemoryWorld::flat(10));
        let needs: Requirements = [(Material::Stone, 10)].into_iter().collect();
        let report = run(&world, &needs, 3);
        // y 10..=4: grass and three dirt cleared, three stone credited
        assert_eq!(report.outcome, MiningOutcome::FloorReached);
        assert_eq!(report.blocks_mined, 7);
        assert_eq!(report.collected.get(&Material::Stone), Some(&3));
        assert_eq!(report.collected.get(&Material::Dirt), None);
        assert_eq!(world.get_material(Position::new(0, 3, 0)).unwrap(), Some(Material::Stone));
    }

    #[test]
    fn stops_at_bedrock() {
        let world = SharedWorld::new(
            MemoryWorld::flat(10).with_block(Position::new(0, 8, 0), Material::Bedrock),
        );
        let report = run(&world, &Requirements::new(), 0);
        assert_eq!(report.outcome, MiningOutcome::FloorReached);
        assert_eq!(report.blocks_mined, 2);
        assert_eq!(report.collected.get(&Material::Dirt), Some(&2));
    }

    #[test]
    fn stops_once_satisfied() {
        let world = SharedWorld::new(MemoryWorld::flat(10));
        let needs: Requirements = [(Material::Dirt, 2)].into_iter().collect();
        let report = run(&world, &needs, 0);
        assert_eq!(report.outcome, MiningOutcome::Satisfied);
        assert_eq!(report.blocks_mined, 2);
        assert_eq!(world.get_material(Position::new(0, 8, 0)).unwrap(), Some(Material::Dirt));
    }
}
