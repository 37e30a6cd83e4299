use tracing::debug;

use super::{MiningJob, MiningOutcome, MiningReport, MiningStrategy, Session, StrategyStatus, Tally};
use crate::control::Control;
use crate::error::AgentError;

/// Scans a cube around the anchor in fixed strides.
///
/// x and z run over `0..size`, y over `-(size - 1)..size` relative to the
/// anchor, all with step `spacing`, column by column. A block is harvested
/// only while its yield is still needed, and the pass returns the moment
/// every requirement is met.
#[derive(Debug, Clone)]
pub struct GridStrategy {
    spacing: u32,
    size: u32,
    tally: Tally,
}

impl GridStrategy {
    /// Registry name.
    pub const NAME: &'static str = "grid";

    /// A grid of edge `size` with stride `spacing`. Both are clamped to at
    /// least one.
    pub fn new(spacing: u32, size: u32) -> Self {
        Self {
            spacing: spacing.max(1),
            size: size.max(1),
            tally: Tally::default(),
        }
    }

    fn offsets(&self) -> impl Iterator<Item = i32> + use<> {
        let size = i32::try_from(self.size).unwrap_or(i32::MAX);
        let step = usize::try_from(self.spacing).unwrap_or(usize::MAX);
        (0..size).step_by(step)
    }

    fn heights(&self) -> impl Iterator<Item = i32> + use<> {
        let size = i32::try_from(self.size).unwrap_or(i32::MAX);
        let step = usize::try_from(self.spacing).unwrap_or(usize::MAX);
        (size.saturating_sub(1).saturating_neg()..size).step_by(step)
    }
}

impl MiningStrategy for GridStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn mine(&mut self, job: &MiningJob<'_>) -> Result<MiningReport, AgentError> {
        let mut session = Session::new(job);
        if session.satisfied() {
            return session.finish(MiningOutcome::Satisfied, &mut self.tally);
        }
        let anchor = job.anchor;
        for dx in self.offsets() {
            for dz in self.offsets() {
                for dy in self.heights() {
                    if !session.proceed() {
                        debug!(strategy = Self::NAME, mined = session.blocks_mined, "stopped mid-scan");
                        return session.finish(MiningOutcome::Stopped, &mut self.tally);
                    }
                    let pos = anchor.offset(dx, dy, dz);
                    self.tally.position = Some(pos);
                    session.inspect(pos, false)?;
                    if session.satisfied() {
                        return session.finish(MiningOutcome::Satisfied, &mut self.tally);
                    }
                }
            }
        }
        debug!(strategy = Self::NAME, %anchor, mined = session.blocks_mined, "pass exhausted");
        session.finish(MiningOutcome::Exhausted, &mut self.tally)
    }

    fn reset(&mut self) {
        self.tally = Tally::default();
    }

    fn status(&self, control: &Control) -> StrategyStatus {
        self.tally.status(Self::NAME, control)
    }

    fn descent(&self) -> i32 {
        i32::try_from(self.size).unwrap_or(i32::MAX)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use craftbots_types::{Inventory, Material, Position, Requirements};
    use craftbots_world::{MemoryWorld, SharedWorld, WorldControl, WorldError};

    use super::*;

    const ANCHOR: Position = Position::new(0, 9, 0);

    fn requirements(pairs: &[(Material, u32)]) -> Requirements {
        pairs.iter().copied().collect()
    }

    fn mine(
        grid: &mut GridStrategy,
        world: &SharedWorld,
        control: &Control,
        held: &Inventory,
        needs: &Requirements,
    ) -> MiningReport {
        grid.mine(&MiningJob {
            world,
            control,
            anchor: ANCHOR,
            inventory: held,
            requirements: needs,
        })
        .unwrap()
    }

    /// Raises the stop signal during the `stop_at`-th block read.
    struct StopAfter {
        inner: MemoryWorld,
        reads: usize,
        stop_at: usize,
        control: Arc<Control>,
    }

    impl WorldControl for StopAfter {
        fn get_block(&mut self, pos: Position) -> Result<u16, WorldError> {
            self.reads = self.reads.saturating_add(1);
            if self.reads == self.stop_at {
                self.control.stop();
            }
            self.inner.get_block(pos)
        }

        fn set_block(&mut self, pos: Position, block: u16, data: Option<u8>) -> Result<(), WorldError> {
            self.inner.set_block(pos, block, data)
        }

        fn get_height(&mut self, x: i32, z: i32) -> Result<i32, WorldError> {
            self.inner.get_height(x, z)
        }

        fn player_position(&mut self) -> Result<Position, WorldError> {
            self.inner.player_position()
        }

        fn post_chat(&mut self, text: &str) -> Result<(), WorldError> {
            self.inner.post_chat(text)
        }
    }

    #[test]
    fn offsets_follow_size_and_spacing() {
        let grid = GridStrategy::new(2, 4);
        assert_eq!(grid.offsets().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(grid.heights().collect::<Vec<_>>(), vec![-3, -1, 1, 3]);
    }

    #[test]
    fn first_column_yields_stone_and_dirt() {
        let world = SharedWorld::new(MemoryWorld::flat(10));
        let control = Control::new();
        let inventory = Inventory::new();
        let needs = requirements(&[(Material::Dirt, 4), (Material::Stone, 1)]);
        let mut grid = GridStrategy::new(1, 4);
        let report = grid
            .mine(&MiningJob {
                world: &world,
                control: &control,
                anchor: Position::new(0, 9, 0),
                inventory: &inventory,
                requirements: &needs,
            })
            .unwrap();
        assert_eq!(report.outcome, MiningOutcome::Satisfied);
        assert_eq!(report.collected, needs);
        assert_eq!(world.get_material(Position::new(0, 10, 0)).unwrap(), Some(Material::Air));
        assert_eq!(world.get_material(Position::new(0, 6, 0)).unwrap(), Some(Material::Air));
        assert_eq!(world.get_material(Position::new(1, 10, 0)).unwrap(), Some(Material::Grass));
    }

    #[test]
    fn held_materials_count_toward_the_bill() {
        let world = SharedWorld::new(MemoryWorld::flat(10));
        let held = Inventory::from([(Material::Dirt, 3)]);
        let needs = requirements(&[(Material::Dirt, 4), (Material::Stone, 1)]);
        let report = mine(&mut GridStrategy::new(1, 4), &world, &Control::new(), &held, &needs);

        assert_eq!(report.outcome, MiningOutcome::Satisfied);
        assert_eq!(report.collected, requirements(&[(Material::Dirt, 1), (Material::Stone, 1)]));
        assert_eq!(report.blocks_mined, 2);
        assert_eq!(world.get_material(Position::new(0, 8, 0)).unwrap(), Some(Material::Dirt));
    }

    #[test]
    fn met_lines_are_left_in_the_ground() {
        let world = SharedWorld::new(MemoryWorld::flat(10));
        let held = Inventory::from([(Material::Dirt, 4)]);
        let needs = requirements(&[(Material::Dirt, 4), (Material::Stone, 2)]);
        let report = mine(&mut GridStrategy::new(1, 4), &world, &Control::new(), &held, &needs);

        assert_eq!(report.outcome, MiningOutcome::Satisfied);
        assert_eq!(report.collected, requirements(&[(Material::Stone, 2)]));
        assert_eq!(report.collected.get(&Material::Dirt), None);
        for y in 7..=9 {
            assert_eq!(world.get_material(Position::new(0, y, 0)).unwrap(), Some(Material::Dirt));
        }
        assert_eq!(world.get_material(Position::new(0, 10, 0)).unwrap(), Some(Material::Grass));
    }

    #[test]
    fn empty_requirements_harvest_everything_in_reach() {
        // A 2-wide grid around y 9 covers y 8..=10 in four columns.
        let world = SharedWorld::new(MemoryWorld::flat(10));
        let report = mine(
            &mut GridStrategy::new(1, 2),
            &world,
            &Control::new(),
            &Inventory::new(),
            &Requirements::new(),
        );

        assert_eq!(report.outcome, MiningOutcome::Exhausted);
        assert_eq!(report.collected, requirements(&[(Material::Dirt, 12)]));
        assert_eq!(report.blocks_mined, 12);
        assert_eq!(world.get_material(Position::new(1, 10, 1)).unwrap(), Some(Material::Air));
        assert_eq!(world.get_material(Position::new(0, 7, 0)).unwrap(), Some(Material::Dirt));
    }

    #[test]
    fn stop_reports_exactly_the_blocks_cleared() {
        let control = Arc::new(Control::new());
        let world = SharedWorld::new(StopAfter {
            inner: MemoryWorld::flat(10),
            reads: 0,
            stop_at: 10,
            control: Arc::clone(&control),
        });
        let needs = requirements(&[(Material::Dirt, 8), (Material::Stone, 8)]);
        let mut grid = GridStrategy::new(1, 4);
        let report = mine(&mut grid, &world, &control, &Inventory::new(), &needs);

        // Ten reads: a full first column, then y 6..=8 of the second.
        assert_eq!(report.outcome, MiningOutcome::Stopped);
        assert_eq!(report.collected, requirements(&[(Material::Dirt, 6), (Material::Stone, 2)]));
        assert_eq!(report.collected.values().sum::<u32>(), report.blocks_mined);
        assert_eq!(world.get_material(Position::new(0, 9, 1)).unwrap(), Some(Material::Dirt));

        let status = grid.status(&control);
        assert!(status.stopped);
        assert_eq!(status.collected, report.collected);
        assert_eq!(status.blocks_mined, 8);
    }
}
