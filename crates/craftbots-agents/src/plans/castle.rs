use craftbots_types::{Material, PlannedBlock, Position};

use super::BuildPlan;

const SIDE: i32 = 5;
const COURSES: i32 = 3;
const DOOR: (i32, i32) = (2, 0);

/// A 5×5 sandstone floor with a three-course stone wall around its edge and
/// a doorway in the middle of the front wall.
#[derive(Debug, Clone, Copy, Default)]
pub struct CastlePlan;

impl CastlePlan {
    /// Registry name.
    pub const NAME: &'static str = "castle";
}

const fn on_edge(d: i32) -> bool {
    d == 0 || d == SIDE.saturating_sub(1)
}

impl BuildPlan for CastlePlan {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, origin: Position) -> Vec<PlannedBlock> {
        let mut blocks = Vec::new();
        for dx in 0..SIDE {
            for dz in 0..SIDE {
                blocks.push(PlannedBlock {
                    position: origin.offset(dx, 1, dz),
                    material: Material::Sandstone,
                });
            }
        }
        for course in 0..COURSES {
            for dx in 0..SIDE {
                for dz in 0..SIDE {
                    if !(on_edge(dx) || on_edge(dz)) || (dx, dz) == DOOR {
                        continue;
                    }
                    blocks.push(PlannedBlock {
                        position: origin.offset(dx, course.saturating_add(2), dz),
                        material: Material::Stone,
                    });
                }
            }
        }
        blocks
    }
}
