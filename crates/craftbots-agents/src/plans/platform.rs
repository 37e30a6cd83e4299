use craftbots_types::{Material, PlannedBlock, Position};

use super::BuildPlan;

/// A 4×4 slab one block above the origin: two columns of dirt, two of
/// stone.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformPlan;

impl PlatformPlan {
    /// Registry name.
    pub const NAME: &'static str = "platform";
}

impl BuildPlan for PlatformPlan {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, origin: Position) -> Vec<PlannedBlock> {
        let mut blocks = Vec::with_capacity(16);
        for dx in 0..4 {
            for dz in 0..4 {
                let material = if dx < 2 { Material::Dirt } else { Material::Stone };
                blocks.push(PlannedBlock {
                    position: origin.offset(dx, 1, dz),
                    material,
                });
            }
        }
        blocks
    }
}
