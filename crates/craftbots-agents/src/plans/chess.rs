use craftbots_types::{Material, PlannedBlock, Position};

use super::BuildPlan;

const SIDE: i32 = 6;

/// A 6×6 checkerboard of stone and dirt one block above the origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChessPlan;

impl ChessPlan {
    /// Registry name.
    pub const NAME: &'static str = "chess";
}

impl BuildPlan for ChessPlan {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, origin: Position) -> Vec<PlannedBlock> {
        (0..SIDE)
            .flat_map(|dx| (0..SIDE).map(move |dz| (dx, dz)))
            .map(|(dx, dz)| PlannedBlock {
                position: origin.offset(dx, 1, dz),
                material: if (dx ^ dz) & 1 == 0 {
                    Material::Stone
                } else {
                    Material::Dirt
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squares_alternate() {
        let blocks = ChessPlan.generate(Position::new(0, 0, 0));
        assert_eq!(blocks.len(), 36);
        assert_eq!(blocks.first().map(|b| b.material), Some(Material::Stone));
        assert_eq!(blocks.get(1).map(|b| b.material), Some(Material::Dirt));
        assert_eq!(blocks.get(6).map(|b| b.material), Some(Material::Dirt));
    }
}
