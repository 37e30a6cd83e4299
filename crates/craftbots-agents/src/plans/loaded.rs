use std::fs::File;
use std::io::Read;
use std::path::Path;

use craftbots_types::{Material, PlannedBlock, Position};
use tracing::debug;

use super::BuildPlan;
use crate::error::AgentError;

/// One relative placement from a plan file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Offset {
    dx: i32,
    dy: i32,
    dz: i32,
    material: Material,
}

/// A plan read from a CSV file with a `dx,dy,dz,material` header.
///
/// A row is kept only when the three offsets parse as integers and the
/// material names a known block; anything else is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPlan {
    name: String,
    rows: Vec<Offset>,
}

impl CsvPlan {
    /// Load `path`, naming the plan after the file stem.
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| AgentError::PlanLoad {
                path: path.to_path_buf(),
                reason: "file name is not valid UTF-8".to_owned(),
            })?;
        let file = File::open(path).map_err(|err| AgentError::PlanLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Self::parse(name, file).map_err(|err| match err {
            AgentError::PlanLoad { reason, .. } => AgentError::PlanLoad {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse plan rows from any reader.
    pub fn parse(name: &str, reader: impl Read) -> Result<Self, AgentError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let fail = |reason: String| AgentError::PlanLoad {
            path: name.into(),
            reason,
        };

        let headers = csv.headers().map_err(|err| fail(err.to_string()))?.clone();
        let column = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| fail(format!("missing `{wanted}` column")))
        };
        let (cx, cy, cz, cm) = (column("dx")?, column("dy")?, column("dz")?, column("material")?);

        let mut rows = Vec::new();
        let mut skipped: usize = 0;
        for record in csv.records() {
            let record = record.map_err(|err| fail(err.to_string()))?;
            match parse_row(&record, [cx, cy, cz, cm]) {
                Some(offset) => rows.push(offset),
                None => skipped = skipped.saturating_add(1),
            }
        }
        debug!(plan = name, rows = rows.len(), skipped, "parsed plan rows");
        Ok(Self {
            name: name.to_owned(),
            rows,
        })
    }

    /// Number of valid rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the plan has no valid rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_row(record: &csv::StringRecord, [cx, cy, cz, cm]: [usize; 4]) -> Option<Offset> {
    let field = |i: usize| record.get(i).unwrap_or_default();
    Some(Offset {
        dx: field(cx).parse().ok()?,
        dy: field(cy).parse().ok()?,
        dz: field(cz).parse().ok()?,
        material: field(cm).parse().ok()?,
    })
}

impl BuildPlan for CsvPlan {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, origin: Position) -> Vec<PlannedBlock> {
        self.rows
            .iter()
            .map(|row| PlannedBlock {
                position: origin.offset(row.dx, row.dy, row.dz),
                material: row.material,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOWER: &str = "\
dx,dy,dz,material
0,1,0,stone
0,2,0, cobblestone
x,3,0,stone
0,4,0,
0,5,0,unobtainium
1,1,1,sand
";

    #[test]
    fn skips_invalid_rows() {
        let plan = CsvPlan::parse("tower", TOWER.as_bytes()).unwrap();
        assert_eq!(plan.len(), 3);
        let blocks = plan.generate(Position::new(10, 64, -5));
        assert_eq!(blocks.first().map(|b| b.position), Some(Position::new(10, 65, -5)));
        assert_eq!(blocks.get(1).map(|b| b.material), Some(Material::Cobblestone));
        assert_eq!(blocks.last().map(|b| b.position), Some(Position::new(11, 65, -4)));
        let bom = plan.bom().unwrap();
        assert_eq!(bom.get(&Material::Stone), Some(&1));
        assert_eq!(bom.get(&Material::Sand), Some(&1));
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = CsvPlan::parse("bad", "dx,dy,material\n0,0,stone\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("dz"));
    }

    #[test]
    fn loads_from_disk() {
        let dir = std::env::temp_dir().join(format!("craftbots-plan-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hut.csv");
        std::fs::write(&path, "dx,dy,dz,material\n0,1,0,wood_planks\n").unwrap();
        let plan = CsvPlan::load(&path).unwrap();
        assert_eq!(plan.name(), "hut");
        assert_eq!(plan.len(), 1);

        let mut registry = super::super::PlanRegistry::new();
        assert_eq!(registry.load_dir(&dir).unwrap(), 1);
        assert!(registry.list().iter().any(|name| name == "hut"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
