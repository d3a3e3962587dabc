//! Cost grid rendering from a text region description.
//!
//! # Example RON
//!
//! ```ron
//! GridSpec(
//!     region: "W1N1",
//!     rows: [
//!         "..........~~~~~~####",
//!         "..........~~~~~~####",
//!     ],
//!     obstacles: [(pos: (x: 5, y: 0), kind: Road)],
//!     hazards: [(pos: (x: 25, y: 25), radius: 5)],
//!     shape_danger: true,
//! )
//! ```
//!
//! Rows are read top to bottom; `.` is open, `~` hindered and `#` a wall.
//! Cells not covered by a row are open. Any other character is an unknown
//! terrain code.

use std::path::Path;

use colony_core::costgrid::{
    compute_cost_grid, CostGrid, CostProfile, Hazard, Obstacle, RegionLayout, Terrain,
};
use colony_core::diagnostics::Diagnostics;
use colony_core::ids::RegionId;
use colony_core::math::{GridPos, REGION_SIZE};
use colony_core::ColonyError;
use serde::{Deserialize, Serialize};

use crate::{read_text, Result};

/// Terrain code used for characters the map format does not know.
const UNKNOWN_CODE: u8 = 0xFF;

/// A region described for the grid tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Region identifier.
    pub region: RegionId,
    /// Terrain rows, top to bottom.
    #[serde(default)]
    pub rows: Vec<String>,
    /// Static structures.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Hazards.
    #[serde(default)]
    pub hazards: Vec<Hazard>,
    /// Whether danger shaping is applied.
    #[serde(default)]
    pub shape_danger: bool,
    /// Cost constants; defaults when absent.
    #[serde(default)]
    pub profile: Option<CostProfile>,
}

impl GridSpec {
    /// Parse a grid description from RON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid spec.
    pub fn from_ron(text: &str, label: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| {
            ColonyError::ConfigParse {
                path: label.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Build the region layout.
    #[must_use]
    pub fn layout(&self) -> RegionLayout {
        let mut layout = RegionLayout::open(self.region.clone());
        for (y, row) in self.rows.iter().take(REGION_SIZE as usize).enumerate() {
            for (x, ch) in row.chars().take(REGION_SIZE as usize).enumerate() {
                let code = match ch {
                    '.' => Terrain::Open.code(),
                    '~' => Terrain::Hindered.code(),
                    '#' => Terrain::Impassable.code(),
                    _ => UNKNOWN_CODE,
                };
                layout.terrain.set_code(GridPos::new(x as u8, y as u8), code);
            }
        }
        layout.obstacles.clone_from(&self.obstacles);
        layout.hazards.clone_from(&self.hazards);
        layout.shape_danger = self.shape_danger;
        layout
    }

    /// Compute the grid, flushing diagnostics at `tick`.
    #[must_use]
    pub fn compute(&self, tick: u64) -> (CostGrid, CostProfile) {
        let profile = self.profile.clone().unwrap_or_default();
        let mut diagnostics = Diagnostics::new();
        let grid = compute_cost_grid(&self.layout(), &profile, tick, &mut diagnostics);
        diagnostics.flush(tick);
        (grid, profile)
    }
}

/// Load a grid description, compute its grid and render it as text.
///
/// When `snapshot` is given the grid snapshot is also written there in its
/// compact binary form.
///
/// # Errors
///
/// Returns an error if the description cannot be read or parsed, or the snapshot
/// cannot be written.
pub fn render_grid_file(path: &Path, snapshot: Option<&Path>) -> Result<String> {
    let text = read_text(path)?;
    let spec = GridSpec::from_ron(&text, &path.display().to_string())?;
    let (grid, profile) = spec.compute(0);
    tracing::info!(
        region = %grid.region(),
        fingerprint = grid.token().fingerprint,
        "cost grid computed"
    );

    if let Some(out) = snapshot {
        let bytes = grid.snapshot().to_bytes()?;
        std::fs::write(out, bytes).map_err(|source| ColonyError::Io {
            path: out.display().to_string(),
            source,
        })?;
        tracing::info!(path = %out.display(), "snapshot written");
    }
    Ok(grid.render(&profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_core::costgrid::CostGridSnapshot;

    const SPEC: &str = r##"
        GridSpec(
            region: "W1N1",
            rows: ["..~#?"],
            hazards: [(pos: (x: 25, y: 25), radius: 5)],
            shape_danger: true,
        )
    "##;

    #[test]
    fn test_rows_map_to_terrain() {
        let spec = GridSpec::from_ron(SPEC, "spec").unwrap();
        let (grid, profile) = spec.compute(3);

        assert_eq!(grid.cost(GridPos::new(0, 0)), profile.open);
        assert_eq!(grid.cost(GridPos::new(2, 0)), profile.hindered);
        assert_eq!(grid.cost(GridPos::new(3, 0)), profile.impassable);
        // Unknown characters are impassable.
        assert_eq!(grid.cost(GridPos::new(4, 0)), profile.impassable);
        assert_eq!(grid.cost(GridPos::new(25, 25)), profile.max_danger_cost(5));
        assert_eq!(grid.token().computed_at, 3);
    }

    #[test]
    fn test_render_and_snapshot() {
        let dir = std::env::temp_dir().join(format!("colony-tools-grid-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let spec_path = dir.join("region.ron");
        let snapshot_path = dir.join("region.bin");
        std::fs::write(&spec_path, SPEC).unwrap();

        let rendered = render_grid_file(&spec_path, Some(&snapshot_path)).unwrap();
        let first_row = rendered.lines().next().unwrap();
        assert!(first_row.starts_with("..1##"));
        assert_eq!(rendered.lines().count(), REGION_SIZE as usize);

        let bytes = std::fs::read(&snapshot_path).unwrap();
        let snapshot = CostGridSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(snapshot.region, RegionId::new("W1N1"));
    }
}
