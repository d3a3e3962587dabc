//! Per-region traversal cost grids.
//!
//! A grid is computed from a region layout by applying the same rules in the
//! same order every time:
//!
//! 1. terrain baseline (open / hindered / impassable)
//! 2. static structures (roads cheapen, blocking structures become impassable)
//! 3. optional danger shaping around hazards
//!
//! Identical inputs produce byte-identical cells. Grids are persisted as a
//! flat row-major array alongside a [`FreshnessToken`].

pub mod cache;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticCause, Diagnostics};
use crate::error::{ColonyError, Result};
use crate::ids::RegionId;
use crate::math::{fixed_serde, Fixed, GridPos, REGION_CELLS, REGION_SIZE};

pub use cache::{CacheStats, CostMatrixCache};

/// Terrain classification of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terrain {
    /// Open ground.
    Open,
    /// Slow ground (swamp).
    Hindered,
    /// Wall.
    Impassable,
}

impl Terrain {
    /// Decode a raw terrain code.
    ///
    /// `0` is open, `2` is hindered, `1` and `3` (wall bit set) are
    /// impassable. Anything else is unknown.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            2 => Some(Self::Hindered),
            1 | 3 => Some(Self::Impassable),
            _ => None,
        }
    }

    /// Raw code for this classification.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Impassable => 1,
            Self::Hindered => 2,
        }
    }
}

/// Raw terrain codes for one region, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerrainSnapshot {
    codes: Vec<u8>,
}

impl TerrainSnapshot {
    /// A region of uniform terrain.
    #[must_use]
    pub fn uniform(terrain: Terrain) -> Self {
        Self {
            codes: vec![terrain.code(); REGION_CELLS],
        }
    }

    /// Build from raw codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the code count does not match the region size.
    pub fn from_codes(region: &RegionId, codes: Vec<u8>) -> Result<Self> {
        if codes.len() != REGION_CELLS {
            return Err(ColonyError::Snapshot {
                region: region.to_string(),
                message: format!("expected {REGION_CELLS} terrain codes, got {}", codes.len()),
            });
        }
        Ok(Self { codes })
    }

    /// Raw code at a position.
    #[must_use]
    pub fn code(&self, pos: GridPos) -> u8 {
        self.codes[pos.index()]
    }

    /// Overwrite the raw code at a position.
    pub fn set_code(&mut self, pos: GridPos, code: u8) {
        self.codes[pos.index()] = code;
    }

    /// Overwrite one cell's terrain.
    pub fn set(&mut self, pos: GridPos, terrain: Terrain) {
        self.set_code(pos, terrain.code());
    }

    /// All raw codes.
    #[must_use]
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }
}

/// Kinds of static structure that affect traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    /// Cheap to walk on.
    Road,
    /// Walkable storage box.
    Container,
    /// Own protective cover; walkable.
    Rampart,
    /// Blocking wall.
    Wall,
    /// Any other blocking structure (facilities, towers, storage).
    Solid,
}

impl StructureKind {
    /// Whether units can stand on this structure.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Road | Self::Container | Self::Rampart)
    }
}

/// A static structure occupying one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Obstacle {
    /// Cell the structure occupies.
    pub pos: GridPos,
    /// Structure kind.
    pub kind: StructureKind,
}

/// A hazardous point of interest that units should keep away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hazard {
    /// Center of the hazard.
    pub pos: GridPos,
    /// Chebyshev radius of influence.
    pub radius: u8,
}

/// Cost constants applied during grid computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostProfile {
    /// Cost of open terrain.
    #[serde(default = "default_open")]
    pub open: u8,
    /// Cost of hindered terrain.
    #[serde(default = "default_hindered")]
    pub hindered: u8,
    /// Cost marking a cell impassable.
    #[serde(default = "default_impassable")]
    pub impassable: u8,
    /// Cost of a road cell.
    #[serde(default = "default_road")]
    pub road: u8,
    /// Fixed cost for region-edge cells inside a danger radius.
    #[serde(default = "default_crossing")]
    pub crossing: u8,
    /// Cost added per step of distance inside a danger radius.
    #[serde(default = "default_danger_step", with = "fixed_serde")]
    pub danger_step: Fixed,
    /// Extra cost for hindered cells inside a danger radius.
    #[serde(default = "default_swamp_surcharge")]
    pub swamp_surcharge: u8,
}

const fn default_open() -> u8 {
    2
}

const fn default_hindered() -> u8 {
    10
}

const fn default_impassable() -> u8 {
    255
}

const fn default_road() -> u8 {
    1
}

const fn default_crossing() -> u8 {
    3
}

fn default_danger_step() -> Fixed {
    Fixed::from_num(10)
}

const fn default_swamp_surcharge() -> u8 {
    10
}

impl Default for CostProfile {
    fn default() -> Self {
        Self {
            open: default_open(),
            hindered: default_hindered(),
            impassable: default_impassable(),
            road: default_road(),
            crossing: default_crossing(),
            danger_step: default_danger_step(),
            swamp_surcharge: default_swamp_surcharge(),
        }
    }
}

impl CostProfile {
    /// Highest cost a passable cell may hold.
    #[must_use]
    pub const fn max_passable(&self) -> u8 {
        self.impassable.saturating_sub(1)
    }

    /// Baseline cost for a terrain classification.
    #[must_use]
    pub const fn terrain_cost(&self, terrain: Terrain) -> u8 {
        match terrain {
            Terrain::Open => self.open,
            Terrain::Hindered => self.hindered,
            Terrain::Impassable => self.impassable,
        }
    }

    /// Shaping added at `distance` from a hazard with `radius`.
    ///
    /// Zero at and beyond the radius; grows linearly toward the center.
    #[must_use]
    pub fn danger_falloff(&self, radius: u8, distance: u8) -> u32 {
        if distance >= radius {
            return 0;
        }
        let steps = Fixed::from_num(radius - distance);
        steps.saturating_mul(self.danger_step).saturating_to_num::<u32>()
    }

    /// Cost of an open cell sitting on a hazard center.
    #[must_use]
    pub fn max_danger_cost(&self, radius: u8) -> u8 {
        clamp_cost(u32::from(self.open).saturating_add(self.danger_falloff(radius, 0)), self)
    }
}

fn clamp_cost(cost: u32, profile: &CostProfile) -> u8 {
    cost.min(u32::from(profile.max_passable())) as u8
}

/// Everything a region's grid is computed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionLayout {
    /// Region identifier.
    pub region: RegionId,
    /// Raw terrain.
    pub terrain: TerrainSnapshot,
    /// Static structures.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Hazards for danger shaping.
    #[serde(default)]
    pub hazards: Vec<Hazard>,
    /// Whether danger shaping is applied.
    #[serde(default)]
    pub shape_danger: bool,
}

impl RegionLayout {
    /// An open region with no structures or hazards.
    #[must_use]
    pub fn open(region: impl Into<RegionId>) -> Self {
        Self {
            region: region.into(),
            terrain: TerrainSnapshot::uniform(Terrain::Open),
            obstacles: Vec::new(),
            hazards: Vec::new(),
            shape_danger: false,
        }
    }

    /// Fingerprint of the layout and profile. Order of obstacles and hazards
    /// does not matter.
    ///
    /// The bytes fed to the digest are laid out explicitly, so fingerprints
    /// persisted by one build compare equal in another.
    #[must_use]
    pub fn fingerprint(&self, profile: &CostProfile) -> u64 {
        let mut obstacles = self.obstacles.clone();
        obstacles.sort_unstable();
        let mut hazards = self.hazards.clone();
        hazards.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        let region = self.region.as_str().as_bytes();
        hasher.update(&(region.len() as u64).to_le_bytes());
        hasher.update(region);
        hasher.update(self.terrain.codes());
        hasher.update(&(obstacles.len() as u64).to_le_bytes());
        for obstacle in &obstacles {
            hasher.update(&[obstacle.pos.x, obstacle.pos.y, obstacle.kind as u8]);
        }
        hasher.update(&(hazards.len() as u64).to_le_bytes());
        for hazard in &hazards {
            hasher.update(&[hazard.pos.x, hazard.pos.y, hazard.radius]);
        }
        hasher.update(&[
            u8::from(self.shape_danger),
            profile.open,
            profile.hindered,
            profile.impassable,
            profile.road,
            profile.crossing,
            profile.swamp_surcharge,
        ]);
        hasher.update(&profile.danger_step.to_bits().to_le_bytes());

        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }
}

/// Identifies which inputs a grid was computed from, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FreshnessToken {
    /// Tick the grid was computed at.
    pub computed_at: u64,
    /// Fingerprint of the inputs.
    pub fingerprint: u64,
}

/// A computed cost grid for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostGrid {
    region: RegionId,
    cells: Vec<u8>,
    token: FreshnessToken,
}

impl CostGrid {
    /// Region this grid covers.
    #[must_use]
    pub fn region(&self) -> &RegionId {
        &self.region
    }

    /// Row-major cell costs.
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Freshness token.
    #[must_use]
    pub const fn token(&self) -> FreshnessToken {
        self.token
    }

    /// Cost at a position.
    #[must_use]
    pub fn cost(&self, pos: GridPos) -> u8 {
        self.cells[pos.index()]
    }

    /// Persistable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CostGridSnapshot {
        CostGridSnapshot {
            region: self.region.clone(),
            token: self.token,
            cells: self.cells.clone(),
        }
    }

    /// Rebuild a grid from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not hold one cell per grid cell.
    pub fn from_snapshot(snapshot: CostGridSnapshot) -> Result<Self> {
        if snapshot.cells.len() != REGION_CELLS {
            return Err(ColonyError::Snapshot {
                region: snapshot.region.to_string(),
                message: format!(
                    "expected {REGION_CELLS} cells, got {}",
                    snapshot.cells.len()
                ),
            });
        }
        Ok(Self {
            region: snapshot.region,
            cells: snapshot.cells,
            token: snapshot.token,
        })
    }

    /// Render as text, one character per cell (`#` impassable, `.` baseline,
    /// digits for increasing cost).
    #[must_use]
    pub fn render(&self, profile: &CostProfile) -> String {
        let size = REGION_SIZE as usize;
        let mut out = String::with_capacity(REGION_CELLS + size);
        for row in self.cells.chunks(size) {
            for &cost in row {
                let ch = if cost >= profile.impassable {
                    '#'
                } else if cost <= profile.open {
                    '.'
                } else {
                    let bucket = (u32::from(cost) * 9 / u32::from(profile.max_passable().max(1))).clamp(1, 9);
                    char::from_digit(bucket, 10).unwrap_or('9')
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }
}

/// Persistence form of a grid: flat row-major costs plus the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostGridSnapshot {
    /// Region identifier.
    pub region: RegionId,
    /// Freshness token.
    pub token: FreshnessToken,
    /// Row-major costs.
    pub cells: Vec<u8>,
}

impl CostGridSnapshot {
    /// Encode to compact bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ColonyError::Snapshot {
            region: self.region.to_string(),
            message: format!("Failed to encode snapshot: {e}"),
        })
    }

    /// Decode from compact bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| ColonyError::Snapshot {
            region: "<unknown>".into(),
            message: format!("Failed to decode snapshot: {e}"),
        })
    }
}

/// Compute a region's cost grid.
///
/// Unknown terrain codes are treated as impassable and reported once for the
/// whole grid through `diagnostics`.
pub fn compute_cost_grid(
    layout: &RegionLayout,
    profile: &CostProfile,
    tick: u64,
    diagnostics: &mut Diagnostics,
) -> CostGrid {
    let mut cells = vec![profile.impassable; REGION_CELLS];
    let mut terrain = vec![Terrain::Impassable; REGION_CELLS];
    let codes = layout.terrain.codes();
    // Missing codes (a truncated snapshot) count as unknown.
    let mut unknown = REGION_CELLS.saturating_sub(codes.len()) as u32;

    // Terrain baseline.
    for (index, &code) in codes.iter().take(REGION_CELLS).enumerate() {
        let class = Terrain::from_code(code).unwrap_or_else(|| {
            unknown += 1;
            Terrain::Impassable
        });
        terrain[index] = class;
        cells[index] = profile.terrain_cost(class);
    }
    if unknown > 0 {
        diagnostics.record_many(
            DiagnosticCause::UnknownTerrain,
            unknown,
            layout.region.to_string(),
        );
    }

    // Static structures. Sorted so overlapping entries resolve the same way
    // regardless of input order.
    let mut obstacles = layout.obstacles.clone();
    obstacles.sort_unstable();
    for obstacle in obstacles.iter().filter(|o| o.pos.in_bounds()) {
        let index = obstacle.pos.index();
        match obstacle.kind {
            StructureKind::Road if cells[index] < profile.impassable => {
                cells[index] = profile.road;
            }
            kind if !kind.is_walkable() => cells[index] = profile.impassable,
            _ => {}
        }
    }

    if layout.shape_danger && !layout.hazards.is_empty() {
        apply_danger(&mut cells, &terrain, &layout.hazards, profile);
    }

    CostGrid {
        region: layout.region.clone(),
        cells,
        token: FreshnessToken {
            computed_at: tick,
            fingerprint: layout.fingerprint(profile),
        },
    }
}

/// Raise costs around hazards. Overlapping hazards take the strongest
/// falloff per cell so the result is independent of hazard order.
fn apply_danger(cells: &mut [u8], terrain: &[Terrain], hazards: &[Hazard], profile: &CostProfile) {
    let mut falloff = vec![0u32; REGION_CELLS];

    for hazard in hazards.iter().filter(|h| h.pos.in_bounds()) {
        let r = hazard.radius;
        let x0 = hazard.pos.x.saturating_sub(r);
        let y0 = hazard.pos.y.saturating_sub(r);
        let x1 = hazard.pos.x.saturating_add(r).min(REGION_SIZE - 1);
        let y1 = hazard.pos.y.saturating_add(r).min(REGION_SIZE - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let pos = GridPos::new(x, y);
                let index = pos.index();
                let add = profile.danger_falloff(r, hazard.pos.range_to(pos));
                falloff[index] = falloff[index].max(add);
            }
        }
    }

    for index in 0..REGION_CELLS {
        if falloff[index] == 0 || cells[index] >= profile.impassable {
            continue;
        }
        let Some(pos) = GridPos::from_index(index) else {
            continue;
        };
        if pos.is_region_edge() {
            cells[index] = profile.crossing;
            continue;
        }
        let mut cost = u32::from(cells[index]).saturating_add(falloff[index]);
        if terrain[index] == Terrain::Hindered {
            cost = cost.saturating_add(u32::from(profile.swamp_surcharge));
        }
        cells[index] = clamp_cost(cost, profile);
    }
}
