//! Colony state as seen by squad requests.
//!
//! The world reports a [`ColonySurvey`] each tick; the record store supplies
//! the unit census. Squad priority and sizing functions read the combined
//! [`ColonyState`] and never mutate it. Only the scheduler updates the census
//! after a grant, so later facilities in the same tick see the new unit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{RegionId, TargetId};
use crate::math::GridPos;
use crate::unit::{Role, Unit};

/// An energy source in the colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Source identifier.
    pub id: TargetId,
    /// Position.
    pub pos: GridPos,
    /// Walkable cells around the source, bounding how many harvesters fit.
    pub open_slots: u32,
}

/// The colony controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInfo {
    /// Controller identifier.
    pub id: TargetId,
    /// Ticks until the controller downgrades without upgrading.
    pub ticks_to_downgrade: u32,
}

/// What the world reports about a colony each tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonySurvey {
    /// Known sources.
    #[serde(default)]
    pub sources: Vec<SourceInfo>,
    /// Pickup points (containers next to sources, dropped piles).
    #[serde(default)]
    pub pickups: Vec<TargetId>,
    /// Controller, if the colony holds one.
    #[serde(default)]
    pub controller: Option<ControllerInfo>,
    /// Open construction sites.
    #[serde(default)]
    pub construction_sites: u32,
    /// Structures below their repair threshold.
    #[serde(default)]
    pub repair_targets: u32,
    /// Regions whose layout changed since the last tick.
    #[serde(default)]
    pub changed_regions: Vec<RegionId>,
}

/// Live membership of one squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SquadCensus {
    /// Live units.
    pub units: u32,
    /// Total WORK parts across live units.
    pub work_parts: u32,
    /// Total CARRY parts across live units.
    pub carry_parts: u32,
}

impl SquadCensus {
    fn count(&mut self, unit: &Unit) {
        self.units += 1;
        self.work_parts += unit.body.work;
        self.carry_parts += unit.body.carry;
    }
}

/// Snapshot read by every squad's priority and sizing functions.
#[derive(Debug, Clone, Default)]
pub struct ColonyState {
    /// Colony name.
    pub name: String,
    /// Current tick.
    pub tick: u64,
    /// World survey.
    pub survey: ColonySurvey,
    squads: BTreeMap<String, SquadCensus>,
    roles: BTreeMap<Role, u32>,
    spawned_this_tick: u32,
}

impl ColonyState {
    /// Build the state from a survey and the live unit records.
    pub fn new<'a>(
        name: impl Into<String>,
        tick: u64,
        survey: ColonySurvey,
        units: impl IntoIterator<Item = &'a Unit>,
    ) -> Self {
        let mut state = Self {
            name: name.into(),
            tick,
            survey,
            ..Self::default()
        };
        for unit in units {
            state.count(unit);
        }
        state
    }

    fn count(&mut self, unit: &Unit) {
        self.squads.entry(unit.squad.clone()).or_default().count(unit);
        *self.roles.entry(unit.role()).or_insert(0) += 1;
    }

    /// Membership of a squad; zero when it has no live units.
    #[must_use]
    pub fn squad(&self, name: &str) -> SquadCensus {
        self.squads.get(name).copied().unwrap_or_default()
    }

    /// Live units of a role across the colony.
    #[must_use]
    pub fn role_count(&self, role: Role) -> u32 {
        self.roles.get(&role).copied().unwrap_or(0)
    }

    /// Source by id.
    #[must_use]
    pub fn source(&self, id: &TargetId) -> Option<&SourceInfo> {
        self.survey.sources.iter().find(|s| &s.id == id)
    }

    /// Whether a pickup point exists.
    #[must_use]
    pub fn has_pickup(&self, id: &TargetId) -> bool {
        self.survey.pickups.contains(id)
    }

    /// Controller, if it matches `id`.
    #[must_use]
    pub fn controller(&self, id: &TargetId) -> Option<&ControllerInfo> {
        self.survey.controller.as_ref().filter(|c| &c.id == id)
    }

    /// Number of units granted so far this tick.
    #[must_use]
    pub const fn spawned_this_tick(&self) -> u32 {
        self.spawned_this_tick
    }

    /// Count a unit granted this tick so later facilities see it.
    pub fn note_spawned(&mut self, unit: &Unit) {
        self.count(unit);
        self.spawned_this_tick += 1;
    }
}
