//! The persisted record store.
//!
//! A flat mapping of unit records by id, squad configurations by name and
//! cost grid snapshots by region. It is read at the start of a tick and
//! written back for whatever the tick touched. An absent record is simply
//! `None`; looking one up is never an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::costgrid::CostGridSnapshot;
use crate::error::{ColonyError, Result};
use crate::ids::{RegionId, UnitId};
use crate::squad::SquadConfig;
use crate::unit::Unit;

/// Key of a record that changed since the last write-back.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    /// A unit record.
    Unit(UnitId),
    /// A squad configuration.
    Squad(String),
    /// A cost grid snapshot.
    CostGrid(RegionId),
}

/// Plain-record store shared across ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStore {
    #[serde(default)]
    units: BTreeMap<UnitId, Unit>,
    #[serde(default)]
    squads: BTreeMap<String, SquadConfig>,
    #[serde(default)]
    cost_grids: BTreeMap<RegionId, CostGridSnapshot>,
    #[serde(skip)]
    dirty: BTreeSet<RecordKey>,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a store from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError::Store`] if the text is not a valid store.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ColonyError::Store(format!("Failed to decode record store: {e}")))
    }

    /// Encode the store as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError::Store`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ColonyError::Store(format!("Failed to encode record store: {e}")))
    }

    // Units

    /// Unit record by id.
    #[must_use]
    pub fn unit(&self, id: &UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// All unit records in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// All unit ids in order.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.keys().cloned().collect()
    }

    /// Number of unit records.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Insert or replace a unit record.
    pub fn put_unit(&mut self, unit: Unit) {
        self.dirty.insert(RecordKey::Unit(unit.id.clone()));
        self.units.insert(unit.id.clone(), unit);
    }

    /// Remove a unit record.
    pub fn remove_unit(&mut self, id: &UnitId) -> Option<Unit> {
        let removed = self.units.remove(id);
        if removed.is_some() {
            self.dirty.insert(RecordKey::Unit(id.clone()));
        }
        removed
    }

    // Squads

    /// Squad configuration by name.
    #[must_use]
    pub fn squad(&self, name: &str) -> Option<&SquadConfig> {
        self.squads.get(name)
    }

    /// All squad configurations in name order.
    pub fn squads(&self) -> impl Iterator<Item = &SquadConfig> {
        self.squads.values()
    }

    /// Insert or replace a squad configuration.
    pub fn put_squad(&mut self, config: SquadConfig) {
        let name = config.name().to_string();
        self.dirty.insert(RecordKey::Squad(name.clone()));
        self.squads.insert(name, config);
    }

    // Cost grids

    /// Stored snapshot for a region.
    #[must_use]
    pub fn cost_grid(&self, region: &RegionId) -> Option<&CostGridSnapshot> {
        self.cost_grids.get(region)
    }

    /// All stored snapshots in region order.
    pub fn cost_grids(&self) -> impl Iterator<Item = &CostGridSnapshot> {
        self.cost_grids.values()
    }

    /// Store a snapshot, replacing any previous one for its region.
    pub fn put_cost_grid(&mut self, snapshot: CostGridSnapshot) {
        self.dirty.insert(RecordKey::CostGrid(snapshot.region.clone()));
        self.cost_grids.insert(snapshot.region.clone(), snapshot);
    }

    /// Clear a region's snapshot. The owning cache treats this as a miss on
    /// its next sync.
    pub fn clear_cost_grid(&mut self, region: &RegionId) -> bool {
        let removed = self.cost_grids.remove(region).is_some();
        if removed {
            self.dirty.insert(RecordKey::CostGrid(region.clone()));
        }
        removed
    }

    // Write-back tracking

    /// Whether any record changed since the last [`Self::take_dirty`].
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Keys changed since the last [`Self::take_dirty`].
    pub fn dirty(&self) -> impl Iterator<Item = &RecordKey> {
        self.dirty.iter()
    }

    /// Drain the changed keys for write-back.
    pub fn take_dirty(&mut self) -> BTreeSet<RecordKey> {
        std::mem::take(&mut self.dirty)
    }
}
