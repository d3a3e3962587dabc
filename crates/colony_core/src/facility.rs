//! Production facilities: the regenerating resource budget units are paid from.
//!
//! A facility produces one unit at a time. Production deducts the body cost
//! up front and keeps the facility busy for a number of ticks proportional to
//! the body size.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::body::{BodySpec, UNIT_LIFETIME};
use crate::ids::{FacilityId, UnitId};
use crate::math::GridPos;
use crate::unit::Unit;

/// Lifetime ticks restored per renewal, before dividing by body size.
const RENEW_LIFETIME_BASE: u32 = 600;

/// A unit description emitted by `materialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpawn {
    /// Production name; becomes the unit id.
    pub name: UnitId,
    /// Body composition.
    pub body: BodySpec,
    /// Initial persisted record.
    pub record: Unit,
}

/// Result of a production attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProduceOutcome {
    /// Production started and resource was deducted.
    Ok,
    /// The body costs more than the facility holds.
    InsufficientResource,
    /// A live unit already uses the requested name.
    NameConflict,
    /// The facility is already producing.
    FacilityBusy,
    /// The body is empty or exceeds the part limit.
    InvalidBody,
}

impl ProduceOutcome {
    /// Whether production started.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for ProduceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::InsufficientResource => write!(f, "insufficient resource"),
            Self::NameConflict => write!(f, "name conflict"),
            Self::FacilityBusy => write!(f, "facility busy"),
            Self::InvalidBody => write!(f, "invalid body"),
        }
    }
}

/// Result of a renewal attempt at a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    /// Lifetime was added.
    Renewed {
        /// Ticks added.
        added: u32,
        /// Resource spent.
        cost: u32,
    },
    /// The facility is producing and cannot renew.
    Busy,
    /// The facility cannot pay for the renewal.
    InsufficientResource,
    /// The unit is already at full lifetime.
    AlreadyFull,
}

/// A resource-producing/consuming point that produces units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionFacility {
    /// Identifier.
    pub id: FacilityId,
    /// Owning colony name.
    pub colony: String,
    /// Position in its region.
    pub pos: GridPos,
    /// Current resource balance.
    pub available: u32,
    /// Maximum resource balance.
    pub capacity: u32,
    /// Ticks until the in-flight production completes.
    #[serde(default)]
    pub spawning_ticks: u32,
}

impl ProductionFacility {
    /// Create an idle facility.
    #[must_use]
    pub fn new(
        id: impl Into<FacilityId>,
        colony: impl Into<String>,
        pos: GridPos,
        available: u32,
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            colony: colony.into(),
            pos,
            available: available.min(capacity),
            capacity,
            spawning_ticks: 0,
        }
    }

    /// Whether a production action is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.spawning_ticks > 0
    }

    /// Whether the scheduler should consider this facility this tick.
    #[must_use]
    pub const fn is_idle_with_balance(&self) -> bool {
        !self.is_busy() && self.available > 0
    }

    /// Add regenerated resource, saturating at capacity.
    pub fn regenerate(&mut self, amount: u32) {
        self.available = self.available.saturating_add(amount).min(self.capacity);
    }

    /// Advance the in-flight production by one tick.
    ///
    /// Returns `true` when production finished this tick.
    pub fn tick(&mut self) -> bool {
        if self.spawning_ticks == 0 {
            return false;
        }
        self.spawning_ticks -= 1;
        self.spawning_ticks == 0
    }

    /// Attempt to produce a unit, deducting its cost on success.
    ///
    /// `alive` holds the names of every live unit; a collision is rejected
    /// without consuming resource.
    pub fn produce(&mut self, spawn: &mut UnitSpawn, alive: &BTreeSet<UnitId>) -> ProduceOutcome {
        if self.is_busy() {
            return ProduceOutcome::FacilityBusy;
        }
        if !spawn.body.is_valid() {
            return ProduceOutcome::InvalidBody;
        }
        let cost = spawn.body.cost();
        if cost > self.available {
            return ProduceOutcome::InsufficientResource;
        }
        if alive.contains(&spawn.name) {
            return ProduceOutcome::NameConflict;
        }

        self.available -= cost;
        self.spawning_ticks = spawn.body.spawn_time();
        spawn.record.pos = self.pos;
        ProduceOutcome::Ok
    }

    /// Renew an adjacent unit's lifetime.
    ///
    /// Adds `600 / parts` ticks (capped at the full lifetime) for
    /// `ceil(cost / 2.5 / parts)` resource.
    pub fn renew(&mut self, unit: &mut Unit) -> RenewOutcome {
        if self.is_busy() {
            return RenewOutcome::Busy;
        }
        if unit.ticks_to_live >= UNIT_LIFETIME {
            return RenewOutcome::AlreadyFull;
        }
        let parts = unit.body.parts.max(1);
        // cost / 2.5 / parts == cost * 2 / (5 * parts), rounded up.
        let price = (unit.body.cost * 2).div_ceil(5 * parts);
        if price > self.available {
            return RenewOutcome::InsufficientResource;
        }
        let added = (RENEW_LIFETIME_BASE / parts).min(UNIT_LIFETIME - unit.ticks_to_live);
        self.available -= price;
        unit.ticks_to_live += added;
        RenewOutcome::Renewed {
            added,
            cost: price,
        }
    }
}
