//! Unit records: the persisted state each produced worker carries between ticks.
//!
//! The record is the only continuation that spans ticks. Everything the
//! behavior automaton needs to resume is stored here and round-trips through
//! the record store unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::body::BodySummary;
use crate::ids::{TargetId, UnitId};
use crate::math::GridPos;

/// Kinds of resource a unit can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// The production resource.
    Energy,
    /// Any mineral; carried but never spent by this core.
    Mineral,
}

/// Carried resources, bounded by a total capacity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Carry {
    /// Total capacity across all kinds.
    pub capacity: u32,
    /// Amount per kind. Zero entries are removed.
    #[serde(default)]
    pub amounts: BTreeMap<ResourceKind, u32>,
}

impl Carry {
    /// Create an empty store with the given capacity.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            amounts: BTreeMap::new(),
        }
    }

    /// Total carried across all kinds.
    #[must_use]
    pub fn used(&self) -> u32 {
        self.amounts.values().sum()
    }

    /// Amount of one kind.
    #[must_use]
    pub fn amount(&self, kind: ResourceKind) -> u32 {
        self.amounts.get(&kind).copied().unwrap_or(0)
    }

    /// Free capacity.
    #[must_use]
    pub fn free(&self) -> u32 {
        self.capacity.saturating_sub(self.used())
    }

    /// Whether nothing is carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used() == 0
    }

    /// Whether the store is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.used() >= self.capacity
    }

    /// Add up to `amount`, returning what was actually stored.
    pub fn add(&mut self, kind: ResourceKind, amount: u32) -> u32 {
        let stored = amount.min(self.free());
        if stored > 0 {
            *self.amounts.entry(kind).or_insert(0) += stored;
        }
        stored
    }

    /// Remove up to `amount` of a kind, returning what was actually removed.
    pub fn remove(&mut self, kind: ResourceKind, amount: u32) -> u32 {
        let held = self.amount(kind);
        let removed = amount.min(held);
        if removed == held {
            self.amounts.remove(&kind);
        } else if let Some(v) = self.amounts.get_mut(&kind) {
            *v -= removed;
        }
        removed
    }

    /// Empty the store, returning the total removed.
    pub fn clear(&mut self) -> u32 {
        let total = self.used();
        self.amounts.clear();
        total
    }
}

/// Automaton state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum UnitState {
    /// Uninitialized or reset.
    #[default]
    None,
    /// Normalizes immediately to the role's start state.
    Idle,
    /// Moving to and extracting from a source, or withdrawing from a depot.
    Gather,
    /// Moving to and depositing into a destination (charging facilities).
    #[serde(alias = "Charge")]
    Deliver,
    /// Building a construction site.
    Build,
    /// Repairing a damaged structure.
    Repair,
    /// Upgrading the controller.
    Upgrade,
    /// Paused near a facility topping up lifetime.
    AwaitingRenewal,
}

impl UnitState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::None,
        Self::Idle,
        Self::Gather,
        Self::Deliver,
        Self::Build,
        Self::Repair,
        Self::Upgrade,
        Self::AwaitingRenewal,
    ];
}

/// Logical role of a squad and its units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Static extraction at one source.
    Harvester,
    /// Moves resource from pickup points to consumers.
    Hauler,
    /// General labor: charge, build, upgrade.
    Worker,
    /// Dedicated controller upgrading.
    Upgrader,
    /// Structure maintenance.
    Repairer,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Harvester,
        Self::Hauler,
        Self::Worker,
        Self::Upgrader,
        Self::Repairer,
    ];

    /// Short lowercase label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Harvester => "harvester",
            Self::Hauler => "hauler",
            Self::Worker => "worker",
            Self::Upgrader => "upgrader",
            Self::Repairer => "repairer",
        }
    }
}

/// Role-specific persisted fields, decoded once when the record loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum RoleMemory {
    /// Bound to one source for its whole life.
    Harvester {
        /// Source this unit extracts from.
        source: TargetId,
    },
    /// Preferred pickup point, if any.
    Hauler {
        /// Pickup point assigned by the squad.
        #[serde(default)]
        pickup: Option<TargetId>,
    },
    /// No role-specific fields.
    Worker,
    /// Controller this unit upgrades.
    Upgrader {
        /// Controller target.
        controller: TargetId,
    },
    /// No role-specific fields.
    Repairer,
}

impl RoleMemory {
    /// Role the memory belongs to.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Harvester { .. } => Role::Harvester,
            Self::Hauler { .. } => Role::Hauler,
            Self::Worker => Role::Worker,
            Self::Upgrader { .. } => Role::Upgrader,
            Self::Repairer => Role::Repairer,
        }
    }
}

/// Persisted record of one produced unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier; also the production name.
    pub id: UnitId,
    /// Owning squad name. Written by the external allocator when re-tasking.
    pub squad: String,
    /// Squad name under which `state` was established.
    pub state_owner: String,
    /// Current automaton state.
    #[serde(default)]
    pub state: UnitState,
    /// Act state to resume after renewal.
    #[serde(default)]
    pub resume_state: Option<UnitState>,
    /// Whether the unit may expire without being renewed.
    pub may_expire: bool,
    /// Remaining lifetime in ticks.
    pub ticks_to_live: u32,
    /// Carried resources.
    pub carry: Carry,
    /// Current position.
    pub pos: GridPos,
    /// Body facts.
    pub body: BodySummary,
    /// Target the unit is currently working on.
    #[serde(default)]
    pub target: Option<TargetId>,
    /// Role-specific fields.
    pub memory: RoleMemory,
}

impl Unit {
    /// Role of this unit.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.memory.role()
    }

    /// Whether the owner changed since the state was established.
    #[must_use]
    pub fn was_retasked(&self) -> bool {
        self.squad != self.state_owner
    }

    /// Reset the automaton for the current owner.
    pub fn reset_for_owner(&mut self) {
        self.state = UnitState::None;
        self.resume_state = None;
        self.target = None;
        self.state_owner.clone_from(&self.squad);
    }
}

#[cfg(test)]
impl Unit {
    /// Fresh record for tests: full lifetime, empty carry, at the origin.
    pub(crate) fn fixture(id: &str, squad: &str, memory: RoleMemory, body: &crate::body::BodySpec) -> Self {
        Self {
            id: UnitId::new(id),
            squad: squad.into(),
            state_owner: squad.into(),
            state: UnitState::None,
            resume_state: None,
            may_expire: true,
            ticks_to_live: body.lifetime(),
            carry: Carry::new(body.carry_capacity()),
            pos: GridPos::default(),
            body: body.summary(),
            target: None,
            memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carry_add_remove() {
        let mut carry = Carry::new(100);
        assert!(carry.is_empty());
        assert_eq!(carry.add(ResourceKind::Energy, 60), 60);
        assert_eq!(carry.add(ResourceKind::Mineral, 60), 40);
        assert!(carry.is_full());
        assert_eq!(carry.remove(ResourceKind::Energy, 100), 60);
        assert_eq!(carry.amount(ResourceKind::Energy), 0);
        assert!(!carry.amounts.contains_key(&ResourceKind::Energy));
        assert_eq!(carry.clear(), 40);
    }

    #[test]
    fn test_zero_capacity_is_never_full() {
        let carry = Carry::new(0);
        assert!(!carry.is_full());
        assert!(carry.is_empty());
    }

    #[test]
    fn test_charge_alias_decodes_to_deliver() {
        let state: UnitState = serde_json::from_str("\"Charge\"").unwrap();
        assert_eq!(state, UnitState::Deliver);
    }

    #[test]
    fn test_role_memory_is_tagged() {
        let memory = RoleMemory::Harvester {
            source: TargetId::new("src-1"),
        };
        let json = serde_json::to_string(&memory).unwrap();
        assert!(json.contains("\"role\":\"Harvester\""));
        let back: RoleMemory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role(), Role::Harvester);
    }
}
