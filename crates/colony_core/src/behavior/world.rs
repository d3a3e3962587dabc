//! The movement and interaction contract the automaton drives.
//!
//! Pathing, range checks and resource accounting live behind [`UnitWorld`].
//! Every primitive reports one of three outcomes; the automaton decides what
//! each means for the unit's state.

use serde::{Deserialize, Serialize};

use crate::ids::TargetId;
use crate::unit::Unit;

/// Kinds of target a unit looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// Energy source that can be harvested.
    Source,
    /// Pickup point holding resource for haulers.
    Pickup,
    /// Storage that accepts deposits and allows withdrawals.
    Depot,
    /// Consumer to charge (facilities and their extensions).
    Sink,
    /// Construction site.
    ConstructionSite,
    /// Structure below its repair threshold.
    Damaged,
    /// Colony controller.
    Controller,
}

/// Interaction a unit performs on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Extract from a source.
    Harvest,
    /// Take resource out of a depot or pickup point.
    Withdraw,
    /// Deposit carried resource.
    Transfer,
    /// Spend resource on a construction site.
    Build,
    /// Spend resource on a damaged structure.
    Repair,
    /// Spend resource on the controller.
    Upgrade,
}

/// Why a primitive failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionError {
    /// Target or facility momentarily busy.
    Busy,
    /// Unit is fatigued and cannot act this tick.
    Tired,
    /// Target cannot accept more.
    Full,
    /// Target no longer exists or is the wrong kind.
    InvalidTarget,
    /// Target has nothing left and will not regenerate.
    Depleted,
    /// Unit is not allowed to act on the target.
    NotAuthorized,
    /// Anything else; retried next tick.
    Other,
}

impl ActionError {
    /// Every error.
    pub const ALL: [Self; 7] = [
        Self::Busy,
        Self::Tired,
        Self::Full,
        Self::InvalidTarget,
        Self::Depleted,
        Self::NotAuthorized,
        Self::Other,
    ];

    /// Whether the target will never accept this action again.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::InvalidTarget | Self::Depleted | Self::NotAuthorized)
    }
}

/// Tri-state result of a world primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// The action happened.
    Ok,
    /// The unit must move closer first.
    NotInRange,
    /// The action failed.
    Failed(ActionError),
}

impl ActionOutcome {
    /// Whether the action happened.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// World primitives used by the unit automaton.
///
/// Implementations update the unit record for effects they apply (carried
/// amounts, position, lifetime); the automaton only manages state and target.
pub trait UnitWorld {
    /// Best target of a kind for the unit, skipping `exclude`.
    fn find_target(&self, unit: &Unit, kind: TargetKind, exclude: Option<&TargetId>)
        -> Option<TargetId>;

    /// Whether `target` still exists as a target of `kind` with work left.
    fn target_valid(&self, target: &TargetId, kind: TargetKind) -> bool;

    /// Issue a move toward `target`.
    fn move_toward(&mut self, unit: &mut Unit, target: &TargetId) -> ActionOutcome;

    /// Perform an interaction on `target`.
    fn perform(&mut self, unit: &mut Unit, action: Action, target: &TargetId) -> ActionOutcome;

    /// Drop everything carried where the unit stands.
    fn drop_carried(&mut self, unit: &mut Unit) -> ActionOutcome;

    /// A nearby production facility that could renew the unit now.
    fn nearby_facility(&self, unit: &Unit) -> Option<TargetId>;

    /// Ask `facility` to renew the unit's lifetime.
    fn renew(&mut self, unit: &mut Unit, facility: &TargetId) -> ActionOutcome;
}
