//! Per-role automaton shape: which act states a role uses, in what order,
//! where it gathers from and what it does when nothing accepts a delivery.

use crate::unit::{Role, UnitState};

use super::world::TargetKind;

/// Where a role gathers resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherFrom {
    /// The source bound in the unit's memory.
    BoundSource,
    /// Pickup points, preferring the one in memory.
    Pickup,
    /// Depots first, then any source.
    DepotThenSource,
}

/// What a delivery does when no destination accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverFallback {
    /// Drop the carried resource in place and go back to gathering.
    DropInPlace,
    /// Hold the resource and retry next tick.
    Wait,
}

/// Automaton shape for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePlan {
    /// Gathering strategy.
    pub gather: GatherFrom,
    /// Act states in the order they are tried.
    pub acts: &'static [UnitState],
    /// Where `Deliver` deposits.
    pub deliver_to: TargetKind,
    /// Delivery fallback.
    pub fallback: DeliverFallback,
}

impl RolePlan {
    /// Plan for a role.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Harvester => Self {
                gather: GatherFrom::BoundSource,
                acts: &[UnitState::Deliver],
                deliver_to: TargetKind::Depot,
                fallback: DeliverFallback::DropInPlace,
            },
            Role::Hauler => Self {
                gather: GatherFrom::Pickup,
                acts: &[UnitState::Deliver],
                deliver_to: TargetKind::Sink,
                fallback: DeliverFallback::Wait,
            },
            Role::Worker => Self {
                gather: GatherFrom::DepotThenSource,
                acts: &[UnitState::Deliver, UnitState::Build, UnitState::Upgrade],
                deliver_to: TargetKind::Sink,
                fallback: DeliverFallback::Wait,
            },
            Role::Upgrader => Self {
                gather: GatherFrom::DepotThenSource,
                acts: &[UnitState::Upgrade],
                deliver_to: TargetKind::Sink,
                fallback: DeliverFallback::Wait,
            },
            Role::Repairer => Self {
                gather: GatherFrom::DepotThenSource,
                acts: &[UnitState::Repair, UnitState::Build, UnitState::Upgrade],
                deliver_to: TargetKind::Sink,
                fallback: DeliverFallback::Wait,
            },
        }
    }

    /// Whether the role's automaton handles `state`.
    #[must_use]
    pub fn recognizes(&self, state: UnitState) -> bool {
        matches!(
            state,
            UnitState::None | UnitState::Idle | UnitState::Gather | UnitState::AwaitingRenewal
        ) || self.acts.contains(&state)
    }

    /// First act state after gathering.
    #[must_use]
    pub fn first_act(&self) -> UnitState {
        self.acts.first().copied().unwrap_or(UnitState::None)
    }

    /// Act state following `state` in the ordering.
    #[must_use]
    pub fn next_act(&self, state: UnitState) -> Option<UnitState> {
        let index = self.acts.iter().position(|&s| s == state)?;
        self.acts.get(index + 1).copied()
    }
}
