//! Worker squads: general labor sized by pending construction.

use crate::behavior::RenewalPolicy;
use crate::body::BodyTemplate;
use crate::facility::{ProduceOutcome, UnitSpawn};
use crate::unit::{Role, RoleMemory};

use super::{ColonyState, Priority, Sizing, SquadRequest, UnitPlan};

/// General labor: charges facilities, builds, upgrades when idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSquad {
    /// Squad name.
    pub name: String,
    /// Units wanted with no construction pending.
    pub target: u32,
    /// Extra units wanted while construction sites exist.
    pub construction_bonus: u32,
    /// Body sizing rule.
    pub body: BodyTemplate,
    /// Whether units may expire instead of renewing.
    pub may_expire: bool,
    /// Renewal override.
    pub renewal: Option<RenewalPolicy>,
}

impl WorkerSquad {
    fn sizing(&self) -> Sizing<'_> {
        Sizing {
            template: &self.body,
            role: Role::Worker,
        }
    }

    /// Units wanted given the current construction load.
    #[must_use]
    pub fn effective_target(&self, state: &ColonyState) -> u32 {
        if state.survey.construction_sites > 0 {
            self.target + self.construction_bonus
        } else {
            self.target
        }
    }
}

impl SquadRequest for WorkerSquad {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Worker
    }

    fn unit_memory(&self) -> RoleMemory {
        RoleMemory::Worker
    }

    fn priority(&self, state: &ColonyState) -> Priority {
        if state.role_count(Role::Worker) == 0 {
            Priority::High
        } else if state.squad(&self.name).units < self.effective_target(state) {
            Priority::Normal
        } else {
            Priority::None
        }
    }

    fn sufficient_resource(&self, state: &ColonyState, available: u32, capacity: u32) -> bool {
        self.sizing().sufficient(state, available, capacity)
    }

    fn materialize(
        &self,
        state: &ColonyState,
        available: u32,
        capacity: u32,
        produce: &mut dyn FnMut(UnitSpawn) -> ProduceOutcome,
    ) -> ProduceOutcome {
        UnitPlan {
            squad: &self.name,
            sizing: self.sizing(),
            memory: self.unit_memory(),
            may_expire: self.may_expire,
        }
        .produce(state, available, capacity, produce)
    }

    fn renewal(&self) -> Option<&RenewalPolicy> {
        self.renewal.as_ref()
    }
}
