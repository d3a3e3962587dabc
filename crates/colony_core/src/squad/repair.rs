//! Repair squads. Maintenance is never urgent.

use crate::behavior::RenewalPolicy;
use crate::body::BodyTemplate;
use crate::facility::{ProduceOutcome, UnitSpawn};
use crate::unit::{Role, RoleMemory};

use super::{ColonyState, Priority, Sizing, SquadRequest, UnitPlan};

/// Structure maintenance; only ever asks at `Low`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairSquad {
    /// Squad name.
    pub name: String,
    /// Units wanted while repair work exists.
    pub target: u32,
    /// Body sizing rule.
    pub body: BodyTemplate,
    /// Whether units may expire instead of renewing.
    pub may_expire: bool,
    /// Renewal override.
    pub renewal: Option<RenewalPolicy>,
}

impl SquadRequest for RepairSquad {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Repairer
    }

    fn unit_memory(&self) -> RoleMemory {
        RoleMemory::Repairer
    }

    fn priority(&self, state: &ColonyState) -> Priority {
        if state.survey.repair_targets > 0 && state.squad(&self.name).units < self.target {
            Priority::Low
        } else {
            Priority::None
        }
    }

    fn sufficient_resource(&self, state: &ColonyState, available: u32, capacity: u32) -> bool {
        Sizing {
            template: &self.body,
            role: Role::Repairer,
        }
        .sufficient(state, available, capacity)
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
            sizing: Sizing {
                template: &self.body,
                role: Role::Repairer,
            },
            memory: self.unit_memory(),
            may_expire: self.may_expire,
        }
        .produce(state, available, capacity, produce)
    }

    fn renewal(&self) -> Option<&RenewalPolicy> {
        self.renewal.as_ref()
    }
}
