//! Upgrade squads bound to one controller, with an alarm when the
//! controller is close to downgrading.

use crate::behavior::RenewalPolicy;
use crate::body::BodyTemplate;
use crate::facility::{ProduceOutcome, UnitSpawn};
use crate::ids::TargetId;
use crate::unit::{Role, RoleMemory};

use super::{ColonyState, Priority, Sizing, SquadRequest, UnitPlan};

/// Dedicated controller upgraders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeSquad {
    /// Squad name.
    pub name: String,
    /// Controller to upgrade.
    pub controller: TargetId,
    /// Units wanted.
    pub target: u32,
    /// Downgrade countdown below which an empty squad is urgent.
    pub downgrade_alarm: u32,
    /// Body sizing rule.
    pub body: BodyTemplate,
    /// Whether units may expire instead of renewing.
    pub may_expire: bool,
    /// Renewal override.
    pub renewal: Option<RenewalPolicy>,
}

impl UpgradeSquad {
    fn sizing(&self) -> Sizing<'_> {
        Sizing {
            template: &self.body,
            role: Role::Upgrader,
        }
    }
}

impl SquadRequest for UpgradeSquad {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Upgrader
    }

    fn unit_memory(&self) -> RoleMemory {
        RoleMemory::Upgrader {
            controller: self.controller.clone(),
        }
    }

    fn priority(&self, state: &ColonyState) -> Priority {
        let Some(controller) = state.controller(&self.controller) else {
            return Priority::None;
        };
        let live = state.role_count(Role::Upgrader);
        if live == 0 && controller.ticks_to_downgrade < self.downgrade_alarm {
            Priority::Urgent
        } else if state.squad(&self.name).units < self.target {
            Priority::Low
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

    fn missing_reference(&self, state: &ColonyState) -> Option<String> {
        state.controller(&self.controller).is_none().then(|| {
            format!(
                "squad {} references missing controller {}",
                self.name, self.controller
            )
        })
    }

    fn renewal(&self) -> Option<&RenewalPolicy> {
        self.renewal.as_ref()
    }
}
