//! Haul squads.

use crate::behavior::RenewalPolicy;
use crate::body::BodyTemplate;
use crate::facility::{ProduceOutcome, UnitSpawn};
use crate::ids::TargetId;
use crate::unit::{Role, RoleMemory};

use super::{ColonyState, Priority, Sizing, SquadRequest, UnitPlan};

/// Haulers moving resource from pickup points to consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaulSquad {
    /// Squad name.
    pub name: String,
    /// Preferred pickup point.
    pub pickup: Option<TargetId>,
    /// Units wanted.
    pub target: u32,
    /// Body sizing rule.
    pub body: BodyTemplate,
    /// Whether units may expire instead of renewing.
    pub may_expire: bool,
    /// Renewal override.
    pub renewal: Option<RenewalPolicy>,
}

impl HaulSquad {
    fn sizing(&self) -> Sizing<'_> {
        Sizing {
            template: &self.body,
            role: Role::Hauler,
        }
    }
}

impl SquadRequest for HaulSquad {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Hauler
    }

    fn unit_memory(&self) -> RoleMemory {
        RoleMemory::Hauler {
            pickup: self.pickup.clone(),
        }
    }

    fn priority(&self, state: &ColonyState) -> Priority {
        if self.missing_reference(state).is_some() {
            return Priority::None;
        }
        let harvesters = state.role_count(Role::Harvester);
        if state.role_count(Role::Hauler) == 0 && harvesters > 0 {
            Priority::High
        } else if harvesters > 0 && state.squad(&self.name).units < self.target {
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
        let pickup = self.pickup.as_ref()?;
        (!state.has_pickup(pickup))
            .then(|| format!("squad {} references missing pickup {pickup}", self.name))
    }

    fn renewal(&self) -> Option<&RenewalPolicy> {
        self.renewal.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyPart, BodySpec};
    use crate::squad::{default_hauler_template, ColonySurvey};
    use crate::unit::Unit;

    fn squad(pickup: Option<&str>) -> HaulSquad {
        HaulSquad {
            name: "haul".into(),
            pickup: pickup.map(TargetId::new),
            target: 2,
            body: default_hauler_template(),
            may_expire: true,
            renewal: None,
        }
    }

    fn unit(id: &str, squad: &str, memory: RoleMemory) -> Unit {
        Unit::fixture(
            id,
            squad,
            memory,
            &BodySpec::new(vec![BodyPart::Work, BodyPart::Carry, BodyPart::Move]),
        )
    }

    fn harvester(id: &str) -> Unit {
        unit(
            id,
            "harvest",
            RoleMemory::Harvester {
                source: TargetId::new("src"),
            },
        )
    }

    #[test]
    fn test_no_haulers_needed_without_harvesters() {
        let state = ColonyState::new("alpha", 1, ColonySurvey::default(), []);
        assert_eq!(squad(None).priority(&state), Priority::None);
    }

    #[test]
    fn test_priority_tiers() {
        let squad = squad(None);
        let units = [harvester("h1")];
        let state = ColonyState::new("alpha", 1, ColonySurvey::default(), &units);
        assert_eq!(squad.priority(&state), Priority::High);

        let units = [harvester("h1"), unit("c1", "haul", RoleMemory::Hauler { pickup: None })];
        let state = ColonyState::new("alpha", 1, ColonySurvey::default(), &units);
        assert_eq!(squad.priority(&state), Priority::Low);

        let units = [
            harvester("h1"),
            unit("c1", "haul", RoleMemory::Hauler { pickup: None }),
            unit("c2", "haul", RoleMemory::Hauler { pickup: None }),
        ];
        let state = ColonyState::new("alpha", 1, ColonySurvey::default(), &units);
        assert_eq!(squad.priority(&state), Priority::None);
    }

    #[test]
    fn test_missing_pickup_is_reported() {
        let squad = squad(Some("box-1"));
        let units = [harvester("h1")];
        let state = ColonyState::new("alpha", 1, ColonySurvey::default(), &units);
        assert_eq!(squad.priority(&state), Priority::None);
        assert!(squad.missing_reference(&state).is_some());

        let survey = ColonySurvey {
            pickups: vec![TargetId::new("box-1")],
            ..ColonySurvey::default()
        };
        let state = ColonyState::new("alpha", 1, survey, &units);
        assert_eq!(squad.priority(&state), Priority::High);
    }
}
