//! Harvest squads: static extraction at one configured source.

use crate::behavior::RenewalPolicy;
use crate::body::BodyTemplate;
use crate::facility::{ProduceOutcome, UnitSpawn};
use crate::ids::TargetId;
use crate::unit::{Role, RoleMemory};

use super::{ColonyState, Priority, Sizing, SquadRequest, UnitPlan};

/// Static harvesters bound to one source.
///
/// Escalates to `Urgent` when the colony has no harvesters at all, since
/// nothing else produces resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSquad {
    /// Squad name.
    pub name: String,
    /// Source the squad extracts from.
    pub source: TargetId,
    /// WORK parts wanted at the source.
    pub work_target: u32,
    /// Body sizing rule.
    pub body: BodyTemplate,
    /// Whether units may expire instead of renewing.
    pub may_expire: bool,
    /// Renewal override.
    pub renewal: Option<RenewalPolicy>,
}

impl HarvestSquad {
    fn sizing(&self) -> Sizing<'_> {
        Sizing {
            template: &self.body,
            role: Role::Harvester,
        }
    }
}

impl SquadRequest for HarvestSquad {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Harvester
    }

    fn unit_memory(&self) -> RoleMemory {
        RoleMemory::Harvester {
            source: self.source.clone(),
        }
    }

    fn priority(&self, state: &ColonyState) -> Priority {
        let Some(source) = state.source(&self.source) else {
            return Priority::None;
        };
        if state.role_count(Role::Harvester) == 0 {
            return Priority::Urgent;
        }
        let census = state.squad(&self.name);
        if census.units == 0 {
            Priority::High
        } else if census.work_parts < self.work_target && census.units < source.open_slots {
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

    fn missing_reference(&self, state: &ColonyState) -> Option<String> {
        state
            .source(&self.source)
            .is_none()
            .then(|| format!("squad {} references missing source {}", self.name, self.source))
    }

    fn renewal(&self) -> Option<&RenewalPolicy> {
        self.renewal.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyPart, BodySpec};
    use crate::math::GridPos;
    use crate::squad::{default_harvester_template, ColonySurvey, SourceInfo};
    use crate::unit::Unit;

    fn squad() -> HarvestSquad {
        HarvestSquad {
            name: "harvest-a".into(),
            source: TargetId::new("src-a"),
            work_target: 5,
            body: default_harvester_template(),
            may_expire: true,
            renewal: None,
        }
    }

    fn survey() -> ColonySurvey {
        ColonySurvey {
            sources: vec![
                SourceInfo {
                    id: TargetId::new("src-a"),
                    pos: GridPos::new(10, 10),
                    open_slots: 2,
                },
                SourceInfo {
                    id: TargetId::new("src-b"),
                    pos: GridPos::new(40, 40),
                    open_slots: 3,
                },
            ],
            ..ColonySurvey::default()
        }
    }

    fn harvester(id: &str, squad: &str, work: usize) -> Unit {
        let mut parts = vec![BodyPart::Carry, BodyPart::Move];
        parts.extend(std::iter::repeat(BodyPart::Work).take(work));
        Unit::fixture(
            id,
            squad,
            RoleMemory::Harvester {
                source: TargetId::new("src-a"),
            },
            &BodySpec::new(parts),
        )
    }

    #[test]
    fn test_priority_escalates_on_starvation() {
        let squad = squad();
        let empty = ColonyState::new("alpha", 1, survey(), []);
        assert_eq!(squad.priority(&empty), Priority::Urgent);

        let elsewhere = [harvester("h1", "harvest-b", 5)];
        let state = ColonyState::new("alpha", 1, survey(), &elsewhere);
        assert_eq!(squad.priority(&state), Priority::High);
    }

    #[test]
    fn test_priority_grows_to_work_target_and_slots() {
        let squad = squad();
        let units = [harvester("h1", "harvest-a", 2)];
        let state = ColonyState::new("alpha", 1, survey(), &units);
        assert_eq!(squad.priority(&state), Priority::Normal);

        let units = [harvester("h1", "harvest-a", 5)];
        let state = ColonyState::new("alpha", 1, survey(), &units);
        assert_eq!(squad.priority(&state), Priority::None);

        // Two slots at the source are both taken even though WORK is short.
        let units = [harvester("h1", "harvest-a", 1), harvester("h2", "harvest-a", 1)];
        let state = ColonyState::new("alpha", 1, survey(), &units);
        assert_eq!(squad.priority(&state), Priority::None);
    }

    #[test]
    fn test_missing_source_degrades_to_none() {
        let squad = squad();
        let state = ColonyState::new("alpha", 1, ColonySurvey::default(), []);
        assert_eq!(squad.priority(&state), Priority::None);
        assert!(squad.missing_reference(&state).is_some());

        let state = ColonyState::new("alpha", 1, survey(), []);
        assert!(squad.missing_reference(&state).is_none());
    }

    #[test]
    fn test_materialize_binds_source() {
        let squad = squad();
        let state = ColonyState::new("alpha", 7, survey(), []);
        let mut produced = None;
        let outcome = squad.materialize(&state, 300, 800, &mut |spawn| {
            produced = Some(spawn);
            ProduceOutcome::Ok
        });

        assert_eq!(outcome, ProduceOutcome::Ok);
        let spawn = produced.unwrap();
        // Starved: the 300 on hand buys carry + move + two work, not the
        // 800-capacity body.
        assert_eq!(spawn.body.cost(), 300);
        assert_eq!(spawn.body.len(), 4);
        assert_eq!(spawn.name.as_str(), "harvest-a-7-0");
        assert_eq!(spawn.record.squad, "harvest-a");
        assert_eq!(
            spawn.record.memory,
            RoleMemory::Harvester {
                source: TargetId::new("src-a")
            }
        );
    }
}
