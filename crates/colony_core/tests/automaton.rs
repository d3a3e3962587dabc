//! Totality of the unit automaton: every role, from every stored state,
//! under every primitive outcome, ends the tick in a state its role handles.

use colony_core::behavior::{
    step, Action, ActionError, ActionOutcome, RenewalPolicy, RolePlan, TargetKind, UnitWorld,
    MAX_HOPS,
};
use colony_core::ids::TargetId;
use colony_core::unit::{ResourceKind, Role, Unit, UnitState};
use colony_test_utils::proptest::prelude::*;
use colony_test_utils::strategies::{arb_action_outcome, arb_unit, unit_for_role};

/// Every target is valid, a facility is always nearby and every primitive
/// answers with the same outcome.
#[derive(Debug, Clone, PartialEq)]
struct FixedOutcomeWorld {
    outcome: ActionOutcome,
    moves: u32,
    commands: Vec<(Option<Action>, TargetId)>,
}

impl FixedOutcomeWorld {
    fn new(outcome: ActionOutcome) -> Self {
        Self {
            outcome,
            moves: 0,
            commands: Vec::new(),
        }
    }
}

fn target_of(kind: TargetKind) -> TargetId {
    TargetId::new(format!("{kind:?}").to_lowercase())
}

impl UnitWorld for FixedOutcomeWorld {
    fn find_target(
        &self,
        _unit: &Unit,
        kind: TargetKind,
        exclude: Option<&TargetId>,
    ) -> Option<TargetId> {
        let target = target_of(kind);
        (exclude != Some(&target)).then_some(target)
    }

    fn target_valid(&self, _target: &TargetId, _kind: TargetKind) -> bool {
        true
    }

    fn move_toward(&mut self, _unit: &mut Unit, target: &TargetId) -> ActionOutcome {
        self.moves += 1;
        self.commands.push((None, target.clone()));
        ActionOutcome::Ok
    }

    fn perform(&mut self, unit: &mut Unit, action: Action, target: &TargetId) -> ActionOutcome {
        self.commands.push((Some(action), target.clone()));
        let spends = matches!(
            action,
            Action::Transfer | Action::Build | Action::Repair | Action::Upgrade
        );
        if self.outcome.is_ok() && spends {
            unit.carry.clear();
        }
        self.outcome
    }

    fn drop_carried(&mut self, unit: &mut Unit) -> ActionOutcome {
        unit.carry.clear();
        ActionOutcome::Ok
    }

    fn nearby_facility(&self, _unit: &Unit) -> Option<TargetId> {
        Some(TargetId::new("fac-1"))
    }

    fn renew(&mut self, unit: &mut Unit, facility: &TargetId) -> ActionOutcome {
        self.commands.push((None, facility.clone()));
        if self.outcome.is_ok() {
            unit.ticks_to_live += 200;
        }
        self.outcome
    }
}

fn all_outcomes() -> Vec<ActionOutcome> {
    let mut outcomes = vec![ActionOutcome::Ok, ActionOutcome::NotInRange];
    outcomes.extend(ActionError::ALL.map(ActionOutcome::Failed));
    outcomes
}

fn check_step(mut unit: Unit, outcome: ActionOutcome) -> Result<(), TestCaseError> {
    let retasked = unit.was_retasked();
    let mut replay_unit = unit.clone();
    let mut world = FixedOutcomeWorld::new(outcome);
    let mut replay_world = FixedOutcomeWorld::new(outcome);
    let policy = RenewalPolicy::default();

    let report = step(&mut unit, &mut world, &policy);

    let plan = RolePlan::for_role(unit.role());
    prop_assert!(report.hops <= MAX_HOPS);
    prop_assert!(plan.recognizes(unit.state), "{:?} left in {:?}", unit.role(), unit.state);
    prop_assert!(unit.resume_state.map_or(true, |s| plan.recognizes(s)));
    prop_assert!(world.moves <= 1, "more than one move in a tick");
    prop_assert_eq!(report.retasked, retasked);
    prop_assert_eq!(&unit.state_owner, &unit.squad);
    prop_assert_eq!(report.to, unit.state);

    let replay = step(&mut replay_unit, &mut replay_world, &policy);
    prop_assert_eq!(replay, report);
    prop_assert_eq!(replay_unit, unit);
    prop_assert_eq!(replay_world, world);
    Ok(())
}

#[test]
fn every_role_state_and_outcome_is_handled() {
    let mut cases = 0;
    for outcome in all_outcomes() {
        for role in Role::ALL {
            for state in UnitState::ALL {
                for (load, may_expire) in [(0, true), (50, true), (150, true), (50, false)] {
                    let mut unit = unit_for_role(role);
                    unit.state = state;
                    unit.carry.add(ResourceKind::Energy, load);
                    unit.may_expire = may_expire;
                    unit.ticks_to_live = if may_expire { 1_500 } else { 200 };
                    if let Err(e) = check_step(unit, outcome) {
                        panic!("{role:?} in {state:?} under {outcome:?}: {e}");
                    }
                    cases += 1;
                }
            }
        }
    }
    assert_eq!(cases, 9 * 5 * 8 * 4);
}

#[test]
fn retasked_unit_restarts_for_new_owner() {
    let mut unit = unit_for_role(Role::Worker);
    unit.state = UnitState::Upgrade;
    unit.squad = "builders".into();
    let mut world = FixedOutcomeWorld::new(ActionOutcome::Ok);

    let report = step(&mut unit, &mut world, &RenewalPolicy::default());

    assert!(report.retasked);
    assert_eq!(unit.state_owner, "builders");
    // Empty carry: restart lands in Gather.
    assert_eq!(unit.state, UnitState::Gather);
}

#[test]
fn foreign_state_is_normalized() {
    let mut unit = unit_for_role(Role::Harvester);
    unit.state = UnitState::Build;
    let mut world = FixedOutcomeWorld::new(ActionOutcome::NotInRange);

    let report = step(&mut unit, &mut world, &RenewalPolicy::default());

    assert!(report.normalized);
    assert_eq!(unit.state, UnitState::Gather);
    assert_eq!(world.moves, 1);
}

proptest! {
    #[test]
    fn arbitrary_records_end_in_a_recognized_state(unit in arb_unit(), outcome in arb_action_outcome()) {
        check_step(unit, outcome)?;
    }
}
