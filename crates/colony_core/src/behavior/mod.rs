//! Per-unit task automaton.
//!
//! [`step`] advances one unit by one tick. Each state handler either uses
//! the tick (an action or move was issued, or the unit waits) or hands off
//! to another state to be evaluated in the same tick. Hand-offs are bounded
//! and a state is never evaluated twice in one tick; a hand-off back to a
//! state already evaluated ends the step in the current state.
//!
//! The unit record is the only continuation between ticks: state, cached
//! target and the state to resume after renewal all live on [`Unit`].

mod plan;
mod renewal;
mod world;

use crate::ids::TargetId;
use crate::unit::{RoleMemory, Unit, UnitState};

pub use plan::{DeliverFallback, GatherFrom, RolePlan};
pub use renewal::RenewalPolicy;
pub use world::{Action, ActionError, ActionOutcome, TargetKind, UnitWorld};

/// Most state hand-offs evaluated in one tick.
pub const MAX_HOPS: u8 = 6;

/// What a state handler decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// The tick is used; stay in the current state.
    Stay,
    /// The tick is used; start the next tick in this state.
    Yield(UnitState),
    /// Nothing was issued; evaluate this state now.
    Goto(UnitState),
}

/// What one step did to a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// State at the start of the step.
    pub from: UnitState,
    /// State at the end of the step.
    pub to: UnitState,
    /// Hand-offs evaluated.
    pub hops: u8,
    /// World commands issued (moves, actions, drops, renewals).
    pub commands: u8,
    /// Whether a move was issued.
    pub moved: bool,
    /// The owner changed and the automaton restarted.
    pub retasked: bool,
    /// The stored state was not one the role handles.
    pub normalized: bool,
    /// The unit entered renewal this step.
    pub entered_renewal: bool,
    /// The hop bound cut the step short.
    pub hit_bound: bool,
}

impl StepReport {
    fn new(from: UnitState) -> Self {
        Self {
            from,
            to: from,
            hops: 0,
            commands: 0,
            moved: false,
            retasked: false,
            normalized: false,
            entered_renewal: false,
            hit_bound: false,
        }
    }
}

/// Advance one unit by one tick.
pub fn step<W: UnitWorld + ?Sized>(
    unit: &mut Unit,
    world: &mut W,
    policy: &RenewalPolicy,
) -> StepReport {
    let mut report = StepReport::new(unit.state);

    if unit.was_retasked() {
        tracing::debug!(unit = %unit.id, from = %unit.state_owner, to = %unit.squad, "unit re-tasked");
        unit.reset_for_owner();
        report.retasked = true;
    }

    let plan = RolePlan::for_role(unit.role());
    if !plan.recognizes(unit.state) {
        unit.state = UnitState::None;
        unit.target = None;
        report.normalized = true;
    }
    if unit.resume_state.is_some_and(|s| !plan.recognizes(s)) {
        unit.resume_state = None;
    }

    let mut runner = Runner {
        world,
        plan,
        policy,
        commands: 0,
        moved: false,
    };
    report.entered_renewal = runner.enter_renewal(unit);

    let mut visited: Vec<UnitState> = Vec::with_capacity(usize::from(MAX_HOPS) + 1);
    loop {
        visited.push(unit.state);
        match runner.handle(unit) {
            Flow::Stay => break,
            Flow::Yield(next) => {
                set_state(unit, next);
                break;
            }
            Flow::Goto(next) => {
                // The hand-off chain closed on itself: wait where we are.
                if visited.contains(&next) {
                    break;
                }
                report.hops += 1;
                set_state(unit, next);
                if report.hops >= MAX_HOPS {
                    report.hit_bound = true;
                    break;
                }
            }
        }
    }

    report.to = unit.state;
    report.commands = runner.commands;
    report.moved = runner.moved;
    if report.from != report.to {
        tracing::debug!(unit = %unit.id, from = ?report.from, to = ?report.to, "state transition");
    }
    report
}

fn set_state(unit: &mut Unit, next: UnitState) {
    if unit.state != next {
        unit.state = next;
        unit.target = None;
    }
}

struct Runner<'a, W: UnitWorld + ?Sized> {
    world: &'a mut W,
    plan: RolePlan,
    policy: &'a RenewalPolicy,
    commands: u8,
    moved: bool,
}

impl<W: UnitWorld + ?Sized> Runner<'_, W> {
    fn handle(&mut self, unit: &mut Unit) -> Flow {
        match unit.state {
            UnitState::None | UnitState::Idle => Flow::Goto(UnitState::Gather),
            UnitState::Gather => self.gather(unit),
            UnitState::Deliver => self.deliver(unit),
            state @ (UnitState::Build | UnitState::Repair | UnitState::Upgrade) => {
                self.act(unit, state)
            }
            UnitState::AwaitingRenewal => self.await_renewal(unit),
        }
    }

    // World commands

    fn perform(&mut self, unit: &mut Unit, action: Action, target: &TargetId) -> ActionOutcome {
        self.commands += 1;
        self.world.perform(unit, action, target)
    }

    fn move_toward(&mut self, unit: &mut Unit, target: &TargetId) {
        self.commands += 1;
        self.moved = true;
        let outcome = self.world.move_toward(unit, target);
        if !outcome.is_ok() {
            tracing::trace!(unit = %unit.id, target = %target, ?outcome, "move not issued");
        }
    }

    fn valid_cached(&self, unit: &Unit, kind: TargetKind) -> Option<TargetId> {
        unit.target
            .clone()
            .filter(|t| self.world.target_valid(t, kind))
    }

    fn after_success(unit: &Unit) -> Flow {
        if unit.carry.is_empty() {
            Flow::Yield(UnitState::Gather)
        } else {
            Flow::Stay
        }
    }

    // Gather

    fn gather(&mut self, unit: &mut Unit) -> Flow {
        let first = self.plan.first_act();
        let critical = unit.ticks_to_live <= self.policy.critical_lifetime;
        if unit.carry.is_full() || (critical && !unit.carry.is_empty()) {
            return Flow::Goto(first);
        }

        let Some((target, action)) = self.gather_target(unit) else {
            return if unit.carry.is_empty() {
                Flow::Stay
            } else {
                Flow::Goto(first)
            };
        };
        unit.target = Some(target.clone());

        match self.perform(unit, action, &target) {
            ActionOutcome::Ok => Flow::Stay,
            ActionOutcome::NotInRange => {
                self.move_toward(unit, &target);
                Flow::Stay
            }
            ActionOutcome::Failed(error) if error.is_permanent() => {
                unit.target = None;
                if unit.carry.is_empty() {
                    Flow::Stay
                } else {
                    Flow::Goto(first)
                }
            }
            ActionOutcome::Failed(ActionError::Full) => Flow::Goto(first),
            ActionOutcome::Failed(_) => Flow::Stay,
        }
    }

    fn gather_target(&self, unit: &Unit) -> Option<(TargetId, Action)> {
        match self.plan.gather {
            GatherFrom::BoundSource => match &unit.memory {
                RoleMemory::Harvester { source }
                    if self.world.target_valid(source, TargetKind::Source) =>
                {
                    Some((source.clone(), Action::Harvest))
                }
                _ => None,
            },
            GatherFrom::Pickup => {
                let preferred = match &unit.memory {
                    RoleMemory::Hauler { pickup: Some(p) } => Some(p.clone()),
                    _ => None,
                };
                self.valid_cached(unit, TargetKind::Pickup)
                    .or_else(|| preferred.filter(|p| self.world.target_valid(p, TargetKind::Pickup)))
                    .or_else(|| self.world.find_target(unit, TargetKind::Pickup, None))
                    .map(|t| (t, Action::Withdraw))
            }
            GatherFrom::DepotThenSource => {
                if let Some(depot) = self.valid_cached(unit, TargetKind::Depot) {
                    return Some((depot, Action::Withdraw));
                }
                if let Some(source) = self.valid_cached(unit, TargetKind::Source) {
                    return Some((source, Action::Harvest));
                }
                self.world
                    .find_target(unit, TargetKind::Depot, None)
                    .map(|t| (t, Action::Withdraw))
                    .or_else(|| {
                        self.world
                            .find_target(unit, TargetKind::Source, None)
                            .map(|t| (t, Action::Harvest))
                    })
            }
        }
    }

    // Deliver

    fn deliver(&mut self, unit: &mut Unit) -> Flow {
        if unit.carry.is_empty() {
            return Flow::Goto(UnitState::Gather);
        }
        let kind = self.plan.deliver_to;
        let target = self
            .valid_cached(unit, kind)
            .or_else(|| self.world.find_target(unit, kind, None));
        let Some(target) = target else {
            return self.deliver_blocked(unit);
        };
        unit.target = Some(target.clone());

        match self.perform(unit, Action::Transfer, &target) {
            ActionOutcome::Ok => Self::after_success(unit),
            ActionOutcome::NotInRange => {
                self.move_toward(unit, &target);
                Flow::Stay
            }
            ActionOutcome::Failed(error) if error == ActionError::Full || error.is_permanent() => {
                unit.target = None;
                match self.world.find_target(unit, kind, Some(&target)) {
                    Some(alternate) => self.deliver_alternate(unit, &alternate),
                    None => self.deliver_blocked(unit),
                }
            }
            ActionOutcome::Failed(_) => Flow::Stay,
        }
    }

    /// One attempt at a second destination in the same tick.
    fn deliver_alternate(&mut self, unit: &mut Unit, alternate: &TargetId) -> Flow {
        unit.target = Some(alternate.clone());
        match self.perform(unit, Action::Transfer, alternate) {
            ActionOutcome::Ok => Self::after_success(unit),
            ActionOutcome::NotInRange => {
                self.move_toward(unit, alternate);
                Flow::Stay
            }
            ActionOutcome::Failed(_) => {
                unit.target = None;
                Flow::Stay
            }
        }
    }

    fn deliver_blocked(&mut self, unit: &mut Unit) -> Flow {
        if let Some(next) = self.plan.next_act(UnitState::Deliver) {
            return Flow::Goto(next);
        }
        match self.plan.fallback {
            DeliverFallback::DropInPlace => {
                self.commands += 1;
                let outcome = self.world.drop_carried(unit);
                if outcome.is_ok() {
                    Flow::Yield(UnitState::Gather)
                } else {
                    Flow::Stay
                }
            }
            DeliverFallback::Wait => Flow::Stay,
        }
    }

    // Build / Repair / Upgrade

    fn act(&mut self, unit: &mut Unit, state: UnitState) -> Flow {
        if unit.carry.is_empty() {
            return Flow::Goto(UnitState::Gather);
        }
        let (kind, action) = match state {
            UnitState::Build => (TargetKind::ConstructionSite, Action::Build),
            UnitState::Repair => (TargetKind::Damaged, Action::Repair),
            _ => (TargetKind::Controller, Action::Upgrade),
        };
        let next = self.plan.next_act(state).unwrap_or(UnitState::None);

        let bound = match &unit.memory {
            RoleMemory::Upgrader { controller } if action == Action::Upgrade => {
                Some(controller.clone())
            }
            _ => None,
        };
        let target = self
            .valid_cached(unit, kind)
            .or_else(|| bound.filter(|c| self.world.target_valid(c, kind)))
            .or_else(|| self.world.find_target(unit, kind, None));
        let Some(target) = target else {
            return Flow::Goto(next);
        };
        unit.target = Some(target.clone());

        match self.perform(unit, action, &target) {
            ActionOutcome::Ok => Self::after_success(unit),
            ActionOutcome::NotInRange => {
                self.move_toward(unit, &target);
                Flow::Stay
            }
            ActionOutcome::Failed(error) if error.is_permanent() => {
                unit.target = None;
                Flow::Goto(next)
            }
            ActionOutcome::Failed(_) => Flow::Stay,
        }
    }

    // Renewal

    fn enter_renewal(&mut self, unit: &mut Unit) -> bool {
        if unit.may_expire
            || unit.state == UnitState::AwaitingRenewal
            || !self.policy.wants_renewal(unit.ticks_to_live)
        {
            return false;
        }
        let Some(facility) = self.world.nearby_facility(unit) else {
            return false;
        };
        tracing::debug!(unit = %unit.id, ticks_to_live = unit.ticks_to_live, facility = %facility, "awaiting renewal");
        unit.resume_state = match unit.state {
            UnitState::None | UnitState::Idle => None,
            state => Some(state),
        };
        unit.state = UnitState::AwaitingRenewal;
        unit.target = Some(facility);
        true
    }

    fn leave_renewal(unit: &mut Unit) -> UnitState {
        unit.resume_state.take().unwrap_or(UnitState::None)
    }

    fn await_renewal(&mut self, unit: &mut Unit) -> Flow {
        if self.policy.renewal_finished(unit.ticks_to_live) {
            return Flow::Goto(Self::leave_renewal(unit));
        }
        let Some(facility) = unit.target.clone() else {
            return Flow::Goto(Self::leave_renewal(unit));
        };

        self.commands += 1;
        match self.world.renew(unit, &facility) {
            ActionOutcome::Ok => {
                if unit.ticks_to_live >= self.policy.renew_until {
                    Flow::Yield(Self::leave_renewal(unit))
                } else {
                    Flow::Stay
                }
            }
            ActionOutcome::NotInRange => {
                self.move_toward(unit, &facility);
                Flow::Stay
            }
            // Occupied facility: abandon rather than queue.
            ActionOutcome::Failed(ActionError::Busy) => Flow::Goto(Self::leave_renewal(unit)),
            ActionOutcome::Failed(error) if error.is_permanent() => {
                Flow::Goto(Self::leave_renewal(unit))
            }
            ActionOutcome::Failed(_) => Flow::Stay,
        }
    }
}
