//! Test fixtures and helpers.
//!
//! A scripted [`MockWorld`], fixed-cost squads and pre-built layouts and
//! configs for consistent testing.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use colony_core::behavior::{Action, ActionError, ActionOutcome, TargetKind, UnitWorld};
use colony_core::body::{BodyPart, BodySpec};
use colony_core::colony::ColonyWorld;
use colony_core::config::ColonyConfig;
use colony_core::costgrid::{Hazard, Obstacle, RegionLayout, StructureKind, Terrain};
use colony_core::facility::{ProduceOutcome, ProductionFacility, UnitSpawn};
use colony_core::ids::{TargetId, UnitId};
use colony_core::math::GridPos;
use colony_core::squad::{ColonyState, ColonySurvey, Priority, SquadRequest};
use colony_core::unit::{Carry, ResourceKind, Role, RoleMemory, Unit, UnitState};
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Energy a single WORK part extracts per harvest.
pub const HARVEST_PER_WORK: u32 = 2;

/// A command the mock world received.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MockCommand {
    /// `move_toward`.
    Move {
        /// Unit moved.
        unit: UnitId,
        /// Destination.
        target: TargetId,
    },
    /// `perform`.
    Perform {
        /// Acting unit.
        unit: UnitId,
        /// Interaction.
        action: Action,
        /// Target.
        target: TargetId,
    },
    /// `drop_carried`.
    Drop {
        /// Unit that dropped.
        unit: UnitId,
    },
    /// `renew`, when the world handles renewal itself.
    Renew {
        /// Unit renewed.
        unit: UnitId,
        /// Facility asked.
        facility: TargetId,
    },
}

/// Scripted world with positioned targets.
///
/// Units interact at Chebyshev range 1, move one cell per move command and
/// lose one tick of lifetime each time the colony observes them. Sources
/// never run dry; depots and pickups hold finite stock. Outcomes can
/// be scripted per target and are consumed in order before the default
/// behavior applies.
#[derive(Debug, Clone, Default)]
pub struct MockWorld {
    /// Live unit ids.
    pub units: BTreeSet<UnitId>,
    /// Targets by kind, in preference order.
    pub targets: BTreeMap<TargetKind, Vec<TargetId>>,
    /// Target positions.
    pub positions: BTreeMap<TargetId, GridPos>,
    /// Finite stock of depots and pickups.
    pub stock: BTreeMap<TargetId, u32>,
    /// Energy received per target.
    pub received: BTreeMap<TargetId, u32>,
    /// Capacity of sinks; full sinks fail transfers with `Full`.
    pub sink_capacity: BTreeMap<TargetId, u32>,
    /// Scripted outcomes for `perform` on a target.
    pub scripted: BTreeMap<TargetId, VecDeque<ActionOutcome>>,
    /// Every command received, in order.
    pub log: Vec<MockCommand>,
    /// Survey reported each tick; pickups and construction sites are
    /// filled in from `targets`.
    pub survey: ColonySurvey,
}

impl MockWorld {
    /// Empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target of `kind` at `pos`.
    #[must_use]
    pub fn with_target(mut self, kind: TargetKind, id: &str, pos: GridPos) -> Self {
        self.add_target(kind, id, pos);
        self
    }

    /// Add a target of `kind` at `pos`.
    pub fn add_target(&mut self, kind: TargetKind, id: &str, pos: GridPos) {
        let id = TargetId::new(id);
        self.targets.entry(kind).or_default().push(id.clone());
        self.positions.insert(id, pos);
    }

    /// Remove a target of every kind.
    pub fn remove_target(&mut self, id: &str) {
        let id = TargetId::new(id);
        for ids in self.targets.values_mut() {
            ids.retain(|t| t != &id);
        }
        self.stock.remove(&id);
    }

    /// Script the next outcomes of `perform` on a target.
    pub fn script(&mut self, target: &str, outcomes: impl IntoIterator<Item = ActionOutcome>) {
        self.scripted
            .entry(TargetId::new(target))
            .or_default()
            .extend(outcomes);
    }

    /// Register a unit as alive.
    pub fn add_unit(&mut self, id: &UnitId) {
        self.units.insert(id.clone());
    }

    /// Make a unit disappear.
    pub fn kill(&mut self, id: &UnitId) {
        self.units.remove(id);
    }

    /// Commands issued to one unit.
    #[must_use]
    pub fn commands_for(&self, unit: &UnitId) -> Vec<&MockCommand> {
        self.log
            .iter()
            .filter(|c| match c {
                MockCommand::Move { unit: u, .. }
                | MockCommand::Perform { unit: u, .. }
                | MockCommand::Drop { unit: u }
                | MockCommand::Renew { unit: u, .. } => u == unit,
            })
            .collect()
    }

    /// Move commands toward a target.
    #[must_use]
    pub fn moves_toward(&self, target: &str) -> usize {
        self.log
            .iter()
            .filter(|c| matches!(c, MockCommand::Move { target: t, .. } if t.as_str() == target))
            .count()
    }

    fn kind_of(&self, target: &TargetId) -> Option<TargetKind> {
        self.targets
            .iter()
            .find(|(_, ids)| ids.contains(target))
            .map(|(kind, _)| *kind)
    }

    fn sink_full(&self, target: &TargetId) -> bool {
        self.sink_capacity
            .get(target)
            .is_some_and(|cap| self.received.get(target).copied().unwrap_or(0) >= *cap)
    }

    fn has_work(&self, target: &TargetId, kind: TargetKind) -> bool {
        match kind {
            TargetKind::Sink => !self.sink_full(target),
            TargetKind::Depot | TargetKind::Pickup => {
                self.stock.get(target).copied().unwrap_or(0) > 0
            }
            _ => true,
        }
    }

    fn apply(&mut self, unit: &mut Unit, action: Action, target: &TargetId) -> ActionOutcome {
        match action {
            Action::Harvest => {
                let amount = unit.body.work.max(1) * HARVEST_PER_WORK;
                unit.carry.add(ResourceKind::Energy, amount);
                ActionOutcome::Ok
            }
            Action::Withdraw => {
                let held = self.stock.get(target).copied().unwrap_or(0);
                if held == 0 {
                    return ActionOutcome::Failed(ActionError::Depleted);
                }
                let taken = unit.carry.add(ResourceKind::Energy, held);
                self.stock.insert(target.clone(), held - taken);
                ActionOutcome::Ok
            }
            Action::Transfer if self.sink_full(target) => ActionOutcome::Failed(ActionError::Full),
            Action::Transfer | Action::Build | Action::Repair | Action::Upgrade => {
                let spent = unit.carry.remove(ResourceKind::Energy, u32::MAX);
                *self.received.entry(target.clone()).or_insert(0) += spent;
                ActionOutcome::Ok
            }
        }
    }
}

impl UnitWorld for MockWorld {
    fn find_target(
        &self,
        unit: &Unit,
        kind: TargetKind,
        exclude: Option<&TargetId>,
    ) -> Option<TargetId> {
        self.targets
            .get(&kind)?
            .iter()
            .filter(|t| Some(*t) != exclude && self.has_work(t, kind))
            .min_by_key(|t| {
                let pos = self.positions.get(*t).copied().unwrap_or_default();
                (unit.pos.range_to(pos), (*t).clone())
            })
            .cloned()
    }

    fn target_valid(&self, target: &TargetId, kind: TargetKind) -> bool {
        self.targets.get(&kind).is_some_and(|ids| ids.contains(target)) && self.has_work(target, kind)
    }

    fn move_toward(&mut self, unit: &mut Unit, target: &TargetId) -> ActionOutcome {
        self.log.push(MockCommand::Move {
            unit: unit.id.clone(),
            target: target.clone(),
        });
        let Some(dest) = self.positions.get(target).copied() else {
            return ActionOutcome::Failed(ActionError::InvalidTarget);
        };
        let step = |from: u8, to: u8| match from.cmp(&to) {
            std::cmp::Ordering::Less => from + 1,
            std::cmp::Ordering::Greater => from - 1,
            std::cmp::Ordering::Equal => from,
        };
        unit.pos = GridPos::new(step(unit.pos.x, dest.x), step(unit.pos.y, dest.y));
        ActionOutcome::Ok
    }

    fn perform(&mut self, unit: &mut Unit, action: Action, target: &TargetId) -> ActionOutcome {
        self.log.push(MockCommand::Perform {
            unit: unit.id.clone(),
            action,
            target: target.clone(),
        });
        if let Some(outcome) = self.scripted.get_mut(target).and_then(VecDeque::pop_front) {
            return outcome;
        }
        if self.kind_of(target).is_none() {
            return ActionOutcome::Failed(ActionError::InvalidTarget);
        }
        let pos = self.positions.get(target).copied().unwrap_or_default();
        if unit.pos.range_to(pos) > 1 {
            return ActionOutcome::NotInRange;
        }
        self.apply(unit, action, target)
    }

    fn drop_carried(&mut self, unit: &mut Unit) -> ActionOutcome {
        self.log.push(MockCommand::Drop {
            unit: unit.id.clone(),
        });
        unit.carry.clear();
        ActionOutcome::Ok
    }

    fn nearby_facility(&self, _unit: &Unit) -> Option<TargetId> {
        None
    }

    fn renew(&mut self, unit: &mut Unit, facility: &TargetId) -> ActionOutcome {
        self.log.push(MockCommand::Renew {
            unit: unit.id.clone(),
            facility: facility.clone(),
        });
        ActionOutcome::Failed(ActionError::InvalidTarget)
    }
}

impl ColonyWorld for MockWorld {
    fn survey(&self) -> ColonySurvey {
        let mut survey = self.survey.clone();
        if let Some(pickups) = self.targets.get(&TargetKind::Pickup) {
            survey.pickups.clone_from(pickups);
        }
        survey.construction_sites = self
            .targets
            .get(&TargetKind::ConstructionSite)
            .map_or(0, |ids| ids.len() as u32);
        survey
    }

    fn unit_exists(&self, id: &UnitId) -> bool {
        self.units.contains(id)
    }

    /// Units age one tick per observation.
    fn observe(&self, unit: &mut Unit) {
        unit.ticks_to_live = unit.ticks_to_live.saturating_sub(1);
    }

    fn spawn_unit(&mut self, spawn: &UnitSpawn) {
        self.units.insert(spawn.name.clone());
    }
}

/// Squad with a fixed priority tier and a fixed body cost, for admission
/// tests that should not depend on sizing policy.
#[derive(Debug, Clone)]
pub struct FixedCostSquad {
    /// Squad name.
    pub name: String,
    /// Constant tier.
    pub priority: Priority,
    /// Body cost; rounded down to whole CARRY parts (50 each).
    pub cost: u32,
    /// Memory for produced units.
    pub memory: RoleMemory,
}

impl FixedCostSquad {
    /// Hauler squad with a fixed tier and cost.
    #[must_use]
    pub fn new(name: &str, priority: Priority, cost: u32) -> Self {
        Self {
            name: name.to_string(),
            priority,
            cost,
            memory: RoleMemory::Hauler { pickup: None },
        }
    }

    /// Boxed for a request list.
    #[must_use]
    pub fn boxed(name: &str, priority: Priority, cost: u32) -> Box<dyn SquadRequest> {
        Box::new(Self::new(name, priority, cost))
    }

    /// Body this squad always produces.
    #[must_use]
    pub fn body(&self) -> BodySpec {
        BodySpec::new(vec![BodyPart::Carry; (self.cost / BodyPart::Carry.cost()) as usize])
    }
}

impl SquadRequest for FixedCostSquad {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        self.memory.role()
    }

    fn unit_memory(&self) -> RoleMemory {
        self.memory.clone()
    }

    fn priority(&self, _state: &ColonyState) -> Priority {
        self.priority
    }

    fn sufficient_resource(&self, _state: &ColonyState, available: u32, _capacity: u32) -> bool {
        self.body().cost() <= available
    }

    fn materialize(
        &self,
        state: &ColonyState,
        _available: u32,
        _capacity: u32,
        produce: &mut dyn FnMut(UnitSpawn) -> ProduceOutcome,
    ) -> ProduceOutcome {
        let body = self.body();
        let name = UnitId::new(format!(
            "{}-{}-{}",
            self.name,
            state.tick,
            state.spawned_this_tick()
        ));
        let record = unit(name.as_str(), &self.name, self.unit_memory(), body.parts());
        produce(UnitSpawn { name, body, record })
    }
}

/// A fresh unit record: full lifetime, empty carry, at the origin.
#[must_use]
pub fn unit(id: &str, squad: &str, memory: RoleMemory, parts: &[BodyPart]) -> Unit {
    let body = BodySpec::new(parts.to_vec());
    Unit {
        id: UnitId::new(id),
        squad: squad.to_string(),
        state_owner: squad.to_string(),
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

/// Worker body: one of each basic part.
pub const WORKER_PARTS: [BodyPart; 3] = [BodyPart::Work, BodyPart::Carry, BodyPart::Move];

/// A general worker record.
#[must_use]
pub fn worker(id: &str, squad: &str) -> Unit {
    unit(id, squad, RoleMemory::Worker, &WORKER_PARTS)
}

/// A harvester record bound to `source`.
#[must_use]
pub fn harvester(id: &str, squad: &str, source: &str) -> Unit {
    unit(
        id,
        squad,
        RoleMemory::Harvester {
            source: TargetId::new(source),
        },
        &[BodyPart::Carry, BodyPart::Move, BodyPart::Work, BodyPart::Work],
    )
}

/// Fill a unit's carry to capacity.
pub fn fill(unit: &mut Unit) {
    let free = unit.carry.free();
    unit.carry.add(ResourceKind::Energy, free);
}

/// An idle facility with a full balance.
#[must_use]
pub fn facility(id: &str, pos: GridPos, capacity: u32) -> ProductionFacility {
    ProductionFacility::new(id, "alpha", pos, capacity, capacity)
}

/// Open region with no structures or hazards.
#[must_use]
pub fn open_layout(region: &str) -> RegionLayout {
    RegionLayout::open(region)
}

/// Open region with one hazard and danger shaping on.
#[must_use]
pub fn hazard_layout(region: &str, pos: GridPos, radius: u8) -> RegionLayout {
    let mut layout = RegionLayout::open(region);
    layout.shape_danger = true;
    layout.hazards.push(Hazard { pos, radius });
    layout
}

/// Region with a wall column, a swamp patch, a road and two structures.
#[must_use]
pub fn mixed_layout(region: &str) -> RegionLayout {
    let mut layout = RegionLayout::open(region);
    for y in 5..45 {
        layout.terrain.set(GridPos::new(20, y), Terrain::Impassable);
    }
    for y in 30..36 {
        for x in 30..36 {
            layout.terrain.set(GridPos::new(x, y), Terrain::Hindered);
        }
    }
    for x in 0..20 {
        layout.obstacles.push(Obstacle {
            pos: GridPos::new(x, 10),
            kind: StructureKind::Road,
        });
    }
    layout.obstacles.push(Obstacle {
        pos: GridPos::new(10, 12),
        kind: StructureKind::Wall,
    });
    layout.obstacles.push(Obstacle {
        pos: GridPos::new(11, 12),
        kind: StructureKind::Container,
    });
    layout
}

/// Sample colony config covering every squad kind.
pub const SAMPLE_CONFIG: &str = r#"
ColonyConfig(
    name: "alpha",
    home: "W1N1",
    squads: [
        Harvest(name: "harvest-src-1", source: "src-1", work_target: 4),
        Haul(name: "haul", pickup: Some("pickup-1"), target: 1),
        Worker(name: "workers", target: 2),
        Upgrade(name: "upgrade", controller: "ctrl", target: 1),
        Repair(name: "repair"),
    ],
    renewal: RenewalPolicy(renew_below: 300, renew_until: 1400),
    regions: {
        "W1N1": RegionProfile(shape_danger: true, hazard_radius: 4),
    },
)
"#;

/// Parsed [`SAMPLE_CONFIG`].
///
/// # Panics
///
/// Panics if the sample no longer parses.
#[must_use]
pub fn sample_config() -> ColonyConfig {
    ColonyConfig::from_ron(SAMPLE_CONFIG, "sample").expect("sample config parses")
}

/// A world matching [`SAMPLE_CONFIG`]: one source with a pickup next to it,
/// a depot, a sink, the controller and a facility at (25, 25).
#[must_use]
pub fn sample_world() -> MockWorld {
    let mut world = MockWorld::new()
        .with_target(TargetKind::Source, "src-1", GridPos::new(10, 10))
        .with_target(TargetKind::Pickup, "pickup-1", GridPos::new(11, 10))
        .with_target(TargetKind::Depot, "pickup-1", GridPos::new(11, 10))
        .with_target(TargetKind::Sink, "ext-1", GridPos::new(24, 25))
        .with_target(TargetKind::Controller, "ctrl", GridPos::new(30, 30));
    world.stock.insert(TargetId::new("pickup-1"), 500);
    world.survey.sources.push(colony_core::squad::SourceInfo {
        id: TargetId::new("src-1"),
        pos: GridPos::new(10, 10),
        open_slots: 3,
    });
    world.survey.controller = Some(colony_core::squad::ControllerInfo {
        id: TargetId::new("ctrl"),
        ticks_to_downgrade: 20_000,
    });
    world
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_world_moves_one_cell() {
        let mut world = MockWorld::new().with_target(TargetKind::Source, "src", GridPos::new(5, 3));
        let mut u = worker("w1", "workers");
        let target = TargetId::new("src");

        assert_eq!(
            world.perform(&mut u, Action::Harvest, &target),
            ActionOutcome::NotInRange
        );
        world.move_toward(&mut u, &target);
        assert_eq!(u.pos, GridPos::new(1, 1));
    }

    #[test]
    fn test_observation_ages_units() {
        let world = MockWorld::new();
        let mut u = worker("w1", "workers");
        u.ticks_to_live = 1;

        world.observe(&mut u);
        assert_eq!(u.ticks_to_live, 0);
        world.observe(&mut u);
        assert_eq!(u.ticks_to_live, 0);
    }

    #[test]
    fn test_scripted_outcomes_come_first() {
        let mut world = MockWorld::new().with_target(TargetKind::Source, "src", GridPos::default());
        world.script("src", [ActionOutcome::Failed(ActionError::Tired)]);
        let mut u = worker("w1", "workers");
        let target = TargetId::new("src");

        assert_eq!(
            world.perform(&mut u, Action::Harvest, &target),
            ActionOutcome::Failed(ActionError::Tired)
        );
        assert_eq!(world.perform(&mut u, Action::Harvest, &target), ActionOutcome::Ok);
        assert_eq!(u.carry.used(), HARVEST_PER_WORK);
    }

    #[test]
    fn test_sample_config_is_valid() {
        sample_config().validate().unwrap();
    }
}
