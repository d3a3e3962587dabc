//! One colony's per-tick orchestration.
//!
//! A [`Colony`] owns its squads, production facilities, cost grid cache and
//! diagnostics. [`Colony::run_tick`] is the whole decision pass for one tick:
//!
//! 1. drop cached cost grids the store or the world says are stale;
//! 2. mirror squad configs into the store and build squads the store added;
//! 3. prune unit records whose unit no longer exists;
//! 4. give re-tasked units their new owner's role fields;
//! 5. build the [`ColonyState`] snapshot;
//! 6. tick facilities and run admission, recording every new unit;
//! 7. refresh every pre-existing unit from the world and step it, in id
//!    order, through its automaton;
//! 8. mirror the cost grid cache into the store;
//! 9. flush batched diagnostics.

use std::collections::{BTreeMap, BTreeSet};

use crate::behavior::{self, ActionError, ActionOutcome, RenewalPolicy, StepReport, UnitWorld};
use crate::behavior::{Action, TargetKind};
use crate::config::{ColonyConfig, RegionProfile};
use crate::costgrid::{CostGrid, CostMatrixCache, RegionLayout};
use crate::diagnostics::{DiagnosticCause, Diagnostics};
use crate::error::Result;
use crate::facility::{ProductionFacility, RenewOutcome, UnitSpawn};
use crate::ids::{RegionId, TargetId, UnitId};
use crate::scheduler::{schedule_colony, Admission};
use crate::squad::{ColonyState, ColonySurvey, SquadConfig, SquadRequest, TargetOverrides};
use crate::store::RecordStore;
use crate::unit::Unit;

/// The world as a colony sees it.
///
/// Production facilities are owned by the colony; the world only reports
/// what it observes and executes unit commands.
pub trait ColonyWorld: UnitWorld {
    /// What the world reports about the colony this tick.
    fn survey(&self) -> ColonySurvey;

    /// Whether a unit with this id still exists.
    fn unit_exists(&self, id: &UnitId) -> bool;

    /// Copy what the world currently observes about a unit (remaining
    /// lifetime, position, carried resources) onto its record.
    fn observe(&self, unit: &mut Unit);

    /// Place a unit that production just started.
    fn spawn_unit(&mut self, spawn: &UnitSpawn);
}

/// What one tick did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Tick number.
    pub tick: u64,
    /// Cached regions dropped before admission.
    pub invalidated: Vec<RegionId>,
    /// Squads first built this tick from configs found in the store.
    pub created_squads: Vec<String>,
    /// Unit records pruned because the unit disappeared.
    pub pruned: Vec<UnitId>,
    /// Admission results, one event per facility.
    pub admission: Admission,
    /// Step result per unit advanced this tick.
    pub steps: BTreeMap<UnitId, StepReport>,
    /// Distinct diagnostic causes emitted on flush.
    pub diagnostics_emitted: usize,
}

impl TickReport {
    /// Units whose state changed this tick.
    pub fn transitions(&self) -> impl Iterator<Item = (&UnitId, &StepReport)> {
        self.steps.iter().filter(|(_, r)| r.from != r.to)
    }
}

/// Decision context for one colony.
#[derive(Debug)]
pub struct Colony {
    name: String,
    home: RegionId,
    squads: Vec<Box<dyn SquadRequest>>,
    squad_configs: Vec<SquadConfig>,
    overrides: TargetOverrides,
    facilities: Vec<ProductionFacility>,
    cache: CostMatrixCache,
    diagnostics: Diagnostics,
    renewal: RenewalPolicy,
    regions: BTreeMap<RegionId, RegionProfile>,
}

impl Colony {
    /// Build a colony from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ColonyError::InvalidConfig`] if validation fails.
    pub fn from_config(config: &ColonyConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            colony = %config.name,
            home = %config.home,
            squads = config.squads.len(),
            "colony initialized"
        );
        Ok(Self {
            name: config.name.clone(),
            home: config.home.clone(),
            squads: config.build_squads(),
            squad_configs: config.squads.clone(),
            overrides: config.region(&config.home).overrides(),
            facilities: Vec::new(),
            cache: CostMatrixCache::new(config.cost_profile.clone()),
            diagnostics: Diagnostics::new(),
            renewal: config.renewal,
            regions: config.regions.clone(),
        })
    }

    /// Replace the squad list. Replaced squads have no config records, so
    /// none are mirrored into the store.
    #[must_use]
    pub fn with_squads(mut self, squads: Vec<Box<dyn SquadRequest>>) -> Self {
        self.squads = squads;
        self.squad_configs.clear();
        self
    }

    /// Colony name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Home region.
    #[must_use]
    pub fn home(&self) -> &RegionId {
        &self.home
    }

    /// Squads in declaration order.
    #[must_use]
    pub fn squads(&self) -> &[Box<dyn SquadRequest>] {
        &self.squads
    }

    /// Register a production facility.
    pub fn add_facility(&mut self, facility: ProductionFacility) {
        self.facilities.push(facility);
    }

    /// Production facilities.
    #[must_use]
    pub fn facilities(&self) -> &[ProductionFacility] {
        &self.facilities
    }

    /// Production facilities, for regeneration by the caller.
    pub fn facilities_mut(&mut self) -> &mut [ProductionFacility] {
        &mut self.facilities
    }

    /// Cost grid cache.
    #[must_use]
    pub fn cache(&self) -> &CostMatrixCache {
        &self.cache
    }

    /// Diagnostics batcher.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn profiled(&self, layout: &RegionLayout) -> RegionLayout {
        let mut layout = layout.clone();
        self.regions
            .get(&layout.region)
            .cloned()
            .unwrap_or_default()
            .apply(&mut layout);
        layout
    }

    /// Cost grid for a region, computing it on a miss.
    ///
    /// The region's profile is applied to `layout` first. A freshly computed
    /// grid is written to `store` straight away so the next tick's store sync
    /// keeps it.
    pub fn cost_grid(&mut self, store: &mut RecordStore, layout: &RegionLayout, tick: u64) -> &CostGrid {
        let layout = self.profiled(layout);
        let grid = self.cache.get_or_compute(&layout, tick, &mut self.diagnostics);
        let stored = store
            .cost_grid(grid.region())
            .is_some_and(|s| s.token == grid.token());
        if !stored {
            store.put_cost_grid(grid.snapshot());
        }
        grid
    }

    /// Drop a region's grid if its inputs changed. Returns `true` if dropped.
    pub fn refresh_region(&mut self, layout: &RegionLayout) -> bool {
        let layout = self.profiled(layout);
        self.cache.refresh_if_changed(&layout)
    }

    /// Adopt persisted grids for the given layouts whose inputs still match.
    pub fn restore_cost_grids<'a>(
        &mut self,
        store: &RecordStore,
        layouts: impl IntoIterator<Item = &'a RegionLayout>,
    ) -> usize {
        let profiled: Vec<RegionLayout> = layouts.into_iter().map(|l| self.profiled(l)).collect();
        self.cache.restore_from_store(store, &profiled)
    }

    /// Forget a region's grid in the cache and the store.
    pub fn invalidate_region(&mut self, store: &mut RecordStore, region: &RegionId) -> bool {
        let cached = self.cache.invalidate(region);
        let stored = store.clear_cost_grid(region);
        cached || stored
    }

    /// Write missing squad configs to the store, then build a squad for
    /// every stored config this colony does not have yet. Returns the names
    /// of the squads built.
    fn sync_squads(&mut self, store: &mut RecordStore) -> Vec<String> {
        for config in &self.squad_configs {
            if store.squad(config.name()).is_none() {
                store.put_squad(config.clone());
            }
        }

        let known: BTreeSet<&str> = self.squads.iter().map(|s| s.name()).collect();
        let added: Vec<SquadConfig> = store
            .squads()
            .filter(|c| !known.contains(c.name()))
            .cloned()
            .collect();

        let mut created = Vec::with_capacity(added.len());
        for config in added {
            tracing::info!(
                colony = %self.name,
                squad = config.name(),
                role = config.role().label(),
                "squad created"
            );
            self.squads.push(config.build(&self.overrides));
            created.push(config.name().to_string());
            self.squad_configs.push(config);
        }
        created
    }

    /// Re-tasked units take the role fields of their new owner, so the
    /// automaton they restart in and the census they count toward both
    /// belong to that owner.
    fn adopt_owner_memory(&self, store: &mut RecordStore) {
        for id in store.unit_ids() {
            let Some(unit) = store.unit(&id) else {
                continue;
            };
            if !unit.was_retasked() {
                continue;
            }
            let Some(owner) = self.squads.iter().find(|s| s.name() == unit.squad) else {
                continue;
            };
            let memory = owner.unit_memory();
            if unit.memory == memory {
                continue;
            }
            tracing::debug!(
                unit = %id,
                from = unit.role().label(),
                to = owner.role().label(),
                "re-tasked unit changes role"
            );
            let mut unit = unit.clone();
            unit.memory = memory;
            unit.target = None;
            store.put_unit(unit);
        }
    }

    fn renewal_policies(&self) -> BTreeMap<String, RenewalPolicy> {
        self.squads
            .iter()
            .map(|s| (s.name().to_string(), s.renewal().copied().unwrap_or(self.renewal)))
            .collect()
    }

    /// Run the whole decision pass for one tick.
    pub fn run_tick<W: ColonyWorld + ?Sized>(
        &mut self,
        world: &mut W,
        store: &mut RecordStore,
        tick: u64,
    ) -> TickReport {
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        let survey = world.survey();

        report.invalidated = self.cache.sync_with_store(store);
        for region in &survey.changed_regions {
            if self.invalidate_region(store, region) {
                report.invalidated.push(region.clone());
            }
        }

        report.created_squads = self.sync_squads(store);

        for id in store.unit_ids() {
            if !world.unit_exists(&id) {
                store.remove_unit(&id);
                self.diagnostics
                    .record(DiagnosticCause::UnitVanished, id.to_string());
                report.pruned.push(id);
            }
        }

        self.adopt_owner_memory(store);

        let existing = store.unit_ids();
        let mut alive: BTreeSet<UnitId> = existing.iter().cloned().collect();
        let mut state = ColonyState::new(self.name.clone(), tick, survey, store.units());

        for facility in &mut self.facilities {
            if facility.tick() {
                tracing::debug!(tick, facility = %facility.id, "production finished");
            }
        }
        report.admission = schedule_colony(
            &mut self.facilities,
            &self.squads,
            &mut state,
            &mut alive,
            &mut self.diagnostics,
        );
        for spawn in &report.admission.spawned {
            world.spawn_unit(spawn);
            store.put_unit(spawn.record.clone());
        }

        let policies = self.renewal_policies();
        for id in existing {
            let Some(mut unit) = store.unit(&id).cloned() else {
                continue;
            };
            let policy = policies.get(&unit.squad).copied().unwrap_or(self.renewal);
            let before = unit.clone();
            world.observe(&mut unit);
            let step = {
                let mut desk = FacilityDesk {
                    world: &mut *world,
                    facilities: &mut self.facilities,
                    search_range: policy.search_range,
                };
                behavior::step(&mut unit, &mut desk, &policy)
            };
            if step.normalized {
                self.diagnostics
                    .record(DiagnosticCause::UnrecognizedState, format!("{id}: {:?}", before.state));
            }
            if step.hit_bound {
                self.diagnostics
                    .record(DiagnosticCause::TransitionBound, id.to_string());
            }
            if unit != before {
                store.put_unit(unit);
            }
            report.steps.insert(id, step);
        }

        self.cache.persist(store);
        report.diagnostics_emitted = self.diagnostics.flush(tick);
        report
    }
}

/// Routes renewal through the colony's facilities and every other primitive
/// to the world.
struct FacilityDesk<'a, W: ?Sized> {
    world: &'a mut W,
    facilities: &'a mut [ProductionFacility],
    search_range: u8,
}

impl<W: UnitWorld + ?Sized> FacilityDesk<'_, W> {
    fn facility_mut(&mut self, id: &TargetId) -> Option<&mut ProductionFacility> {
        self.facilities
            .iter_mut()
            .find(|f| f.id.as_str() == id.as_str())
    }
}

impl<W: UnitWorld + ?Sized> UnitWorld for FacilityDesk<'_, W> {
    fn find_target(
        &self,
        unit: &Unit,
        kind: TargetKind,
        exclude: Option<&TargetId>,
    ) -> Option<TargetId> {
        self.world.find_target(unit, kind, exclude)
    }

    fn target_valid(&self, target: &TargetId, kind: TargetKind) -> bool {
        self.world.target_valid(target, kind)
    }

    fn move_toward(&mut self, unit: &mut Unit, target: &TargetId) -> ActionOutcome {
        self.world.move_toward(unit, target)
    }

    fn perform(&mut self, unit: &mut Unit, action: Action, target: &TargetId) -> ActionOutcome {
        self.world.perform(unit, action, target)
    }

    fn drop_carried(&mut self, unit: &mut Unit) -> ActionOutcome {
        self.world.drop_carried(unit)
    }

    /// Closest idle facility within the search range; ties go to the lower id.
    fn nearby_facility(&self, unit: &Unit) -> Option<TargetId> {
        self.facilities
            .iter()
            .filter(|f| !f.is_busy())
            .map(|f| (unit.pos.range_to(f.pos), f))
            .filter(|(range, _)| *range <= self.search_range)
            .min_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.id.cmp(&b.id)))
            .map(|(_, f)| TargetId::new(f.id.as_str()))
    }

    fn renew(&mut self, unit: &mut Unit, facility: &TargetId) -> ActionOutcome {
        let Some(facility) = self.facility_mut(facility) else {
            return ActionOutcome::Failed(ActionError::InvalidTarget);
        };
        if unit.pos.range_to(facility.pos) > 1 {
            return ActionOutcome::NotInRange;
        }
        match facility.renew(unit) {
            RenewOutcome::Renewed { added, cost } => {
                tracing::debug!(unit = %unit.id, facility = %facility.id, added, cost, "unit renewed");
                ActionOutcome::Ok
            }
            RenewOutcome::AlreadyFull => ActionOutcome::Ok,
            RenewOutcome::Busy => ActionOutcome::Failed(ActionError::Busy),
            RenewOutcome::InsufficientResource => ActionOutcome::Failed(ActionError::Other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyPart, BodySpec};
    use crate::math::GridPos;
    use crate::unit::{RoleMemory, UnitState};

    /// World with no targets that records spawns.
    #[derive(Default)]
    struct EmptyWorld {
        units: BTreeSet<UnitId>,
        changed: Vec<RegionId>,
        moves: Vec<TargetId>,
    }

    impl UnitWorld for EmptyWorld {
        fn find_target(&self, _: &Unit, _: TargetKind, _: Option<&TargetId>) -> Option<TargetId> {
            None
        }

        fn target_valid(&self, _: &TargetId, _: TargetKind) -> bool {
            false
        }

        fn move_toward(&mut self, _: &mut Unit, target: &TargetId) -> ActionOutcome {
            self.moves.push(target.clone());
            ActionOutcome::Ok
        }

        fn perform(&mut self, _: &mut Unit, _: Action, _: &TargetId) -> ActionOutcome {
            ActionOutcome::Failed(ActionError::InvalidTarget)
        }

        fn drop_carried(&mut self, _: &mut Unit) -> ActionOutcome {
            ActionOutcome::Ok
        }

        fn nearby_facility(&self, _: &Unit) -> Option<TargetId> {
            None
        }

        fn renew(&mut self, _: &mut Unit, _: &TargetId) -> ActionOutcome {
            ActionOutcome::Failed(ActionError::InvalidTarget)
        }
    }

    impl ColonyWorld for EmptyWorld {
        fn survey(&self) -> ColonySurvey {
            ColonySurvey {
                changed_regions: self.changed.clone(),
                ..ColonySurvey::default()
            }
        }

        fn unit_exists(&self, id: &UnitId) -> bool {
            self.units.contains(id)
        }

        fn observe(&self, _: &mut Unit) {}

        fn spawn_unit(&mut self, spawn: &UnitSpawn) {
            self.units.insert(spawn.name.clone());
        }
    }

    fn colony() -> Colony {
        let config = ColonyConfig::from_ron(
            r#"ColonyConfig(name: "alpha", home: "W1N1", squads: [Worker(name: "workers")])"#,
            "test",
        )
        .unwrap();
        let mut colony = Colony::from_config(&config).unwrap();
        colony.add_facility(ProductionFacility::new(
            "fac-1",
            "alpha",
            GridPos::new(10, 10),
            300,
            300,
        ));
        colony
    }

    fn worker(id: &str) -> Unit {
        Unit::fixture(
            id,
            "workers",
            RoleMemory::Worker,
            &BodySpec::new(vec![BodyPart::Work, BodyPart::Carry, BodyPart::Move]),
        )
    }

    #[test]
    fn test_first_tick_spawns_a_worker() {
        let mut colony = colony();
        let mut world = EmptyWorld::default();
        let mut store = RecordStore::new();

        let report = colony.run_tick(&mut world, &mut store, 1);

        assert_eq!(report.admission.grants(), 1);
        assert_eq!(store.unit_count(), 1);
        assert_eq!(world.units.len(), 1);
        // New units are not stepped on the tick they are produced.
        assert!(report.steps.is_empty());
    }

    #[test]
    fn test_vanished_units_are_pruned() {
        let mut colony = colony();
        let mut world = EmptyWorld::default();
        let mut store = RecordStore::new();
        store.put_unit(worker("ghost"));

        let report = colony.run_tick(&mut world, &mut store, 1);

        assert_eq!(report.pruned, vec![UnitId::new("ghost")]);
        assert!(store.unit(&UnitId::new("ghost")).is_none());
    }

    #[test]
    fn test_renewal_goes_through_colony_facility() {
        let mut colony = colony().with_squads(Vec::new());
        let mut world = EmptyWorld::default();
        let mut store = RecordStore::new();
        let mut unit = worker("w1");
        unit.may_expire = false;
        unit.ticks_to_live = 250;
        unit.pos = GridPos::new(11, 10);
        world.units.insert(unit.id.clone());
        store.put_unit(unit);

        let report = colony.run_tick(&mut world, &mut store, 1);

        let step = &report.steps[&UnitId::new("w1")];
        assert!(step.entered_renewal);
        let unit = store.unit(&UnitId::new("w1")).unwrap();
        assert_eq!(unit.state, UnitState::AwaitingRenewal);
        // 600 / 3 parts added on the first renewal.
        assert_eq!(unit.ticks_to_live, 450);
        assert_eq!(colony.facilities()[0].available, 273);
        assert!(world.moves.is_empty());
    }

    #[test]
    fn test_desk_reports_out_of_range_facility() {
        let mut world = EmptyWorld::default();
        let mut facilities = vec![ProductionFacility::new(
            "fac-1",
            "alpha",
            GridPos::new(10, 10),
            300,
            300,
        )];
        let mut desk = FacilityDesk {
            world: &mut world,
            facilities: &mut facilities,
            search_range: 5,
        };
        let mut unit = worker("w1");
        unit.ticks_to_live = 250;
        unit.pos = GridPos::new(14, 10);

        let facility = desk.nearby_facility(&unit).unwrap();
        assert_eq!(facility.as_str(), "fac-1");
        assert_eq!(desk.renew(&mut unit, &facility), ActionOutcome::NotInRange);

        unit.pos = GridPos::new(20, 10);
        assert!(desk.nearby_facility(&unit).is_none());
        assert_eq!(
            desk.renew(&mut unit, &TargetId::new("fac-9")),
            ActionOutcome::Failed(ActionError::InvalidTarget)
        );
    }

    #[test]
    fn test_changed_region_invalidates_grid() {
        let mut colony = colony();
        let mut store = RecordStore::new();
        let layout = RegionLayout::open("W1N1");
        let _ = colony.cost_grid(&mut store, &layout, 1);
        assert!(store.cost_grid(&RegionId::new("W1N1")).is_some());

        let mut world = EmptyWorld {
            changed: vec![RegionId::new("W1N1")],
            ..EmptyWorld::default()
        };
        let report = colony.run_tick(&mut world, &mut store, 2);

        assert_eq!(report.invalidated, vec![RegionId::new("W1N1")]);
        assert!(colony.cache().is_empty());
        assert!(store.cost_grid(&RegionId::new("W1N1")).is_none());
    }
}
