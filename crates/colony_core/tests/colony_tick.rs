//! Whole-tick behavior of a colony against the sample world.

use colony_core::behavior::{RolePlan, TargetKind};
use colony_core::colony::Colony;
use colony_core::config::ColonyConfig;
use colony_core::costgrid::Terrain;
use colony_core::ids::{RegionId, TargetId, UnitId};
use colony_core::math::GridPos;
use colony_core::scheduler::AdmissionEvent;
use colony_core::squad::{default_repairer_template, Priority, SquadConfig};
use colony_core::store::{RecordKey, RecordStore};
use colony_core::unit::{ResourceKind, Role, RoleMemory, UnitState};
use colony_test_utils::determinism::{
    find_first_divergence, verify_determinism, verify_reload_determinism, ColonyHarness,
};
use colony_test_utils::fixtures::{facility, fill, hazard_layout, worker, MockWorld};

/// A colony with no squads and one idle facility at (25, 25).
fn bare_colony() -> Colony {
    let config = ColonyConfig::from_ron(r#"ColonyConfig(name: "alpha", home: "W1N1")"#, "bare")
        .expect("config parses");
    let mut colony = Colony::from_config(&config).expect("valid config");
    colony.add_facility(facility("fac-1", GridPos::new(25, 25), 300));
    colony
}

#[test]
fn first_tick_grants_the_starved_harvester() {
    let mut harness = ColonyHarness::sample();
    let report = harness
        .colony
        .run_tick(&mut harness.world, &mut harness.store, 1);

    assert_eq!(report.admission.grants(), 1);
    match &report.admission.events[0] {
        AdmissionEvent::Granted {
            squad,
            priority,
            unit,
            cost,
            ..
        } => {
            assert_eq!(squad, "harvest-src-1");
            assert_eq!(*priority, Priority::Urgent);
            assert_eq!(*cost, 500);
            assert_eq!(unit.as_str(), "harvest-src-1-1-0");
        }
        other => panic!("expected a grant, got {other:?}"),
    }
    let id = UnitId::new("harvest-src-1-1-0");
    assert!(harness.store.unit(&id).is_some());
    assert!(harness.world.units.contains(&id));
    assert_eq!(harness.colony.facilities()[0].available, 50);
    // New units are not stepped on their spawn tick.
    assert!(report.steps.is_empty());
}

#[test]
fn spawned_unit_is_stepped_next_tick() {
    let mut harness = ColonyHarness::sample();
    harness.tick();
    let report = harness
        .colony
        .run_tick(&mut harness.world, &mut harness.store, 2);

    let id = UnitId::new("harvest-src-1-1-0");
    let step = &report.steps[&id];
    assert_eq!(step.from, UnitState::None);
    assert_eq!(step.to, UnitState::Gather);
    assert_eq!(harness.world.moves_toward("src-1"), 1);
    // The facility is still producing.
    assert!(matches!(
        report.admission.events[0],
        AdmissionEvent::FacilityUnavailable { .. }
    ));
}

#[test]
fn vanished_unit_is_pruned() {
    let mut harness = ColonyHarness::sample();
    harness.tick();
    let id = UnitId::new("harvest-src-1-1-0");
    harness.world.kill(&id);

    let report = harness
        .colony
        .run_tick(&mut harness.world, &mut harness.store, 2);

    assert_eq!(report.pruned, vec![id.clone()]);
    assert!(harness.store.unit(&id).is_none());
    assert!(!report.steps.contains_key(&id));
}

#[test]
fn retasked_unit_resets_its_automaton() {
    let mut harness = ColonyHarness::sample();
    let mut unit = worker("w-7", "workers");
    unit.state_owner = "repair".into();
    unit.state = UnitState::Build;
    unit.pos = GridPos::new(10, 11);
    harness.world.add_unit(&unit.id);
    harness.store.put_unit(unit);

    let report = harness
        .colony
        .run_tick(&mut harness.world, &mut harness.store, 1);

    let id = UnitId::new("w-7");
    assert!(report.steps[&id].retasked);
    let record = harness.store.unit(&id).expect("kept");
    assert_eq!(record.state_owner, "workers");
    assert_eq!(record.state, UnitState::Gather);
}

#[test]
fn retasked_unit_takes_the_new_roles_automaton() {
    let mut harness = ColonyHarness::sample();
    let mut unit = worker("w-9", "upgrade");
    unit.state_owner = "workers".into();
    unit.state = UnitState::Build;
    unit.pos = GridPos::new(29, 29);
    fill(&mut unit);
    harness.world.add_unit(&unit.id);
    harness.store.put_unit(unit);

    let report = harness
        .colony
        .run_tick(&mut harness.world, &mut harness.store, 1);

    let id = UnitId::new("w-9");
    assert!(report.steps[&id].retasked);
    let record = harness.store.unit(&id).expect("kept");
    assert_eq!(record.role(), Role::Upgrader);
    assert_eq!(
        record.memory,
        RoleMemory::Upgrader {
            controller: TargetId::new("ctrl")
        }
    );
    assert!(RolePlan::for_role(Role::Upgrader).recognizes(record.state));
    // Full carry goes straight to the controller instead of a worker's sink.
    assert_eq!(harness.world.received.get(&TargetId::new("ctrl")), Some(&50));
    assert_eq!(harness.world.moves_toward("ext-1"), 0);
    assert_eq!(record.state, UnitState::Gather);
}

#[test]
fn non_expiring_unit_ages_into_renewal() {
    let mut colony = bare_colony();
    let mut world = MockWorld::new();
    let mut store = RecordStore::new();
    let mut unit = worker("w-1", "workers");
    unit.may_expire = false;
    unit.ticks_to_live = 1_500;
    unit.pos = GridPos::new(24, 25);
    world.add_unit(&unit.id);
    store.put_unit(unit);
    let id = UnitId::new("w-1");

    let mut entered = None;
    for tick in 1..=1_300 {
        let report = colony.run_tick(&mut world, &mut store, tick);
        if report.steps[&id].entered_renewal {
            entered = Some(tick);
            break;
        }
    }

    // 1500 - 1201 = 299, the first lifetime below the threshold.
    assert_eq!(entered, Some(1_201));
    let record = store.unit(&id).expect("kept");
    assert_eq!(record.state, UnitState::AwaitingRenewal);
    assert_eq!(record.ticks_to_live, 299 + 200);
    assert_eq!(colony.facilities()[0].available, 300 - 27);
}

#[test]
fn gatherer_near_end_of_life_delivers_partial_load() {
    let setup = |ticks_to_live: u32| {
        let mut world = MockWorld::new()
            .with_target(TargetKind::Source, "src-1", GridPos::new(10, 10))
            .with_target(TargetKind::Sink, "ext-1", GridPos::new(40, 40));
        let mut unit = worker("w-1", "workers");
        unit.state = UnitState::Gather;
        unit.pos = GridPos::new(10, 11);
        unit.ticks_to_live = ticks_to_live;
        unit.carry.add(ResourceKind::Energy, 10);
        let mut store = RecordStore::new();
        world.add_unit(&unit.id);
        store.put_unit(unit);
        (world, store)
    };
    let id = UnitId::new("w-1");

    // Observed at 30: critical, so the partial load is delivered.
    let (mut world, mut store) = setup(31);
    bare_colony().run_tick(&mut world, &mut store, 1);
    let record = store.unit(&id).expect("kept");
    assert_eq!(record.state, UnitState::Deliver);
    assert_eq!(record.carry.used(), 10);
    assert_eq!(world.moves_toward("ext-1"), 1);

    // Observed at 31: keeps harvesting.
    let (mut world, mut store) = setup(32);
    bare_colony().run_tick(&mut world, &mut store, 1);
    let record = store.unit(&id).expect("kept");
    assert_eq!(record.state, UnitState::Gather);
    assert_eq!(record.carry.used(), 12);
    assert_eq!(world.moves_toward("ext-1"), 0);
}

#[test]
fn renewal_is_abandoned_below_the_expire_floor() {
    let mut colony = bare_colony();
    let mut world =
        MockWorld::new().with_target(TargetKind::ConstructionSite, "site-1", GridPos::new(40, 40));
    let mut store = RecordStore::new();
    let mut unit = worker("w-1", "workers");
    unit.may_expire = false;
    unit.state = UnitState::AwaitingRenewal;
    unit.resume_state = Some(UnitState::Build);
    unit.target = Some(TargetId::new("fac-1"));
    unit.ticks_to_live = 50;
    unit.pos = GridPos::new(24, 25);
    fill(&mut unit);
    world.add_unit(&unit.id);
    store.put_unit(unit);
    let id = UnitId::new("w-1");

    let report = colony.run_tick(&mut world, &mut store, 1);

    assert_eq!(report.steps[&id].to, UnitState::Build);
    let record = store.unit(&id).expect("kept");
    assert_eq!(record.ticks_to_live, 49);
    assert_eq!(record.resume_state, None);
    assert_eq!(world.moves_toward("site-1"), 1);
    assert_eq!(colony.facilities()[0].available, 300);

    let report = colony.run_tick(&mut world, &mut store, 2);
    assert!(!report.steps[&id].entered_renewal);
    assert_eq!(store.unit(&id).expect("kept").state, UnitState::Build);
}

#[test]
fn squads_are_mirrored_to_the_store_and_built_from_it() {
    let mut harness = ColonyHarness::sample();
    harness.tick();
    assert_eq!(harness.store.squads().count(), 5);
    assert!(harness.store.squad("workers").is_some());

    harness.store.put_squad(SquadConfig::Repair {
        name: "repair-2".into(),
        target: 1,
        body: default_repairer_template(),
        may_expire: true,
        renewal: None,
    });
    let report = harness
        .colony
        .run_tick(&mut harness.world, &mut harness.store, 2);

    assert_eq!(report.created_squads, vec!["repair-2".to_string()]);
    let names: Vec<&str> = harness.colony.squads().iter().map(|s| s.name()).collect();
    assert_eq!(names.last(), Some(&"repair-2"));

    let report = harness
        .colony
        .run_tick(&mut harness.world, &mut harness.store, 3);
    assert!(report.created_squads.is_empty());
    assert_eq!(harness.colony.squads().len(), 6);
}

#[test]
fn tick_marks_touched_records_dirty() {
    let mut harness = ColonyHarness::sample();
    harness.store.take_dirty();

    harness.tick();

    let dirty = harness.store.take_dirty();
    assert!(dirty.contains(&RecordKey::Unit(UnitId::new("harvest-src-1-1-0"))));
    assert!(!harness.store.is_dirty());
}

#[test]
fn changed_region_drops_cached_grid() {
    let mut harness = ColonyHarness::sample();
    let layout = hazard_layout("W1N1", GridPos::new(25, 25), 0);
    let region = RegionId::new("W1N1");
    harness
        .colony
        .cost_grid(&mut harness.store, &layout, 1);
    harness.tick();
    assert!(harness.colony.cache().get(&region).is_some());
    assert!(harness.store.cost_grid(&region).is_some());

    harness.world.survey.changed_regions.push(region.clone());
    let report = harness
        .colony
        .run_tick(&mut harness.world, &mut harness.store, 2);

    assert_eq!(report.invalidated, vec![region.clone()]);
    assert!(harness.colony.cache().get(&region).is_none());
    assert!(harness.store.cost_grid(&region).is_none());
}

#[test]
fn region_profile_shapes_the_home_grid() {
    let mut harness = ColonyHarness::sample();
    let layout = hazard_layout("W1N1", GridPos::new(25, 25), 0);
    let profile = harness.colony.cache().profile().clone();

    let grid = harness
        .colony
        .cost_grid(&mut harness.store, &layout, 1);

    // The sample profile fills the radius-less hazard with radius 4.
    assert_eq!(grid.cost(GridPos::new(25, 25)), profile.max_danger_cost(4));
}

#[test]
fn refresh_region_drops_only_changed_layouts() {
    let mut harness = ColonyHarness::sample();
    let mut layout = hazard_layout("W1N1", GridPos::new(25, 25), 0);
    let region = RegionId::new("W1N1");
    harness.colony.cost_grid(&mut harness.store, &layout, 1);

    assert!(!harness.colony.refresh_region(&layout));
    assert!(harness.colony.cache().get(&region).is_some());

    layout.terrain.set(GridPos::new(5, 5), Terrain::Impassable);
    assert!(harness.colony.refresh_region(&layout));
    assert!(harness.colony.cache().get(&region).is_none());
}

#[test]
fn restore_applies_region_profiles() {
    let mut warm = ColonyHarness::sample();
    let layout = hazard_layout("W1N1", GridPos::new(25, 25), 0);
    let region = RegionId::new("W1N1");
    warm.colony.cost_grid(&mut warm.store, &layout, 1);
    let profile = warm.colony.cache().profile().clone();

    // Same region profile: the radius-less hazard is filled the same way and
    // the stored grid matches.
    let mut cold = ColonyHarness::sample();
    assert_eq!(cold.colony.restore_cost_grids(&warm.store, [&layout]), 1);
    let grid = cold.colony.cache().get(&region).expect("restored");
    assert_eq!(grid.cost(GridPos::new(25, 25)), profile.max_danger_cost(4));

    // A different hazard radius for the region makes the snapshot stale.
    let config = ColonyConfig::from_ron(
        r#"ColonyConfig(name: "alpha", home: "W1N1", regions: {"W1N1": RegionProfile(hazard_radius: 6)})"#,
        "wide",
    )
    .expect("config parses");
    let mut other = Colony::from_config(&config).expect("valid config");
    assert_eq!(other.restore_cost_grids(&warm.store, [&layout]), 0);
    assert!(other.cache().is_empty());
}

#[test]
fn sample_colony_grows_over_time() {
    let mut harness = ColonyHarness::sample();
    for _ in 0..200 {
        harness.tick();
    }
    assert!(harness.store.unit_count() >= 2, "{}", harness.store.unit_count());
    assert!(!harness.world.received.is_empty());
}

#[test]
fn runs_are_deterministic() {
    verify_determinism(
        4,
        120,
        ColonyHarness::sample,
        ColonyHarness::tick,
        ColonyHarness::state_hash,
    )
    .assert_deterministic();
    assert_eq!(find_first_divergence(ColonyHarness::sample, 80), None);
}

#[test]
fn reload_mid_run_does_not_change_the_outcome() {
    assert!(verify_reload_determinism(ColonyHarness::sample, 60));
}
