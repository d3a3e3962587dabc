//! Proptest strategies.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of admission, cost grids and the unit automaton.

use colony_core::behavior::{ActionError, ActionOutcome};
use colony_core::body::BodyPart;
use colony_core::costgrid::{
    Hazard, Obstacle, RegionLayout, StructureKind, Terrain, TerrainSnapshot,
};
use colony_core::ids::TargetId;
use colony_core::math::{GridPos, REGION_CELLS, REGION_SIZE};
use colony_core::squad::Priority;
use colony_core::unit::{ResourceKind, Role, RoleMemory, Unit, UnitState};
use proptest::prelude::*;

use crate::fixtures::unit;

/// Any priority tier, including `None`.
pub fn arb_priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

/// A request spec: tier and body cost in whole CARRY parts.
pub fn arb_request_spec() -> impl Strategy<Value = (Priority, u32)> {
    (arb_priority(), (1u32..=12).prop_map(|parts| parts * 50))
}

/// Between one and eight request specs.
pub fn arb_request_specs() -> impl Strategy<Value = Vec<(Priority, u32)>> {
    proptest::collection::vec(arb_request_spec(), 1..8)
}

/// A facility balance and capacity with balance <= capacity.
pub fn arb_balance() -> impl Strategy<Value = (u32, u32)> {
    (50u32..=1_300).prop_flat_map(|capacity| (0..=capacity, Just(capacity)))
}

/// Any position inside a region.
pub fn arb_grid_pos() -> impl Strategy<Value = GridPos> {
    (0..REGION_SIZE, 0..REGION_SIZE).prop_map(|(x, y)| GridPos::new(x, y))
}

/// A terrain code, mostly known classifications with the occasional
/// unknown code.
pub fn arb_terrain_code() -> impl Strategy<Value = u8> {
    prop_oneof![
        6 => Just(0u8),
        2 => Just(2u8),
        2 => Just(1u8),
        1 => Just(3u8),
        1 => 4u8..=255,
    ]
}

/// Any structure kind.
pub fn arb_structure_kind() -> impl Strategy<Value = StructureKind> {
    prop::sample::select(vec![
        StructureKind::Road,
        StructureKind::Container,
        StructureKind::Rampart,
        StructureKind::Wall,
        StructureKind::Solid,
    ])
}

/// A hazard with radius 1..=8.
pub fn arb_hazard() -> impl Strategy<Value = Hazard> {
    (arb_grid_pos(), 1u8..=8).prop_map(|(pos, radius)| Hazard { pos, radius })
}

/// A full region layout with random terrain, structures and hazards.
pub fn arb_layout() -> impl Strategy<Value = RegionLayout> {
    (
        proptest::collection::vec(arb_terrain_code(), REGION_CELLS),
        proptest::collection::vec(
            (arb_grid_pos(), arb_structure_kind()).prop_map(|(pos, kind)| Obstacle { pos, kind }),
            0..20,
        ),
        proptest::collection::vec(arb_hazard(), 0..4),
        any::<bool>(),
    )
        .prop_map(|(codes, obstacles, hazards, shape_danger)| {
            let mut layout = RegionLayout::open("W1N1");
            layout.terrain = TerrainSnapshot::from_codes(&layout.region, codes)
                .unwrap_or_else(|_| TerrainSnapshot::uniform(Terrain::Open));
            layout.obstacles = obstacles;
            layout.hazards = hazards;
            layout.shape_danger = shape_danger;
            layout
        })
}

/// Any unit state.
pub fn arb_unit_state() -> impl Strategy<Value = UnitState> {
    prop::sample::select(UnitState::ALL.to_vec())
}

/// Any role.
pub fn arb_role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

/// Any primitive outcome.
pub fn arb_action_outcome() -> impl Strategy<Value = ActionOutcome> {
    prop_oneof![
        Just(ActionOutcome::Ok),
        Just(ActionOutcome::NotInRange),
        prop::sample::select(ActionError::ALL.to_vec()).prop_map(ActionOutcome::Failed),
    ]
}

fn memory_for(role: Role) -> RoleMemory {
    match role {
        Role::Harvester => RoleMemory::Harvester {
            source: TargetId::new("src-1"),
        },
        Role::Hauler => RoleMemory::Hauler {
            pickup: Some(TargetId::new("pickup-1")),
        },
        Role::Worker => RoleMemory::Worker,
        Role::Upgrader => RoleMemory::Upgrader {
            controller: TargetId::new("ctrl"),
        },
        Role::Repairer => RoleMemory::Repairer,
    }
}

/// A fresh unit of `role` with one WORK, three CARRY and one MOVE part and
/// memory bound to the sample world's targets.
#[must_use]
pub fn unit_for_role(role: Role) -> Unit {
    let parts = [
        BodyPart::Work,
        BodyPart::Carry,
        BodyPart::Carry,
        BodyPart::Carry,
        BodyPart::Move,
    ];
    unit("u-1", "squad-a", memory_for(role), &parts)
}

/// A unit record in an arbitrary (possibly foreign) state, with arbitrary
/// load, lifetime and renewal flag.
pub fn arb_unit() -> impl Strategy<Value = Unit> {
    (
        arb_role(),
        arb_unit_state(),
        proptest::option::of(arb_unit_state()),
        0u32..=150,
        1u32..=1_500,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(role, state, resume, load, ttl, may_expire, retasked)| {
            let mut u = unit_for_role(role);
            u.state = state;
            u.resume_state = resume;
            u.carry.add(ResourceKind::Energy, load);
            u.ticks_to_live = ttl;
            u.may_expire = may_expire;
            if retasked {
                u.squad = "squad-b".to_string();
            }
            u
        })
}
