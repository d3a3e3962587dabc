//! Admission control for unit production.
//!
//! Each idle facility with a non-zero balance grants at most one squad
//! request per tick. Requests are ranked by priority tier; resource fit only
//! filters, it never reorders. Within a tier the first request in
//! declaration order wins.
//!
//! Facilities are scheduled one after another in id order. After a grant
//! the colony census is updated, so the next facility ranks requests against
//! the new unit count rather than a stale snapshot.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticCause, Diagnostics};
use crate::facility::{ProduceOutcome, ProductionFacility, UnitSpawn};
use crate::ids::{FacilityId, UnitId};
use crate::squad::{ColonyState, Priority, SquadRequest};

/// What happened at one facility this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionEvent {
    /// A request was granted and production started.
    Granted {
        /// Facility that produced.
        facility: FacilityId,
        /// Winning squad.
        squad: String,
        /// Tier the squad won at.
        priority: Priority,
        /// Name of the new unit.
        unit: UnitId,
        /// Resource consumed.
        cost: u32,
    },
    /// No request was both wanted and affordable.
    NothingToDo {
        /// Facility considered.
        facility: FacilityId,
    },
    /// The facility was busy or empty and was skipped.
    FacilityUnavailable {
        /// Facility skipped.
        facility: FacilityId,
    },
    /// The winner's production was rejected; nothing was consumed.
    ProductionFailed {
        /// Facility that rejected.
        facility: FacilityId,
        /// Winning squad.
        squad: String,
        /// Rejection reason.
        outcome: ProduceOutcome,
    },
}

impl AdmissionEvent {
    /// Facility the event concerns.
    #[must_use]
    pub fn facility(&self) -> &FacilityId {
        match self {
            Self::Granted { facility, .. }
            | Self::NothingToDo { facility }
            | Self::FacilityUnavailable { facility }
            | Self::ProductionFailed { facility, .. } => facility,
        }
    }

    /// Whether production started.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Everything the scheduler did across a colony's facilities.
#[derive(Debug, Clone, Default)]
pub struct Admission {
    /// One event per facility, in facility id order.
    pub events: Vec<AdmissionEvent>,
    /// Units whose production started.
    pub spawned: Vec<UnitSpawn>,
}

impl Admission {
    /// Number of grants.
    #[must_use]
    pub fn grants(&self) -> usize {
        self.events.iter().filter(|e| e.is_granted()).count()
    }
}

/// Pick the winning request index, if any.
///
/// Pure: the same inputs always give the same answer.
#[must_use]
pub fn select_winner(
    requests: &[Box<dyn SquadRequest>],
    state: &ColonyState,
    available: u32,
    capacity: u32,
) -> Option<(usize, Priority)> {
    let mut best: Option<(usize, Priority)> = None;
    for (index, request) in requests.iter().enumerate() {
        let priority = request.priority(state);
        if !priority.wants_production() {
            continue;
        }
        // Strict `<` keeps the earliest request within a tier.
        if best.is_some_and(|(_, tier)| priority >= tier) {
            continue;
        }
        if request.sufficient_resource(state, available, capacity) {
            best = Some((index, priority));
        }
    }
    best
}

/// Warn once per missing reference and forget the warning once the
/// reference resolves again.
pub fn audit_references(
    requests: &[Box<dyn SquadRequest>],
    state: &ColonyState,
    diagnostics: &mut Diagnostics,
) {
    for request in requests {
        let key = format!("{}:{}:missing-reference", state.name, request.name());
        match request.missing_reference(state) {
            Some(message) => {
                diagnostics.warn_once(key, &message);
            }
            None => {
                diagnostics.clear_once(&key);
            }
        }
    }
}

/// Grant at most one request at one facility.
///
/// `alive` holds every unit name in use and receives the new name on a
/// grant. The census in `state` is updated on a grant.
pub fn schedule_facility(
    facility: &mut ProductionFacility,
    requests: &[Box<dyn SquadRequest>],
    state: &mut ColonyState,
    alive: &mut BTreeSet<UnitId>,
    diagnostics: &mut Diagnostics,
) -> (AdmissionEvent, Option<UnitSpawn>) {
    if !facility.is_idle_with_balance() {
        return (
            AdmissionEvent::FacilityUnavailable {
                facility: facility.id.clone(),
            },
            None,
        );
    }

    let (available, capacity) = (facility.available, facility.capacity);
    let Some((index, priority)) = select_winner(requests, state, available, capacity) else {
        return (
            AdmissionEvent::NothingToDo {
                facility: facility.id.clone(),
            },
            None,
        );
    };
    let request = &requests[index];

    let mut produced: Option<UnitSpawn> = None;
    let outcome = {
        let alive = &*alive;
        let facility = &mut *facility;
        let produced = &mut produced;
        request.materialize(state, available, capacity, &mut |mut spawn| {
            let outcome = facility.produce(&mut spawn, alive);
            if outcome.is_ok() {
                *produced = Some(spawn);
            }
            outcome
        })
    };

    match (outcome, produced) {
        (ProduceOutcome::Ok, Some(spawn)) => {
            let cost = spawn.body.cost();
            tracing::info!(
                tick = state.tick,
                facility = %facility.id,
                squad = request.name(),
                ?priority,
                unit = %spawn.name,
                cost,
                "production granted"
            );
            state.note_spawned(&spawn.record);
            alive.insert(spawn.name.clone());
            let event = AdmissionEvent::Granted {
                facility: facility.id.clone(),
                squad: request.name().to_string(),
                priority,
                unit: spawn.name.clone(),
                cost,
            };
            (event, Some(spawn))
        }
        (outcome, _) => {
            // A squad that reports success without producing is treated as
            // having offered no valid body.
            let outcome = if outcome.is_ok() {
                ProduceOutcome::InvalidBody
            } else {
                outcome
            };
            tracing::debug!(
                tick = state.tick,
                facility = %facility.id,
                squad = request.name(),
                %outcome,
                "production rejected"
            );
            diagnostics.record(DiagnosticCause::ProductionFailed, facility.id.to_string());
            let event = AdmissionEvent::ProductionFailed {
                facility: facility.id.clone(),
                squad: request.name().to_string(),
                outcome,
            };
            (event, None)
        }
    }
}

/// Schedule every facility of a colony, in id order.
pub fn schedule_colony(
    facilities: &mut [ProductionFacility],
    requests: &[Box<dyn SquadRequest>],
    state: &mut ColonyState,
    alive: &mut BTreeSet<UnitId>,
    diagnostics: &mut Diagnostics,
) -> Admission {
    audit_references(requests, state, diagnostics);

    let mut order: Vec<usize> = (0..facilities.len()).collect();
    order.sort_by(|&a, &b| facilities[a].id.cmp(&facilities[b].id));

    let mut admission = Admission::default();
    for index in order {
        let (event, spawn) =
            schedule_facility(&mut facilities[index], requests, state, alive, diagnostics);
        admission.events.push(event);
        admission.spawned.extend(spawn);
    }
    if admission.spawned.is_empty() {
        tracing::debug!(tick = state.tick, colony = %state.name, "nothing to produce");
    }
    admission
}
