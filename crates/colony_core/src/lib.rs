//! # Colony Core
//!
//! Deterministic per-tick decision core for autonomous colonies.
//!
//! This crate contains **only** deterministic logic:
//! - No IO beyond explicit (de)serialization helpers
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! Each tick a colony decides which squad's production request consumes a
//! facility's limited, regenerating resource, then drives every produced
//! unit through a small task automaton. Per-region traversal-cost grids are
//! memoized in an explicit cache owned by the colony.
//!
//! ## Crate Structure
//!
//! - [`scheduler`] - Admission of squad production requests
//! - [`squad`] - Squad requests: priority and sizing policies
//! - [`behavior`] - Per-unit task automaton
//! - [`costgrid`] - Cost grid computation and cache
//! - [`colony`] - Tick orchestration
//! - [`config`] - RON configuration
//! - [`store`] - Persisted records

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod behavior;
pub mod body;
pub mod colony;
pub mod config;
pub mod costgrid;
pub mod diagnostics;
pub mod error;
pub mod facility;
pub mod ids;
pub mod math;
pub mod scheduler;
pub mod squad;
pub mod store;
pub mod unit;

pub use error::{ColonyError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::behavior::{
        step, Action, ActionError, ActionOutcome, RenewalPolicy, StepReport, TargetKind, UnitWorld,
    };
    pub use crate::body::{BodyPart, BodySpec, BodyTemplate};
    pub use crate::colony::{Colony, ColonyWorld, TickReport};
    pub use crate::config::{ColonyConfig, RegionProfile};
    pub use crate::costgrid::{
        compute_cost_grid, CostGrid, CostMatrixCache, CostProfile, Hazard, RegionLayout, Terrain,
    };
    pub use crate::diagnostics::Diagnostics;
    pub use crate::error::{ColonyError, Result};
    pub use crate::facility::{ProduceOutcome, ProductionFacility, UnitSpawn};
    pub use crate::ids::{FacilityId, RegionId, TargetId, UnitId};
    pub use crate::math::{Fixed, GridPos};
    pub use crate::scheduler::{schedule_colony, Admission, AdmissionEvent};
    pub use crate::squad::{ColonyState, ColonySurvey, Priority, SquadConfig, SquadRequest};
    pub use crate::store::RecordStore;
    pub use crate::unit::{Role, RoleMemory, Unit, UnitState};
}
