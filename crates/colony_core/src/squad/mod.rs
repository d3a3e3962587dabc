//! Squad production requests.
//!
//! A squad is a named task group that competes for production and owns the
//! units it produced. Each squad answers two pure questions about the colony
//! state, how urgently it wants another unit ([`Priority`]) and whether the
//! facility can pay for a properly-sized body, and knows how to describe the
//! unit it wants ([`SquadRequest::materialize`]).
//!
//! Concrete squads are configured by [`SquadConfig`] records, one variant per
//! role.

mod harvest;
mod haul;
mod repair;
pub mod state;
mod upgrade;
mod worker;

use serde::{Deserialize, Serialize};

use crate::behavior::RenewalPolicy;
use crate::body::{BodyPart, BodySpec, BodyTemplate};
use crate::facility::{ProduceOutcome, UnitSpawn};
use crate::ids::{TargetId, UnitId};
use crate::math::GridPos;
use crate::unit::{Carry, Role, RoleMemory, Unit, UnitState};

pub use harvest::HarvestSquad;
pub use haul::HaulSquad;
pub use repair::RepairSquad;
pub use state::{ColonyState, ColonySurvey, ControllerInfo, SourceInfo, SquadCensus};
pub use upgrade::UpgradeSquad;
pub use worker::WorkerSquad;

/// Production priority. Lower is more important; `None` means do not produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Priority {
    /// Starvation of an essential role.
    Urgent = 0,
    /// Missing role with a dependency in place.
    High = 1,
    /// Growth toward a target.
    Normal = 2,
    /// Optional growth.
    Low = 3,
    /// Nothing wanted.
    #[default]
    None = 4,
}

impl Priority {
    /// Every tier, most important first.
    pub const ALL: [Self; 5] = [Self::Urgent, Self::High, Self::Normal, Self::Low, Self::None];

    /// Whether this tier asks for production.
    #[must_use]
    pub const fn wants_production(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A production request competing for a facility.
///
/// `priority`, `sufficient_resource` and `missing_reference` are pure:
/// repeated calls against the same state give the same answer.
pub trait SquadRequest: std::fmt::Debug {
    /// Stable squad name.
    fn name(&self) -> &str;

    /// Role of the units this squad produces.
    fn role(&self) -> Role;

    /// Role-specific fields carried by units this squad owns, both new ones
    /// and units re-tasked into it.
    fn unit_memory(&self) -> RoleMemory;

    /// How urgently the squad wants another unit.
    fn priority(&self, state: &ColonyState) -> Priority;

    /// Whether `available` pays for the body this squad would produce.
    fn sufficient_resource(&self, state: &ColonyState, available: u32, capacity: u32) -> bool;

    /// Describe the next unit and hand it to `produce`.
    fn materialize(
        &self,
        state: &ColonyState,
        available: u32,
        capacity: u32,
        produce: &mut dyn FnMut(UnitSpawn) -> ProduceOutcome,
    ) -> ProduceOutcome;

    /// Description of a configured reference the colony no longer has.
    fn missing_reference(&self, _state: &ColonyState) -> Option<String> {
        None
    }

    /// Renewal policy for this squad's units, if it overrides the colony's.
    fn renewal(&self) -> Option<&RenewalPolicy> {
        None
    }
}

/// Sizing shared by every squad: bodies are sized against the full capacity
/// unless the role is starved, in which case whatever is available now buys
/// an emergency body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sizing<'a> {
    pub template: &'a BodyTemplate,
    pub role: Role,
}

impl Sizing<'_> {
    pub fn budget(&self, state: &ColonyState, available: u32, capacity: u32) -> u32 {
        if state.role_count(self.role) == 0 {
            available
        } else {
            capacity.max(available)
        }
    }

    pub fn body(&self, state: &ColonyState, available: u32, capacity: u32) -> Option<BodySpec> {
        self.template
            .body_for(self.budget(state, available, capacity))
            .filter(|body| body.cost() <= available)
    }

    pub fn sufficient(&self, state: &ColonyState, available: u32, capacity: u32) -> bool {
        self.body(state, available, capacity).is_some()
    }
}

/// Name for a unit produced this tick. The per-tick serial keeps names from
/// two grants in one tick apart.
pub(crate) fn unit_name(squad: &str, state: &ColonyState) -> UnitId {
    UnitId::new(format!("{squad}-{}-{}", state.tick, state.spawned_this_tick()))
}

/// What a squad wants produced; the common production path sizes the body,
/// builds the initial record and calls the production callback.
#[derive(Debug, Clone)]
pub(crate) struct UnitPlan<'a> {
    pub squad: &'a str,
    pub sizing: Sizing<'a>,
    pub memory: RoleMemory,
    pub may_expire: bool,
}

impl UnitPlan<'_> {
    pub fn produce(
        self,
        state: &ColonyState,
        available: u32,
        capacity: u32,
        produce: &mut dyn FnMut(UnitSpawn) -> ProduceOutcome,
    ) -> ProduceOutcome {
        let Some(body) = self.sizing.body(state, available, capacity) else {
            return ProduceOutcome::InsufficientResource;
        };
        let name = unit_name(self.squad, state);
        let record = Unit {
            id: name.clone(),
            squad: self.squad.to_string(),
            state_owner: self.squad.to_string(),
            state: UnitState::None,
            resume_state: None,
            may_expire: self.may_expire,
            ticks_to_live: body.lifetime(),
            carry: Carry::new(body.carry_capacity()),
            pos: GridPos::default(),
            body: body.summary(),
            target: None,
            memory: self.memory,
        };
        produce(UnitSpawn { name, body, record })
    }
}

const fn default_true() -> bool {
    true
}

const fn default_work_target() -> u32 {
    5
}

const fn default_haul_target() -> u32 {
    2
}

const fn default_worker_target() -> u32 {
    2
}

const fn default_construction_bonus() -> u32 {
    2
}

const fn default_upgrade_target() -> u32 {
    1
}

const fn default_downgrade_alarm() -> u32 {
    5_000
}

const fn default_repair_target() -> u32 {
    1
}

/// Default harvester body: carry and move, then WORK parts.
#[must_use]
pub fn default_harvester_template() -> BodyTemplate {
    BodyTemplate::new(vec![BodyPart::Carry, BodyPart::Move], vec![BodyPart::Work], 6)
}

/// Default hauler body: two carries per move.
#[must_use]
pub fn default_hauler_template() -> BodyTemplate {
    BodyTemplate::new(
        vec![],
        vec![BodyPart::Carry, BodyPart::Carry, BodyPart::Move],
        8,
    )
}

/// Default general-labor body.
#[must_use]
pub fn default_worker_template() -> BodyTemplate {
    BodyTemplate::new(vec![], vec![BodyPart::Work, BodyPart::Carry, BodyPart::Move], 5)
}

/// Default upgrader body: one carry, scaling WORK.
#[must_use]
pub fn default_upgrader_template() -> BodyTemplate {
    BodyTemplate::new(
        vec![BodyPart::Carry, BodyPart::Move],
        vec![BodyPart::Work, BodyPart::Work, BodyPart::Move],
        5,
    )
}

/// Default repairer body.
#[must_use]
pub fn default_repairer_template() -> BodyTemplate {
    BodyTemplate::new(vec![], vec![BodyPart::Work, BodyPart::Carry, BodyPart::Move], 3)
}

/// Configuration record for one squad, tagged by role.
///
/// # Example RON
///
/// ```ron
/// Harvest(
///     name: "harvest-src-1",
///     source: "src-1",
///     work_target: 5,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SquadConfig {
    /// Static extraction at one source.
    Harvest {
        /// Squad name.
        name: String,
        /// Source the squad extracts from.
        source: TargetId,
        /// WORK parts wanted at the source.
        #[serde(default = "default_work_target")]
        work_target: u32,
        /// Body sizing rule.
        #[serde(default = "default_harvester_template")]
        body: BodyTemplate,
        /// Whether units may expire instead of renewing.
        #[serde(default = "default_true")]
        may_expire: bool,
        /// Renewal override.
        #[serde(default)]
        renewal: Option<RenewalPolicy>,
    },
    /// Transport from pickup points to consumers.
    Haul {
        /// Squad name.
        name: String,
        /// Preferred pickup point.
        #[serde(default)]
        pickup: Option<TargetId>,
        /// Units wanted.
        #[serde(default = "default_haul_target")]
        target: u32,
        /// Body sizing rule.
        #[serde(default = "default_hauler_template")]
        body: BodyTemplate,
        /// Whether units may expire instead of renewing.
        #[serde(default = "default_true")]
        may_expire: bool,
        /// Renewal override.
        #[serde(default)]
        renewal: Option<RenewalPolicy>,
    },
    /// General labor: charging, building, upgrading.
    Worker {
        /// Squad name.
        name: String,
        /// Units wanted with no construction pending.
        #[serde(default = "default_worker_target")]
        target: u32,
        /// Extra units wanted while construction sites exist.
        #[serde(default = "default_construction_bonus")]
        construction_bonus: u32,
        /// Body sizing rule.
        #[serde(default = "default_worker_template")]
        body: BodyTemplate,
        /// Whether units may expire instead of renewing.
        #[serde(default = "default_true")]
        may_expire: bool,
        /// Renewal override.
        #[serde(default)]
        renewal: Option<RenewalPolicy>,
    },
    /// Dedicated controller upgrading.
    Upgrade {
        /// Squad name.
        name: String,
        /// Controller to upgrade.
        controller: TargetId,
        /// Units wanted.
        #[serde(default = "default_upgrade_target")]
        target: u32,
        /// Downgrade countdown below which an empty squad is urgent.
        #[serde(default = "default_downgrade_alarm")]
        downgrade_alarm: u32,
        /// Body sizing rule.
        #[serde(default = "default_upgrader_template")]
        body: BodyTemplate,
        /// Whether units may expire instead of renewing.
        #[serde(default = "default_true")]
        may_expire: bool,
        /// Renewal override.
        #[serde(default)]
        renewal: Option<RenewalPolicy>,
    },
    /// Structure maintenance.
    Repair {
        /// Squad name.
        name: String,
        /// Units wanted while repair work exists.
        #[serde(default = "default_repair_target")]
        target: u32,
        /// Body sizing rule.
        #[serde(default = "default_repairer_template")]
        body: BodyTemplate,
        /// Whether units may expire instead of renewing.
        #[serde(default = "default_true")]
        may_expire: bool,
        /// Renewal override.
        #[serde(default)]
        renewal: Option<RenewalPolicy>,
    },
}

impl SquadConfig {
    /// Squad name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Harvest { name, .. }
            | Self::Haul { name, .. }
            | Self::Worker { name, .. }
            | Self::Upgrade { name, .. }
            | Self::Repair { name, .. } => name,
        }
    }

    /// Role of the squad's units.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Harvest { .. } => Role::Harvester,
            Self::Haul { .. } => Role::Hauler,
            Self::Worker { .. } => Role::Worker,
            Self::Upgrade { .. } => Role::Upgrader,
            Self::Repair { .. } => Role::Repairer,
        }
    }

    /// Body sizing rule.
    #[must_use]
    pub fn body(&self) -> &BodyTemplate {
        match self {
            Self::Harvest { body, .. }
            | Self::Haul { body, .. }
            | Self::Worker { body, .. }
            | Self::Upgrade { body, .. }
            | Self::Repair { body, .. } => body,
        }
    }

    /// Renewal override, if any.
    #[must_use]
    pub fn renewal(&self) -> Option<&RenewalPolicy> {
        match self {
            Self::Harvest { renewal, .. }
            | Self::Haul { renewal, .. }
            | Self::Worker { renewal, .. }
            | Self::Upgrade { renewal, .. }
            | Self::Repair { renewal, .. } => renewal.as_ref(),
        }
    }

    /// Build the request, applying region-level target overrides.
    #[must_use]
    pub fn build(&self, overrides: &TargetOverrides) -> Box<dyn SquadRequest> {
        match self.clone() {
            Self::Harvest {
                name,
                source,
                work_target,
                body,
                may_expire,
                renewal,
            } => Box::new(HarvestSquad {
                name,
                source,
                work_target,
                body,
                may_expire,
                renewal,
            }),
            Self::Haul {
                name,
                pickup,
                target,
                body,
                may_expire,
                renewal,
            } => Box::new(HaulSquad {
                name,
                pickup,
                target,
                body,
                may_expire,
                renewal,
            }),
            Self::Worker {
                name,
                target,
                construction_bonus,
                body,
                may_expire,
                renewal,
            } => Box::new(WorkerSquad {
                name,
                target: overrides.worker_target.unwrap_or(target),
                construction_bonus,
                body,
                may_expire,
                renewal,
            }),
            Self::Upgrade {
                name,
                controller,
                target,
                downgrade_alarm,
                body,
                may_expire,
                renewal,
            } => Box::new(UpgradeSquad {
                name,
                controller,
                target: overrides.upgrader_target.unwrap_or(target),
                downgrade_alarm,
                body,
                may_expire,
                renewal,
            }),
            Self::Repair {
                name,
                target,
                body,
                may_expire,
                renewal,
            } => Box::new(RepairSquad {
                name,
                target,
                body,
                may_expire,
                renewal,
            }),
        }
    }
}

/// Per-region overrides of squad targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetOverrides {
    /// Replaces worker squad targets.
    pub worker_target: Option<u32>,
    /// Replaces upgrade squad targets.
    pub upgrader_target: Option<u32>,
}
