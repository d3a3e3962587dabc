//! Unit body composition, costs and step-function sizing.
//!
//! A body is an ordered list of parts. Each part has a fixed production
//! cost; the body's cost is what a facility deducts when producing it.
//! [`BodyTemplate`] turns a resource budget into the largest useful body.

use serde::{Deserialize, Serialize};

/// Maximum number of parts a single body may have.
pub const MAX_BODY_PARTS: usize = 50;

/// Resource capacity contributed by each carry part.
pub const CARRY_CAPACITY_PER_PART: u32 = 50;

/// Lifetime of a freshly produced unit, in ticks.
pub const UNIT_LIFETIME: u32 = 1500;

/// Lifetime of a unit carrying a claim part, in ticks.
pub const CLAIM_UNIT_LIFETIME: u32 = 600;

/// Production ticks spent per body part.
pub const TICKS_PER_PART: u32 = 3;

/// A single body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BodyPart {
    /// Movement.
    Move,
    /// Extraction, construction, repair and upgrading.
    Work,
    /// Resource capacity.
    Carry,
    /// Melee damage.
    Attack,
    /// Ranged damage.
    RangedAttack,
    /// Healing.
    Heal,
    /// Controller claiming.
    Claim,
    /// Cheap hit points.
    Tough,
}

impl BodyPart {
    /// Production cost of this part.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Move => 50,
            Self::Work => 100,
            Self::Carry => 50,
            Self::Attack => 80,
            Self::RangedAttack => 150,
            Self::Heal => 250,
            Self::Claim => 600,
            Self::Tough => 10,
        }
    }
}

/// An ordered body composition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodySpec(pub Vec<BodyPart>);

impl BodySpec {
    /// Create a body from parts.
    #[must_use]
    pub fn new(parts: Vec<BodyPart>) -> Self {
        Self(parts)
    }

    /// The parts in production order.
    #[must_use]
    pub fn parts(&self) -> &[BodyPart] {
        &self.0
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the body has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total production cost.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.0.iter().map(|p| p.cost()).sum()
    }

    /// Number of parts of a given kind.
    #[must_use]
    pub fn count(&self, part: BodyPart) -> u32 {
        self.0.iter().filter(|p| **p == part).count() as u32
    }

    /// Resource carrying capacity.
    #[must_use]
    pub fn carry_capacity(&self) -> u32 {
        self.count(BodyPart::Carry) * CARRY_CAPACITY_PER_PART
    }

    /// Whether this body can be produced at all.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.len() <= MAX_BODY_PARTS
    }

    /// Lifetime in ticks once produced.
    #[must_use]
    pub fn lifetime(&self) -> u32 {
        if self.count(BodyPart::Claim) > 0 {
            CLAIM_UNIT_LIFETIME
        } else {
            UNIT_LIFETIME
        }
    }

    /// Ticks a facility stays busy producing this body.
    #[must_use]
    pub fn spawn_time(&self) -> u32 {
        self.0.len() as u32 * TICKS_PER_PART
    }

    /// Summary kept on the unit record.
    #[must_use]
    pub fn summary(&self) -> BodySummary {
        BodySummary {
            parts: self.0.len() as u32,
            work: self.count(BodyPart::Work),
            carry: self.count(BodyPart::Carry),
            cost: self.cost(),
        }
    }
}

/// Compact body facts kept on a unit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BodySummary {
    /// Total part count.
    pub parts: u32,
    /// Work parts.
    pub work: u32,
    /// Carry parts.
    pub carry: u32,
    /// Production cost.
    pub cost: u32,
}

/// Step-function sizing rule for a role's body.
///
/// `prefix` is always included; `repeat` is appended as many times as the
/// budget allows, up to `max_repeats` and the part cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyTemplate {
    /// Parts always present.
    #[serde(default)]
    pub prefix: Vec<BodyPart>,
    /// Parts repeated to scale the body.
    pub repeat: Vec<BodyPart>,
    /// Maximum useful number of repeats.
    pub max_repeats: u32,
}

impl BodyTemplate {
    /// Create a template.
    #[must_use]
    pub fn new(prefix: Vec<BodyPart>, repeat: Vec<BodyPart>, max_repeats: u32) -> Self {
        Self {
            prefix,
            repeat,
            max_repeats,
        }
    }

    fn prefix_cost(&self) -> u32 {
        self.prefix.iter().map(|p| p.cost()).sum()
    }

    fn repeat_cost(&self) -> u32 {
        self.repeat.iter().map(|p| p.cost()).sum()
    }

    /// How many repeats a budget buys, capped by `max_repeats` and the part limit.
    #[must_use]
    pub fn repeats_for(&self, budget: u32) -> u32 {
        let repeat_cost = self.repeat_cost();
        if repeat_cost == 0 || self.repeat.is_empty() {
            return 0;
        }
        let Some(remaining) = budget.checked_sub(self.prefix_cost()) else {
            return 0;
        };
        let part_room = MAX_BODY_PARTS.saturating_sub(self.prefix.len()) / self.repeat.len();
        (remaining / repeat_cost)
            .min(self.max_repeats)
            .min(part_room as u32)
    }

    /// Largest body the budget buys, or `None` when not even one repeat fits.
    #[must_use]
    pub fn body_for(&self, budget: u32) -> Option<BodySpec> {
        let repeats = self.repeats_for(budget);
        if repeats == 0 {
            return None;
        }
        let mut parts = self.prefix.clone();
        for _ in 0..repeats {
            parts.extend_from_slice(&self.repeat);
        }
        Some(BodySpec(parts))
    }

    /// Cost of the body `budget` buys; the minimal viable cost for that budget.
    #[must_use]
    pub fn cost_for(&self, budget: u32) -> Option<u32> {
        self.body_for(budget).map(|b| b.cost())
    }

    /// Cost of the smallest body this template can produce.
    #[must_use]
    pub fn min_cost(&self) -> u32 {
        self.prefix_cost() + self.repeat_cost()
    }
}
