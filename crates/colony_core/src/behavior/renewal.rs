//! Lifetime renewal policy.

use serde::{Deserialize, Serialize};

/// Thresholds for pausing a unit to renew its lifetime.
///
/// Units whose production cost is high should use a higher `renew_below` so
/// they start topping up earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenewalPolicy {
    /// Enter renewal below this many ticks to live.
    #[serde(default = "default_renew_below")]
    pub renew_below: u32,
    /// Leave renewal once lifetime reaches this.
    #[serde(default = "default_renew_until")]
    pub renew_until: u32,
    /// Give up renewing below this; the unit is allowed to expire.
    #[serde(default = "default_expire_floor")]
    pub expire_floor: u32,
    /// Lifetime at which a gathering unit delivers whatever it carries.
    #[serde(default = "default_critical_lifetime")]
    pub critical_lifetime: u32,
    /// Chebyshev range within which a facility counts as nearby.
    #[serde(default = "default_search_range")]
    pub search_range: u8,
}

const fn default_renew_below() -> u32 {
    300
}

const fn default_renew_until() -> u32 {
    1400
}

const fn default_expire_floor() -> u32 {
    50
}

const fn default_critical_lifetime() -> u32 {
    30
}

const fn default_search_range() -> u8 {
    5
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            renew_below: default_renew_below(),
            renew_until: default_renew_until(),
            expire_floor: default_expire_floor(),
            critical_lifetime: default_critical_lifetime(),
            search_range: default_search_range(),
        }
    }
}

impl RenewalPolicy {
    /// Whether a unit with `ticks_to_live` should start renewing.
    #[must_use]
    pub const fn wants_renewal(&self, ticks_to_live: u32) -> bool {
        ticks_to_live < self.renew_below && ticks_to_live >= self.expire_floor
    }

    /// Whether renewal is done, either topped up or past saving.
    #[must_use]
    pub const fn renewal_finished(&self, ticks_to_live: u32) -> bool {
        ticks_to_live >= self.renew_until || ticks_to_live < self.expire_floor
    }

    /// Problems with the thresholds, if any.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.renew_until <= self.renew_below {
            problems.push(format!(
                "renew_until ({}) must exceed renew_below ({})",
                self.renew_until, self.renew_below
            ));
        }
        if self.expire_floor >= self.renew_below {
            problems.push(format!(
                "expire_floor ({}) must be below renew_below ({})",
                self.expire_floor, self.renew_below
            ));
        }
        if self.renew_until > crate::body::UNIT_LIFETIME {
            problems.push(format!(
                "renew_until ({}) exceeds the unit lifetime ({})",
                self.renew_until,
                crate::body::UNIT_LIFETIME
            ));
        }
        problems
    }
}
