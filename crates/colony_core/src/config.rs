//! Colony configuration loaded from RON.
//!
//! Everything tuned per deployment lives here instead of in control flow:
//! squad targets and body templates, renewal thresholds, cost constants and
//! per-region behavior.
//!
//! # Example RON
//!
//! ```ron
//! ColonyConfig(
//!     name: "alpha",
//!     home: "W1N1",
//!     squads: [
//!         Harvest(name: "harvest-src-1", source: "src-1"),
//!         Haul(name: "haul", target: 2),
//!         Worker(name: "workers"),
//!         Upgrade(name: "upgrade", controller: "ctrl"),
//!     ],
//!     regions: {
//!         "W1N1": RegionProfile(shape_danger: true, hazard_radius: 4),
//!     },
//! )
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::behavior::RenewalPolicy;
use crate::costgrid::{CostProfile, RegionLayout};
use crate::error::{ColonyError, Result};
use crate::ids::RegionId;
use crate::math::Fixed;
use crate::squad::{SquadConfig, SquadRequest, TargetOverrides};

/// Behavior parameters for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionProfile {
    /// Whether cost grids for this region get danger shaping.
    #[serde(default = "default_shape_danger")]
    pub shape_danger: bool,
    /// Radius given to hazards reported without one.
    #[serde(default = "default_hazard_radius")]
    pub hazard_radius: u8,
    /// Replaces worker squad targets in this region.
    #[serde(default)]
    pub worker_target: Option<u32>,
    /// Replaces upgrade squad targets in this region.
    #[serde(default)]
    pub upgrader_target: Option<u32>,
}

const fn default_shape_danger() -> bool {
    true
}

const fn default_hazard_radius() -> u8 {
    3
}

impl Default for RegionProfile {
    fn default() -> Self {
        Self {
            shape_danger: default_shape_danger(),
            hazard_radius: default_hazard_radius(),
            worker_target: None,
            upgrader_target: None,
        }
    }
}

impl RegionProfile {
    /// Apply the profile to a layout before computing its grid.
    pub fn apply(&self, layout: &mut RegionLayout) {
        layout.shape_danger = self.shape_danger;
        for hazard in &mut layout.hazards {
            if hazard.radius == 0 {
                hazard.radius = self.hazard_radius;
            }
        }
    }

    /// Squad target overrides.
    #[must_use]
    pub const fn overrides(&self) -> TargetOverrides {
        TargetOverrides {
            worker_target: self.worker_target,
            upgrader_target: self.upgrader_target,
        }
    }
}

/// Complete configuration for one colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyConfig {
    /// Colony name.
    pub name: String,
    /// Region the colony's facilities live in.
    pub home: RegionId,
    /// Squads in declaration order; earlier squads win priority ties.
    #[serde(default)]
    pub squads: Vec<SquadConfig>,
    /// Default renewal policy.
    #[serde(default)]
    pub renewal: RenewalPolicy,
    /// Cost grid constants.
    #[serde(default)]
    pub cost_profile: CostProfile,
    /// Per-region parameters.
    #[serde(default)]
    pub regions: BTreeMap<RegionId, RegionProfile>,
}

impl ColonyConfig {
    /// Parse a config from RON text. `label` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError::ConfigParse`] if the text is not valid RON for
    /// this type.
    pub fn from_ron(text: &str, label: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| ColonyError::ConfigParse {
            path: label.to_string(),
            message: e.to_string(),
        })
    }

    /// Serialize as pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError::ConfigParse`] if serialization fails.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            ColonyError::ConfigParse {
                path: self.name.clone(),
                message: e.to_string(),
            }
        })
    }

    /// Profile for a region; defaults when the region is not configured.
    #[must_use]
    pub fn region(&self, region: &RegionId) -> RegionProfile {
        self.regions.get(region).cloned().unwrap_or_default()
    }

    /// Check the config for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError::InvalidConfig`] listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("colony name is empty".to_string());
        }
        if self.home.as_str().trim().is_empty() {
            problems.push("home region is empty".to_string());
        }

        let mut seen = BTreeSet::new();
        for squad in &self.squads {
            let name = squad.name();
            if name.trim().is_empty() {
                problems.push("squad with an empty name".to_string());
            } else if !seen.insert(name) {
                problems.push(format!("duplicate squad name '{name}'"));
            }
            let body = squad.body();
            if body.repeat.is_empty() || body.max_repeats == 0 {
                problems.push(format!("squad '{name}' body template has no repeat"));
            }
            if let Some(policy) = squad.renewal() {
                problems.extend(
                    policy
                        .problems()
                        .into_iter()
                        .map(|p| format!("squad '{name}' renewal: {p}")),
                );
            }
        }

        problems.extend(self.renewal.problems());

        let profile = &self.cost_profile;
        if profile.open == 0 || profile.road == 0 {
            problems.push("cost profile: open and road costs must be non-zero".to_string());
        }
        if profile.open >= profile.impassable || profile.hindered >= profile.impassable {
            problems.push("cost profile: terrain costs must be below impassable".to_string());
        }
        if profile.crossing >= profile.impassable {
            problems.push("cost profile: crossing cost must be below impassable".to_string());
        }
        if profile.danger_step < Fixed::ZERO
            || profile.danger_step > Fixed::from_num(profile.max_passable())
        {
            problems.push(format!(
                "cost profile: danger_step ({}) must be between 0 and {}",
                profile.danger_step,
                profile.max_passable()
            ));
        }

        for (region, profile) in &self.regions {
            if profile.shape_danger && profile.hazard_radius == 0 {
                problems.push(format!("region {region}: danger shaping with zero hazard radius"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ColonyError::InvalidConfig {
                colony: self.name.clone(),
                problems,
            })
        }
    }

    /// Build the squad requests in declaration order, applying the home
    /// region's target overrides.
    #[must_use]
    pub fn build_squads(&self) -> Vec<Box<dyn SquadRequest>> {
        let overrides = self.region(&self.home).overrides();
        self.squads.iter().map(|s| s.build(&overrides)).collect()
    }
}
