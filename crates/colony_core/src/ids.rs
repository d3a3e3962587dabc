//! String identifiers for world objects.
//!
//! Identifiers are opaque strings assigned by the world. They are ordered so
//! that every map keyed by them iterates deterministically.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

string_id!(
    /// Identifier of a map region (one 50x50 grid).
    RegionId
);
string_id!(
    /// Identifier of a produced unit. Doubles as its production name.
    UnitId
);
string_id!(
    /// Identifier of a production facility.
    FacilityId
);
string_id!(
    /// Identifier of anything a unit can act on: sources, sinks, sites, controllers.
    TargetId
);
