//! Typed identifiers for arena-indexed entities
//!
//! Identifiers are assigned sequentially from 1 across a whole run and double
//! as arena positions (`id - 1`).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric value
            pub fn value(self) -> u64 {
                self.0
            }

            pub(crate) fn index(self) -> Option<usize> {
                (self.0 as usize).checked_sub(1)
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u64 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Customer order identifier
    OrderId,
    "order"
);
entity_id!(
    /// Patient identifier, unique across orders
    PatientId,
    "patient"
);
entity_id!(
    /// Item (aligner) identifier, unique across patients
    ItemId,
    "item"
);
entity_id!(
    /// Job identifier; forward and rework jobs share one sequence
    JobId,
    "job"
);
