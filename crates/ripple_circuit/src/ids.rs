//! Opaque ID newtypes for circuit entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, and
//! `Serialize`/`Deserialize`. Component IDs are allocated by the circuit
//! they live in and stay stable across attribute edits, which is what lets
//! simulation state survive a structural transaction.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a circuit in a project.
    CircuitId
);

define_id!(
    /// Opaque, copyable ID for a component within a circuit.
    ComponentId
);

define_id!(
    /// Opaque, copyable ID for a wire bundle in a connectivity snapshot.
    BundleId
);

define_id!(
    /// Opaque, copyable ID for a single-bit wire thread in a connectivity
    /// snapshot.
    WireThreadId
);
