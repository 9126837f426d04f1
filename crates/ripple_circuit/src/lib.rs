//! Circuit structure and transactional mutation for the Ripple simulator.
//!
//! A [`Project`] holds a registry of [`Circuit`]s. Each circuit owns a set
//! of components and wires behind a reader/writer lock, plus a cached
//! [`Connectivity`] that resolves wires, tunnels, and splitters into
//! bundles and threads. All structural edits go through [`Transaction`],
//! which acquires circuit write locks in a deadlock-free order, applies
//! primitive changes, repairs wire geometry, and returns a reverse
//! transaction for undo.

#![warn(missing_docs)]

pub mod circuit;
pub mod component;
pub mod error;
pub mod ids;
pub mod lock;
pub mod mutation;
pub mod netlist;
pub mod points;
pub mod project;
pub mod replacement;
pub mod splitter;
pub mod subcircuit;
pub mod wire;
pub mod wire_repair;
pub mod wiring;

pub use circuit::{Circuit, CircuitInner};
pub use component::{
    AttrValue, Component, ComponentData, ComponentError, End, EndKind, InstanceState, PinInfo,
};
pub use error::CircuitError;
pub use ids::{BundleId, CircuitId, ComponentId, WireThreadId};
pub use lock::CircuitLock;
pub use mutation::{CircuitChange, Transaction, TransactionResult};
pub use netlist::{Bundle, Connectivity, WidthIncompatibility};
pub use points::PointIndex;
pub use project::Project;
pub use replacement::ReplacementMap;
pub use splitter::Splitter;
pub use subcircuit::SubcircuitInstance;
pub use wire::{Wire, WireError};
pub use wiring::{PullResistor, Tunnel};
