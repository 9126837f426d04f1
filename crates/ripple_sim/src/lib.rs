//! Event-driven simulation engine for Ripple circuits.
//!
//! A [`Simulation`] owns a tree of [`CircuitState`]s, one node per
//! subcircuit instance, and a single time-ordered event queue shared by
//! the whole tree. Components schedule their output changes as future
//! events; the propagator drains the queue, resolves multi-driver nets
//! through the circuit's connectivity snapshot, and re-propagates
//! components whose inputs changed, until the design is quiescent or
//! the iteration budget trips the oscillation detector.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod propagator;
pub mod simulation;
pub mod state;

pub use config::{ConfigError, SimConfig};
pub use error::SimError;
pub use event::{EventQueue, SimEvent, StatePath};
pub use propagator::Propagator;
pub use simulation::Simulation;
pub use state::CircuitState;
