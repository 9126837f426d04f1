//! Simulation error types.

use ripple_circuit::{CircuitError, ComponentError, ComponentId};

/// Errors that can occur while configuring or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A component referenced by the caller does not exist.
    #[error("component {} not found in the simulated circuit", .0.as_raw())]
    ComponentNotFound(ComponentId),

    /// The component named as temporary clock cannot act as one.
    #[error("component cannot act as a clock source: {reason}")]
    InvalidClockSource {
        /// Why the component was rejected.
        reason: String,
    },

    /// The component does not accept externally poked values.
    #[error("component {} does not accept external values", .0.as_raw())]
    NotPokable(ComponentId),

    /// A component failed while propagating.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// A circuit-level lookup failed.
    #[error(transparent)]
    Circuit(#[from] CircuitError),
}
