//! Error types for circuit structure and mutation.

use crate::component::ComponentError;
use crate::ids::{CircuitId, ComponentId};
use crate::mutation::Transaction;
use crate::wire::{Wire, WireError};

/// Errors raised by circuit lookup, locking, and transactions.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError {
    /// A circuit ID was not found in the project.
    #[error("circuit {} not found in project", .0.as_raw())]
    CircuitNotFound(CircuitId),

    /// A component ID was not found in its circuit.
    #[error("component {} not found", .0.as_raw())]
    ComponentNotFound(ComponentId),

    /// A wire slated for removal is not present.
    #[error("wire {0} not present in circuit")]
    WireNotFound(Wire),

    /// A wire slated for addition is already present.
    #[error("wire {0} already present in circuit")]
    WireExists(Wire),

    /// A mutation touched a circuit without holding its write lock.
    #[error("circuit '{circuit}' mutated without its write lock{}",
        .holder.as_deref().map(|h| format!(" (held by transaction '{h}')")).unwrap_or_default())]
    LockViolation {
        /// The circuit that was touched.
        circuit: String,
        /// The label of the transaction holding the lock, if any.
        holder: Option<String>,
    },

    /// Adding a subcircuit instance would make a circuit contain
    /// itself.
    #[error("adding circuit {} inside circuit {} would be recursive", .child.as_raw(), .parent.as_raw())]
    RecursiveSubcircuit {
        /// The circuit the instance was being added to.
        parent: CircuitId,
        /// The circuit the instance refers to.
        child: CircuitId,
    },

    /// A primitive change failed partway through a transaction. The
    /// changes applied before the failure have already been rolled
    /// back using `rollback`.
    #[error("transaction '{label}' failed: {source}")]
    TransactionFailed {
        /// The failing transaction's label.
        label: String,
        /// The error raised by the failing primitive change.
        #[source]
        source: Box<CircuitError>,
        /// The inverse of the prefix that had been applied.
        rollback: Transaction,
    },

    /// A component rejected an attribute edit or operation.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// A wire could not be constructed.
    #[error(transparent)]
    Wire(#[from] WireError),
}
