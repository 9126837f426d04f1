//! Transactional mutation of circuit structure.
//!
//! Every structural edit is a [`Transaction`]: an ordered list of
//! primitive [`CircuitChange`]s applied atomically under the write
//! locks of every affected circuit. The scope of a transaction is the
//! directly changed circuits plus everything containing them, because a
//! pin edit reshapes parent circuits too. Locks are taken in ascending
//! circuit creation serial, which makes concurrent transactions
//! deadlock-free by construction.
//!
//! Applying a primitive produces its inverse; the inverses, reversed,
//! form the reverse transaction returned for undo. Wire repair runs
//! inside the same lock scope after the requested changes and its
//! repairs join the same undo log.

use crate::circuit::Circuit;
use crate::component::{AttrValue, Component, ComponentError};
use crate::error::CircuitError;
use crate::ids::{CircuitId, ComponentId};
use crate::project::Project;
use crate::replacement::ReplacementMap;
use crate::wire::Wire;
use crate::wire_repair::plan_repair;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One primitive structural edit.
#[derive(Clone, Debug)]
pub enum CircuitChange {
    /// Adds a component under a freshly allocated ID.
    AddComponent {
        /// The circuit to add to.
        circuit: CircuitId,
        /// The component to add.
        component: Arc<dyn Component>,
    },
    /// Removes a component.
    RemoveComponent {
        /// The circuit to remove from.
        circuit: CircuitId,
        /// The component to remove.
        component: ComponentId,
    },
    /// Removes `old` and adds `component` under a fresh ID, recording
    /// the pair in the replacement map so simulation state can migrate.
    ReplaceComponent {
        /// The circuit holding the component.
        circuit: CircuitId,
        /// The component being replaced.
        old: ComponentId,
        /// Its replacement.
        component: Arc<dyn Component>,
    },
    /// Swaps a component for a copy with one attribute changed, keeping
    /// its ID.
    SetAttribute {
        /// The circuit holding the component.
        circuit: CircuitId,
        /// The component being edited.
        component: ComponentId,
        /// The attribute name.
        name: String,
        /// The new value.
        value: AttrValue,
    },
    /// Adds a wire segment.
    AddWire {
        /// The circuit to add to.
        circuit: CircuitId,
        /// The wire to add.
        wire: Wire,
    },
    /// Removes a wire segment.
    RemoveWire {
        /// The circuit to remove from.
        circuit: CircuitId,
        /// The wire to remove.
        wire: Wire,
    },
}

impl CircuitChange {
    /// The circuit this change touches.
    pub fn circuit(&self) -> CircuitId {
        match self {
            CircuitChange::AddComponent { circuit, .. }
            | CircuitChange::RemoveComponent { circuit, .. }
            | CircuitChange::ReplaceComponent { circuit, .. }
            | CircuitChange::SetAttribute { circuit, .. }
            | CircuitChange::AddWire { circuit, .. }
            | CircuitChange::RemoveWire { circuit, .. } => *circuit,
        }
    }
}

/// An ordered list of changes applied atomically.
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    label: String,
    changes: Vec<CircuitChange>,
}

/// What a committed transaction did.
#[derive(Debug)]
pub struct TransactionResult {
    /// Every circuit the transaction locked, in serial order.
    pub modified: Vec<CircuitId>,
    /// Component renamings per circuit, for state migration.
    pub replacements: BTreeMap<CircuitId, ReplacementMap>,
    /// The transaction that undoes this one.
    pub reverse: Transaction,
}

impl Transaction {
    /// An empty transaction with a human-readable label. The label
    /// shows up in lock diagnostics and undo history.
    pub fn new(label: impl Into<String>) -> Self {
        Transaction {
            label: label.into(),
            changes: Vec::new(),
        }
    }

    /// The transaction's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The changes in application order.
    pub fn changes(&self) -> &[CircuitChange] {
        &self.changes
    }

    /// Appends a change.
    pub fn push(&mut self, change: CircuitChange) -> &mut Self {
        self.changes.push(change);
        self
    }

    /// Appends a component addition.
    pub fn add_component(&mut self, circuit: CircuitId, component: Arc<dyn Component>) -> &mut Self {
        self.push(CircuitChange::AddComponent { circuit, component })
    }

    /// Appends a component removal.
    pub fn remove_component(&mut self, circuit: CircuitId, component: ComponentId) -> &mut Self {
        self.push(CircuitChange::RemoveComponent { circuit, component })
    }

    /// Appends a component replacement.
    pub fn replace_component(
        &mut self,
        circuit: CircuitId,
        old: ComponentId,
        component: Arc<dyn Component>,
    ) -> &mut Self {
        self.push(CircuitChange::ReplaceComponent {
            circuit,
            old,
            component,
        })
    }

    /// Appends an attribute edit.
    pub fn set_attribute(
        &mut self,
        circuit: CircuitId,
        component: ComponentId,
        name: impl Into<String>,
        value: AttrValue,
    ) -> &mut Self {
        self.push(CircuitChange::SetAttribute {
            circuit,
            component,
            name: name.into(),
            value,
        })
    }

    /// Appends a wire addition.
    pub fn add_wire(&mut self, circuit: CircuitId, wire: Wire) -> &mut Self {
        self.push(CircuitChange::AddWire { circuit, wire })
    }

    /// Appends a wire removal.
    pub fn remove_wire(&mut self, circuit: CircuitId, wire: Wire) -> &mut Self {
        self.push(CircuitChange::RemoveWire { circuit, wire })
    }

    /// Applies the transaction.
    ///
    /// On failure, the primitive changes already applied are rolled
    /// back and their inverse travels in the returned
    /// [`CircuitError::TransactionFailed`].
    pub fn execute(&self, project: &Project) -> Result<TransactionResult, CircuitError> {
        let seeds: Vec<CircuitId> = self.changes.iter().map(CircuitChange::circuit).collect();
        let scope = project.transitive_users(seeds.iter().copied());
        let mut circuits: Vec<Arc<Circuit>> = scope
            .iter()
            .map(|&id| project.circuit(id))
            .collect::<Result<_, _>>()?;
        circuits.sort_by_key(|c| c.serial());
        let _guards: Vec<_> = circuits
            .iter()
            .map(|c| c.lock().acquire(&self.label))
            .collect();

        let mut replacements: BTreeMap<CircuitId, ReplacementMap> = BTreeMap::new();
        let mut inverses: Vec<CircuitChange> = Vec::new();
        for change in &self.changes {
            match apply_change(project, change, &mut replacements) {
                Ok(inverse) => inverses.push(inverse),
                Err(source) => {
                    inverses.reverse();
                    let rollback = Transaction {
                        label: format!("rollback of '{}'", self.label),
                        changes: inverses,
                    };
                    let mut scratch = BTreeMap::new();
                    for change in &rollback.changes {
                        // The inverse of an applied change must re-apply
                        // cleanly; a failure here means the circuit is
                        // half rolled back.
                        let undone = apply_change(project, change, &mut scratch);
                        debug_assert!(
                            undone.is_ok(),
                            "rollback change failed: {:?}",
                            undone.err()
                        );
                    }
                    for circuit in &circuits {
                        circuit.void_connectivity();
                    }
                    return Err(CircuitError::TransactionFailed {
                        label: self.label.clone(),
                        source: Box::new(source),
                        rollback,
                    });
                }
            }
        }

        // Canonicalize wire geometry in the directly changed circuits.
        let mut repaired = seeds.clone();
        repaired.sort_unstable();
        repaired.dedup();
        for id in repaired {
            let circuit = project.circuit(id)?;
            let plan = plan_repair(&circuit.read());
            for wire in plan.removals {
                let change = CircuitChange::RemoveWire { circuit: id, wire };
                inverses.push(apply_change(project, &change, &mut replacements)?);
            }
            for wire in plan.additions {
                let change = CircuitChange::AddWire { circuit: id, wire };
                inverses.push(apply_change(project, &change, &mut replacements)?);
            }
        }

        for circuit in &circuits {
            circuit.void_connectivity();
        }
        inverses.reverse();
        Ok(TransactionResult {
            modified: circuits.iter().map(|c| c.id()).collect(),
            replacements,
            reverse: Transaction {
                label: format!("undo '{}'", self.label),
                changes: inverses,
            },
        })
    }
}

/// Applies one primitive change, returning its inverse. The caller
/// must already hold the circuit's write lock.
fn apply_change(
    project: &Project,
    change: &CircuitChange,
    replacements: &mut BTreeMap<CircuitId, ReplacementMap>,
) -> Result<CircuitChange, CircuitError> {
    match change {
        CircuitChange::AddComponent { circuit, component } => {
            if let Some(sub) = component.as_subcircuit() {
                let child = sub.circuit().id();
                if project.depends_on(child, *circuit) {
                    return Err(CircuitError::RecursiveSubcircuit {
                        parent: *circuit,
                        child,
                    });
                }
            }
            let target = project.circuit(*circuit)?;
            let mut inner = target.write()?;
            let id = inner.alloc_component_id();
            inner.insert_component(id, Arc::clone(component));
            replacements.entry(*circuit).or_default().record_add(id);
            Ok(CircuitChange::RemoveComponent {
                circuit: *circuit,
                component: id,
            })
        }
        CircuitChange::RemoveComponent { circuit, component } => {
            let target = project.circuit(*circuit)?;
            let mut inner = target.write()?;
            let removed = inner.remove_component(*component)?;
            replacements
                .entry(*circuit)
                .or_default()
                .record_remove(*component);
            Ok(CircuitChange::AddComponent {
                circuit: *circuit,
                component: removed,
            })
        }
        CircuitChange::ReplaceComponent {
            circuit,
            old,
            component,
        } => {
            if let Some(sub) = component.as_subcircuit() {
                let child = sub.circuit().id();
                if project.depends_on(child, *circuit) {
                    return Err(CircuitError::RecursiveSubcircuit {
                        parent: *circuit,
                        child,
                    });
                }
            }
            let target = project.circuit(*circuit)?;
            let mut inner = target.write()?;
            let removed = inner.remove_component(*old)?;
            let id = inner.alloc_component_id();
            inner.insert_component(id, Arc::clone(component));
            replacements
                .entry(*circuit)
                .or_default()
                .record_replace(*old, id);
            Ok(CircuitChange::ReplaceComponent {
                circuit: *circuit,
                old: id,
                component: removed,
            })
        }
        CircuitChange::SetAttribute {
            circuit,
            component,
            name,
            value,
        } => {
            let target = project.circuit(*circuit)?;
            let mut inner = target.write()?;
            let current = Arc::clone(inner.component(*component)?);
            let previous =
                current
                    .attr(name)
                    .ok_or_else(|| ComponentError::UnknownAttribute {
                        component: current.type_name(),
                        name: name.clone(),
                    })?;
            let updated = current.with_attr(name, value)?;
            inner.insert_component(*component, updated);
            Ok(CircuitChange::SetAttribute {
                circuit: *circuit,
                component: *component,
                name: name.clone(),
                value: previous,
            })
        }
        CircuitChange::AddWire { circuit, wire } => {
            let target = project.circuit(*circuit)?;
            target.write()?.insert_wire(*wire)?;
            Ok(CircuitChange::RemoveWire {
                circuit: *circuit,
                wire: *wire,
            })
        }
        CircuitChange::RemoveWire { circuit, wire } => {
            let target = project.circuit(*circuit)?;
            target.write()?.remove_wire(*wire)?;
            Ok(CircuitChange::AddWire {
                circuit: *circuit,
                wire: *wire,
            })
        }
    }
}
