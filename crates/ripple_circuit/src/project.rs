//! A project: the registry of circuits that can reference each other.

use crate::circuit::Circuit;
use crate::error::CircuitError;
use crate::ids::CircuitId;
use ripple_common::Interner;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// The top-level container for a design.
///
/// Circuits are created through the project so IDs are unique and the
/// subcircuit dependency graph can be queried. The project also owns
/// the string interner used for tunnel and component labels.
#[derive(Default)]
pub struct Project {
    interner: Interner,
    circuits: Mutex<BTreeMap<CircuitId, Arc<Circuit>>>,
    next_circuit: AtomicU32,
}

impl Project {
    /// An empty project.
    pub fn new() -> Self {
        Self::default()
    }

    /// The project's label interner.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Creates an empty circuit and registers it.
    pub fn add_circuit(&self, name: impl Into<String>) -> Arc<Circuit> {
        let id = CircuitId::from_raw(self.next_circuit.fetch_add(1, Ordering::Relaxed));
        let circuit = Circuit::new(id, name);
        self.circuits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&circuit));
        circuit
    }

    /// Looks up a circuit by ID.
    pub fn circuit(&self, id: CircuitId) -> Result<Arc<Circuit>, CircuitError> {
        self.circuits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(CircuitError::CircuitNotFound(id))
    }

    /// Every circuit in the project, in ID order.
    pub fn circuits(&self) -> Vec<Arc<Circuit>> {
        self.circuits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// The circuits directly containing an instance of `id`.
    pub fn users_of(&self, id: CircuitId) -> Vec<CircuitId> {
        self.circuits()
            .iter()
            .filter(|c| {
                c.read()
                    .components()
                    .values()
                    .any(|comp| comp.as_subcircuit().is_some_and(|s| s.circuit().id() == id))
            })
            .map(|c| c.id())
            .collect()
    }

    /// The given circuits plus everything containing them,
    /// transitively. This is the scope a transaction locks: a change
    /// to a circuit's pins reshapes every instance upstream.
    pub fn transitive_users(&self, seeds: impl IntoIterator<Item = CircuitId>) -> BTreeSet<CircuitId> {
        let mut closed: BTreeSet<CircuitId> = BTreeSet::new();
        let mut open: Vec<CircuitId> = seeds.into_iter().collect();
        while let Some(id) = open.pop() {
            if closed.insert(id) {
                open.extend(self.users_of(id));
            }
        }
        closed
    }

    /// `true` when `circuit` contains `target`, transitively, through
    /// subcircuit instances. Used to reject recursive instantiation.
    pub fn depends_on(&self, circuit: CircuitId, target: CircuitId) -> bool {
        if circuit == target {
            return true;
        }
        let Ok(c) = self.circuit(circuit) else {
            return false;
        };
        let children: Vec<CircuitId> = c
            .read()
            .components()
            .values()
            .filter_map(|comp| comp.as_subcircuit().map(|s| s.circuit().id()))
            .collect();
        children.into_iter().any(|child| self.depends_on(child, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subcircuit::SubcircuitInstance;
    use ripple_common::Location;

    fn embed(project: &Project, parent: &Arc<Circuit>, child: &Arc<Circuit>) {
        let _p = project; // scope check only happens through transactions
        let _guard = parent.lock().acquire("setup");
        let mut inner = parent.write().unwrap();
        let id = inner.alloc_component_id();
        inner.insert_component(
            id,
            Arc::new(SubcircuitInstance::new(
                Location::new(0, 0),
                Arc::clone(child),
            )),
        );
    }

    #[test]
    fn registry_round_trip() {
        let project = Project::new();
        let main = project.add_circuit("main");
        let found = project.circuit(main.id()).unwrap();
        assert_eq!(found.name(), "main");
        assert!(matches!(
            project.circuit(CircuitId::from_raw(99)),
            Err(CircuitError::CircuitNotFound(_))
        ));
    }

    #[test]
    fn user_tracking() {
        let project = Project::new();
        let top = project.add_circuit("top");
        let mid = project.add_circuit("mid");
        let leaf = project.add_circuit("leaf");
        embed(&project, &top, &mid);
        embed(&project, &mid, &leaf);
        assert_eq!(project.users_of(leaf.id()), vec![mid.id()]);
        let scope = project.transitive_users([leaf.id()]);
        assert_eq!(
            scope.into_iter().collect::<Vec<_>>(),
            vec![top.id(), mid.id(), leaf.id()]
        );
        assert!(project.depends_on(top.id(), leaf.id()));
        assert!(!project.depends_on(leaf.id(), top.id()));
    }
}
