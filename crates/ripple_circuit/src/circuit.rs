//! A single circuit: components, wires, and cached connectivity.

use crate::component::Component;
use crate::error::CircuitError;
use crate::ids::{CircuitId, ComponentId};
use crate::lock::CircuitLock;
use crate::netlist::Connectivity;
use crate::wire::Wire;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global allocator for circuit creation serials. Serials are the
/// total order transactions lock circuits in.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

/// The mutable structure of a circuit: its components and wires.
///
/// Reached only through [`Circuit::read`] and [`Circuit::write`];
/// writes additionally require the circuit's [`CircuitLock`].
#[derive(Debug, Default)]
pub struct CircuitInner {
    components: BTreeMap<ComponentId, Arc<dyn Component>>,
    wires: BTreeSet<Wire>,
    next_component: u32,
}

impl CircuitInner {
    /// Allocates a fresh component ID.
    pub fn alloc_component_id(&mut self) -> ComponentId {
        let id = ComponentId::from_raw(self.next_component);
        self.next_component += 1;
        id
    }

    /// The components in ID order.
    pub fn components(&self) -> &BTreeMap<ComponentId, Arc<dyn Component>> {
        &self.components
    }

    /// A component by ID.
    pub fn component(&self, id: ComponentId) -> Result<&Arc<dyn Component>, CircuitError> {
        self.components
            .get(&id)
            .ok_or(CircuitError::ComponentNotFound(id))
    }

    /// Inserts a component under `id`.
    pub fn insert_component(&mut self, id: ComponentId, component: Arc<dyn Component>) {
        self.components.insert(id, component);
    }

    /// Removes a component, returning it.
    pub fn remove_component(
        &mut self,
        id: ComponentId,
    ) -> Result<Arc<dyn Component>, CircuitError> {
        self.components
            .remove(&id)
            .ok_or(CircuitError::ComponentNotFound(id))
    }

    /// The wires in canonical order.
    pub fn wires(&self) -> &BTreeSet<Wire> {
        &self.wires
    }

    /// Adds a wire; the wire must not already be present.
    pub fn insert_wire(&mut self, wire: Wire) -> Result<(), CircuitError> {
        if self.wires.insert(wire) {
            Ok(())
        } else {
            Err(CircuitError::WireExists(wire))
        }
    }

    /// Removes a wire; the wire must be present.
    pub fn remove_wire(&mut self, wire: Wire) -> Result<(), CircuitError> {
        if self.wires.remove(&wire) {
            Ok(())
        } else {
            Err(CircuitError::WireNotFound(wire))
        }
    }
}

/// A named circuit in a project.
///
/// The structure lives behind a reader/writer lock so simulation
/// threads can read while no transaction is writing. The connectivity
/// snapshot is cached and rebuilt lazily after a transaction voids it;
/// readers always see either the old complete snapshot or the new one,
/// never a half-built resolution.
#[derive(Debug)]
pub struct Circuit {
    id: CircuitId,
    name: String,
    serial: u64,
    lock: CircuitLock,
    inner: RwLock<CircuitInner>,
    connectivity: Mutex<Option<Arc<Connectivity>>>,
}

impl Circuit {
    /// Creates an empty circuit. Normally called through
    /// [`Project::add_circuit`](crate::Project::add_circuit).
    pub fn new(id: CircuitId, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Circuit {
            id,
            name: name.into(),
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            lock: CircuitLock::new(),
            inner: RwLock::new(CircuitInner::default()),
            connectivity: Mutex::new(None),
        })
    }

    /// The circuit's ID within its project.
    pub fn id(&self) -> CircuitId {
        self.id
    }

    /// The circuit's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The circuit's creation serial, the key transactions sort by
    /// when locking several circuits.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// The circuit's write lock.
    pub fn lock(&self) -> &CircuitLock {
        &self.lock
    }

    /// Read access to the structure.
    pub fn read(&self) -> RwLockReadGuard<'_, CircuitInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the structure. The caller must hold the write
    /// lock; this is checked, not assumed.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, CircuitInner>, CircuitError> {
        self.ensure_locked()?;
        Ok(self.inner.write().unwrap_or_else(PoisonError::into_inner))
    }

    /// Verifies the calling thread holds the write lock.
    pub fn ensure_locked(&self) -> Result<(), CircuitError> {
        if self.lock.held_by_current_thread() {
            Ok(())
        } else {
            Err(CircuitError::LockViolation {
                circuit: self.name.clone(),
                holder: self.lock.holder_label(),
            })
        }
    }

    /// The current connectivity snapshot, rebuilding it if a
    /// transaction voided the cache.
    pub fn connectivity(&self) -> Arc<Connectivity> {
        let mut cache = self
            .connectivity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(snapshot) = cache.as_ref() {
            return Arc::clone(snapshot);
        }
        let snapshot = Arc::new(Connectivity::build(&self.read()));
        *cache = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Discards the cached connectivity snapshot. Called by
    /// transactions after structural changes.
    pub fn void_connectivity(&self) {
        let mut cache = self
            .connectivity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cache = None;
    }
}
