//! Hierarchical simulation state.

use crate::event::StatePath;
use ripple_circuit::{Circuit, ComponentData, ComponentId, Connectivity, ReplacementMap};
use ripple_common::{Bit, Location, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// The live values of one circuit, with one child state per subcircuit
/// instance.
///
/// A state node holds the resolved value at every net point, the raw
/// per-component drives those values were resolved from, and a state
/// slot per stateful component. Dirty lists are double-buffered: the
/// propagator takes the whole list and processes it while new
/// dirtiness accumulates in a fresh one, so a component marking its
/// own net dirty never extends the pass that is processing it.
///
/// The node remembers which connectivity snapshot its values were
/// resolved against. When a transaction voids the circuit's snapshot,
/// the next synchronization discards stale wire values and re-marks
/// every component dirty rather than patching incrementally.
#[derive(Clone, Debug)]
pub struct CircuitState {
    circuit: Arc<Circuit>,
    connectivity: Arc<Connectivity>,
    values: HashMap<Location, Value>,
    driven: HashMap<Location, Vec<(ComponentId, Value)>>,
    data: HashMap<ComponentId, Box<dyn ComponentData>>,
    dirty_components: Vec<ComponentId>,
    dirty_points: Vec<Location>,
    substates: HashMap<ComponentId, CircuitState>,
    parent_notify: bool,
}

impl CircuitState {
    /// A fresh state for `circuit` with every component dirty, so the
    /// first propagation computes the whole circuit.
    pub fn new(circuit: Arc<Circuit>) -> Self {
        let connectivity = circuit.connectivity();
        let mut state = CircuitState {
            circuit,
            connectivity,
            values: HashMap::new(),
            driven: HashMap::new(),
            data: HashMap::new(),
            dirty_components: Vec::new(),
            dirty_points: Vec::new(),
            substates: HashMap::new(),
            parent_notify: false,
        };
        state.mark_all_components_dirty();
        state.mark_all_points_dirty();
        state
    }

    /// The circuit this state simulates.
    pub fn circuit(&self) -> &Arc<Circuit> {
        &self.circuit
    }

    /// The connectivity snapshot the values were resolved against.
    pub fn connectivity(&self) -> &Arc<Connectivity> {
        &self.connectivity
    }

    /// The resolved value at a point. Unresolved points read as
    /// floating at the net's width.
    pub fn value_at(&self, loc: Location) -> Value {
        if let Some(&v) = self.values.get(&loc) {
            return v;
        }
        match self.connectivity.width_at(loc) {
            Some(w) => Value::floating(w),
            None => Value::single(Bit::Floating),
        }
    }

    /// Stores the resolved value at a point. Returns `true` when the
    /// value changed.
    pub fn set_value(&mut self, loc: Location, value: Value) -> bool {
        self.values.insert(loc, value) != Some(value)
    }

    /// Records that `cause` is driving `value` at `loc`. Returns `true`
    /// when the drive changed.
    pub fn set_driven(&mut self, loc: Location, cause: ComponentId, value: Value) -> bool {
        let drivers = self.driven.entry(loc).or_default();
        match drivers.iter_mut().find(|(id, _)| *id == cause) {
            Some((_, existing)) if *existing == value => false,
            Some((_, existing)) => {
                *existing = value;
                true
            }
            None => {
                drivers.push((cause, value));
                true
            }
        }
    }

    /// The raw drives at a point.
    pub fn drivers_at(&self, loc: Location) -> &[(ComponentId, Value)] {
        self.driven.get(&loc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Queues a component for re-propagation.
    pub fn mark_component_dirty(&mut self, id: ComponentId) {
        self.dirty_components.push(id);
    }

    /// Queues a point for re-resolution.
    pub fn mark_point_dirty(&mut self, loc: Location) {
        self.dirty_points.push(loc);
    }

    /// Queues every component in the circuit.
    pub fn mark_all_components_dirty(&mut self) {
        let ids: Vec<ComponentId> = self.circuit.read().components().keys().copied().collect();
        self.dirty_components.extend(ids);
    }

    /// Queues every net point for resolution. Run at power-on and
    /// after a connectivity rebuild so pulls take effect before any
    /// component reads its inputs.
    pub fn mark_all_points_dirty(&mut self) {
        let locations: Vec<Location> = self
            .connectivity
            .bundles()
            .flat_map(|(_, b)| b.locations().iter().copied())
            .collect();
        self.dirty_points.extend(locations);
    }

    /// Swaps out the pending component list, deduplicated in first-seen
    /// order.
    pub fn take_dirty_components(&mut self) -> Vec<ComponentId> {
        let mut taken = std::mem::take(&mut self.dirty_components);
        let mut seen = std::collections::HashSet::new();
        taken.retain(|id| seen.insert(*id));
        taken
    }

    /// Swaps out the pending point list, deduplicated.
    pub fn take_dirty_points(&mut self) -> Vec<Location> {
        let mut taken = std::mem::take(&mut self.dirty_points);
        let mut seen = std::collections::HashSet::new();
        taken.retain(|loc| seen.insert(*loc));
        taken
    }

    /// `true` when this node or any descendant has pending work.
    pub fn has_dirty(&self) -> bool {
        !self.dirty_components.is_empty()
            || !self.dirty_points.is_empty()
            || self.parent_notify
            || self.substates.values().any(CircuitState::has_dirty)
    }

    /// Flags that a child output pin changed, so the parent must
    /// re-propagate the enclosing subcircuit instance. Ignored at the
    /// root.
    pub fn set_parent_notify(&mut self) {
        self.parent_notify = true;
    }

    /// Clears and returns the parent-notify flag.
    pub fn take_parent_notify(&mut self) -> bool {
        std::mem::take(&mut self.parent_notify)
    }

    /// The child state for a subcircuit instance, creating it on first
    /// use.
    pub fn ensure_substate(&mut self, instance: ComponentId, child: &Arc<Circuit>) -> &mut CircuitState {
        self.substates
            .entry(instance)
            .or_insert_with(|| CircuitState::new(Arc::clone(child)))
    }

    /// The child state for a subcircuit instance, if it exists.
    pub fn substate(&self, instance: ComponentId) -> Option<&CircuitState> {
        self.substates.get(&instance)
    }

    /// Mutable access to a child state.
    pub fn substate_mut(&mut self, instance: ComponentId) -> Option<&mut CircuitState> {
        self.substates.get_mut(&instance)
    }

    /// The instance IDs with live child states.
    pub fn substate_ids(&self) -> Vec<ComponentId> {
        self.substates.keys().copied().collect()
    }

    /// Walks the tree to the state named by `path`.
    pub fn state_at_path_mut(&mut self, path: &StatePath) -> Option<&mut CircuitState> {
        let mut node = self;
        for &segment in path.segments() {
            node = node.substates.get_mut(&segment)?;
        }
        Some(node)
    }

    /// Read-only walk to the state named by `path`.
    pub fn state_at_path(&self, path: &StatePath) -> Option<&CircuitState> {
        let mut node = self;
        for &segment in path.segments() {
            node = node.substates.get(&segment)?;
        }
        Some(node)
    }

    /// The state slot of a component.
    pub fn component_data(&self, id: ComponentId) -> Option<&dyn ComponentData> {
        self.data.get(&id).map(Box::as_ref)
    }

    /// Mutable state slot of a component.
    pub fn component_data_mut(&mut self, id: ComponentId) -> Option<&mut Box<dyn ComponentData>> {
        self.data.get_mut(&id)
    }

    /// Installs a component's state slot.
    pub fn set_component_data(&mut self, id: ComponentId, data: Box<dyn ComponentData>) {
        self.data.insert(id, data);
    }

    /// Re-synchronizes with the circuit's current connectivity
    /// snapshot. If the snapshot changed, stale wire values and drives
    /// are discarded and every component is queued for re-propagation.
    /// Recurses into child states. Returns `true` when anything was
    /// stale.
    pub fn sync_connectivity(&mut self) -> bool {
        let mut changed = false;
        let current = self.circuit.connectivity();
        if !Arc::ptr_eq(&self.connectivity, &current) {
            self.connectivity = current;
            self.values.clear();
            self.driven.clear();
            self.dirty_points.clear();
            self.mark_all_components_dirty();
            self.mark_all_points_dirty();
            changed = true;
        }
        for substate in self.substates.values_mut() {
            changed |= substate.sync_connectivity();
        }
        changed
    }

    /// Clears all values and component state, returning the circuit to
    /// power-on conditions. Child states are kept but reset too.
    pub fn reset(&mut self) {
        self.values.clear();
        self.driven.clear();
        self.data.clear();
        self.dirty_points.clear();
        self.dirty_components.clear();
        self.parent_notify = false;
        self.mark_all_components_dirty();
        self.mark_all_points_dirty();
        for substate in self.substates.values_mut() {
            substate.reset();
        }
    }

    /// Migrates component state after a committed transaction.
    ///
    /// State slots move from each replaced ID to its replacements; a
    /// slot whose concrete type no longer matches is discarded later,
    /// when the new component fails to downcast it. Drives from
    /// removed components are withdrawn and their points queued for
    /// re-resolution. Added and replacement components are queued for
    /// propagation.
    pub fn apply_replacements(&mut self, map: &ReplacementMap) {
        for old in map.removed() {
            let data = self.data.remove(&old);
            let substate = self.substates.remove(&old);
            let replacements: Vec<ComponentId> =
                map.replacements_of(old).unwrap_or(&[]).to_vec();
            for &new in &replacements {
                if let Some(data) = data.as_ref() {
                    self.data.insert(new, data.clone_box());
                }
                if let Some(substate) = substate.as_ref() {
                    let matches = self.circuit.read().component(new).is_ok_and(|c| {
                        c.as_subcircuit()
                            .is_some_and(|s| s.circuit().id() == substate.circuit.id())
                    });
                    if matches {
                        self.substates.insert(new, substate.clone());
                    }
                }
                self.mark_component_dirty(new);
            }
            // Withdraw the removed component's drives.
            let mut stale_points = Vec::new();
            for (&loc, drivers) in self.driven.iter_mut() {
                let before = drivers.len();
                drivers.retain(|(id, _)| *id != old);
                if drivers.len() != before {
                    stale_points.push(loc);
                }
            }
            for loc in stale_points {
                self.mark_point_dirty(loc);
            }
        }
        for &new in map.added() {
            self.mark_component_dirty(new);
        }
    }
}
