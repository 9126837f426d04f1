//! The propagation engine: drains the event queue, resolves nets, and
//! re-propagates components until the design settles.

use crate::config::SimConfig;
use crate::error::SimError;
use crate::event::{EventQueue, StatePath};
use crate::state::CircuitState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ripple_circuit::{
    BundleId, Circuit, Component, ComponentData, ComponentId, End, InstanceState,
    SubcircuitInstance,
};
use ripple_common::{Bit, BitWidth, Location, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One component's window onto the simulation during `propagate`.
struct InstanceView<'a> {
    component: ComponentId,
    ends: Vec<End>,
    path: &'a StatePath,
    state: &'a mut CircuitState,
    queue: &'a mut EventQueue,
    rng: &'a mut StdRng,
    jitter: bool,
}

impl InstanceState for InstanceView<'_> {
    fn port_value(&self, index: usize) -> Value {
        match self.ends.get(index) {
            Some(end) => self.state.value_at(end.location),
            None => Value::single(Bit::Floating),
        }
    }

    fn set_port(&mut self, index: usize, value: Value, delay: u32) {
        let Some(end) = self.ends.get(index) else {
            return;
        };
        let mut delay = delay.max(1);
        if self.jitter {
            delay += self.rng.gen_range(0..=1);
        }
        self.queue
            .schedule(delay, self.path.clone(), end.location, self.component, value);
    }

    fn data(&self) -> Option<&dyn ComponentData> {
        self.state.component_data(self.component)
    }

    fn data_mut(&mut self) -> Option<&mut dyn ComponentData> {
        self.state
            .component_data_mut(self.component)
            .map(|b| &mut **b)
    }

    fn set_data(&mut self, data: Box<dyn ComponentData>) {
        self.state.set_component_data(self.component, data);
    }

    fn notify_parent(&mut self) {
        self.state.set_parent_notify();
    }
}

/// The event-driven propagation engine for one root circuit.
///
/// Propagation alternates between two kinds of work until both run
/// dry: resolving dirty net points against the connectivity snapshot,
/// and re-propagating components whose inputs changed. Each pass
/// counts against the iteration budget; exceeding it sets the sticky
/// oscillation flag and records the points that were still changing,
/// instead of hanging the caller.
pub struct Propagator {
    config: SimConfig,
    queue: EventQueue,
    root: CircuitState,
    rng: StdRng,
    ticks: u64,
    temporary_clock: Option<ComponentId>,
    oscillating: bool,
    oscillation_points: Vec<(StatePath, Location)>,
}

impl Propagator {
    /// A fresh engine for `circuit`.
    pub fn new(circuit: Arc<Circuit>, config: SimConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.jitter_seed);
        Propagator {
            root: CircuitState::new(circuit),
            queue: EventQueue::new(),
            rng,
            config,
            ticks: 0,
            temporary_clock: None,
            oscillating: false,
            oscillation_points: Vec::new(),
        }
    }

    /// The root state.
    pub fn root(&self) -> &CircuitState {
        &self.root
    }

    /// Mutable root state, for state migration after a transaction.
    pub fn root_mut(&mut self) -> &mut CircuitState {
        &mut self.root
    }

    /// The current simulation time.
    pub fn clock(&self) -> u64 {
        self.queue.clock()
    }

    /// How many clock ticks have been issued.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// `true` once an oscillation has been detected. Sticky until a
    /// later run drains fully within budget or [`reset`](Self::reset)
    /// is called.
    pub fn is_oscillating(&self) -> bool {
        self.oscillating
    }

    /// The points still changing when the oscillation detector fired.
    pub fn oscillation_points(&self) -> &[(StatePath, Location)] {
        &self.oscillation_points
    }

    /// Runs until the design is quiescent or the iteration budget is
    /// exhausted.
    pub fn propagate(&mut self) -> Result<(), SimError> {
        self.root.sync_connectivity();
        let budget = self.config.iteration_budget;
        let mut iters: u32 = 0;
        let mut exhausted = false;
        while !self.queue.is_empty() || self.root.has_dirty() {
            iters += 1;
            if iters > budget {
                exhausted = true;
                self.queue.clear();
                break;
            }
            // Points from the final quarter of the budget are the ones
            // worth reporting when the detector fires.
            let collect = iters.saturating_mul(4) > budget.saturating_mul(3);
            if collect && iters == budget.saturating_mul(3) / 4 + 1 {
                self.oscillation_points.clear();
            }
            self.step_once(collect)?;
        }
        // A run that settles within budget clears the detector; only
        // a budget-exhausted run leaves it set.
        self.oscillating = exhausted;
        if !exhausted {
            self.oscillation_points.clear();
        }
        Ok(())
    }

    /// Performs one propagation slice: either settles pending dirty
    /// work or delivers the next batch of due events.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.root.sync_connectivity();
        if !self.queue.is_empty() || self.root.has_dirty() {
            self.step_once(false)?;
        }
        Ok(())
    }

    fn step_once(&mut self, collect: bool) -> Result<(), SimError> {
        if self.root.has_dirty() {
            process_state(
                &mut self.root,
                &StatePath::root(),
                &mut self.queue,
                &mut self.rng,
                self.config.jitter,
                collect,
                &mut self.oscillation_points,
            )?;
            // Nothing encloses the root, so its boundary flag is
            // discarded rather than re-queued.
            self.root.take_parent_notify();
            Ok(())
        } else if let Some(time) = self.queue.next_time() {
            self.queue.advance_to(time);
            while let Some(event) = self.queue.pop_due(time) {
                let Some(state) = self.root.state_at_path_mut(&event.path) else {
                    continue;
                };
                if state.set_driven(event.location, event.cause, event.value) {
                    state.mark_point_dirty(event.location);
                    if collect {
                        self.oscillation_points
                            .push((event.path.clone(), event.location));
                    }
                }
            }
            Ok(())
        } else {
            Ok(())
        }
    }

    /// Issues `count` clock ticks, propagating to quiescence after
    /// each. Returns `true` when some clock (or the temporary clock)
    /// actually toggled.
    pub fn tick(&mut self, count: u64) -> Result<bool, SimError> {
        let mut ticked_any = false;
        let root_path = StatePath::root();
        for _ in 0..count {
            self.ticks += 1;
            let mut ticked = toggle_clocks(
                &mut self.root,
                &root_path,
                self.ticks,
                &mut self.queue,
                &mut self.rng,
            );
            if !ticked {
                if let Some(id) = self.temporary_clock {
                    let phase = if self.ticks % 2 == 1 { Bit::One } else { Bit::Zero };
                    self.poke(&StatePath::root(), id, Value::single(phase))?;
                    ticked = true;
                }
            }
            ticked_any |= ticked;
            self.propagate()?;
        }
        Ok(ticked_any)
    }

    /// Names a root-level pin to stand in for a clock when the circuit
    /// has no clock component. The pin must be a 1-bit input.
    pub fn set_temporary_clock(&mut self, id: ComponentId) -> Result<(), SimError> {
        let component = {
            let inner = self.root.circuit().read();
            inner
                .component(id)
                .map(Arc::clone)
                .map_err(|_| SimError::ComponentNotFound(id))?
        };
        match component.pin_info() {
            Some(info) if info.is_input && info.width == BitWidth::ONE => {
                self.temporary_clock = Some(id);
                Ok(())
            }
            Some(info) if !info.is_input => Err(SimError::InvalidClockSource {
                reason: "pin is an output".to_string(),
            }),
            Some(info) => Err(SimError::InvalidClockSource {
                reason: format!("pin is {} bits wide", info.width),
            }),
            None => Err(SimError::InvalidClockSource {
                reason: "component is not a pin".to_string(),
            }),
        }
    }

    /// Forces an external value onto a component, as when the user
    /// pokes an input pin. Does not propagate; call
    /// [`propagate`](Self::propagate) afterwards.
    pub fn poke(
        &mut self,
        path: &StatePath,
        id: ComponentId,
        value: Value,
    ) -> Result<(), SimError> {
        let Some(state) = self.root.state_at_path_mut(path) else {
            return Err(SimError::ComponentNotFound(id));
        };
        let component = {
            let inner = state.circuit().read();
            inner
                .component(id)
                .map(Arc::clone)
                .map_err(|_| SimError::ComponentNotFound(id))?
        };
        if component.pin_info().is_none() && !component.is_clock() {
            return Err(SimError::NotPokable(id));
        }
        let mut view = InstanceView {
            component: id,
            ends: component.ends(),
            path,
            state: &mut *state,
            queue: &mut self.queue,
            rng: &mut self.rng,
            jitter: false,
        };
        if component.set_external(&mut view, value) {
            state.mark_component_dirty(id);
        }
        Ok(())
    }

    /// Returns the simulation to power-on state: values, component
    /// state, pending events, the tick counter, and the oscillation
    /// flag all clear. Structure and state-tree shape are kept.
    pub fn reset(&mut self) {
        self.root.reset();
        self.queue = EventQueue::new();
        self.rng = StdRng::seed_from_u64(self.config.jitter_seed);
        self.ticks = 0;
        self.oscillating = false;
        self.oscillation_points.clear();
    }
}

/// Settles one state node: dirty points, then dirty components, then
/// child states. A child whose output pins changed re-queues its
/// enclosing instance in this node.
fn process_state(
    state: &mut CircuitState,
    path: &StatePath,
    queue: &mut EventQueue,
    rng: &mut StdRng,
    jitter: bool,
    collect: bool,
    osc: &mut Vec<(StatePath, Location)>,
) -> Result<(), SimError> {
    resolve_points(state, path, collect, osc);

    let dirty = state.take_dirty_components();
    let components: Vec<(ComponentId, Arc<dyn Component>)> = {
        let inner = state.circuit().read();
        dirty
            .iter()
            .filter_map(|&id| inner.component(id).ok().map(|c| (id, Arc::clone(c))))
            .collect()
    };
    for (id, component) in components {
        if let Some(sub) = component.as_subcircuit() {
            propagate_subcircuit(state, path, id, sub, queue, rng)?;
        } else {
            let mut view = InstanceView {
                component: id,
                ends: component.ends(),
                path,
                state: &mut *state,
                queue: &mut *queue,
                rng: &mut *rng,
                jitter,
            };
            component.propagate(&mut view)?;
        }
    }

    for instance in state.substate_ids() {
        let child_path = path.child(instance);
        let mut notify = false;
        if let Some(substate) = state.substate_mut(instance) {
            process_state(substate, &child_path, queue, rng, jitter, collect, osc)?;
            notify = substate.take_parent_notify();
        }
        if notify {
            state.mark_component_dirty(instance);
        }
    }
    Ok(())
}

/// Re-resolves the nets touched by dirty points.
///
/// Threads tie bundles together, so the recomputation works on the
/// whole thread-connected cluster around each dirty point: local
/// driven values per bundle, thread values across bundles, then the
/// resolved value pushed to every point, with pulls applied to bits
/// still floating and conflicted bundles reading all-error.
fn resolve_points(
    state: &mut CircuitState,
    path: &StatePath,
    collect: bool,
    osc: &mut Vec<(StatePath, Location)>,
) {
    let dirty = state.take_dirty_points();
    if dirty.is_empty() {
        return;
    }
    let conn = Arc::clone(state.connectivity());

    // The thread-connected closure of the dirty bundles.
    let mut affected: BTreeSet<BundleId> = BTreeSet::new();
    let mut work: Vec<BundleId> = dirty.iter().filter_map(|&l| conn.bundle_at(l)).collect();
    while let Some(bundle) = work.pop() {
        if !affected.insert(bundle) {
            continue;
        }
        for &thread in conn.bundle(bundle).threads() {
            for &(member, _) in conn.thread_members(thread) {
                if !affected.contains(&member) {
                    work.push(member);
                }
            }
        }
    }

    // Combine all drives landing on each affected bundle.
    let mut local: BTreeMap<BundleId, Option<Value>> = BTreeMap::new();
    for &id in &affected {
        let mut acc: Option<Value> = None;
        for &loc in conn.bundle(id).locations() {
            for &(_, value) in state.drivers_at(loc) {
                acc = Some(match acc {
                    Some(prior) => prior.combine(value),
                    None => value,
                });
            }
        }
        local.insert(id, acc);
    }

    for &id in &affected {
        let bundle = conn.bundle(id);
        let value = if !bundle.is_valid() {
            Value::error_value(bundle.width().unwrap_or(BitWidth::ONE))
        } else {
            let Some(width) = bundle.width() else {
                continue;
            };
            let mut out = Value::floating(width);
            for (i, &thread) in bundle.threads().iter().enumerate() {
                let mut bit = Bit::Floating;
                for &(member, position) in conn.thread_members(thread) {
                    if let Some(Some(driven)) = local.get(&member) {
                        if position < driven.width().get() {
                            bit = bit.combine(driven.get(position));
                        }
                    }
                }
                if bit == Bit::Floating {
                    bit = conn.thread_pull(thread);
                }
                out = out.set(i as u8, bit);
            }
            out
        };

        let mut changed = false;
        for &loc in bundle.locations() {
            if state.set_value(loc, value) {
                changed = true;
                if collect {
                    osc.push((path.clone(), loc));
                }
            }
        }
        if changed {
            for &sink in conn.sinks(id) {
                state.mark_component_dirty(sink);
            }
        }
    }
}

/// Moves values across a subcircuit boundary.
///
/// Input pins receive the parent's net value through their external
/// slot, exactly as if the user had poked them; output pins' child-side
/// net values are driven onto the parent net with a fixed delay of one
/// and no jitter, so hierarchy never perturbs timing.
fn propagate_subcircuit(
    state: &mut CircuitState,
    path: &StatePath,
    instance: ComponentId,
    sub: &SubcircuitInstance,
    queue: &mut EventQueue,
    rng: &mut StdRng,
) -> Result<(), SimError> {
    let ends = sub.ends();
    let pins = sub.pins();
    let child_path = path.child(instance);

    let mut down: Vec<(ComponentId, Value)> = Vec::new();
    let mut up: Vec<(usize, ComponentId)> = Vec::new();
    for (i, &(pin_id, info)) in pins.iter().enumerate() {
        if info.is_input {
            down.push((pin_id, state.value_at(ends[i].location)));
        } else {
            up.push((i, pin_id));
        }
    }

    let substate = state.ensure_substate(instance, sub.circuit());
    for (pin_id, value) in down {
        let component = {
            let inner = substate.circuit().read();
            inner.component(pin_id).map(Arc::clone)
        };
        let Ok(component) = component else { continue };
        let mut view = InstanceView {
            component: pin_id,
            ends: component.ends(),
            path: &child_path,
            state: &mut *substate,
            queue: &mut *queue,
            rng: &mut *rng,
            jitter: false,
        };
        if component.set_external(&mut view, value) {
            substate.mark_component_dirty(pin_id);
        }
    }

    let mut rises: Vec<(usize, Value)> = Vec::new();
    for (i, pin_id) in up {
        let pin_location = {
            let inner = substate.circuit().read();
            inner.component(pin_id).ok().map(|c| c.location())
        };
        if let Some(loc) = pin_location {
            rises.push((i, substate.value_at(loc)));
        }
    }
    for (i, value) in rises {
        queue.schedule(1, path.clone(), ends[i].location, instance, value);
    }
    Ok(())
}

/// Advances every clock component in the state tree by one tick.
/// Returns `true` when at least one clock toggled.
fn toggle_clocks(
    state: &mut CircuitState,
    path: &StatePath,
    ticks: u64,
    queue: &mut EventQueue,
    rng: &mut StdRng,
) -> bool {
    let mut ticked = false;
    let clocks: Vec<(ComponentId, Arc<dyn Component>)> = {
        let inner = state.circuit().read();
        inner
            .components()
            .iter()
            .filter(|(_, c)| c.is_clock())
            .map(|(&id, c)| (id, Arc::clone(c)))
            .collect()
    };
    for (id, component) in clocks {
        let mut view = InstanceView {
            component: id,
            ends: component.ends(),
            path,
            state: &mut *state,
            queue: &mut *queue,
            rng: &mut *rng,
            jitter: false,
        };
        if component.tick(&mut view, ticks) {
            state.mark_component_dirty(id);
            ticked = true;
        }
    }
    for instance in state.substate_ids() {
        let child_path = path.child(instance);
        if let Some(substate) = state.substate_mut(instance) {
            ticked |= toggle_clocks(substate, &child_path, ticks, queue, rng);
        }
    }
    ticked
}
