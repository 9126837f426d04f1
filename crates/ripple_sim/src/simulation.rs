//! The top-level simulation handle tying a circuit, its state tree,
//! and the propagation engine together.

use crate::config::SimConfig;
use crate::error::SimError;
use crate::event::StatePath;
use crate::propagator::Propagator;
use crate::state::CircuitState;
use ripple_circuit::{
    Circuit, ComponentId, TransactionResult, WidthIncompatibility,
};
use ripple_common::{BitWidth, Location, Value};
use std::sync::Arc;

/// A running simulation of one root circuit.
///
/// The simulation owns the state tree and the event queue. Structural
/// edits happen elsewhere, through transactions; after committing one,
/// call [`handle_transaction`](Self::handle_transaction) so the state
/// tree migrates and the affected circuits re-propagate.
pub struct Simulation {
    propagator: Propagator,
}

impl Simulation {
    /// Starts a simulation of `circuit` with default settings.
    pub fn new(circuit: Arc<Circuit>) -> Self {
        Simulation::with_config(circuit, SimConfig::default())
    }

    /// Starts a simulation of `circuit` with explicit settings.
    pub fn with_config(circuit: Arc<Circuit>, config: SimConfig) -> Self {
        Simulation {
            propagator: Propagator::new(circuit, config),
        }
    }

    /// The root circuit being simulated.
    pub fn circuit(&self) -> &Arc<Circuit> {
        self.propagator.root().circuit()
    }

    /// The root of the state tree.
    pub fn root_state(&self) -> &CircuitState {
        self.propagator.root()
    }

    /// Runs propagation to quiescence (or until the oscillation
    /// detector fires).
    pub fn propagate(&mut self) -> Result<(), SimError> {
        self.propagator.propagate()
    }

    /// Performs a single propagation slice, for step-debugging.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.propagator.step()
    }

    /// Issues `count` clock ticks, propagating after each. Returns
    /// `true` when some clock actually toggled.
    pub fn tick(&mut self, count: u64) -> Result<bool, SimError> {
        self.propagator.tick(count)
    }

    /// Returns the simulation to power-on state.
    pub fn reset(&mut self) {
        self.propagator.reset();
    }

    /// `true` once an oscillation has been detected; cleared when a
    /// later run settles within budget or by [`reset`](Self::reset).
    pub fn is_oscillating(&self) -> bool {
        self.propagator.is_oscillating()
    }

    /// The points that were still changing when the oscillation
    /// detector fired, with the state paths they live in.
    pub fn oscillation_points(&self) -> &[(StatePath, Location)] {
        self.propagator.oscillation_points()
    }

    /// How many clock ticks have been issued.
    pub fn ticks(&self) -> u64 {
        self.propagator.ticks()
    }

    /// The current simulation time, in delay units.
    pub fn clock(&self) -> u64 {
        self.propagator.clock()
    }

    /// The resolved value at a point of the root circuit.
    pub fn value_at(&self, loc: Location) -> Value {
        self.propagator.root().value_at(loc)
    }

    /// The resolved value at a point of the state named by `path`.
    /// Floating when the path does not resolve to a live state.
    pub fn value_in(&self, path: &StatePath, loc: Location) -> Value {
        match self.propagator.root().state_at_path(path) {
            Some(state) => state.value_at(loc),
            None => Value::floating(BitWidth::ONE),
        }
    }

    /// The width of the bundle at a point of the root circuit. For a
    /// conflicted bundle this is the widest width observed; `None`
    /// when no end with a known width touches the point.
    pub fn width_at(&self, loc: Location) -> Option<BitWidth> {
        self.circuit().connectivity().width_at(loc)
    }

    /// Width conflicts in the root circuit's current connectivity.
    pub fn width_incompatibilities(&self) -> Vec<WidthIncompatibility> {
        self.circuit().connectivity().incompatibilities().to_vec()
    }

    /// Drives an external value onto a pokable component, then
    /// propagates.
    pub fn set_pin(
        &mut self,
        path: &StatePath,
        id: ComponentId,
        value: Value,
    ) -> Result<(), SimError> {
        self.propagator.poke(path, id, value)?;
        self.propagator.propagate()
    }

    /// Names a root-level input pin to toggle on [`tick`](Self::tick)
    /// when the design has no clock component.
    pub fn set_temporary_clock(&mut self, id: ComponentId) -> Result<(), SimError> {
        self.propagator.set_temporary_clock(id)
    }

    /// Migrates simulation state after a committed transaction and
    /// re-propagates.
    ///
    /// Every state node simulating an edited circuit picks up the
    /// circuit's replacement map, resynchronizes against the rebuilt
    /// connectivity, and has its stale drives withdrawn.
    pub fn handle_transaction(&mut self, result: &TransactionResult) -> Result<(), SimError> {
        migrate(self.propagator.root_mut(), result);
        self.propagator.root_mut().sync_connectivity();
        self.propagator.propagate()
    }
}

fn migrate(state: &mut CircuitState, result: &TransactionResult) {
    let id = state.circuit().id();
    if let Some(map) = result.replacements.get(&id) {
        state.apply_replacements(map);
    }
    for instance in state.substate_ids() {
        if let Some(substate) = state.substate_mut(instance) {
            migrate(substate, result);
        }
    }
}
