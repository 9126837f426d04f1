//! A test bench standing in for the simulation's instance view.

use ripple_circuit::{ComponentData, InstanceState};
use ripple_common::{Bit, Value};
use std::collections::BTreeMap;

/// Records drives a component schedules and serves canned port values.
#[derive(Default)]
pub(crate) struct Bench {
    ports: BTreeMap<usize, Value>,
    pub(crate) scheduled: Vec<(usize, Value, u32)>,
    pub(crate) data: Option<Box<dyn ComponentData>>,
    pub(crate) notified: bool,
}

impl Bench {
    /// Sets the value the component will read at port `index`.
    pub(crate) fn drive(&mut self, index: usize, value: Value) {
        self.ports.insert(index, value);
    }

    /// The most recent value scheduled onto port `index`.
    pub(crate) fn last_drive(&self, index: usize) -> Option<Value> {
        self.scheduled
            .iter()
            .rev()
            .find(|(i, _, _)| *i == index)
            .map(|&(_, v, _)| v)
    }
}

impl InstanceState for Bench {
    fn port_value(&self, index: usize) -> Value {
        self.ports
            .get(&index)
            .copied()
            .unwrap_or_else(|| Value::single(Bit::Floating))
    }

    fn set_port(&mut self, index: usize, value: Value, delay: u32) {
        self.scheduled.push((index, value, delay));
    }

    fn data(&self) -> Option<&dyn ComponentData> {
        self.data.as_deref()
    }

    fn data_mut(&mut self) -> Option<&mut dyn ComponentData> {
        self.data.as_deref_mut()
    }

    fn set_data(&mut self, data: Box<dyn ComponentData>) {
        self.data = Some(data);
    }

    fn notify_parent(&mut self) {
        self.notified = true;
    }
}
