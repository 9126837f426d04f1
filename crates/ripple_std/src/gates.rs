//! Combinational logic gates.

use crate::pin::coerce;
use ripple_circuit::{AttrValue, Component, ComponentError, End, InstanceState};
use ripple_common::{BitWidth, Location, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The logic function a [`Gate`] computes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum GateKind {
    /// Output is one only when every input is one.
    And,
    /// Output is one when any input is one.
    Or,
    /// Output is the bitwise parity of the inputs.
    Xor,
    /// Negated [`And`](GateKind::And).
    Nand,
    /// Negated [`Or`](GateKind::Or).
    Nor,
    /// Negated [`Xor`](GateKind::Xor).
    Xnor,
}

impl GateKind {
    fn fold(self, a: Value, b: Value) -> Value {
        match self {
            GateKind::And | GateKind::Nand => a.and_bits(b),
            GateKind::Or | GateKind::Nor => a.or_bits(b),
            GateKind::Xor | GateKind::Xnor => a.xor_bits(b),
        }
    }

    fn negated(self) -> bool {
        matches!(self, GateKind::Nand | GateKind::Nor | GateKind::Xnor)
    }
}

/// A multi-input logic gate operating bitwise over its width.
///
/// The output end sits at the gate's location; inputs stack on the west
/// side. A floating or error input poisons the affected output bits to
/// error, except where the function's dominant value decides the bit
/// regardless (a zero into an and-gate, a one into an or-gate).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Gate {
    kind: GateKind,
    location: Location,
    width: BitWidth,
    inputs: u8,
}

impl Gate {
    /// A gate computing `kind` over `inputs` inputs of `width` bits.
    /// Input counts below two are raised to two.
    pub fn new(kind: GateKind, location: Location, width: BitWidth, inputs: u8) -> Self {
        Gate {
            kind,
            location,
            width,
            inputs: inputs.max(2),
        }
    }

    /// The gate's function.
    pub fn kind(&self) -> GateKind {
        self.kind
    }

    /// The gate's width.
    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// The location of input end `index`.
    pub fn input_location(&self, index: u8) -> Location {
        self.location.translate(-50, i32::from(index) * 10)
    }
}

impl Component for Gate {
    fn type_name(&self) -> &'static str {
        match self.kind {
            GateKind::And => "and gate",
            GateKind::Or => "or gate",
            GateKind::Xor => "xor gate",
            GateKind::Nand => "nand gate",
            GateKind::Nor => "nor gate",
            GateKind::Xnor => "xnor gate",
        }
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        let mut ends = vec![End::output(self.location, self.width)];
        for i in 0..self.inputs {
            ends.push(End::input(self.input_location(i), self.width));
        }
        ends
    }

    fn propagate(&self, state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        let mut acc = coerce(state.port_value(1), self.width);
        for i in 2..=usize::from(self.inputs) {
            let input = coerce(state.port_value(i), self.width);
            acc = self.kind.fold(acc, input);
        }
        if self.kind.negated() {
            acc = acc.not_bits();
        }
        state.set_port(0, acc, 1);
        Ok(())
    }

    fn attr(&self, name: &str) -> Option<AttrValue> {
        match name {
            "width" => Some(AttrValue::Width(self.width)),
            "inputs" => Some(AttrValue::Int(i64::from(self.inputs))),
            _ => None,
        }
    }

    fn with_attr(
        &self,
        name: &str,
        value: &AttrValue,
    ) -> Result<Arc<dyn Component>, ComponentError> {
        match (name, value) {
            ("width", AttrValue::Width(w)) => Ok(Arc::new(Gate { width: *w, ..*self })),
            ("inputs", AttrValue::Int(n)) if (2..=32).contains(n) => Ok(Arc::new(Gate {
                inputs: *n as u8,
                ..*self
            })),
            ("inputs", AttrValue::Int(_)) => Err(ComponentError::InvalidAttribute {
                name: name.to_owned(),
                reason: "input count must be between 2 and 32".to_owned(),
            }),
            ("width" | "inputs", _) => Err(ComponentError::InvalidAttribute {
                name: name.to_owned(),
                reason: "wrong value type".to_owned(),
            }),
            _ => Err(ComponentError::UnknownAttribute {
                component: self.type_name(),
                name: name.to_owned(),
            }),
        }
    }
}

/// An inverter.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NotGate {
    location: Location,
    width: BitWidth,
}

impl NotGate {
    /// An inverter of `width` bits with its output at `location`.
    pub fn new(location: Location, width: BitWidth) -> Self {
        NotGate { location, width }
    }

    /// The location of the inverter's input end.
    pub fn input_location(&self) -> Location {
        self.location.translate(-30, 0)
    }
}

impl Component for NotGate {
    fn type_name(&self) -> &'static str {
        "not gate"
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        vec![
            End::output(self.location, self.width),
            End::input(self.input_location(), self.width),
        ]
    }

    fn propagate(&self, state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        let input = coerce(state.port_value(1), self.width);
        state.set_port(0, input.not_bits(), 1);
        Ok(())
    }

    fn attr(&self, name: &str) -> Option<AttrValue> {
        match name {
            "width" => Some(AttrValue::Width(self.width)),
            _ => None,
        }
    }

    fn with_attr(
        &self,
        name: &str,
        value: &AttrValue,
    ) -> Result<Arc<dyn Component>, ComponentError> {
        match (name, value) {
            ("width", AttrValue::Width(w)) => Ok(Arc::new(NotGate { width: *w, ..*self })),
            ("width", _) => Err(ComponentError::InvalidAttribute {
                name: name.to_owned(),
                reason: "expected a width".to_owned(),
            }),
            _ => Err(ComponentError::UnknownAttribute {
                component: self.type_name(),
                name: name.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Bench;
    use ripple_common::Bit;

    fn w(n: u8) -> BitWidth {
        BitWidth::new(n).unwrap()
    }

    #[test]
    fn and_gate_truth() {
        let gate = Gate::new(GateKind::And, Location::new(0, 0), BitWidth::ONE, 2);
        let ends = gate.ends();
        let mut bench = Bench::default();
        bench.drive(1, Value::single(Bit::One));
        bench.drive(2, Value::single(Bit::One));
        gate.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::One)));
        assert_eq!(ends.len(), 3);

        bench.drive(2, Value::single(Bit::Zero));
        gate.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::Zero)));
    }

    #[test]
    fn zero_dominates_and_even_against_floating() {
        let gate = Gate::new(GateKind::And, Location::new(0, 0), BitWidth::ONE, 2);
        let mut bench = Bench::default();
        bench.drive(1, Value::single(Bit::Zero));
        bench.drive(2, Value::single(Bit::Floating));
        gate.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::Zero)));
    }

    #[test]
    fn floating_input_poisons_or_to_error() {
        let gate = Gate::new(GateKind::Or, Location::new(0, 0), BitWidth::ONE, 2);
        let mut bench = Bench::default();
        bench.drive(1, Value::single(Bit::Zero));
        bench.drive(2, Value::single(Bit::Floating));
        gate.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::Error)));
    }

    #[test]
    fn nand_negates() {
        let gate = Gate::new(GateKind::Nand, Location::new(0, 0), BitWidth::ONE, 2);
        let mut bench = Bench::default();
        bench.drive(1, Value::single(Bit::One));
        bench.drive(2, Value::single(Bit::One));
        gate.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::Zero)));
    }

    #[test]
    fn wide_xor_works_bitwise() {
        let gate = Gate::new(GateKind::Xor, Location::new(0, 0), w(4), 2);
        let mut bench = Bench::default();
        bench.drive(1, Value::known(w(4), 0b1100));
        bench.drive(2, Value::known(w(4), 0b1010));
        gate.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::known(w(4), 0b0110)));
    }

    #[test]
    fn three_input_or() {
        let gate = Gate::new(GateKind::Or, Location::new(0, 0), BitWidth::ONE, 3);
        let mut bench = Bench::default();
        bench.drive(1, Value::single(Bit::Zero));
        bench.drive(2, Value::single(Bit::Zero));
        bench.drive(3, Value::single(Bit::One));
        gate.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::One)));
    }

    #[test]
    fn not_gate_inverts_and_reports_floating_as_error() {
        let gate = NotGate::new(Location::new(0, 0), BitWidth::ONE);
        let mut bench = Bench::default();
        bench.drive(1, Value::single(Bit::Zero));
        gate.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::One)));

        bench.drive(1, Value::single(Bit::Floating));
        gate.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::Error)));
    }

    #[test]
    fn input_count_attr_is_bounded() {
        let gate = Gate::new(GateKind::And, Location::new(0, 0), BitWidth::ONE, 2);
        assert!(gate.with_attr("inputs", &AttrValue::Int(5)).is_ok());
        assert!(gate.with_attr("inputs", &AttrValue::Int(1)).is_err());
        assert!(gate.with_attr("inputs", &AttrValue::Int(99)).is_err());
    }
}
