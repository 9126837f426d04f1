//! Input and output pins, the interface points of a circuit.

use ripple_circuit::{
    AttrValue, Component, ComponentData, ComponentError, End, EndKind, InstanceState, PinInfo,
};
use ripple_common::{BitWidth, Location, Value};
use std::any::Any;
use std::sync::Arc;

/// The value held by a pin during simulation.
///
/// For an input pin this is the externally supplied value the pin
/// drives onto its net; for an output pin it is the last value sensed
/// from the net, which an enclosing subcircuit instance reads back.
#[derive(Clone, Debug)]
pub struct PinData {
    value: Value,
}

impl PinData {
    /// The pin's current value.
    pub fn value(&self) -> Value {
        self.value
    }
}

impl ComponentData for PinData {
    fn clone_box(&self) -> Box<dyn ComponentData> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A circuit interface point.
///
/// An input pin drives an externally supplied value onto its net, so
/// its single end faces the net as an output. An output pin senses its
/// net, so its end is an input. When the circuit is instantiated as a
/// subcircuit, the parent pushes values through input pins and reads
/// them back from output pins.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Pin {
    location: Location,
    width: BitWidth,
    is_input: bool,
    label: String,
}

impl Pin {
    /// An input pin: the circuit reads a value supplied from outside.
    pub fn input(location: Location, width: BitWidth) -> Self {
        Pin {
            location,
            width,
            is_input: true,
            label: String::new(),
        }
    }

    /// An output pin: the circuit exposes a value to the outside.
    pub fn output(location: Location, width: BitWidth) -> Self {
        Pin {
            location,
            width,
            is_input: false,
            label: String::new(),
        }
    }

    /// The same pin with a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The pin's width.
    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// The pin's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn stored(&self, state: &dyn InstanceState) -> Value {
        state
            .data()
            .and_then(|d| d.as_any().downcast_ref::<PinData>())
            .map(|d| d.value)
            .unwrap_or_else(|| Value::floating(self.width))
    }
}

impl Component for Pin {
    fn type_name(&self) -> &'static str {
        "pin"
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        let kind = if self.is_input {
            EndKind::Output
        } else {
            EndKind::Input
        };
        vec![End {
            location: self.location,
            width: Some(self.width),
            kind,
        }]
    }

    fn propagate(&self, state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        if self.is_input {
            let value = self.stored(state);
            state.set_port(0, value, 1);
        } else {
            let sensed = coerce(state.port_value(0), self.width);
            if self.stored(state) != sensed {
                state.set_data(Box::new(PinData { value: sensed }));
                state.notify_parent();
            }
        }
        Ok(())
    }

    fn set_external(&self, state: &mut dyn InstanceState, value: Value) -> bool {
        let value = coerce(value, self.width);
        if self.stored(state) == value {
            return false;
        }
        state.set_data(Box::new(PinData { value }));
        true
    }

    fn pin_info(&self) -> Option<PinInfo> {
        Some(PinInfo {
            is_input: self.is_input,
            width: self.width,
        })
    }

    fn attr(&self, name: &str) -> Option<AttrValue> {
        match name {
            "width" => Some(AttrValue::Width(self.width)),
            "label" => Some(AttrValue::Label(self.label.clone())),
            "output" => Some(AttrValue::Bool(!self.is_input)),
            _ => None,
        }
    }

    fn with_attr(
        &self,
        name: &str,
        value: &AttrValue,
    ) -> Result<Arc<dyn Component>, ComponentError> {
        match (name, value) {
            ("width", AttrValue::Width(w)) => Ok(Arc::new(Pin {
                width: *w,
                ..self.clone()
            })),
            ("label", AttrValue::Label(l)) => Ok(Arc::new(Pin {
                label: l.clone(),
                ..self.clone()
            })),
            ("output", AttrValue::Bool(out)) => Ok(Arc::new(Pin {
                is_input: !*out,
                ..self.clone()
            })),
            ("width" | "label" | "output", _) => Err(ComponentError::InvalidAttribute {
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

/// Widens or narrows `value` to `width`, padding with floating bits.
pub(crate) fn coerce(value: Value, width: BitWidth) -> Value {
    if value.width() == width {
        return value;
    }
    let mut out = Value::floating(width);
    let copy = width.get().min(value.width().get());
    for i in 0..copy {
        out = out.set(i, value.get(i));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Bench;
    use ripple_common::Bit;

    #[test]
    fn input_pin_drives_its_external_value() {
        let pin = Pin::input(Location::new(0, 0), BitWidth::ONE);
        let mut bench = Bench::default();
        assert!(pin.set_external(&mut bench, Value::single(Bit::One)));
        pin.propagate(&mut bench).unwrap();
        assert_eq!(bench.scheduled, vec![(0, Value::single(Bit::One), 1)]);
    }

    #[test]
    fn input_pin_defaults_to_floating() {
        let pin = Pin::input(Location::new(0, 0), BitWidth::new(4).unwrap());
        let mut bench = Bench::default();
        pin.propagate(&mut bench).unwrap();
        assert_eq!(
            bench.scheduled,
            vec![(0, Value::floating(BitWidth::new(4).unwrap()), 1)]
        );
    }

    #[test]
    fn set_external_reports_change() {
        let pin = Pin::input(Location::new(0, 0), BitWidth::ONE);
        let mut bench = Bench::default();
        assert!(pin.set_external(&mut bench, Value::single(Bit::Zero)));
        assert!(!pin.set_external(&mut bench, Value::single(Bit::Zero)));
        assert!(pin.set_external(&mut bench, Value::single(Bit::One)));
    }

    #[test]
    fn output_pin_senses_and_notifies() {
        let pin = Pin::output(Location::new(0, 0), BitWidth::ONE);
        let mut bench = Bench::default();
        bench.drive(0, Value::single(Bit::One));
        pin.propagate(&mut bench).unwrap();
        assert!(bench.notified);
        assert!(bench.scheduled.is_empty());
        let data = bench.data.as_ref().unwrap();
        let held = data.as_any().downcast_ref::<PinData>().unwrap();
        assert_eq!(held.value(), Value::single(Bit::One));

        // A second propagate with no change stays quiet.
        bench.notified = false;
        pin.propagate(&mut bench).unwrap();
        assert!(!bench.notified);
    }

    #[test]
    fn pin_end_faces_the_net() {
        let input = Pin::input(Location::new(0, 0), BitWidth::ONE);
        assert_eq!(input.ends()[0].kind, EndKind::Output);
        let output = Pin::output(Location::new(0, 0), BitWidth::ONE);
        assert_eq!(output.ends()[0].kind, EndKind::Input);
    }

    #[test]
    fn coerce_pads_with_floating() {
        let narrow = Value::single(Bit::One);
        let wide = coerce(narrow, BitWidth::new(4).unwrap());
        assert_eq!(wide.get(0), Bit::One);
        assert_eq!(wide.get(3), Bit::Floating);
    }

    #[test]
    fn width_attr_builds_replacement() {
        let pin = Pin::input(Location::new(0, 0), BitWidth::ONE).with_label("a");
        let wide = pin
            .with_attr("width", &AttrValue::Width(BitWidth::new(8).unwrap()))
            .unwrap();
        assert_eq!(
            wide.attr("width"),
            Some(AttrValue::Width(BitWidth::new(8).unwrap()))
        );
        assert_eq!(wide.attr("label"), Some(AttrValue::Label("a".to_owned())));
        assert!(pin.with_attr("width", &AttrValue::Bool(true)).is_err());
    }
}
