//! An edge-triggered register.

use crate::pin::coerce;
use ripple_circuit::{
    AttrValue, Component, ComponentData, ComponentError, End, InstanceState,
};
use ripple_common::{Bit, BitWidth, Location, Value};
use std::any::Any;
use std::sync::Arc;

/// A register's stored word and the last clock level it saw.
#[derive(Clone, Copy, Debug)]
pub struct RegisterData {
    value: Value,
    last_clock: Bit,
}

impl RegisterData {
    /// The stored word.
    pub fn value(&self) -> Value {
        self.value
    }
}

impl ComponentData for RegisterData {
    fn clone_box(&self) -> Box<dyn ComponentData> {
        Box::new(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A rising-edge register.
///
/// End 0 is the stored word's output, end 1 the data input on the west
/// side, end 2 the clock input below it. The register latches the data
/// input when the clock input goes from zero to one; a floating or
/// error clock never triggers. Power-on contents are all zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Register {
    location: Location,
    width: BitWidth,
}

impl Register {
    /// A register of `width` bits with its output at `location`.
    pub fn new(location: Location, width: BitWidth) -> Self {
        Register { location, width }
    }

    /// The register's width.
    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// The location of the data input.
    pub fn data_location(&self) -> Location {
        self.location.translate(-30, 0)
    }

    /// The location of the clock input.
    pub fn clock_location(&self) -> Location {
        self.location.translate(-30, 20)
    }

    fn stored(&self, state: &dyn InstanceState) -> RegisterData {
        state
            .data()
            .and_then(|d| d.as_any().downcast_ref::<RegisterData>())
            .copied()
            .unwrap_or(RegisterData {
                value: Value::known(self.width, 0),
                last_clock: Bit::Zero,
            })
    }
}

impl Component for Register {
    fn type_name(&self) -> &'static str {
        "register"
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        vec![
            End::output(self.location, self.width),
            End::input(self.data_location(), self.width),
            End::input(self.clock_location(), BitWidth::ONE),
        ]
    }

    fn propagate(&self, state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        let mut held = self.stored(state);
        let clock = state.port_value(2).get(0);
        if held.last_clock == Bit::Zero && clock == Bit::One {
            held.value = coerce(state.port_value(1), self.width);
        }
        if clock.is_defined() {
            held.last_clock = clock;
        }
        state.set_data(Box::new(held));
        state.set_port(0, held.value, 1);
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
            ("width", AttrValue::Width(w)) => Ok(Arc::new(Register { width: *w, ..*self })),
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

    fn w(n: u8) -> BitWidth {
        BitWidth::new(n).unwrap()
    }

    #[test]
    fn register_latches_on_rising_edge_only() {
        let reg = Register::new(Location::new(0, 0), w(4));
        let mut bench = Bench::default();
        bench.drive(1, Value::known(w(4), 0b0101));
        bench.drive(2, Value::single(Bit::Zero));

        // Low clock: output holds the power-on zero.
        reg.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::known(w(4), 0)));

        // Rising edge latches.
        bench.drive(2, Value::single(Bit::One));
        reg.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::known(w(4), 0b0101)));

        // A held-high clock does not latch again.
        bench.drive(1, Value::known(w(4), 0b1111));
        reg.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::known(w(4), 0b0101)));

        // Falling edge then rising edge picks up the new input.
        bench.drive(2, Value::single(Bit::Zero));
        reg.propagate(&mut bench).unwrap();
        bench.drive(2, Value::single(Bit::One));
        reg.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::known(w(4), 0b1111)));
    }

    #[test]
    fn undefined_clock_never_triggers() {
        let reg = Register::new(Location::new(0, 0), w(4));
        let mut bench = Bench::default();
        bench.drive(1, Value::known(w(4), 0b1111));
        bench.drive(2, Value::single(Bit::Floating));
        reg.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::known(w(4), 0)));

        bench.drive(2, Value::single(Bit::Error));
        reg.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::known(w(4), 0)));
    }
}
