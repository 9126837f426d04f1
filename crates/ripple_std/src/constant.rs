//! A fixed-value driver.

use ripple_circuit::{AttrValue, Component, ComponentError, End, InstanceState};
use ripple_common::{Location, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A component that always drives the same value.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Constant {
    location: Location,
    value: Value,
}

impl Constant {
    /// A constant driving `value` at `location`.
    pub fn new(location: Location, value: Value) -> Self {
        Constant { location, value }
    }

    /// The value being driven.
    pub fn value(&self) -> Value {
        self.value
    }
}

impl Component for Constant {
    fn type_name(&self) -> &'static str {
        "constant"
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        vec![End::output(self.location, self.value.width())]
    }

    fn propagate(&self, state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        state.set_port(0, self.value, 1);
        Ok(())
    }

    fn attr(&self, name: &str) -> Option<AttrValue> {
        match name {
            "width" => Some(AttrValue::Width(self.value.width())),
            "value" => Some(AttrValue::Int(self.value.to_u64().unwrap_or(0) as i64)),
            _ => None,
        }
    }

    fn with_attr(
        &self,
        name: &str,
        value: &AttrValue,
    ) -> Result<Arc<dyn Component>, ComponentError> {
        match (name, value) {
            ("width", AttrValue::Width(w)) => Ok(Arc::new(Constant {
                value: Value::known(*w, self.value.to_u64().unwrap_or(0) & w.mask()),
                ..*self
            })),
            ("value", AttrValue::Int(bits)) => Ok(Arc::new(Constant {
                value: Value::known(self.value.width(), *bits as u64 & self.value.width().mask()),
                ..*self
            })),
            ("width" | "value", _) => Err(ComponentError::InvalidAttribute {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Bench;
    use ripple_common::BitWidth;

    #[test]
    fn constant_drives_its_value() {
        let w = BitWidth::new(4).unwrap();
        let c = Constant::new(Location::new(0, 0), Value::known(w, 0b1010));
        let mut bench = Bench::default();
        c.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::known(w, 0b1010)));
    }

    #[test]
    fn narrowing_the_width_truncates_the_value() {
        let wide = BitWidth::new(8).unwrap();
        let c = Constant::new(Location::new(0, 0), Value::known(wide, 0xAB));
        let narrow = c
            .with_attr("width", &AttrValue::Width(BitWidth::new(4).unwrap()))
            .unwrap();
        assert_eq!(narrow.attr("value"), Some(AttrValue::Int(0xB)));
    }
}
