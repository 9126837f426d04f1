//! Wiring helpers: tunnels and pull resistors.

use crate::component::{AttrValue, Component, ComponentError, End, EndKind, InstanceState};
use ripple_common::{Bit, BitWidth, Ident, Location};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A named wireless connection point.
///
/// All tunnels in a circuit that share a label are electrically one
/// point. Labels are interned and compared after trimming, so `" clk"`
/// and `"clk"` name the same net.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Tunnel {
    location: Location,
    width: BitWidth,
    label: Ident,
}

impl Tunnel {
    /// Creates a tunnel. The label must already be interned with
    /// trimmed whitespace.
    pub fn new(location: Location, width: BitWidth, label: Ident) -> Self {
        Tunnel {
            location,
            width,
            label,
        }
    }

    /// The tunnel's label.
    pub fn label(&self) -> Ident {
        self.label
    }

    /// The tunnel's width.
    pub fn width(&self) -> BitWidth {
        self.width
    }
}

impl Component for Tunnel {
    fn type_name(&self) -> &'static str {
        "tunnel"
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        vec![End {
            location: self.location,
            width: Some(self.width),
            kind: EndKind::Bidirectional,
        }]
    }

    fn propagate(&self, _state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        // Tunnels are resolved at the wire level.
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
            ("width", AttrValue::Width(w)) => Ok(Arc::new(Tunnel { width: *w, ..*self })),
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

    fn as_tunnel(&self) -> Option<&Tunnel> {
        Some(self)
    }
}

/// A resistor that pulls floating bits on its net towards a value.
///
/// Pull resolution happens after driver combination: any bit of the net
/// that is still floating takes the pull value. Two resistors with
/// conflicting pulls on one net resolve to an error pull.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PullResistor {
    location: Location,
    width: BitWidth,
    pull: Bit,
}

impl PullResistor {
    /// Creates a pull resistor.
    pub fn new(location: Location, width: BitWidth, pull: Bit) -> Self {
        PullResistor {
            location,
            width,
            pull,
        }
    }

    /// The value floating bits are pulled towards.
    pub fn pull(&self) -> Bit {
        self.pull
    }

    /// The resistor's width.
    pub fn width(&self) -> BitWidth {
        self.width
    }
}

impl Component for PullResistor {
    fn type_name(&self) -> &'static str {
        "pull resistor"
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        vec![End {
            location: self.location,
            width: Some(self.width),
            kind: EndKind::Input,
        }]
    }

    fn propagate(&self, _state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        // Pulls are resolved at the wire level.
        Ok(())
    }

    fn attr(&self, name: &str) -> Option<AttrValue> {
        match name {
            "width" => Some(AttrValue::Width(self.width)),
            "pull" => Some(AttrValue::Bit(self.pull)),
            _ => None,
        }
    }

    fn with_attr(
        &self,
        name: &str,
        value: &AttrValue,
    ) -> Result<Arc<dyn Component>, ComponentError> {
        match (name, value) {
            ("width", AttrValue::Width(w)) => Ok(Arc::new(PullResistor { width: *w, ..*self })),
            ("pull", AttrValue::Bit(b)) => Ok(Arc::new(PullResistor { pull: *b, ..*self })),
            ("width" | "pull", _) => Err(ComponentError::InvalidAttribute {
                name: name.to_owned(),
                reason: "wrong value type".to_owned(),
            }),
            _ => Err(ComponentError::UnknownAttribute {
                component: self.type_name(),
                name: name.to_owned(),
            }),
        }
    }

    fn as_pull(&self) -> Option<&PullResistor> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_common::Interner;

    #[test]
    fn tunnel_reports_one_bidirectional_end() {
        let interner = Interner::new();
        let t = Tunnel::new(
            Location::new(10, 10),
            BitWidth::ONE,
            interner.get_or_intern("clk"),
        );
        let ends = t.ends();
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].kind, EndKind::Bidirectional);
        assert_eq!(ends[0].location, Location::new(10, 10));
    }

    #[test]
    fn tunnel_width_attr_round_trips() {
        let interner = Interner::new();
        let t = Tunnel::new(
            Location::new(0, 0),
            BitWidth::ONE,
            interner.get_or_intern("a"),
        );
        let wide = t
            .with_attr("width", &AttrValue::Width(BitWidth::new(8).unwrap()))
            .unwrap();
        assert_eq!(
            wide.attr("width"),
            Some(AttrValue::Width(BitWidth::new(8).unwrap()))
        );
        assert!(t.with_attr("label", &AttrValue::Bool(true)).is_err());
    }

    #[test]
    fn pull_resistor_attrs() {
        let p = PullResistor::new(Location::new(0, 0), BitWidth::ONE, Bit::One);
        assert_eq!(p.attr("pull"), Some(AttrValue::Bit(Bit::One)));
        let down = p.with_attr("pull", &AttrValue::Bit(Bit::Zero)).unwrap();
        assert_eq!(down.attr("pull"), Some(AttrValue::Bit(Bit::Zero)));
        assert!(p.with_attr("pull", &AttrValue::Bool(true)).is_err());
    }
}
