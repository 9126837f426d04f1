//! The component abstraction shared by every placeable circuit element.

use crate::splitter::Splitter;
use crate::subcircuit::SubcircuitInstance;
use crate::wiring::{PullResistor, Tunnel};
use ripple_common::{Bit, BitWidth, Location, Value};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The direction of a component end relative to the component.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EndKind {
    /// The component reads the net at this end.
    Input,
    /// The component drives the net at this end.
    Output,
    /// The component both reads and drives, such as a bus transceiver.
    Bidirectional,
}

impl EndKind {
    /// `true` when the component reads the net here.
    pub fn is_input(self) -> bool {
        matches!(self, EndKind::Input | EndKind::Bidirectional)
    }

    /// `true` when the component can drive the net here.
    pub fn is_output(self) -> bool {
        matches!(self, EndKind::Output | EndKind::Bidirectional)
    }
}

/// One connection point of a component.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct End {
    /// Where the end sits on the canvas.
    pub location: Location,
    /// The width the end expects, or `None` when not yet determined.
    pub width: Option<BitWidth>,
    /// Whether the end reads, drives, or both.
    pub kind: EndKind,
}

impl End {
    /// An input end with a known width.
    pub fn input(location: Location, width: BitWidth) -> Self {
        End {
            location,
            width: Some(width),
            kind: EndKind::Input,
        }
    }

    /// An output end with a known width.
    pub fn output(location: Location, width: BitWidth) -> Self {
        End {
            location,
            width: Some(width),
            kind: EndKind::Output,
        }
    }
}

/// A typed attribute value, used by [`Component::attr`] and the
/// `SetAttribute` mutation primitive.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum AttrValue {
    /// A bit width.
    Width(BitWidth),
    /// A text label.
    Label(String),
    /// An integer, such as a gate's input count.
    Int(i64),
    /// A single 4-state bit, such as a pull direction.
    Bit(Bit),
    /// A boolean flag.
    Bool(bool),
}

/// Errors raised by component behavior.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// The component has no attribute by this name.
    #[error("component '{component}' has no attribute '{name}'")]
    UnknownAttribute {
        /// The component's type name.
        component: &'static str,
        /// The attribute that was requested.
        name: String,
    },

    /// The attribute exists but the supplied value is not acceptable.
    #[error("invalid value for attribute '{name}': {reason}")]
    InvalidAttribute {
        /// The attribute being set.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A port was driven or read with a value of the wrong width.
    #[error("width mismatch: expected {expected}, got {got}")]
    WidthMismatch {
        /// The width the end expects.
        expected: BitWidth,
        /// The width that was supplied.
        got: BitWidth,
    },

    /// The component does not support the requested operation.
    #[error("unsupported: {reason}")]
    Unsupported {
        /// Description of the unsupported operation.
        reason: String,
    },
}

/// Mutable per-instance state owned by a component, stored in the
/// simulation state tree rather than in the component itself.
///
/// Components are immutable and shared; anything that changes during
/// simulation (register contents, pin values, clock phase) lives in a
/// `ComponentData` slot keyed by the component's ID.
pub trait ComponentData: Any + Send + fmt::Debug {
    /// Clones the state for simulation checkpoints.
    fn clone_box(&self) -> Box<dyn ComponentData>;

    /// Upcast for downcasting to the concrete state type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete state type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn ComponentData> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// The simulation's view of one component instance, passed to
/// [`Component::propagate`].
///
/// Reading a port sees the resolved net value at the end's location;
/// driving a port schedules a future event rather than writing the net
/// directly.
pub trait InstanceState {
    /// The resolved value on the net at end `index`.
    fn port_value(&self, index: usize) -> Value;

    /// Schedules the component to drive `value` at end `index` after
    /// `delay` time steps. A delay of zero is floored to one.
    fn set_port(&mut self, index: usize, value: Value, delay: u32);

    /// The component's state slot, if one has been created.
    fn data(&self) -> Option<&dyn ComponentData>;

    /// Mutable access to the component's state slot.
    fn data_mut(&mut self) -> Option<&mut dyn ComponentData>;

    /// Installs (or replaces) the component's state slot.
    fn set_data(&mut self, data: Box<dyn ComponentData>);

    /// Flags that this component's externally visible output changed.
    /// Output pins call this so an enclosing subcircuit instance gets
    /// re-propagated; at the root it has no effect.
    fn notify_parent(&mut self) {}
}

/// A placeable circuit element.
///
/// Components are immutable once constructed. Attribute edits produce a
/// replacement object that a transaction swaps in under the same
/// [`ComponentId`](crate::ComponentId), so the rest of the circuit never
/// observes a half-edited component.
pub trait Component: Send + Sync + fmt::Debug {
    /// A stable name for the component's type, used to decide whether
    /// state can migrate from a replaced component to its replacement.
    fn type_name(&self) -> &'static str;

    /// The component's anchor location.
    fn location(&self) -> Location;

    /// The component's connection points.
    fn ends(&self) -> Vec<End>;

    /// Recomputes outputs from the current inputs, scheduling any
    /// changed drives through the instance state.
    fn propagate(&self, state: &mut dyn InstanceState) -> Result<(), ComponentError>;

    /// Reads an attribute, or `None` if the component has no attribute
    /// by that name.
    fn attr(&self, _name: &str) -> Option<AttrValue> {
        None
    }

    /// Builds a copy of this component with one attribute replaced.
    fn with_attr(
        &self,
        name: &str,
        _value: &AttrValue,
    ) -> Result<Arc<dyn Component>, ComponentError> {
        Err(ComponentError::UnknownAttribute {
            component: self.type_name(),
            name: name.to_owned(),
        })
    }

    /// Advances the component for a clock tick. Returns `true` when the
    /// tick changed the component's drive and propagation is needed.
    fn tick(&self, _state: &mut dyn InstanceState, _ticks: u64) -> bool {
        false
    }

    /// Forces an externally supplied value onto the component, as when
    /// the user pokes a pin. Returns `true` when the value changed.
    fn set_external(&self, _state: &mut dyn InstanceState, _value: Value) -> bool {
        false
    }

    /// `true` for components driven by the tick source.
    fn is_clock(&self) -> bool {
        false
    }

    /// For pin components, the pin's direction and width.
    fn pin_info(&self) -> Option<PinInfo> {
        None
    }

    /// Downcast used by connectivity resolution.
    fn as_splitter(&self) -> Option<&Splitter> {
        None
    }

    /// Downcast used by connectivity resolution.
    fn as_tunnel(&self) -> Option<&Tunnel> {
        None
    }

    /// Downcast used by connectivity resolution.
    fn as_pull(&self) -> Option<&PullResistor> {
        None
    }

    /// Downcast used by hierarchical simulation.
    fn as_subcircuit(&self) -> Option<&SubcircuitInstance> {
        None
    }
}

/// Direction and width of a pin component, as seen from the circuit
/// that contains the pin.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PinInfo {
    /// `true` when the pin feeds a value into its circuit.
    pub is_input: bool,
    /// The pin's width.
    pub width: BitWidth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_kind_classification() {
        assert!(EndKind::Input.is_input());
        assert!(!EndKind::Input.is_output());
        assert!(EndKind::Output.is_output());
        assert!(!EndKind::Output.is_input());
        assert!(EndKind::Bidirectional.is_input());
        assert!(EndKind::Bidirectional.is_output());
    }

    #[test]
    fn end_constructors() {
        let e = End::input(Location::new(10, 20), BitWidth::ONE);
        assert_eq!(e.kind, EndKind::Input);
        assert_eq!(e.width, Some(BitWidth::ONE));
        assert_eq!(e.location, Location::new(10, 20));
    }
}
