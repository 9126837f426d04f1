//! Subcircuit instances embed one circuit inside another.

use crate::circuit::Circuit;
use crate::component::{Component, ComponentError, End, EndKind, InstanceState, PinInfo};
use crate::ids::ComponentId;
use ripple_common::Location;
use std::sync::Arc;

/// A component that stands for another circuit.
///
/// The instance's ends mirror the child circuit's pins in component-ID
/// order: input pins appear on the west edge (the parent feeds them),
/// output pins on the east edge (they drive the parent's net). Ends are
/// derived from the child's current structure on every call, so editing
/// the child's pins reshapes every instance without touching the
/// parents.
#[derive(Clone, Debug)]
pub struct SubcircuitInstance {
    location: Location,
    circuit: Arc<Circuit>,
}

impl SubcircuitInstance {
    /// Creates an instance of `circuit` anchored at `location`.
    pub fn new(location: Location, circuit: Arc<Circuit>) -> Self {
        SubcircuitInstance { location, circuit }
    }

    /// The circuit this instance embeds.
    pub fn circuit(&self) -> &Arc<Circuit> {
        &self.circuit
    }

    /// The child circuit's pins in component-ID order, paired with
    /// their direction and width.
    pub fn pins(&self) -> Vec<(ComponentId, PinInfo)> {
        let inner = self.circuit.read();
        inner
            .components()
            .iter()
            .filter_map(|(&id, c)| c.pin_info().map(|info| (id, info)))
            .collect()
    }

    /// The parent-side end location for the pin at `index` within
    /// [`Self::pins`].
    pub fn pin_end_location(&self, index: usize) -> Location {
        let pins = self.pins();
        let mut inputs = 0usize;
        let mut outputs = 0usize;
        for (i, (_, info)) in pins.iter().enumerate() {
            if i == index {
                return if info.is_input {
                    self.location.translate(0, inputs as i32 * 10)
                } else {
                    self.location.translate(30, outputs as i32 * 10)
                };
            }
            if info.is_input {
                inputs += 1;
            } else {
                outputs += 1;
            }
        }
        self.location
    }
}

impl Component for SubcircuitInstance {
    fn type_name(&self) -> &'static str {
        "subcircuit"
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        self.pins()
            .iter()
            .enumerate()
            .map(|(i, (_, info))| End {
                location: self.pin_end_location(i),
                width: Some(info.width),
                kind: if info.is_input {
                    EndKind::Input
                } else {
                    EndKind::Output
                },
            })
            .collect()
    }

    fn propagate(&self, _state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        // The simulator walks into the child state tree instead.
        Ok(())
    }

    fn as_subcircuit(&self) -> Option<&SubcircuitInstance> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::ids::CircuitId;
    use ripple_common::{BitWidth, Location};

    /// A stand-in pin component for structure tests.
    #[derive(Debug)]
    struct TestPin {
        at: Location,
        info: PinInfo,
    }

    impl Component for TestPin {
        fn type_name(&self) -> &'static str {
            "pin"
        }

        fn location(&self) -> Location {
            self.at
        }

        fn ends(&self) -> Vec<End> {
            vec![End {
                location: self.at,
                width: Some(self.info.width),
                kind: if self.info.is_input {
                    EndKind::Output
                } else {
                    EndKind::Input
                },
            }]
        }

        fn propagate(&self, _state: &mut dyn InstanceState) -> Result<(), ComponentError> {
            Ok(())
        }

        fn pin_info(&self) -> Option<PinInfo> {
            Some(self.info)
        }
    }

    fn child_with_pins() -> Arc<Circuit> {
        let child = Circuit::new(CircuitId::from_raw(0), "child");
        let _guard = child.lock().acquire("setup");
        let mut inner = child.write().unwrap();
        for (i, is_input) in [(0, true), (1, true), (2, false)] {
            let id = inner.alloc_component_id();
            inner.insert_component(
                id,
                Arc::new(TestPin {
                    at: Location::new(i * 20, 0),
                    info: PinInfo {
                        is_input,
                        width: BitWidth::ONE,
                    },
                }),
            );
        }
        drop(inner);
        drop(_guard);
        child
    }

    #[test]
    fn ends_mirror_child_pins() {
        let inst = SubcircuitInstance::new(Location::new(100, 100), child_with_pins());
        let ends = inst.ends();
        assert_eq!(ends.len(), 3);
        assert_eq!(ends[0].kind, EndKind::Input);
        assert_eq!(ends[1].kind, EndKind::Input);
        assert_eq!(ends[2].kind, EndKind::Output);
        // Inputs stack on the west edge, outputs on the east.
        assert_eq!(ends[0].location, Location::new(100, 100));
        assert_eq!(ends[1].location, Location::new(100, 110));
        assert_eq!(ends[2].location, Location::new(130, 100));
    }

    #[test]
    fn pins_are_in_id_order() {
        let inst = SubcircuitInstance::new(Location::new(0, 0), child_with_pins());
        let pins = inst.pins();
        assert_eq!(pins.len(), 3);
        assert!(pins.windows(2).all(|p| p[0].0 < p[1].0));
    }
}
