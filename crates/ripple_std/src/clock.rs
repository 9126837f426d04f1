//! The clock component, toggled by the simulation's tick source.

use ripple_circuit::{Component, ComponentData, ComponentError, End, InstanceState};
use ripple_common::{Bit, BitWidth, Location, Value};
use std::any::Any;

/// The clock's current phase.
#[derive(Clone, Copy, Debug)]
pub struct ClockData {
    phase: Bit,
}

impl ClockData {
    /// The phase the clock is driving.
    pub fn phase(&self) -> Bit {
        self.phase
    }
}

impl ComponentData for ClockData {
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

/// A free-running clock.
///
/// The clock drives low until the first tick and toggles on every tick
/// thereafter. Poking a clock forces its phase directly, which is how
/// the user single-steps a design by hand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Clock {
    location: Location,
}

impl Clock {
    /// A clock driving the net at `location`.
    pub fn new(location: Location) -> Self {
        Clock { location }
    }

    fn phase(state: &dyn InstanceState) -> Bit {
        state
            .data()
            .and_then(|d| d.as_any().downcast_ref::<ClockData>())
            .map(|d| d.phase)
            .unwrap_or(Bit::Zero)
    }
}

impl Component for Clock {
    fn type_name(&self) -> &'static str {
        "clock"
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        vec![End::output(self.location, BitWidth::ONE)]
    }

    fn propagate(&self, state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        let phase = Clock::phase(state);
        state.set_port(0, Value::single(phase), 1);
        Ok(())
    }

    fn tick(&self, state: &mut dyn InstanceState, _ticks: u64) -> bool {
        let next = match Clock::phase(state) {
            Bit::One => Bit::Zero,
            _ => Bit::One,
        };
        state.set_data(Box::new(ClockData { phase: next }));
        true
    }

    fn set_external(&self, state: &mut dyn InstanceState, value: Value) -> bool {
        let forced = value.get(0);
        if Clock::phase(state) == forced {
            return false;
        }
        state.set_data(Box::new(ClockData { phase: forced }));
        true
    }

    fn is_clock(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Bench;

    #[test]
    fn clock_starts_low_and_toggles() {
        let clock = Clock::new(Location::new(0, 0));
        let mut bench = Bench::default();
        clock.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::Zero)));

        assert!(clock.tick(&mut bench, 1));
        clock.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::One)));

        assert!(clock.tick(&mut bench, 2));
        clock.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::Zero)));
    }

    #[test]
    fn poking_forces_the_phase() {
        let clock = Clock::new(Location::new(0, 0));
        let mut bench = Bench::default();
        assert!(clock.set_external(&mut bench, Value::single(Bit::One)));
        assert!(!clock.set_external(&mut bench, Value::single(Bit::One)));
        clock.propagate(&mut bench).unwrap();
        assert_eq!(bench.last_drive(0), Some(Value::single(Bit::One)));
    }
}
