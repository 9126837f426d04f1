//! The simulation event queue.

use ripple_circuit::ComponentId;
use ripple_common::{Location, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

/// The path from the root simulation state to a nested substate: the
/// subcircuit instance IDs walked, outermost first. The empty path is
/// the root.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct StatePath(Vec<ComponentId>);

impl StatePath {
    /// The root path.
    pub fn root() -> Self {
        StatePath(Vec::new())
    }

    /// `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// This path extended by one subcircuit instance.
    pub fn child(&self, instance: ComponentId) -> Self {
        let mut segments = self.0.clone();
        segments.push(instance);
        StatePath(segments)
    }

    /// The instance IDs from the root down.
    pub fn segments(&self) -> &[ComponentId] {
        &self.0
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for id in &self.0 {
            write!(f, "/{}", id.as_raw())?;
        }
        Ok(())
    }
}

/// A scheduled drive: at `time`, `cause` drives `value` onto the net
/// at `location` within the state named by `path`.
#[derive(Clone, Debug)]
pub struct SimEvent {
    /// When the drive takes effect.
    pub time: u64,
    /// Tie-breaker preserving scheduling order within a time step.
    pub serial: u64,
    /// Which state in the tree the drive lands in.
    pub path: StatePath,
    /// The driven point.
    pub location: Location,
    /// The driving component.
    pub cause: ComponentId,
    /// The driven value.
    pub value: Value,
}

impl PartialEq for SimEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.serial == other.serial
    }
}

impl Eq for SimEvent {}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.time, self.serial).cmp(&(other.time, other.serial))
    }
}

/// Min-heap of pending drives, ordered by time then scheduling order.
///
/// Two events at the same time pop in the order they were scheduled,
/// so propagation is deterministic regardless of hash-map iteration or
/// thread timing.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<SimEvent>>,
    next_serial: u64,
    clock: u64,
}

impl EventQueue {
    /// An empty queue at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current simulation time.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Schedules a drive `delay` steps from now. A zero delay is
    /// floored to one so a component never observes its own output
    /// within the step that computed it.
    pub fn schedule(
        &mut self,
        delay: u32,
        path: StatePath,
        location: Location,
        cause: ComponentId,
        value: Value,
    ) {
        let time = self.clock + u64::from(delay.max(1));
        let serial = self.next_serial;
        self.next_serial += 1;
        self.heap.push(Reverse(SimEvent {
            time,
            serial,
            path,
            location,
            cause,
            value,
        }));
    }

    /// The time of the earliest pending event.
    pub fn next_time(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(e)| e.time)
    }

    /// Advances the clock.
    pub fn advance_to(&mut self, time: u64) {
        debug_assert!(time >= self.clock);
        self.clock = time;
    }

    /// Pops the earliest event if it is due at `time`.
    pub fn pop_due(&mut self, time: u64) -> Option<SimEvent> {
        if self.heap.peek().is_some_and(|Reverse(e)| e.time <= time) {
            self.heap.pop().map(|Reverse(e)| e)
        } else {
            None
        }
    }

    /// `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Discards all pending events. The clock keeps its value so a
    /// later `schedule` still lands in the future.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_common::Bit;

    fn event_args(x: i32) -> (StatePath, Location, ComponentId, Value) {
        (
            StatePath::root(),
            Location::new(x, 0),
            ComponentId::from_raw(0),
            Value::single(Bit::One),
        )
    }

    #[test]
    fn pops_in_time_order() {
        let mut queue = EventQueue::new();
        let (path, loc, cause, value) = event_args(0);
        queue.schedule(5, path.clone(), loc, cause, value);
        queue.schedule(1, path.clone(), loc, cause, value);
        queue.schedule(3, path, loc, cause, value);
        assert_eq!(queue.next_time(), Some(1));
        let mut times = Vec::new();
        while let Some(t) = queue.next_time() {
            queue.advance_to(t);
            while let Some(e) = queue.pop_due(t) {
                times.push(e.time);
            }
        }
        assert_eq!(times, vec![1, 3, 5]);
    }

    #[test]
    fn same_time_pops_in_schedule_order() {
        let mut queue = EventQueue::new();
        for x in 0..10 {
            let (path, loc, cause, value) = event_args(x);
            queue.schedule(1, path, loc, cause, value);
        }
        let mut xs = Vec::new();
        while let Some(e) = queue.pop_due(1) {
            xs.push(e.location.x);
        }
        assert_eq!(xs, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn zero_delay_floors_to_one() {
        let mut queue = EventQueue::new();
        queue.advance_to(0);
        let (path, loc, cause, value) = event_args(0);
        queue.schedule(0, path, loc, cause, value);
        assert_eq!(queue.next_time(), Some(1));
    }

    #[test]
    fn delays_are_relative_to_the_clock() {
        let mut queue = EventQueue::new();
        queue.advance_to(100);
        let (path, loc, cause, value) = event_args(0);
        queue.schedule(2, path, loc, cause, value);
        assert_eq!(queue.next_time(), Some(102));
    }

    #[test]
    fn clear_keeps_clock() {
        let mut queue = EventQueue::new();
        let (path, loc, cause, value) = event_args(0);
        queue.schedule(1, path, loc, cause, value);
        queue.advance_to(1);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.clock(), 1);
    }

    #[test]
    fn state_paths_nest() {
        let root = StatePath::root();
        assert!(root.is_root());
        let inner = root.child(ComponentId::from_raw(3));
        let deeper = inner.child(ComponentId::from_raw(5));
        assert!(!deeper.is_root());
        assert_eq!(deeper.segments().len(), 2);
        assert_eq!(deeper.to_string(), "/3/5");
        assert_eq!(root.to_string(), "/");
    }
}
