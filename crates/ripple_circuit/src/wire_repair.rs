//! Canonicalizes wire geometry after a structural edit.
//!
//! Only a wire's endpoints connect to anything, so geometry and
//! connectivity must agree: a component end sitting in the interior of
//! a segment would be isolated, and two collinear segments meeting at a
//! bare point are really one wire. Repair recomputes the canonical
//! segmentation of each axis line: overlapping and touching collinear
//! wires merge into maximal runs, which are then cut at every junction,
//! where a junction is a component end or an endpoint of a wire on a
//! different line. Transactions apply the resulting removals and
//! additions as ordinary primitive changes inside the same lock scope,
//! so repair shows up in the undo log like any other edit.

use crate::circuit::CircuitInner;
use crate::points::PointIndex;
use crate::wire::Wire;
use ripple_common::Location;
use std::collections::{BTreeMap, BTreeSet};

/// The wire removals and additions that canonicalize a circuit's
/// geometry. Empty when the geometry is already canonical.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WireRepairPlan {
    /// Wires to remove.
    pub removals: Vec<Wire>,
    /// Wires to add.
    pub additions: Vec<Wire>,
}

impl WireRepairPlan {
    /// `true` when no repair is needed.
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty()
    }
}

/// Axis line a wire lies on: vertical at `x` or horizontal at `y`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Line {
    Vertical(i32),
    Horizontal(i32),
}

impl Line {
    fn of(wire: Wire) -> Self {
        if wire.is_vertical() {
            Line::Vertical(wire.end0().x)
        } else {
            Line::Horizontal(wire.end0().y)
        }
    }

    fn span(self, wire: Wire) -> (i32, i32) {
        match self {
            Line::Vertical(_) => (wire.end0().y, wire.end1().y),
            Line::Horizontal(_) => (wire.end0().x, wire.end1().x),
        }
    }

    fn on_line(self, loc: Location) -> Option<i32> {
        match self {
            Line::Vertical(x) if loc.x == x => Some(loc.y),
            Line::Horizontal(y) if loc.y == y => Some(loc.x),
            _ => None,
        }
    }

    fn wire(self, a: i32, b: i32) -> Option<Wire> {
        let (p, q) = match self {
            Line::Vertical(x) => (Location::new(x, a), Location::new(x, b)),
            Line::Horizontal(y) => (Location::new(a, y), Location::new(b, y)),
        };
        Wire::new(p, q).ok()
    }
}

/// Computes the repair plan for the circuit's current structure.
pub fn plan_repair(inner: &CircuitInner) -> WireRepairPlan {
    let index = PointIndex::build(inner);

    let mut groups: BTreeMap<Line, BTreeSet<Wire>> = BTreeMap::new();
    for &wire in inner.wires() {
        groups.entry(Line::of(wire)).or_default().insert(wire);
    }

    let end_locations: Vec<Location> = index.end_locations().collect();
    let mut plan = WireRepairPlan::default();
    for (&line, wires) in &groups {
        // Junctions cutting this line: component ends plus endpoints of
        // wires on other lines.
        let mut cuts: BTreeSet<i32> = end_locations
            .iter()
            .filter_map(|&l| line.on_line(l))
            .collect();
        for (&other_line, other_wires) in &groups {
            if other_line == line {
                continue;
            }
            for w in other_wires {
                cuts.extend(line.on_line(w.end0()));
                cuts.extend(line.on_line(w.end1()));
            }
        }

        // Merge covered spans into maximal runs. Spans are sorted by
        // start because the wire set is ordered.
        let mut runs: Vec<(i32, i32)> = Vec::new();
        for &wire in wires {
            let (a, b) = line.span(wire);
            match runs.last_mut() {
                Some((_, end)) if a <= *end => *end = (*end).max(b),
                _ => runs.push((a, b)),
            }
        }

        // Cut each run at interior junctions.
        let mut canonical: BTreeSet<Wire> = BTreeSet::new();
        for (a, b) in runs {
            let mut boundaries = vec![a];
            boundaries.extend(cuts.range((a + 1)..b));
            boundaries.push(b);
            for pair in boundaries.windows(2) {
                canonical.extend(line.wire(pair[0], pair[1]));
            }
        }

        plan.removals.extend(wires.difference(&canonical));
        plan.additions.extend(canonical.difference(wires));
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitInner;
    use crate::component::{Component, ComponentError, End, InstanceState};
    use std::sync::Arc;

    fn loc(x: i32, y: i32) -> Location {
        Location::new(x, y)
    }

    fn wire(a: Location, b: Location) -> Wire {
        Wire::new(a, b).unwrap()
    }

    #[derive(Debug)]
    struct Stub {
        end: End,
    }

    impl Component for Stub {
        fn type_name(&self) -> &'static str {
            "stub"
        }

        fn location(&self) -> Location {
            self.end.location
        }

        fn ends(&self) -> Vec<End> {
            vec![self.end]
        }

        fn propagate(&self, _state: &mut dyn InstanceState) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    fn add_stub(inner: &mut CircuitInner, at: Location) {
        let id = inner.alloc_component_id();
        inner.insert_component(
            id,
            Arc::new(Stub {
                end: End::input(at, ripple_common::BitWidth::ONE),
            }),
        );
    }

    #[test]
    fn canonical_geometry_needs_no_repair() {
        let mut inner = CircuitInner::default();
        inner.insert_wire(wire(loc(0, 0), loc(20, 0))).unwrap();
        inner.insert_wire(wire(loc(0, 10), loc(0, 30))).unwrap();
        assert!(plan_repair(&inner).is_empty());
    }

    #[test]
    fn touching_collinear_wires_merge() {
        let mut inner = CircuitInner::default();
        inner.insert_wire(wire(loc(0, 0), loc(20, 0))).unwrap();
        inner.insert_wire(wire(loc(20, 0), loc(40, 0))).unwrap();
        let plan = plan_repair(&inner);
        assert_eq!(plan.removals.len(), 2);
        assert_eq!(plan.additions, vec![wire(loc(0, 0), loc(40, 0))]);
    }

    #[test]
    fn overlapping_wires_merge() {
        let mut inner = CircuitInner::default();
        inner.insert_wire(wire(loc(0, 0), loc(30, 0))).unwrap();
        inner.insert_wire(wire(loc(10, 0), loc(50, 0))).unwrap();
        let plan = plan_repair(&inner);
        assert_eq!(plan.additions, vec![wire(loc(0, 0), loc(50, 0))]);
    }

    #[test]
    fn component_end_in_interior_splits() {
        let mut inner = CircuitInner::default();
        inner.insert_wire(wire(loc(0, 0), loc(40, 0))).unwrap();
        add_stub(&mut inner, loc(20, 0));
        let plan = plan_repair(&inner);
        assert_eq!(plan.removals, vec![wire(loc(0, 0), loc(40, 0))]);
        assert_eq!(
            plan.additions,
            vec![wire(loc(0, 0), loc(20, 0)), wire(loc(20, 0), loc(40, 0))]
        );
    }

    #[test]
    fn perpendicular_endpoint_splits() {
        let mut inner = CircuitInner::default();
        inner.insert_wire(wire(loc(0, 0), loc(40, 0))).unwrap();
        inner.insert_wire(wire(loc(20, 0), loc(20, 30))).unwrap();
        let plan = plan_repair(&inner);
        assert!(plan.removals.contains(&wire(loc(0, 0), loc(40, 0))));
        assert!(plan.additions.contains(&wire(loc(0, 0), loc(20, 0))));
        assert!(plan.additions.contains(&wire(loc(20, 0), loc(40, 0))));
        // The vertical wire itself is untouched.
        assert!(!plan.removals.contains(&wire(loc(20, 0), loc(20, 30))));
    }

    #[test]
    fn merge_stops_at_junctions() {
        // Two collinear wires touch where a component end sits; the
        // junction keeps them split.
        let mut inner = CircuitInner::default();
        inner.insert_wire(wire(loc(0, 0), loc(20, 0))).unwrap();
        inner.insert_wire(wire(loc(20, 0), loc(40, 0))).unwrap();
        add_stub(&mut inner, loc(20, 0));
        assert!(plan_repair(&inner).is_empty());
    }

    #[test]
    fn component_end_at_wire_endpoint_does_not_split() {
        let mut inner = CircuitInner::default();
        inner.insert_wire(wire(loc(0, 0), loc(40, 0))).unwrap();
        add_stub(&mut inner, loc(40, 0));
        assert!(plan_repair(&inner).is_empty());
    }
}
