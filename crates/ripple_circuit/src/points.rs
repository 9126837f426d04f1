//! Location index over component ends and wire endpoints.

use crate::circuit::CircuitInner;
use crate::component::End;
use crate::ids::ComponentId;
use ripple_common::Location;
use std::collections::{BTreeMap, BTreeSet};

/// One component end, tagged with the component it belongs to.
#[derive(Clone, Debug)]
pub struct EndRef {
    /// The owning component.
    pub component: ComponentId,
    /// The end's index in the component's end list.
    pub index: usize,
    /// The end itself.
    pub end: End,
}

/// An index from canvas locations to everything that touches them.
///
/// Built from a structure snapshot; connectivity resolution and wire
/// repair both iterate it instead of re-scanning the component list.
#[derive(Debug, Default)]
pub struct PointIndex {
    ends: BTreeMap<Location, Vec<EndRef>>,
    wire_ends: BTreeSet<Location>,
}

impl PointIndex {
    /// Builds the index from a circuit's current structure.
    pub fn build(inner: &CircuitInner) -> Self {
        let mut index = PointIndex::default();
        for (&id, component) in inner.components() {
            for (i, end) in component.ends().into_iter().enumerate() {
                index.ends.entry(end.location).or_default().push(EndRef {
                    component: id,
                    index: i,
                    end,
                });
            }
        }
        for wire in inner.wires() {
            index.wire_ends.insert(wire.end0());
            index.wire_ends.insert(wire.end1());
        }
        index
    }

    /// The component ends at `loc`.
    pub fn ends_at(&self, loc: Location) -> &[EndRef] {
        self.ends.get(&loc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `true` when some wire ends at `loc`.
    pub fn has_wire_end(&self, loc: Location) -> bool {
        self.wire_ends.contains(&loc)
    }

    /// Every location where a component end sits.
    pub fn end_locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.ends.keys().copied()
    }

    /// Every location where a wire ends.
    pub fn wire_end_locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.wire_ends.iter().copied()
    }

    /// All locations of interest: component ends and wire endpoints,
    /// deduplicated, in canvas order.
    pub fn all_locations(&self) -> Vec<Location> {
        let mut locs: BTreeSet<Location> = self.ends.keys().copied().collect();
        locs.extend(self.wire_ends.iter().copied());
        locs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitInner;
    use crate::splitter::Splitter;
    use crate::wire::Wire;
    use ripple_common::BitWidth;
    use std::sync::Arc;

    fn loc(x: i32, y: i32) -> Location {
        Location::new(x, y)
    }

    fn sample_inner() -> CircuitInner {
        let mut inner = CircuitInner::default();
        let id = inner.alloc_component_id();
        let splitter = Splitter::new(loc(0, 0), BitWidth::new(4).unwrap(), 2).unwrap();
        inner.insert_component(id, Arc::new(splitter));
        inner
            .insert_wire(Wire::new(loc(0, 0), loc(-20, 0)).unwrap())
            .unwrap();
        inner
    }

    #[test]
    fn indexes_ends_and_wire_endpoints() {
        let inner = sample_inner();
        let index = PointIndex::build(&inner);
        assert_eq!(index.ends_at(loc(0, 0)).len(), 1); // splitter combined end
        assert!(index.has_wire_end(loc(0, 0)));
        assert!(index.has_wire_end(loc(-20, 0)));
        assert!(!index.has_wire_end(loc(5, 0)));
        // Combined end plus two split ends.
        assert_eq!(index.end_locations().count(), 3);
    }

    #[test]
    fn all_locations_deduplicates() {
        let inner = sample_inner();
        let index = PointIndex::build(&inner);
        let locs = index.all_locations();
        // 3 end locations + 1 extra wire endpoint; (0,0) appears once.
        assert_eq!(locs.len(), 4);
        assert_eq!(locs.iter().filter(|&&l| l == loc(0, 0)).count(), 1);
    }
}
