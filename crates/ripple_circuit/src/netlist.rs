//! Connectivity resolution: wires, tunnels, and splitters into bundles
//! and threads.
//!
//! A *bundle* is a maximal set of canvas points joined by wire segments
//! and same-label tunnels; every point of a bundle carries the same
//! multi-bit value. A *thread* is one bit of connectivity. Within a
//! bundle, bit `i` belongs to thread `i`; splitters join threads across
//! bundles, so a single thread can span buses of different widths. The
//! resolver never rejects a circuit: width conflicts mark the affected
//! bundle invalid and are reported as [`WidthIncompatibility`] records
//! for the UI to display.
//!
//! A [`Connectivity`] is an immutable snapshot built from the circuit
//! structure. Transactions void the cached snapshot; the next reader
//! rebuilds it wholesale, which keeps the resolver free of incremental
//! invalidation bugs at the cost of a full pass per edit.

use crate::circuit::CircuitInner;
use crate::component::Component;
use crate::ids::{BundleId, ComponentId, WireThreadId};
use crate::points::PointIndex;
use petgraph::unionfind::UnionFind;
use ripple_common::{Bit, BitWidth, Ident, Location};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A point where ends of differing widths meet.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WidthIncompatibility {
    /// A representative location on the conflicted bundle.
    pub location: Location,
    /// The conflicting widths, ascending.
    pub widths: Vec<BitWidth>,
}

/// A maximal wire-connected set of points.
#[derive(Debug)]
pub struct Bundle {
    width: Option<BitWidth>,
    valid: bool,
    pull: Bit,
    locations: Vec<Location>,
    threads: Vec<WireThreadId>,
}

impl Bundle {
    /// The bundle's width: the agreed width of its ends, the widest
    /// observed width when conflicted, or `None` when no end with a
    /// known width touches it.
    pub fn width(&self) -> Option<BitWidth> {
        self.width
    }

    /// `false` when ends of differing widths meet on this bundle.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The combined pull of resistors on this bundle, `Floating` when
    /// there are none.
    pub fn pull(&self) -> Bit {
        self.pull
    }

    /// Every point of the bundle, in canvas order.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// The thread carrying each bit, low bit first. Empty when the
    /// bundle is invalid or width-less.
    pub fn threads(&self) -> &[WireThreadId] {
        &self.threads
    }
}

/// An immutable connectivity snapshot for one circuit.
#[derive(Debug)]
pub struct Connectivity {
    bundles: Vec<Bundle>,
    bundle_at: HashMap<Location, BundleId>,
    thread_members: Vec<Vec<(BundleId, u8)>>,
    thread_pull: Vec<Bit>,
    bundle_sinks: Vec<Vec<ComponentId>>,
    incompatibilities: Vec<WidthIncompatibility>,
}

impl Connectivity {
    /// Resolves the given structure into bundles and threads.
    pub fn build(inner: &CircuitInner) -> Self {
        let index = PointIndex::build(inner);
        let locations = index.all_locations();
        let loc_index: HashMap<Location, usize> = locations
            .iter()
            .enumerate()
            .map(|(i, &l)| (l, i))
            .collect();

        // Union points joined by wires.
        let mut points: UnionFind<usize> = UnionFind::new(locations.len());
        for wire in inner.wires() {
            points.union(loc_index[&wire.end0()], loc_index[&wire.end1()]);
        }

        // Union points joined by same-label tunnels.
        let mut tunnel_groups: BTreeMap<Ident, Vec<usize>> = BTreeMap::new();
        for component in inner.components().values() {
            if let Some(tunnel) = component.as_tunnel() {
                tunnel_groups
                    .entry(tunnel.label())
                    .or_default()
                    .push(loc_index[&component.location()]);
            }
        }
        for group in tunnel_groups.values() {
            for window in group.windows(2) {
                points.union(window[0], window[1]);
            }
        }

        // Assign bundle IDs in canvas order of first appearance.
        let mut bundle_of_root: HashMap<usize, BundleId> = HashMap::new();
        let mut bundle_at: HashMap<Location, BundleId> = HashMap::new();
        let mut bundle_locations: Vec<Vec<Location>> = Vec::new();
        for (i, &loc) in locations.iter().enumerate() {
            let root = points.find(i);
            let id = *bundle_of_root.entry(root).or_insert_with(|| {
                bundle_locations.push(Vec::new());
                BundleId::from_raw(bundle_locations.len() as u32 - 1)
            });
            bundle_at.insert(loc, id);
            bundle_locations[id.as_raw() as usize].push(loc);
        }
        let bundle_count = bundle_locations.len();

        // Determine widths and detect conflicts.
        let mut widths_seen: Vec<BTreeSet<BitWidth>> = vec![BTreeSet::new(); bundle_count];
        let mut pulls: Vec<Bit> = vec![Bit::Floating; bundle_count];
        let mut sinks: Vec<Vec<ComponentId>> = vec![Vec::new(); bundle_count];
        for &loc in &locations {
            let bundle = bundle_at[&loc].as_raw() as usize;
            for end_ref in index.ends_at(loc) {
                if let Some(w) = end_ref.end.width {
                    widths_seen[bundle].insert(w);
                }
            }
        }
        for (&id, component) in inner.components() {
            if let Some(pull) = component.as_pull() {
                let bundle = bundle_at[&component.location()].as_raw() as usize;
                pulls[bundle] = pulls[bundle].combine(pull.pull());
            }
            if component.as_splitter().is_some()
                || component.as_tunnel().is_some()
                || component.as_pull().is_some()
            {
                continue;
            }
            for end in component.ends() {
                if end.kind.is_input() {
                    let bundle = bundle_at[&end.location].as_raw() as usize;
                    if !sinks[bundle].contains(&id) {
                        sinks[bundle].push(id);
                    }
                }
            }
        }

        let mut incompatibilities = Vec::new();
        let mut bundles: Vec<Bundle> = Vec::new();
        for (i, seen) in widths_seen.iter().enumerate() {
            let valid = seen.len() <= 1;
            if !valid {
                incompatibilities.push(WidthIncompatibility {
                    location: bundle_locations[i][0],
                    widths: seen.iter().copied().collect(),
                });
            }
            bundles.push(Bundle {
                width: seen.iter().next_back().copied(),
                valid,
                pull: pulls[i],
                locations: std::mem::take(&mut bundle_locations[i]),
                threads: Vec::new(),
            });
        }

        // Allocate one thread slot per bit of each valid bundle, then
        // union slots across splitters.
        let mut slot_base: Vec<Option<usize>> = Vec::with_capacity(bundle_count);
        let mut slot_count = 0usize;
        for bundle in &bundles {
            if bundle.valid {
                if let Some(w) = bundle.width {
                    slot_base.push(Some(slot_count));
                    slot_count += w.get() as usize;
                    continue;
                }
            }
            slot_base.push(None);
        }
        let mut threads: UnionFind<usize> = UnionFind::new(slot_count);
        for component in inner.components().values() {
            let Some(splitter) = component.as_splitter() else {
                continue;
            };
            let ends = splitter.ends();
            let combined = bundle_at[&ends[0].location].as_raw() as usize;
            for bit in 0..splitter.incoming_width().get() {
                let (Some(end), Some(pos)) =
                    (splitter.end_of_bit(bit), splitter.position_of_bit(bit))
                else {
                    continue;
                };
                let split = bundle_at[&splitter.end_location(end)].as_raw() as usize;
                let (Some(b0), Some(b1)) = (slot_base[combined], slot_base[split]) else {
                    continue;
                };
                // A conflicted or width-less side leaves the other
                // side's threads untouched.
                let in_range = |b: usize, i: u8| {
                    bundles[b].width.is_some_and(|w| i < w.get())
                };
                if in_range(combined, bit) && in_range(split, pos) {
                    threads.union(b0 + bit as usize, b1 + pos as usize);
                }
            }
        }

        // Compact thread roots to dense IDs and fill reverse indexes.
        let mut thread_of_root: HashMap<usize, WireThreadId> = HashMap::new();
        let mut thread_members: Vec<Vec<(BundleId, u8)>> = Vec::new();
        let mut thread_pull: Vec<Bit> = Vec::new();
        for (i, bundle) in bundles.iter_mut().enumerate() {
            let Some(base) = slot_base[i] else { continue };
            let width = match bundle.width {
                Some(w) => w.get(),
                None => continue,
            };
            for bit in 0..width {
                let root = threads.find(base + bit as usize);
                let tid = *thread_of_root.entry(root).or_insert_with(|| {
                    thread_members.push(Vec::new());
                    thread_pull.push(Bit::Floating);
                    WireThreadId::from_raw(thread_members.len() as u32 - 1)
                });
                let t = tid.as_raw() as usize;
                thread_members[t].push((BundleId::from_raw(i as u32), bit));
                thread_pull[t] = thread_pull[t].combine(bundle.pull);
                bundle.threads.push(tid);
            }
        }

        Connectivity {
            bundles,
            bundle_at,
            thread_members,
            thread_pull,
            bundle_sinks: sinks,
            incompatibilities,
        }
    }

    /// The bundle containing `loc`, if any end or wire touches it.
    pub fn bundle_at(&self, loc: Location) -> Option<BundleId> {
        self.bundle_at.get(&loc).copied()
    }

    /// A bundle by ID.
    pub fn bundle(&self, id: BundleId) -> &Bundle {
        &self.bundles[id.as_raw() as usize]
    }

    /// All bundles with their IDs.
    pub fn bundles(&self) -> impl Iterator<Item = (BundleId, &Bundle)> {
        self.bundles
            .iter()
            .enumerate()
            .map(|(i, b)| (BundleId::from_raw(i as u32), b))
    }

    /// The thread carrying bit `bit` at `loc`.
    pub fn thread_at(&self, loc: Location, bit: u8) -> Option<WireThreadId> {
        let bundle = self.bundle(self.bundle_at(loc)?);
        bundle.threads.get(bit as usize).copied()
    }

    /// Every (bundle, bit position) pair a thread runs through.
    pub fn thread_members(&self, thread: WireThreadId) -> &[(BundleId, u8)] {
        &self.thread_members[thread.as_raw() as usize]
    }

    /// The combined pull of every bundle a thread runs through.
    pub fn thread_pull(&self, thread: WireThreadId) -> Bit {
        self.thread_pull[thread.as_raw() as usize]
    }

    /// The number of distinct threads.
    pub fn thread_count(&self) -> usize {
        self.thread_members.len()
    }

    /// Components that read the net at some point of the bundle.
    pub fn sinks(&self, id: BundleId) -> &[ComponentId] {
        &self.bundle_sinks[id.as_raw() as usize]
    }

    /// Width conflicts found during resolution, in canvas order.
    pub fn incompatibilities(&self) -> &[WidthIncompatibility] {
        &self.incompatibilities
    }

    /// The resolved width at a point.
    pub fn width_at(&self, loc: Location) -> Option<BitWidth> {
        self.bundle_at(loc).and_then(|id| self.bundle(id).width())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitInner;
    use crate::component::{ComponentError, End, InstanceState};
    use crate::splitter::Splitter;
    use crate::wire::Wire;
    use crate::wiring::{PullResistor, Tunnel};
    use ripple_common::Interner;
    use std::sync::Arc;

    fn loc(x: i32, y: i32) -> Location {
        Location::new(x, y)
    }

    fn w(bits: u8) -> BitWidth {
        BitWidth::new(bits).unwrap()
    }

    /// A minimal one-end test component.
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

    fn add(inner: &mut CircuitInner, c: impl Component + 'static) -> ComponentId {
        let id = inner.alloc_component_id();
        inner.insert_component(id, Arc::new(c));
        id
    }

    fn wire(inner: &mut CircuitInner, a: Location, b: Location) {
        inner.insert_wire(Wire::new(a, b).unwrap()).unwrap();
    }

    #[test]
    fn wires_union_into_one_bundle() {
        let mut inner = CircuitInner::default();
        wire(&mut inner, loc(0, 0), loc(20, 0));
        wire(&mut inner, loc(20, 0), loc(20, 20));
        wire(&mut inner, loc(40, 0), loc(60, 0));
        let conn = Connectivity::build(&inner);
        let a = conn.bundle_at(loc(0, 0)).unwrap();
        assert_eq!(conn.bundle_at(loc(20, 20)), Some(a));
        let b = conn.bundle_at(loc(40, 0)).unwrap();
        assert_ne!(a, b);
        assert_eq!(conn.bundle_at(loc(10, 0)), None); // wire interior
    }

    #[test]
    fn tunnels_join_by_label() {
        let interner = Interner::new();
        let clk = interner.get_or_intern("clk");
        let rst = interner.get_or_intern("rst");
        let mut inner = CircuitInner::default();
        add(&mut inner, Tunnel::new(loc(0, 0), w(1), clk));
        add(&mut inner, Tunnel::new(loc(100, 100), w(1), clk));
        add(&mut inner, Tunnel::new(loc(200, 200), w(1), rst));
        let conn = Connectivity::build(&inner);
        assert_eq!(conn.bundle_at(loc(0, 0)), conn.bundle_at(loc(100, 100)));
        assert_ne!(conn.bundle_at(loc(0, 0)), conn.bundle_at(loc(200, 200)));
    }

    #[test]
    fn width_conflict_marks_bundle_invalid() {
        let mut inner = CircuitInner::default();
        add(
            &mut inner,
            Stub {
                end: End::output(loc(0, 0), w(1)),
            },
        );
        add(
            &mut inner,
            Stub {
                end: End::input(loc(20, 0), w(8)),
            },
        );
        wire(&mut inner, loc(0, 0), loc(20, 0));
        let conn = Connectivity::build(&inner);
        let bundle = conn.bundle(conn.bundle_at(loc(0, 0)).unwrap());
        assert!(!bundle.is_valid());
        assert!(bundle.threads().is_empty());
        assert_eq!(conn.incompatibilities().len(), 1);
        assert_eq!(conn.incompatibilities()[0].widths, vec![w(1), w(8)]);
    }

    #[test]
    fn agreeing_widths_allocate_threads() {
        let mut inner = CircuitInner::default();
        add(
            &mut inner,
            Stub {
                end: End::output(loc(0, 0), w(4)),
            },
        );
        add(
            &mut inner,
            Stub {
                end: End::input(loc(20, 0), w(4)),
            },
        );
        wire(&mut inner, loc(0, 0), loc(20, 0));
        let conn = Connectivity::build(&inner);
        let bundle = conn.bundle(conn.bundle_at(loc(0, 0)).unwrap());
        assert!(bundle.is_valid());
        assert_eq!(bundle.threads().len(), 4);
        // Four distinct threads on one bundle.
        let set: std::collections::HashSet<_> = bundle.threads().iter().collect();
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn splitter_joins_threads_across_bundles() {
        let mut inner = CircuitInner::default();
        let splitter = Splitter::new(loc(0, 0), w(4), 2).unwrap();
        let end1 = splitter.end_location(1);
        let end2 = splitter.end_location(2);
        add(&mut inner, splitter);
        wire(&mut inner, loc(0, 0), loc(-20, 0));
        wire(&mut inner, end1, end1.translate(20, 0));
        wire(&mut inner, end2, end2.translate(20, 0));
        let conn = Connectivity::build(&inner);
        // Combined bit 0 and split end 1 position 0 share a thread.
        let t_combined_0 = conn.thread_at(loc(-20, 0), 0).unwrap();
        let t_split1_0 = conn.thread_at(end1, 0).unwrap();
        assert_eq!(t_combined_0, t_split1_0);
        // Combined bit 2 lands on split end 2 position 0.
        let t_combined_2 = conn.thread_at(loc(-20, 0), 2).unwrap();
        let t_split2_0 = conn.thread_at(end2, 0).unwrap();
        assert_eq!(t_combined_2, t_split2_0);
        // Distinct bits stay distinct threads.
        assert_ne!(t_combined_0, t_combined_2);
        // The shared thread spans both bundles.
        let members = conn.thread_members(t_combined_0);
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn splitter_width_conflict_is_contained() {
        // A 2-bit bus wired into the 4-bit side of a splitter conflicts
        // there, but the split ends still resolve.
        let mut inner = CircuitInner::default();
        let splitter = Splitter::new(loc(0, 0), w(4), 2).unwrap();
        let end1 = splitter.end_location(1);
        add(&mut inner, splitter);
        add(
            &mut inner,
            Stub {
                end: End::output(loc(-20, 0), w(2)),
            },
        );
        wire(&mut inner, loc(0, 0), loc(-20, 0));
        wire(&mut inner, end1, end1.translate(20, 0));
        let conn = Connectivity::build(&inner);
        assert_eq!(conn.incompatibilities().len(), 1);
        let combined = conn.bundle(conn.bundle_at(loc(0, 0)).unwrap());
        assert!(!combined.is_valid());
        let split = conn.bundle(conn.bundle_at(end1).unwrap());
        assert!(split.is_valid());
        assert_eq!(split.threads().len(), 2);
    }

    #[test]
    fn pulls_combine_on_a_bundle() {
        let mut inner = CircuitInner::default();
        add(&mut inner, PullResistor::new(loc(0, 0), w(1), Bit::One));
        add(&mut inner, PullResistor::new(loc(20, 0), w(1), Bit::Zero));
        wire(&mut inner, loc(0, 0), loc(20, 0));
        let conn = Connectivity::build(&inner);
        let bundle = conn.bundle(conn.bundle_at(loc(0, 0)).unwrap());
        // Conflicting pulls resolve to an error pull.
        assert_eq!(bundle.pull(), Bit::Error);
        assert_eq!(conn.thread_pull(bundle.threads()[0]), Bit::Error);
    }

    #[test]
    fn sinks_are_reading_components() {
        let mut inner = CircuitInner::default();
        let source = add(
            &mut inner,
            Stub {
                end: End::output(loc(0, 0), w(1)),
            },
        );
        let sink = add(
            &mut inner,
            Stub {
                end: End::input(loc(20, 0), w(1)),
            },
        );
        wire(&mut inner, loc(0, 0), loc(20, 0));
        let conn = Connectivity::build(&inner);
        let id = conn.bundle_at(loc(0, 0)).unwrap();
        assert_eq!(conn.sinks(id), &[sink]);
        assert!(!conn.sinks(id).contains(&source));
    }
}
