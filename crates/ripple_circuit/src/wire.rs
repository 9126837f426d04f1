//! Axis-parallel wire segments.

use ripple_common::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised when constructing a [`Wire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The two endpoints differ in both coordinates.
    #[error("wire from {0} to {1} is not axis-parallel")]
    NotAxisParallel(Location, Location),

    /// The two endpoints coincide.
    #[error("wire at {0} has zero length")]
    ZeroLength(Location),
}

/// A horizontal or vertical wire segment.
///
/// Endpoints are stored in canonical order (`e0 < e1` in canvas order), so
/// two wires covering the same segment compare equal. Only a wire's
/// endpoints connect to other wires and component ends; a point in the
/// interior of a segment is electrically isolated from it, which is why
/// wire repair splits segments at junctions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Wire {
    e0: Location,
    e1: Location,
}

impl Wire {
    /// Creates a wire between two points, rejecting diagonal and
    /// zero-length segments.
    pub fn new(a: Location, b: Location) -> Result<Self, WireError> {
        if a == b {
            return Err(WireError::ZeroLength(a));
        }
        if a.x != b.x && a.y != b.y {
            return Err(WireError::NotAxisParallel(a, b));
        }
        let (e0, e1) = if a < b { (a, b) } else { (b, a) };
        Ok(Wire { e0, e1 })
    }

    /// The first endpoint in canvas order.
    pub fn end0(self) -> Location {
        self.e0
    }

    /// The second endpoint in canvas order.
    pub fn end1(self) -> Location {
        self.e1
    }

    /// `true` for vertical segments.
    pub fn is_vertical(self) -> bool {
        self.e0.x == self.e1.x
    }

    /// The wire's length in grid units.
    pub fn length(self) -> u32 {
        self.e0.manhattan_distance(self.e1)
    }

    /// `true` when `loc` lies on the segment, endpoints included.
    pub fn contains(self, loc: Location) -> bool {
        if self.is_vertical() {
            loc.x == self.e0.x && (self.e0.y..=self.e1.y).contains(&loc.y)
        } else {
            loc.y == self.e0.y && (self.e0.x..=self.e1.x).contains(&loc.x)
        }
    }

    /// `true` when `loc` lies strictly inside the segment.
    pub fn contains_interior(self, loc: Location) -> bool {
        self.contains(loc) && loc != self.e0 && loc != self.e1
    }

    /// `true` when `loc` is one of the two endpoints.
    pub fn ends_at(self, loc: Location) -> bool {
        loc == self.e0 || loc == self.e1
    }

    /// Given one endpoint, the other.
    pub fn other_end(self, loc: Location) -> Option<Location> {
        if loc == self.e0 {
            Some(self.e1)
        } else if loc == self.e1 {
            Some(self.e0)
        } else {
            None
        }
    }

    /// `true` when the two wires share an endpoint.
    pub fn shares_end(self, other: Wire) -> bool {
        other.ends_at(self.e0) || other.ends_at(self.e1)
    }

    /// `true` when the two wires share an orientation.
    pub fn is_parallel(self, other: Wire) -> bool {
        self.is_vertical() == other.is_vertical()
    }

    /// `true` when the two wires lie on the same line and their
    /// segments share at least one point.
    pub fn overlaps(self, other: Wire) -> bool {
        if !self.is_parallel(other) {
            return false;
        }
        let same_line = if self.is_vertical() {
            self.e0.x == other.e0.x
        } else {
            self.e0.y == other.e0.y
        };
        same_line
            && (self.contains(other.e0)
                || self.contains(other.e1)
                || other.contains(self.e0))
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.e0, self.e1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(x: i32, y: i32) -> Location {
        Location::new(x, y)
    }

    #[test]
    fn construction_validates() {
        assert!(Wire::new(loc(0, 0), loc(10, 0)).is_ok());
        assert!(Wire::new(loc(0, 0), loc(0, 10)).is_ok());
        assert_eq!(
            Wire::new(loc(0, 0), loc(0, 0)),
            Err(WireError::ZeroLength(loc(0, 0)))
        );
        assert_eq!(
            Wire::new(loc(0, 0), loc(5, 5)),
            Err(WireError::NotAxisParallel(loc(0, 0), loc(5, 5)))
        );
    }

    #[test]
    fn endpoints_are_canonical() {
        let a = Wire::new(loc(10, 0), loc(0, 0)).unwrap();
        let b = Wire::new(loc(0, 0), loc(10, 0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.end0(), loc(0, 0));
        assert_eq!(a.end1(), loc(10, 0));
    }

    #[test]
    fn containment() {
        let w = Wire::new(loc(0, 0), loc(30, 0)).unwrap();
        assert!(w.contains(loc(0, 0)));
        assert!(w.contains(loc(15, 0)));
        assert!(w.contains(loc(30, 0)));
        assert!(!w.contains(loc(31, 0)));
        assert!(!w.contains(loc(15, 1)));
        assert!(w.contains_interior(loc(15, 0)));
        assert!(!w.contains_interior(loc(0, 0)));
    }

    #[test]
    fn overlap_detection() {
        let a = Wire::new(loc(0, 0), loc(20, 0)).unwrap();
        let b = Wire::new(loc(10, 0), loc(30, 0)).unwrap();
        let c = Wire::new(loc(20, 0), loc(40, 0)).unwrap();
        let d = Wire::new(loc(25, 0), loc(40, 0)).unwrap();
        let v = Wire::new(loc(10, -5), loc(10, 5)).unwrap();
        assert!(a.overlaps(b));
        assert!(a.overlaps(c)); // touching endpoints overlap
        assert!(!a.overlaps(d));
        assert!(!a.overlaps(v)); // perpendicular never overlaps
        let parallel = Wire::new(loc(0, 1), loc(20, 1)).unwrap();
        assert!(!a.overlaps(parallel));
        assert!(a.is_parallel(parallel));
        assert!(!a.is_parallel(v));
    }

    #[test]
    fn other_end() {
        let w = Wire::new(loc(0, 0), loc(0, 10)).unwrap();
        assert_eq!(w.other_end(loc(0, 0)), Some(loc(0, 10)));
        assert_eq!(w.other_end(loc(0, 10)), Some(loc(0, 0)));
        assert_eq!(w.other_end(loc(0, 5)), None);
    }
}
