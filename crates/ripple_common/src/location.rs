//! Grid coordinates on the circuit canvas.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the circuit grid.
///
/// Ordering is y-major (top to bottom, then left to right), which
/// gives wire endpoints and component ends a stable canvas order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Location {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Location {
    /// Creates a location.
    pub fn new(x: i32, y: i32) -> Self {
        Location { x, y }
    }

    /// This location offset by `(dx, dy)`.
    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Location {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Manhattan distance to `other`.
    pub fn manhattan_distance(self, other: Location) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}
