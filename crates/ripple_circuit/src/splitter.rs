//! Splitters fan a multi-bit bus out into narrower ends.

use crate::component::{Component, ComponentError, End, EndKind, InstanceState};
use ripple_common::{BitWidth, Location};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A splitter between one combined bus end and several split ends.
///
/// `bit_end[i]` names which split end carries bit `i` of the combined
/// bus: `0` leaves the bit unconnected, `j >= 1` routes it to split end
/// `j`. Several bits may share a split end; a bit's position within its
/// end is the count of lower-numbered bits routed to the same end. The
/// splitter has no propagation behavior of its own. Connectivity
/// resolution joins the wire threads on either side, so values flow
/// through it in both directions with no delay.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Splitter {
    location: Location,
    incoming: BitWidth,
    fanout: u8,
    bit_end: Vec<u8>,
}

impl Splitter {
    /// Creates a splitter with bits distributed evenly across the split
    /// ends, low bits to low ends, the way a freshly placed splitter is
    /// configured.
    pub fn new(location: Location, incoming: BitWidth, fanout: u8) -> Result<Self, ComponentError> {
        if fanout == 0 {
            return Err(ComponentError::InvalidAttribute {
                name: "fanout".to_owned(),
                reason: "a splitter needs at least one split end".to_owned(),
            });
        }
        let bits = incoming.get() as usize;
        let fan = fanout as usize;
        let per_end = bits / fan;
        let extra = bits % fan;
        let mut bit_end = Vec::with_capacity(bits);
        for (j, chunk) in (0..fan)
            .map(|j| per_end + usize::from(j < extra))
            .enumerate()
        {
            for _ in 0..chunk {
                bit_end.push(j as u8 + 1);
            }
        }
        Ok(Splitter {
            location,
            incoming,
            fanout,
            bit_end,
        })
    }

    /// Replaces the bit assignment. Entries must be `0` (unconnected) or
    /// `1..=fanout`, one per incoming bit.
    pub fn with_bit_end(mut self, bit_end: Vec<u8>) -> Result<Self, ComponentError> {
        if bit_end.len() != self.incoming.get() as usize {
            return Err(ComponentError::InvalidAttribute {
                name: "bit_end".to_owned(),
                reason: format!(
                    "expected {} entries, got {}",
                    self.incoming.get(),
                    bit_end.len()
                ),
            });
        }
        if let Some(&bad) = bit_end.iter().find(|&&e| e > self.fanout) {
            return Err(ComponentError::InvalidAttribute {
                name: "bit_end".to_owned(),
                reason: format!("end {bad} exceeds fanout {}", self.fanout),
            });
        }
        self.bit_end = bit_end;
        Ok(self)
    }

    /// The combined bus width.
    pub fn incoming_width(&self) -> BitWidth {
        self.incoming
    }

    /// The number of split ends.
    pub fn fanout(&self) -> u8 {
        self.fanout
    }

    /// Which split end (1-based) carries combined bit `bit`, or `None`
    /// when the bit is unconnected.
    pub fn end_of_bit(&self, bit: u8) -> Option<u8> {
        match self.bit_end.get(bit as usize) {
            Some(0) | None => None,
            Some(&e) => Some(e),
        }
    }

    /// The position of combined bit `bit` within its split end.
    pub fn position_of_bit(&self, bit: u8) -> Option<u8> {
        let end = self.end_of_bit(bit)?;
        let pos = self.bit_end[..bit as usize]
            .iter()
            .filter(|&&e| e == end)
            .count();
        Some(pos as u8)
    }

    /// The width of split end `end` (1-based), or `None` when no bit is
    /// routed there.
    pub fn end_width(&self, end: u8) -> Option<BitWidth> {
        let count = self.bit_end.iter().filter(|&&e| e == end).count();
        BitWidth::new(count as u8).ok()
    }

    /// The canvas location of split end `end` (1-based).
    pub fn end_location(&self, end: u8) -> Location {
        self.location.translate(20, end as i32 * 10)
    }
}

impl Component for Splitter {
    fn type_name(&self) -> &'static str {
        "splitter"
    }

    fn location(&self) -> Location {
        self.location
    }

    fn ends(&self) -> Vec<End> {
        let mut ends = vec![End {
            location: self.location,
            width: Some(self.incoming),
            kind: EndKind::Bidirectional,
        }];
        for end in 1..=self.fanout {
            ends.push(End {
                location: self.end_location(end),
                width: self.end_width(end),
                kind: EndKind::Bidirectional,
            });
        }
        ends
    }

    fn propagate(&self, _state: &mut dyn InstanceState) -> Result<(), ComponentError> {
        // Values pass through at the wire level via thread unions.
        Ok(())
    }

    fn as_splitter(&self) -> Option<&Splitter> {
        Some(self)
    }
}

/// Convenience constructor returning the trait object form.
pub fn splitter(
    location: Location,
    incoming: BitWidth,
    fanout: u8,
) -> Result<Arc<dyn Component>, ComponentError> {
    Ok(Arc::new(Splitter::new(location, incoming, fanout)?))
}
