//! Validated bit widths.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The largest width a single [`crate::Value`] can carry.
pub const MAX_WIDTH: u8 = 64;

/// A validated signal width, always in `1..=64`.
///
/// Ends that have not yet determined their width use `Option<BitWidth>`
/// rather than a sentinel value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BitWidth(u8);

/// Raised when constructing a [`BitWidth`] outside `1..=64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bit width {0} out of range 1..=64")]
pub struct WidthError(pub u8);

impl BitWidth {
    /// The one-bit width.
    pub const ONE: BitWidth = BitWidth(1);

    /// Creates a width, rejecting values outside `1..=64`.
    pub fn new(bits: u8) -> Result<Self, WidthError> {
        if (1..=MAX_WIDTH).contains(&bits) {
            Ok(BitWidth(bits))
        } else {
            Err(WidthError(bits))
        }
    }

    /// The width in bits.
    pub fn get(self) -> u8 {
        self.0
    }

    /// A mask with the low `self.get()` bits set.
    pub fn mask(self) -> u64 {
        if self.0 == 64 {
            u64::MAX
        } else {
            (1u64 << self.0) - 1
        }
    }
}

impl TryFrom<u8> for BitWidth {
    type Error = WidthError;

    fn try_from(bits: u8) -> Result<Self, WidthError> {
        BitWidth::new(bits)
    }
}

impl From<BitWidth> for u8 {
    fn from(w: BitWidth) -> u8 {
        w.0
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_validation() {
        assert!(BitWidth::new(0).is_err());
        assert!(BitWidth::new(1).is_ok());
        assert!(BitWidth::new(64).is_ok());
        assert!(BitWidth::new(65).is_err());
    }

    #[test]
    fn masks() {
        assert_eq!(BitWidth::ONE.mask(), 1);
        assert_eq!(BitWidth::new(8).unwrap().mask(), 0xFF);
        assert_eq!(BitWidth::new(64).unwrap().mask(), u64::MAX);
    }

    #[test]
    fn serde_round_trip() {
        let w = BitWidth::new(16).unwrap();
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, "16");
        let back: BitWidth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
        assert!(serde_json::from_str::<BitWidth>("0").is_err());
        assert!(serde_json::from_str::<BitWidth>("90").is_err());
    }
}
