//! Four-state signal bits with truth-table-based operators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A single 4-state signal value.
///
/// The four states represent:
/// - `Zero` — logic low (driven 0)
/// - `One` — logic high (driven 1)
/// - `Floating` — undriven (high-impedance)
/// - `Error` — conflicting drivers or an undefined gate result
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Bit {
    /// Logic low (0).
    Zero = 0,
    /// Logic high (1).
    One = 1,
    /// Undriven (high-impedance).
    Floating = 2,
    /// Conflicting or undefined.
    Error = 3,
}

impl Bit {
    /// Converts a character to a [`Bit`] value.
    ///
    /// Accepts '0', '1', 'x'/'X' (floating), and 'e'/'E' (error).
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Bit::Zero),
            '1' => Some(Bit::One),
            'x' | 'X' => Some(Bit::Floating),
            'e' | 'E' => Some(Bit::Error),
            _ => None,
        }
    }

    /// Returns `true` for `Zero` and `One`.
    pub fn is_defined(self) -> bool {
        matches!(self, Bit::Zero | Bit::One)
    }

    /// Resolves two simultaneous drivers of the same point.
    ///
    /// Truth table:
    /// ```text
    ///     0  1  x  E
    /// 0 | 0  E  0  E
    /// 1 | E  1  1  E
    /// x | 0  1  x  E
    /// E | E  E  E  E
    /// ```
    /// Commutative, associative, and idempotent; `Floating` is the
    /// identity, `Error` is absorbing, and disagreement yields `Error`.
    pub fn combine(self, other: Bit) -> Bit {
        use Bit::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Floating, b) => b,
            (a, Floating) => a,
            _ => Error,
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bit::Zero => write!(f, "0"),
            Bit::One => write!(f, "1"),
            Bit::Floating => write!(f, "x"),
            Bit::Error => write!(f, "E"),
        }
    }
}

/// Gate AND truth table:
/// ```text
///     0  1  x  E
/// 0 | 0  0  0  0
/// 1 | 0  1  E  E
/// x | 0  E  E  E
/// E | 0  E  E  E
/// ```
/// A floating input to a gate is an error, not a weak value.
impl BitAnd for Bit {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Bit::*;
        match (self, rhs) {
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            _ => Error,
        }
    }
}

/// Gate OR truth table:
/// ```text
///     0  1  x  E
/// 0 | 0  1  E  E
/// 1 | 1  1  1  1
/// x | E  1  E  E
/// E | E  1  E  E
/// ```
impl BitOr for Bit {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use Bit::*;
        match (self, rhs) {
            (One, _) | (_, One) => One,
            (Zero, Zero) => Zero,
            _ => Error,
        }
    }
}

/// Gate XOR: defined inputs give the exclusive-or, anything else is `Error`.
impl BitXor for Bit {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        use Bit::*;
        match (self, rhs) {
            (Zero, Zero) | (One, One) => Zero,
            (Zero, One) | (One, Zero) => One,
            _ => Error,
        }
    }
}

/// Gate NOT: `!0 = 1`, `!1 = 0`, floating and error invert to `Error`.
impl Not for Bit {
    type Output = Self;

    fn not(self) -> Self {
        use Bit::*;
        match self {
            Zero => One,
            One => Zero,
            Floating | Error => Error,
        }
    }
}
