//! Multi-bit signal values packed into per-state masks.

use crate::{Bit, BitWidth};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A multi-bit signal value of up to 64 bits.
///
/// Each bit position is in one of the four [`Bit`] states. The states
/// are stored as three packed masks with a canonical precedence: a bit
/// flagged in `error` is `Error` regardless of the other masks, a bit
/// flagged in `floating` (and not in `error`) is `Floating`, and
/// otherwise the bit is defined by `bits`. Constructors normalize the
/// masks so equal values compare equal bitwise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(from = "RawValue")]
pub struct Value {
    width: BitWidth,
    error: u64,
    floating: u64,
    bits: u64,
}

/// The wire form of [`Value`], renormalized through [`Value::create`]
/// on the way in so no deserialized value can violate the mask
/// precedence invariant.
#[derive(Deserialize)]
struct RawValue {
    width: BitWidth,
    error: u64,
    floating: u64,
    bits: u64,
}

impl From<RawValue> for Value {
    fn from(raw: RawValue) -> Value {
        Value::create(raw.width, raw.error, raw.floating, raw.bits)
    }
}

impl Value {
    /// Builds a value from raw masks, normalizing per the precedence
    /// `error > floating > defined` and masking to the width.
    pub fn create(width: BitWidth, error: u64, floating: u64, bits: u64) -> Self {
        let mask = width.mask();
        let error = error & mask;
        let floating = floating & mask & !error;
        let bits = bits & mask & !floating & !error;
        Value {
            width,
            error,
            floating,
            bits,
        }
    }

    /// An all-floating value of the given width.
    pub fn floating(width: BitWidth) -> Self {
        Value::create(width, 0, u64::MAX, 0)
    }

    /// An all-error value of the given width.
    pub fn error_value(width: BitWidth) -> Self {
        Value::create(width, u64::MAX, 0, 0)
    }

    /// A fully defined value holding the low `width` bits of `bits`.
    pub fn known(width: BitWidth, bits: u64) -> Self {
        Value::create(width, 0, 0, bits)
    }

    /// A one-bit value.
    pub fn single(bit: Bit) -> Self {
        Value::repeat(BitWidth::ONE, bit)
    }

    /// A value with every bit position in the same state.
    pub fn repeat(width: BitWidth, bit: Bit) -> Self {
        match bit {
            Bit::Zero => Value::known(width, 0),
            Bit::One => Value::known(width, u64::MAX),
            Bit::Floating => Value::floating(width),
            Bit::Error => Value::error_value(width),
        }
    }

    /// Builds a value bit by bit, least significant first.
    ///
    /// Returns `None` for an empty or over-long slice.
    pub fn from_bits(bits: &[Bit]) -> Option<Self> {
        let width = BitWidth::new(u8::try_from(bits.len()).ok()?).ok()?;
        let mut v = Value::known(width, 0);
        for (i, &b) in bits.iter().enumerate() {
            v = v.set(i as u8, b);
        }
        Some(v)
    }

    /// The value's width.
    pub fn width(self) -> BitWidth {
        self.width
    }

    /// The state of bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width().get()`.
    pub fn get(self, index: u8) -> Bit {
        assert!(index < self.width.get(), "bit index out of range");
        let m = 1u64 << index;
        if self.error & m != 0 {
            Bit::Error
        } else if self.floating & m != 0 {
            Bit::Floating
        } else if self.bits & m != 0 {
            Bit::One
        } else {
            Bit::Zero
        }
    }

    /// A copy of this value with bit `index` replaced.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width().get()`.
    pub fn set(self, index: u8, bit: Bit) -> Self {
        assert!(index < self.width.get(), "bit index out of range");
        let m = 1u64 << index;
        let (error, floating, bits) = match bit {
            Bit::Zero => (self.error & !m, self.floating & !m, self.bits & !m),
            Bit::One => (self.error & !m, self.floating & !m, self.bits | m),
            Bit::Floating => (self.error & !m, self.floating | m, self.bits & !m),
            Bit::Error => (self.error | m, self.floating & !m, self.bits & !m),
        };
        Value::create(self.width, error, floating, bits)
    }

    /// The bits as a vector, least significant first.
    pub fn to_bits(self) -> Vec<Bit> {
        (0..self.width.get()).map(|i| self.get(i)).collect()
    }

    /// `true` when every bit is `Zero` or `One`.
    pub fn is_fully_defined(self) -> bool {
        self.error == 0 && self.floating == 0
    }

    /// `true` when any bit is `Error`.
    pub fn is_error(self) -> bool {
        self.error != 0
    }

    /// `true` when every bit is `Floating`.
    pub fn is_floating(self) -> bool {
        self.error == 0 && self.floating == self.width.mask()
    }

    /// The defined bits as an integer, or `None` if any bit is
    /// floating or error.
    pub fn to_u64(self) -> Option<u64> {
        if self.is_fully_defined() {
            Some(self.bits)
        } else {
            None
        }
    }

    /// Resolves two drivers of the same point, bitwise per
    /// [`Bit::combine`].
    ///
    /// When the widths differ the result takes the larger width; bit
    /// positions covered by only one operand keep that operand's state,
    /// positions covered by neither are floating. Same-width combine is
    /// commutative, associative, and idempotent.
    pub fn combine(self, other: Value) -> Value {
        if self.width == other.width {
            let defined1 = self.width.mask() & !self.error & !self.floating;
            let defined2 = other.width.mask() & !other.error & !other.floating;
            let disagree = (self.bits ^ other.bits) & defined1 & defined2;
            Value::create(
                self.width,
                self.error | other.error | disagree,
                self.floating & other.floating,
                self.bits | other.bits,
            )
        } else {
            let width = self.width.max(other.width);
            let mut out = Value::floating(width);
            for i in 0..width.get() {
                let a = if i < self.width.get() {
                    self.get(i)
                } else {
                    Bit::Floating
                };
                let b = if i < other.width.get() {
                    other.get(i)
                } else {
                    Bit::Floating
                };
                out = out.set(i, a.combine(b));
            }
            out
        }
    }

    /// Replaces each floating bit with `pull`; defined and error bits
    /// are unchanged.
    pub fn pull_each_bit_towards(self, pull: Bit) -> Value {
        if self.floating == 0 {
            return self;
        }
        match pull {
            Bit::Floating => self,
            Bit::Zero => Value::create(self.width, self.error, 0, self.bits),
            Bit::One => Value::create(self.width, self.error, 0, self.bits | self.floating),
            Bit::Error => Value::create(self.width, self.error | self.floating, 0, self.bits),
        }
    }

    /// Bitwise AND per the gate truth table: a `Zero` on either side
    /// wins, otherwise a floating or error input poisons the bit.
    pub fn and_bits(self, other: Value) -> Value {
        self.zip_bits(other, |a, b| a & b)
    }

    /// Bitwise OR per the gate truth table.
    pub fn or_bits(self, other: Value) -> Value {
        self.zip_bits(other, |a, b| a | b)
    }

    /// Bitwise XOR per the gate truth table.
    pub fn xor_bits(self, other: Value) -> Value {
        self.zip_bits(other, |a, b| a ^ b)
    }

    /// Bitwise NOT; floating and error bits invert to error.
    pub fn not_bits(self) -> Value {
        Value::create(
            self.width,
            self.error | self.floating,
            0,
            !self.bits & !self.error & !self.floating,
        )
    }

    fn zip_bits(self, other: Value, f: impl Fn(Bit, Bit) -> Bit) -> Value {
        let width = self.width.max(other.width);
        let mut out = Value::known(width, 0);
        for i in 0..width.get() {
            let a = if i < self.width.get() {
                self.get(i)
            } else {
                Bit::Zero
            };
            let b = if i < other.width.get() {
                other.get(i)
            } else {
                Bit::Zero
            };
            out = out.set(i, f(a, b));
        }
        out
    }
}

impl From<Bit> for Value {
    fn from(bit: Bit) -> Value {
        Value::single(bit)
    }
}

impl fmt::Display for Value {
    /// Binary rendering, most significant bit first, with a space
    /// every four bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.width.get();
        for i in (0..w).rev() {
            write!(f, "{}", self.get(i))?;
            if i != 0 && i % 4 == 0 {
                write!(f, " ")?;
            }
        }
        Ok(())
    }
}
