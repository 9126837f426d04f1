//! Shared foundational types for the Ripple circuit simulator.
//!
//! This crate defines the 4-state signal model ([`Bit`] and the packed
//! multi-bit [`Value`]), validated bit widths, canvas locations, and
//! interned identifiers. Everything here is plain data with no
//! dependency on circuit structure or simulation state, so the higher
//! crates can share these types freely across threads.

#![warn(missing_docs)]

pub mod bit;
pub mod ident;
pub mod location;
pub mod value;
pub mod width;

pub use bit::Bit;
pub use ident::{Ident, Interner};
pub use location::Location;
pub use value::Value;
pub use width::{BitWidth, WidthError, MAX_WIDTH};
