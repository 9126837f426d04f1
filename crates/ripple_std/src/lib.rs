//! The built-in component library.
//!
//! Everything here implements [`ripple_circuit::Component`] and is
//! meant to be installed into circuits through transactions. Wiring
//! infrastructure (splitters, tunnels, pull resistors) lives in
//! `ripple_circuit` itself because connectivity resolution inspects it.

#![warn(missing_docs)]

pub mod clock;
pub mod constant;
pub mod gates;
pub mod pin;
pub mod register;

#[cfg(test)]
mod testutil;

pub use clock::{Clock, ClockData};
pub use constant::Constant;
pub use gates::{Gate, GateKind, NotGate};
pub use pin::{Pin, PinData};
pub use register::{Register, RegisterData};
