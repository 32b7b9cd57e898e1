//! A `no_std` driver for Trinamic TMC stepper motor drivers.
//!
//! This crate provides register-level access to a TMC2209 over the shared
//! bit-banged single-wire UART bus, plus the STEP/DIR/EN/DIAG pin helpers
//! used by the step generation engine. It is built on `embedded-hal` traits
//! and can be tested with `embedded-hal-mock` or scripted fakes.
//!
//! ## Structure
//!
//! - **[`datagram`]**: request/reply framing with CRC-8 (polynomial 0x07).
//! - **[`registers`]**: register addresses and bit fields.
//! - **[`tmc2209`]**: the register driver with microstep / current /
//!   StallGuard convenience wrappers.
//! - **[`pins`]**: the discrete STEP/DIR/EN/DIAG pin bundle.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod datagram;
pub mod pins;
pub mod registers;
pub mod tmc2209;

pub use pins::MotorPins;
pub use tmc2209::{Tmc2209, TmcUart};

/// Represents errors that can occur while interacting with a TMC driver.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// An error occurred on the single-wire bus (busy, timeout, ...).
    Bus(E),
    /// The CRC checksum of a reply datagram was invalid.
    InvalidCrc,
    /// A reply carried an unexpected master address or register echo.
    WrongReply,
    /// A parameter was outside the register's accepted range.
    InvalidParam,
}
