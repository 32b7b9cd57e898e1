//! Simulated EDM Controller Hardware
//!
//! Software models of every peripheral the firmware touches, letting the
//! whole control plane run and be integration-tested without a machine:
//!
//! - **[`motor`]**: step/dir/enable/diag pin models that count microsteps
//!   and can assert a stall after a scripted number of steps.
//! - **[`tmc`]**: a register-map TMC device speaking the request/reply
//!   datagram protocol at the byte level, with scriptable corruption.
//! - **[`pulser`]**: an I²C register-map pulser with scripted discharge
//!   ratios and an observable gate.
//! - **[`console`]**: an in-memory byte pipe standing in for the console
//!   UART.
//! - **[`harness`]**: a host-side driver that records a machine-readable
//!   trace of the console conversation.

pub mod console;
pub mod harness;
pub mod motor;
pub mod pulser;
pub mod tmc;

pub use console::{duplex, DeviceConsole, HostConsole};
pub use harness::Harness;
pub use motor::MotorSim;
pub use pulser::PulserSim;
pub use tmc::{InstantDelay, TmcSim};
