//! # EDM Controller Core Firmware
//!
//! The real-time control plane of a multi-axis EDM machine:
//!
//! - **[`system`]**: the global machine-state/cancel-flag facade.
//! - **[`comm`]**: structured console output and the command reader.
//! - **[`motor`]**: the 30 µs step engine for up to seven motors.
//! - **[`onewire`]**: the shared blocking bus over the bit-banged
//!   single-wire UART.
//! - **[`pulser`]**: pulser polling, snapshot, and sample log.
//! - **[`motion`]**: the 1 ms motion tick glue around the motion engine.
//! - **[`wirefeed`]**: the wire-feed auxiliary axis.
//! - **[`settings`]**: the RAM-seeded key/value store with hardware push.
//! - **[`gcode`]**: the G/M-code dispatcher.
//! - **[`commands`]**: console command handlers.
//! - **[`app`]**: machine assembly, boot sequence, and the main loop.
//!
//! ## Concurrency
//!
//! Three execution contexts, modelled as threads: a high-priority console
//! reader (cancel flag + single-slot command queue), the main task (command
//! dispatch and blocking completion waits), and the periodic tick contexts
//! (step engine + single-wire bus at 30 µs, motion/pulser/wirefeed at
//! 1 ms, with the pulser's I²C burst delegated to a worker). Shared state
//! crosses contexts through small typed facades with one writer per field.

pub mod app;
pub mod comm;
pub mod commands;
pub mod gcode;
pub mod hal;
pub mod motion;
pub mod motor;
pub mod onewire;
pub mod pulser;
pub mod settings;
pub mod system;
pub mod wirefeed;

pub use app::{Hardware, Machine, Timing};
pub use hal::{PulserPort, StepDirPins, TmcPort};
