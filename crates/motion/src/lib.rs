//! # Motion Control Crate
//!
//! Deterministic motion primitives for the EDM controller, usable on both
//! host and MCU (`no_std`-friendly).
//!
//! Provides the core of the 1 ms control loop:
//! - Physical / driver coordinate types ([`PhysPos`], [`DrvPos`])
//! - A two-segment [`PathBuffer`] with discrete-notch traversal and a
//!   bounded retraction history
//! - The [`MotionEngine`] tick: termination predicates, adaptive EDM feed,
//!   homing-offset management, physical-to-driver mapping
//!
//! The engine is a pure state machine: every tick receives its inputs
//! (cancel flag, stall levels, discharge ratios, driver step counters)
//! explicitly and returns the new driver target, which makes the whole
//! control law unit-testable without hardware.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod engine;
pub mod errors;
pub mod path;
pub mod pos;

// Re-export core types for easier access
pub use engine::{
    MotionEngine, MotionState, MoveKind, StopReason, TickInputs, EDM_ADVANCE_MM, EDM_RETRACT_MM,
    MAX_TRAVEL_MM, VELOCITY_MM_PER_S,
};
pub use errors::PathError;
pub use path::{PathBuffer, HISTORY_LEN, NOTCH_MM};
pub use pos::{DrvPos, PhysPos, AXIS_COUNT};
