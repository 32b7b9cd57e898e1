//! The process-wide state machine and cancel flag.
//!
//! Every other component reads the machine mode through this facade; only
//! the main loop writes it. The cancel flag is set from the reader context
//! and polled by the motion tick, the wirefeed tick, and the step test.

use edm_proto::Mode;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Shared machine state: mode plus cancel flag.
#[derive(Debug, Default)]
pub struct SystemState {
    mode: AtomicU8,
    cancel: AtomicBool,
}

impl SystemState {
    pub fn new() -> Self {
        Self {
            mode: AtomicU8::new(Mode::Idle as u8),
            cancel: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    /// Requests cancellation of the operation in progress. Safe from any
    /// context; observed on the next poll.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Clears the flag once the command finishes.
    pub fn clear_cancel(&self) {
        self.cancel.store(false, Ordering::Release);
    }
}
