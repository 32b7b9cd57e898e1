//! Pulser control: polling pump, latest-snapshot cache, and sample log.
//!
//! The 1 ms timer must not perform I²C, so it only pokes a work channel;
//! a worker thread runs the burst read and publishes the result. The
//! snapshot is stored byte-per-byte in atomics (tearing between bytes is
//! tolerated because each is interpreted independently), and every poll is
//! appended to the bounded sample ring for later upload.

use crate::hal::{PulserPort, PulserPortError};
use driver_pulser::{Sample, SampleRing};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Capacity of the discharge sample log (~10 s of 1 ms polls).
pub const SAMPLE_RING_CAPACITY: usize = 10_000;

/// Pulser board control and shared discharge statistics.
pub struct PulserCtl {
    port: Mutex<Box<dyn PulserPort>>,
    ring: Mutex<SampleRing<SAMPLE_RING_CAPACITY>>,
    n_pulse: AtomicU8,
    r_pulse: AtomicU8,
    r_short: AtomicU8,
    r_open: AtomicU8,
    poll_count: AtomicU32,
}

impl PulserCtl {
    pub fn new(port: Box<dyn PulserPort>) -> Self {
        Self {
            port: Mutex::new(port),
            ring: Mutex::new(SampleRing::new()),
            n_pulse: AtomicU8::new(0),
            r_pulse: AtomicU8::new(0),
            r_short: AtomicU8::new(0),
            r_open: AtomicU8::new(0),
            poll_count: AtomicU32::new(0),
        }
    }

    /// One poll cycle (worker context): burst read, snapshot update, ring
    /// append.
    pub fn poll_once(&self) {
        let sample = match self.port.lock().poll() {
            Ok(sample) => sample,
            Err(e) => {
                tracing::debug!(error = %e, "pulser poll failed");
                return;
            }
        };
        self.n_pulse.store(sample.n_pulse, Ordering::Relaxed);
        self.r_pulse.store(sample.r_pulse, Ordering::Relaxed);
        self.r_short.store(sample.r_short, Ordering::Relaxed);
        self.r_open.store(sample.r_open, Ordering::Relaxed);
        self.poll_count.fetch_add(1, Ordering::Relaxed);

        self.ring.lock().push(&sample);
    }

    pub fn energize(
        &self,
        negative: bool,
        pulse_us: f32,
        current_a: f32,
        duty_pct: f32,
    ) -> Result<(), PulserPortError> {
        self.port
            .lock()
            .energize(negative, pulse_us, current_a, duty_pct)
    }

    pub fn deenergize(&self) -> Result<(), PulserPortError> {
        self.port.lock().deenergize()
    }

    pub fn temperature(&self) -> Result<u8, PulserPortError> {
        self.port.lock().temperature()
    }

    /// Latest snapshot as one [`Sample`].
    pub fn snapshot(&self) -> Sample {
        Sample {
            n_pulse: self.n_pulse.load(Ordering::Relaxed),
            r_pulse: self.r_pulse.load(Ordering::Relaxed),
            r_short: self.r_short.load(Ordering::Relaxed),
            r_open: self.r_open.load(Ordering::Relaxed),
        }
    }

    pub fn short_rate(&self) -> u8 {
        self.r_short.load(Ordering::Relaxed)
    }

    pub fn open_rate(&self) -> u8 {
        self.r_open.load(Ordering::Relaxed)
    }

    pub fn has_discharge(&self) -> bool {
        self.r_pulse.load(Ordering::Relaxed) > 0 || self.r_short.load(Ordering::Relaxed) > 0
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_count.load(Ordering::Relaxed)
    }

    pub fn sample_count(&self) -> usize {
        self.ring.lock().len()
    }

    pub const fn sample_capacity(&self) -> usize {
        SAMPLE_RING_CAPACITY
    }

    /// Copies the whole sample log into a packed byte vector. The ring's
    /// copying flag suppresses poll writes while the snapshot is taken.
    pub fn copy_log(&self) -> Vec<u8> {
        let ring = self.ring.lock();
        ring.begin_copy();
        let mut out = vec![0u8; ring.len() * driver_pulser::ring::ENTRY_SIZE];
        let written = ring.copy_to(&mut out);
        out.truncate(written);
        ring.end_copy();
        out
    }

    /// Discards the sample log.
    pub fn clear_log(&self) {
        self.ring.lock().clear();
    }
}
