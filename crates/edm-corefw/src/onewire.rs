//! The shared blocking bus over the single-wire UART engine.
//!
//! One [`WireEngine`] serves every stepper pin, clocked from the 30 µs tick
//! context. Exactly one transfer runs at a time: concurrent callers get a
//! busy error instead of queueing, because all callers live on the main
//! task by construction. Completion is signalled through a condvar with a
//! timeout; a timed-out transfer aborts the engine so the bus recovers.

use driver_onewire::{WireEngine, WireLine, MAX_FRAME};
use driver_tmc::TmcUart;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default transfer timeout.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(15);

/// A pin shared between the bus (tick context) and its owner.
pub type SharedLine = Arc<Mutex<Box<dyn WireLine + Send>>>;

/// Errors surfaced by bus transfers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum BusError {
    /// Another transfer is in flight.
    #[error("bus busy")]
    Busy,
    /// The transfer did not complete within the timeout.
    #[error("bus timeout")]
    Timeout,
    /// The transfer exceeds the 8-byte engine buffer.
    #[error("frame too long")]
    FrameTooLong,
    /// Re-initialisation with a different timer.
    #[error("timer mismatch")]
    TimerMismatch,
}

struct BusInner {
    engine: WireEngine,
    active: Option<SharedLine>,
    completed: bool,
}

/// The shared single-wire bus.
pub struct OneWireBus {
    inner: Mutex<BusInner>,
    done: Condvar,
    busy: AtomicBool,
    timer: Mutex<Option<usize>>,
    timeout: Duration,
}

impl Default for OneWireBus {
    fn default() -> Self {
        Self::new(TRANSFER_TIMEOUT)
    }
}

impl OneWireBus {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                engine: WireEngine::new(),
                active: None,
                completed: false,
            }),
            done: Condvar::new(),
            busy: AtomicBool::new(false),
            timer: Mutex::new(None),
            timeout,
        }
    }

    /// Binds the bus to its tick timer. Idempotent for the same timer;
    /// rebinding to a different one is an error.
    pub fn init(&self, timer_id: usize) -> Result<(), BusError> {
        let mut timer = self.timer.lock();
        match *timer {
            None => {
                *timer = Some(timer_id);
                Ok(())
            }
            Some(bound) if bound == timer_id => Ok(()),
            Some(_) => Err(BusError::TimerMismatch),
        }
    }

    /// Advances the active transfer by one tick (tick context).
    pub fn tick(&self) {
        let mut inner = self.inner.lock();
        if let Some(line) = inner.active.clone() {
            let mut line = line.lock();
            if inner.engine.tick(line.as_mut()) {
                inner.completed = true;
                self.done.notify_all();
            }
        }
    }

    fn acquire(&self) -> Result<(), BusError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(BusError::Busy);
        }
        Ok(())
    }

    fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    fn wait_done(&self, inner: &mut parking_lot::MutexGuard<'_, BusInner>) -> Result<(), BusError> {
        let deadline = std::time::Instant::now() + self.timeout;
        while !inner.completed {
            if self.done.wait_until(inner, deadline).timed_out() {
                inner.engine.abort();
                inner.active = None;
                return Err(BusError::Timeout);
            }
        }
        inner.active = None;
        Ok(())
    }

    /// Transmits `data` on `line`, blocking until done or timeout.
    pub fn write(&self, line: &SharedLine, data: &[u8]) -> Result<(), BusError> {
        if data.len() > MAX_FRAME {
            return Err(BusError::FrameTooLong);
        }
        self.acquire()?;
        let result = (|| {
            let mut inner = self.inner.lock();
            {
                let mut pin = line.lock();
                inner
                    .engine
                    .begin_write(pin.as_mut(), data)
                    .map_err(|_| BusError::FrameTooLong)?;
            }
            inner.active = Some(line.clone());
            inner.completed = false;
            self.wait_done(&mut inner)
        })();
        self.release();
        result
    }

    /// Receives `buf.len()` bytes from `line`, blocking until done or
    /// timeout.
    pub fn read(&self, line: &SharedLine, buf: &mut [u8]) -> Result<(), BusError> {
        if buf.len() > MAX_FRAME {
            return Err(BusError::FrameTooLong);
        }
        self.acquire()?;
        let result = (|| {
            let mut inner = self.inner.lock();
            {
                let mut pin = line.lock();
                inner
                    .engine
                    .begin_read(pin.as_mut(), buf.len())
                    .map_err(|_| BusError::FrameTooLong)?;
            }
            inner.active = Some(line.clone());
            inner.completed = false;
            self.wait_done(&mut inner)?;
            buf.copy_from_slice(inner.engine.data());
            Ok(())
        })();
        self.release();
        result
    }
}

/// One stepper driver's endpoint on the shared bus.
pub struct BusDevice {
    bus: Arc<OneWireBus>,
    line: SharedLine,
}

impl BusDevice {
    pub fn new(bus: Arc<OneWireBus>, line: SharedLine) -> Self {
        Self { bus, line }
    }
}

impl TmcUart for BusDevice {
    type Error = BusError;

    fn send(&mut self, data: &[u8]) -> Result<(), BusError> {
        self.bus.write(&self.line, data)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<(), BusError> {
        self.bus.read(&self.line, buf)
    }
}
