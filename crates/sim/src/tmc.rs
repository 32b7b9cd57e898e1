//! Simulated TMC register device on the single-wire bus.
//!
//! Speaks the request/reply datagram protocol at the byte level: validates
//! sync, node address, and CRC of incoming requests, applies writes to a
//! register map, and answers reads with CRC-sealed replies. Reply
//! corruption can be scripted to exercise the driver's error paths.

use driver_tmc::datagram::{self, crc8, READ_REQUEST_LEN, REPLY_LEN, WRITE_REQUEST_LEN};
use driver_tmc::TmcUart;
use embedded_hal::delay::DelayNs;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// TMC2209 CHOPCONF reset default.
const CHOPCONF_RESET: u32 = 0x1000_0053;

/// Errors surfaced to the register driver, mirroring what the real bus
/// produces.
#[derive(Debug, PartialEq, Eq)]
pub enum SimBusError {
    /// The device could not parse the request (bad sync/CRC/length).
    BadRequest,
    /// A reply was requested with no read request pending.
    NoReplyPending,
}

#[derive(Debug)]
struct TmcState {
    regs: HashMap<u8, u32>,
    pending_read: Option<u8>,
    corrupt_next_reply: bool,
    write_log: Vec<(u8, u32)>,
}

impl Default for TmcState {
    fn default() -> Self {
        let mut regs = HashMap::new();
        regs.insert(driver_tmc::registers::CHOPCONF, CHOPCONF_RESET);
        Self {
            regs,
            pending_read: None,
            corrupt_next_reply: false,
            write_log: Vec::new(),
        }
    }
}

/// A simulated TMC device; clone handles share the same register file.
#[derive(Clone, Default)]
pub struct TmcSim {
    inner: Arc<Mutex<TmcState>>,
}

impl TmcSim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reg(&self, addr: u8) -> u32 {
        self.inner.lock().regs.get(&addr).copied().unwrap_or(0)
    }

    pub fn set_reg(&self, addr: u8, value: u32) {
        self.inner.lock().regs.insert(addr, value);
    }

    /// All register writes observed, in order.
    pub fn write_log(&self) -> Vec<(u8, u32)> {
        self.inner.lock().write_log.clone()
    }

    /// Corrupts the CRC of the next reply.
    pub fn corrupt_next_reply(&self) {
        self.inner.lock().corrupt_next_reply = true;
    }
}

impl TmcUart for TmcSim {
    type Error = SimBusError;

    fn send(&mut self, data: &[u8]) -> Result<(), SimBusError> {
        let mut state = self.inner.lock();
        match data.len() {
            READ_REQUEST_LEN => {
                if data[0] != datagram::SYNC || data[3] != crc8(&data[..3]) {
                    return Err(SimBusError::BadRequest);
                }
                state.pending_read = Some(data[2] & 0x7F);
                Ok(())
            }
            WRITE_REQUEST_LEN => {
                if data[0] != datagram::SYNC
                    || data[2] & 0x80 == 0
                    || data[7] != crc8(&data[..7])
                {
                    return Err(SimBusError::BadRequest);
                }
                let reg = data[2] & 0x7F;
                let mut value = [0u8; 4];
                value.copy_from_slice(&data[3..7]);
                let value = u32::from_be_bytes(value);
                state.regs.insert(reg, value);
                state.write_log.push((reg, value));
                Ok(())
            }
            _ => Err(SimBusError::BadRequest),
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<(), SimBusError> {
        let mut state = self.inner.lock();
        let reg = state.pending_read.take().ok_or(SimBusError::NoReplyPending)?;
        let value = state.regs.get(&reg).copied().unwrap_or(0);

        let mut frame = [0u8; REPLY_LEN];
        frame[0] = datagram::SYNC;
        frame[1] = datagram::MASTER_ADDR;
        frame[2] = reg;
        frame[3..7].copy_from_slice(&value.to_be_bytes());
        frame[7] = crc8(&frame[..7]);
        if state.corrupt_next_reply {
            state.corrupt_next_reply = false;
            frame[7] ^= 0xFF;
        }
        buf.copy_from_slice(&frame);
        Ok(())
    }
}

/// A delay source that does not wait; sim transactions have no bus to
/// settle.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantDelay;

impl DelayNs for InstantDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
