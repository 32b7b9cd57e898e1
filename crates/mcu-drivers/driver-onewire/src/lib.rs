//! A `no_std` bit-banged half-duplex single-wire UART.
//!
//! The engine is clocked by a periodic 30 µs tick; three ticks make one baud
//! (~90 µs per bit, ~11.1 kbit/s). Each frame is one start bit (0), eight
//! data bits LSB first, and one stop bit (1). The line is open-drain and
//! shared with an external device that masters it for replies, so the
//! engine switches the pin between driven output and released input via the
//! [`WireLine`] trait.
//!
//! Reception re-synchronises on every byte: the engine waits for the
//! start-bit falling edge, then samples the middle of each subsequent bit.
//!
//! The engine itself is a pure state machine; arbitration, blocking waits,
//! and timeouts belong to the owner of the tick context.

#![no_std]

#[cfg(test)]
extern crate std;

/// Maximum transfer size in bytes.
pub const MAX_FRAME: usize = 8;

/// Ticks per bit (30 µs tick, ~90 µs baud).
pub const TICKS_PER_BIT: u8 = 3;

/// Access to the shared open-drain line.
pub trait WireLine {
    /// Switch the pin to driven open-drain output (idle high).
    fn set_output(&mut self);
    /// Release the pin to input so the remote device can drive it.
    fn set_input(&mut self);
    /// Drive the line level; only meaningful in output mode.
    fn write(&mut self, high: bool);
    /// Sample the line level.
    fn read(&mut self) -> bool;
}

/// Errors starting a transfer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum WireError {
    /// The requested transfer exceeds [`MAX_FRAME`] bytes.
    FrameTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Send,
    /// Receiving, waiting for the next start-bit falling edge.
    Receive,
    /// Receiving, phase-locked to the current byte.
    ReceiveSynced,
}

/// The per-tick transmit/receive state machine.
#[derive(Debug)]
pub struct WireEngine {
    buf: [u8; MAX_FRAME],
    len: usize,
    byte_idx: usize,
    /// 0 = start bit, 1..=8 = data bits, 9 = stop bit.
    bit: u8,
    phase: u8,
    state: State,
}

impl Default for WireEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WireEngine {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_FRAME],
            len: 0,
            byte_idx: 0,
            bit: 0,
            phase: 0,
            state: State::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Bytes captured by the last completed receive (or queued for send).
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Begins transmitting `data`; the line is taken as driven output.
    pub fn begin_write(
        &mut self,
        line: &mut (impl WireLine + ?Sized),
        data: &[u8],
    ) -> Result<(), WireError> {
        if data.len() > MAX_FRAME {
            return Err(WireError::FrameTooLong);
        }
        line.set_output();
        self.buf[..data.len()].copy_from_slice(data);
        self.len = data.len();
        self.byte_idx = 0;
        self.bit = 0;
        self.phase = 0;
        self.state = State::Send;
        Ok(())
    }

    /// Begins receiving `len` bytes; the line is released to input.
    pub fn begin_read(
        &mut self,
        line: &mut (impl WireLine + ?Sized),
        len: usize,
    ) -> Result<(), WireError> {
        if len > MAX_FRAME {
            return Err(WireError::FrameTooLong);
        }
        line.set_input();
        self.buf = [0; MAX_FRAME];
        self.len = len;
        self.byte_idx = 0;
        self.bit = 0;
        self.phase = 0;
        self.state = State::Receive;
        Ok(())
    }

    /// Forces the engine back to idle (timeout recovery).
    pub fn abort(&mut self) {
        self.state = State::Idle;
    }

    /// Advances the engine by one 30 µs tick.
    ///
    /// Returns `true` on the tick that completes the current operation.
    pub fn tick(&mut self, line: &mut (impl WireLine + ?Sized)) -> bool {
        match self.state {
            State::Idle => false,
            State::Send => {
                let mut done = false;
                if self.phase == 0 {
                    let level = match self.bit {
                        0 => false,
                        1..=8 => (self.buf[self.byte_idx] >> (self.bit - 1)) & 1 != 0,
                        _ => true,
                    };
                    line.write(level);
                    self.bit += 1;

                    if self.bit >= 10 {
                        self.bit = 0;
                        self.byte_idx += 1;
                        if self.byte_idx >= self.len {
                            self.state = State::Idle;
                            done = true;
                        }
                    }
                }
                self.phase = (self.phase + 1) % TICKS_PER_BIT;
                done
            }
            State::Receive => {
                // Wait for the start-bit falling edge, then phase-lock so
                // the next sample lands mid-bit.
                if !line.read() {
                    self.state = State::ReceiveSynced;
                    self.phase = 1;
                    self.bit = 0;
                }
                false
            }
            State::ReceiveSynced => {
                let mut done = false;
                if self.phase == 1 {
                    let level = line.read();
                    if (1..=8).contains(&self.bit) && level {
                        self.buf[self.byte_idx] |= 1 << (self.bit - 1);
                    }
                    self.bit += 1;

                    if self.bit >= 10 {
                        self.state = State::Receive;
                        self.byte_idx += 1;
                        if self.byte_idx >= self.len {
                            self.state = State::Idle;
                            done = true;
                        }
                    }
                }
                self.phase = (self.phase + 1) % TICKS_PER_BIT;
                done
            }
        }
    }
}
