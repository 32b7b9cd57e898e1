//! Simulated pulser board: I²C register map plus gate pin.

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, ErrorType, I2c, Operation, SevenBitAddress};
use parking_lot::Mutex;
use std::sync::Arc;

/// Register file size; registers 0x00..=0x1F exist on the board.
const REG_SPACE: usize = 0x20;

/// I²C error type; never actually produced by the simulation.
#[derive(Debug)]
pub struct SimI2cError;

impl i2c::Error for SimI2cError {
    fn kind(&self) -> i2c::ErrorKind {
        i2c::ErrorKind::Other
    }
}

/// Gate pin error type; never actually produced by the simulation.
#[derive(Debug)]
pub struct SimGateError;

impl digital::Error for SimGateError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

#[derive(Debug)]
struct PulserState {
    regs: [u8; REG_SPACE],
    pointer: u8,
    gate: bool,
}

impl Default for PulserState {
    fn default() -> Self {
        Self {
            regs: [0; REG_SPACE],
            pointer: 0,
            gate: false,
        }
    }
}

/// A simulated pulser board; clone handles share the same state.
#[derive(Clone, Default)]
pub struct PulserSim {
    inner: Arc<Mutex<PulserState>>,
}

impl PulserSim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.inner.lock().regs[addr as usize % REG_SPACE]
    }

    pub fn set_reg(&self, addr: u8, value: u8) {
        self.inner.lock().regs[addr as usize % REG_SPACE] = value;
    }

    pub fn gate(&self) -> bool {
        self.inner.lock().gate
    }

    /// Scripts the discharge ratios the next polls will observe.
    pub fn set_rates(&self, r_open: u8, r_short: u8) {
        let mut state = self.inner.lock();
        state.regs[driver_pulser::registers::R_OPEN as usize] = r_open;
        state.regs[driver_pulser::registers::R_SHORT as usize] = r_short;
    }

    pub fn set_pulse_stats(&self, n_pulse: u8, r_pulse: u8) {
        let mut state = self.inner.lock();
        state.regs[driver_pulser::registers::CKP_N_PULSE as usize] = n_pulse;
        state.regs[driver_pulser::registers::R_PULSE as usize] = r_pulse;
    }

    pub fn set_temperature(&self, celsius: u8) {
        self.set_reg(driver_pulser::registers::TEMPERATURE, celsius);
    }

    /// The gate pin handle.
    pub fn gate_pin(&self) -> GatePin {
        GatePin(self.clone())
    }
}

impl ErrorType for PulserSim {
    type Error = SimI2cError;
}

impl I2c<SevenBitAddress> for PulserSim {
    fn transaction(
        &mut self,
        _address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), SimI2cError> {
        let mut state = self.inner.lock();
        for op in operations {
            match op {
                Operation::Write(bytes) => match &**bytes {
                    [] => {}
                    [reg] => state.pointer = *reg,
                    [reg, values @ ..] => {
                        state.pointer = *reg;
                        for (i, value) in values.iter().enumerate() {
                            let addr = (*reg as usize + i) % REG_SPACE;
                            state.regs[addr] = *value;
                        }
                    }
                },
                Operation::Read(buf) => {
                    for (i, out) in buf.iter_mut().enumerate() {
                        *out = state.regs[(state.pointer as usize + i) % REG_SPACE];
                    }
                }
            }
        }
        Ok(())
    }
}

pub struct GatePin(PulserSim);

impl digital::ErrorType for GatePin {
    type Error = SimGateError;
}

impl OutputPin for GatePin {
    fn set_low(&mut self) -> Result<(), SimGateError> {
        self.0.inner.lock().gate = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimGateError> {
        self.0.inner.lock().gate = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driver_pulser::{registers, Pulser, Sample};

    #[test]
    fn driver_energize_reaches_registers_and_gate() {
        let board = PulserSim::new();
        let mut pulser = Pulser::new(board.clone(), board.gate_pin());

        pulser.energize(true, 750.0, 1.5, 30.0).unwrap();
        assert_eq!(board.reg(registers::PULSE_DUR), 75);
        assert_eq!(board.reg(registers::PULSE_CURRENT), 15);
        assert_eq!(board.reg(registers::MAX_DUTY), 30);
        assert_eq!(board.reg(registers::POLARITY), 2);
        assert!(board.gate());

        pulser.deenergize().unwrap();
        assert!(!board.gate());
        assert_eq!(board.reg(registers::POLARITY), 0);
    }

    #[test]
    fn driver_poll_sees_scripted_rates() {
        let board = PulserSim::new();
        board.set_rates(200, 3);
        board.set_pulse_stats(7, 90);

        let mut pulser = Pulser::new(board.clone(), board.gate_pin());
        assert_eq!(
            pulser.poll().unwrap(),
            Sample {
                n_pulse: 7,
                r_pulse: 90,
                r_short: 3,
                r_open: 200,
            }
        );
    }
}
