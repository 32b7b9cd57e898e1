//! A `no_std` driver for the EDM pulser board.
//!
//! The pulser is an I²C slave with a small register map plus a discrete
//! gate GPIO that enables power output. The gate is kept separate from the
//! polarity register so the output can be cut fast without a bus write.
//!
//! A 1 ms poll reads the checkpoint block (pulse count, ignition timing,
//! discharge ratios) in one burst; samples land in the fixed-capacity
//! [`SampleRing`] for later bulk upload.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod registers;
pub mod ring;

pub use ring::SampleRing;

use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use registers as regs;

/// I²C slave address of the pulser board.
pub const PULSER_I2C_ADDR: u8 = 0x3B;

/// Errors raised by pulser operations.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<EI, EG> {
    /// An I²C transfer failed.
    I2c(EI),
    /// Driving the gate GPIO failed.
    Gate(EG),
}

/// One checkpoint snapshot captured by the periodic poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Pulses since the previous checkpoint read.
    pub n_pulse: u8,
    /// Ratio of the window spent discharging (0-255).
    pub r_pulse: u8,
    /// Ratio of the window spent shorted (0-255).
    pub r_short: u8,
    /// Ratio of the window spent open / waiting (0-255).
    pub r_open: u8,
}

/// Driver for the pulser board.
pub struct Pulser<I2C, GATE> {
    i2c: I2C,
    gate: GATE,
}

impl<I2C, GATE, EI, EG> Pulser<I2C, GATE>
where
    I2C: I2c<Error = EI>,
    GATE: OutputPin<Error = EG>,
{
    /// Creates the driver; the gate is assumed inactive at reset.
    pub fn new(i2c: I2C, gate: GATE) -> Self {
        Self { i2c, gate }
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<EI, EG>> {
        self.i2c
            .write(PULSER_I2C_ADDR, &[reg, value])
            .map_err(Error::I2c)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, Error<EI, EG>> {
        let mut value = [0u8];
        self.i2c
            .write_read(PULSER_I2C_ADDR, &[reg], &mut value)
            .map_err(Error::I2c)?;
        Ok(value[0])
    }

    fn set_gate(&mut self, on: bool) -> Result<(), Error<EI, EG>> {
        if on {
            self.gate.set_high().map_err(Error::Gate)
        } else {
            self.gate.set_low().map_err(Error::Gate)
        }
    }

    /// Programs pulse parameters and enables the output.
    ///
    /// Units are quantised to the register scales: duration to 10 µs
    /// steps, current to 100 mA steps (clamped to the 100 mA minimum),
    /// duty to whole percent. Polarity 2 is tool-negative, 1 tool-positive.
    pub fn energize(
        &mut self,
        negative: bool,
        pulse_us: f32,
        current_a: f32,
        duty_pct: f32,
    ) -> Result<(), Error<EI, EG>> {
        let pulse_dur_10us = (pulse_us * 0.1) as u8;
        let mut pulse_current_100ma = (current_a * 10.0) as u8;
        if pulse_current_100ma == 0 {
            pulse_current_100ma = 1;
        }
        let duty = duty_pct as u8;
        let polarity = if negative { 2 } else { 1 };

        self.write_register(regs::PULSE_CURRENT, pulse_current_100ma)?;
        self.write_register(regs::PULSE_DUR, pulse_dur_10us)?;
        self.write_register(regs::MAX_DUTY, duty)?;
        self.write_register(regs::POLARITY, polarity)?;

        self.set_gate(true)
    }

    /// Cuts the gate, then clears the polarity register.
    pub fn deenergize(&mut self) -> Result<(), Error<EI, EG>> {
        self.set_gate(false)?;
        self.write_register(regs::POLARITY, 0)
    }

    /// Burst-reads the checkpoint block (6 registers starting at
    /// [`registers::CKP_N_PULSE`]) into a [`Sample`].
    pub fn poll(&mut self) -> Result<Sample, Error<EI, EG>> {
        let mut buf = [0u8; 6];
        self.i2c
            .write_read(PULSER_I2C_ADDR, &[regs::CKP_N_PULSE], &mut buf)
            .map_err(Error::I2c)?;
        Ok(Sample {
            n_pulse: buf[(regs::CKP_N_PULSE - regs::CKP_N_PULSE) as usize],
            r_pulse: buf[(regs::R_PULSE - regs::CKP_N_PULSE) as usize],
            r_short: buf[(regs::R_SHORT - regs::CKP_N_PULSE) as usize],
            r_open: buf[(regs::R_OPEN - regs::CKP_N_PULSE) as usize],
        })
    }

    /// Reads the heatsink temperature in °C.
    pub fn temperature(&mut self) -> Result<u8, Error<EI, EG>> {
        self.read_register(regs::TEMPERATURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec;

    #[test]
    fn energize_programs_registers_then_gate() {
        // M3 P750 Q1.5 R30: duration 75 x 10 us, current 15 x 100 mA,
        // duty 30 %, polarity 2 (tool-negative).
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(PULSER_I2C_ADDR, vec![regs::PULSE_CURRENT, 15]),
            I2cTransaction::write(PULSER_I2C_ADDR, vec![regs::PULSE_DUR, 75]),
            I2cTransaction::write(PULSER_I2C_ADDR, vec![regs::MAX_DUTY, 30]),
            I2cTransaction::write(PULSER_I2C_ADDR, vec![regs::POLARITY, 2]),
        ]);
        let mut gate = PinMock::new(&[PinTransaction::set(PinState::High)]);

        {
            let mut pulser = Pulser::new(&mut i2c, &mut gate);
            pulser.energize(true, 750.0, 1.5, 30.0).unwrap();
        }
        i2c.done();
        gate.done();
    }

    #[test]
    fn energize_clamps_minimum_current() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(PULSER_I2C_ADDR, vec![regs::PULSE_CURRENT, 1]),
            I2cTransaction::write(PULSER_I2C_ADDR, vec![regs::PULSE_DUR, 50]),
            I2cTransaction::write(PULSER_I2C_ADDR, vec![regs::MAX_DUTY, 25]),
            I2cTransaction::write(PULSER_I2C_ADDR, vec![regs::POLARITY, 1]),
        ]);
        let mut gate = PinMock::new(&[PinTransaction::set(PinState::High)]);

        {
            let mut pulser = Pulser::new(&mut i2c, &mut gate);
            pulser.energize(false, 500.0, 0.05, 25.0).unwrap();
        }
        i2c.done();
        gate.done();
    }

    #[test]
    fn deenergize_cuts_gate_before_polarity_write() {
        let mut i2c = I2cMock::new(&[I2cTransaction::write(
            PULSER_I2C_ADDR,
            vec![regs::POLARITY, 0],
        )]);
        let mut gate = PinMock::new(&[PinTransaction::set(PinState::Low)]);

        {
            let mut pulser = Pulser::new(&mut i2c, &mut gate);
            pulser.deenergize().unwrap();
        }
        i2c.done();
        gate.done();
    }

    #[test]
    fn poll_burst_reads_checkpoint_block() {
        let mut i2c = I2cMock::new(&[I2cTransaction::write_read(
            PULSER_I2C_ADDR,
            vec![regs::CKP_N_PULSE],
            vec![7, 10, 12, 90, 3, 200],
        )]);
        let mut gate = PinMock::new(&[]);

        let sample = {
            let mut pulser = Pulser::new(&mut i2c, &mut gate);
            pulser.poll().unwrap()
        };
        assert_eq!(
            sample,
            Sample {
                n_pulse: 7,
                r_pulse: 90,
                r_short: 3,
                r_open: 200,
            }
        );
        i2c.done();
        gate.done();
    }
}
