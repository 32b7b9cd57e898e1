//! Hardware seams between the control plane and the drivers.
//!
//! The step engine, settings store, and dispatcher talk to hardware through
//! these object-safe traits so the same control code runs against real
//! peripherals or the simulation. The generic `embedded-hal` based drivers
//! get blanket implementations.

use driver_tmc::{MotorPins, Tmc2209, TmcUart};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::I2c;
use std::fmt::Debug;
use thiserror::Error;

/// The discrete pins the step engine drives for one motor.
pub trait StepDirPins: Send {
    fn set_step(&mut self, high: bool);
    fn set_dir(&mut self, forward: bool);
    fn energize(&mut self, on: bool);
    fn stalled(&mut self) -> bool;
}

impl<STEP, DIR, EN, DIAG, E> StepDirPins for MotorPins<STEP, DIR, EN, DIAG>
where
    STEP: OutputPin<Error = E> + Send,
    DIR: OutputPin<Error = E> + Send,
    EN: OutputPin<Error = E> + Send,
    DIAG: InputPin<Error = E> + Send,
    E: Debug,
{
    fn set_step(&mut self, high: bool) {
        let _ = MotorPins::set_step(self, high);
    }

    fn set_dir(&mut self, forward: bool) {
        let _ = MotorPins::set_dir(self, forward);
    }

    fn energize(&mut self, on: bool) {
        let _ = MotorPins::energize(self, on);
    }

    fn stalled(&mut self) -> bool {
        MotorPins::stalled(self).unwrap_or(false)
    }
}

/// A failed stepper register transaction, flattened for reporting.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TmcPortError(pub String);

/// Register-level access to one stepper driver.
pub trait TmcPort: Send {
    fn reg_read(&mut self, reg: u8) -> Result<u32, TmcPortError>;
    fn reg_write(&mut self, reg: u8, value: u32) -> Result<(), TmcPortError>;
    fn set_microstep(&mut self, microstep: u32) -> Result<(), TmcPortError>;
    fn set_current(&mut self, run_percent: u8, hold_percent: u8) -> Result<(), TmcPortError>;
    fn set_stallguard_threshold(&mut self, threshold: u8) -> Result<(), TmcPortError>;
    fn set_tcoolthrs(&mut self, value: u32) -> Result<(), TmcPortError>;
    fn sg_result(&mut self) -> Result<u16, TmcPortError>;
    fn dump_regs(&mut self) -> Result<String, TmcPortError>;
}

fn tmc_err<E: Debug>(e: driver_tmc::Error<E>) -> TmcPortError {
    TmcPortError(format!("{e:?}"))
}

impl<U, D> TmcPort for Tmc2209<U, D>
where
    U: TmcUart + Send,
    U::Error: Debug,
    D: DelayNs + Send,
{
    fn reg_read(&mut self, reg: u8) -> Result<u32, TmcPortError> {
        Tmc2209::reg_read(self, reg).map_err(tmc_err)
    }

    fn reg_write(&mut self, reg: u8, value: u32) -> Result<(), TmcPortError> {
        Tmc2209::reg_write(self, reg, value).map_err(tmc_err)
    }

    fn set_microstep(&mut self, microstep: u32) -> Result<(), TmcPortError> {
        Tmc2209::set_microstep(self, microstep).map_err(tmc_err)
    }

    fn set_current(&mut self, run_percent: u8, hold_percent: u8) -> Result<(), TmcPortError> {
        Tmc2209::set_current(self, run_percent, hold_percent).map_err(tmc_err)
    }

    fn set_stallguard_threshold(&mut self, threshold: u8) -> Result<(), TmcPortError> {
        Tmc2209::set_stallguard_threshold(self, threshold).map_err(tmc_err)
    }

    fn set_tcoolthrs(&mut self, value: u32) -> Result<(), TmcPortError> {
        Tmc2209::set_tcoolthrs(self, value).map_err(tmc_err)
    }

    fn sg_result(&mut self) -> Result<u16, TmcPortError> {
        Tmc2209::sg_result(self).map_err(tmc_err)
    }

    fn dump_regs(&mut self) -> Result<String, TmcPortError> {
        Tmc2209::dump_regs(self)
            .map(|s| s.as_str().to_string())
            .map_err(tmc_err)
    }
}

/// A failed pulser transaction, flattened for reporting.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PulserPortError(pub String);

/// The pulser board as seen by the control plane.
pub trait PulserPort: Send {
    fn energize(
        &mut self,
        negative: bool,
        pulse_us: f32,
        current_a: f32,
        duty_pct: f32,
    ) -> Result<(), PulserPortError>;
    fn deenergize(&mut self) -> Result<(), PulserPortError>;
    fn poll(&mut self) -> Result<driver_pulser::Sample, PulserPortError>;
    fn temperature(&mut self) -> Result<u8, PulserPortError>;
}

fn pulser_err<EI: Debug, EG: Debug>(e: driver_pulser::Error<EI, EG>) -> PulserPortError {
    PulserPortError(format!("{e:?}"))
}

impl<I2C, GATE, EI, EG> PulserPort for driver_pulser::Pulser<I2C, GATE>
where
    I2C: I2c<Error = EI> + Send,
    GATE: OutputPin<Error = EG> + Send,
    EI: Debug,
    EG: Debug,
{
    fn energize(
        &mut self,
        negative: bool,
        pulse_us: f32,
        current_a: f32,
        duty_pct: f32,
    ) -> Result<(), PulserPortError> {
        driver_pulser::Pulser::energize(self, negative, pulse_us, current_a, duty_pct)
            .map_err(pulser_err)
    }

    fn deenergize(&mut self) -> Result<(), PulserPortError> {
        driver_pulser::Pulser::deenergize(self).map_err(pulser_err)
    }

    fn poll(&mut self) -> Result<driver_pulser::Sample, PulserPortError> {
        driver_pulser::Pulser::poll(self).map_err(pulser_err)
    }

    fn temperature(&mut self) -> Result<u8, PulserPortError> {
        driver_pulser::Pulser::temperature(self).map_err(pulser_err)
    }
}
