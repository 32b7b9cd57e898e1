//! The discrete STEP/DIR/EN/DIAG pin bundle of one stepper driver.
//!
//! Register access goes over the shared bus; the step engine ISR only ever
//! touches these pins, so they are bundled separately from the register
//! driver.

use embedded_hal::digital::{InputPin, OutputPin};

/// STEP, DIR, and ENABLE outputs plus the DIAG (stall) input of one motor.
pub struct MotorPins<STEP, DIR, EN, DIAG> {
    step: STEP,
    dir: DIR,
    enable: EN,
    diag: DIAG,
}

impl<STEP, DIR, EN, DIAG, E> MotorPins<STEP, DIR, EN, DIAG>
where
    STEP: OutputPin<Error = E>,
    DIR: OutputPin<Error = E>,
    EN: OutputPin<Error = E>,
    DIAG: InputPin<Error = E>,
{
    pub fn new(step: STEP, dir: DIR, enable: EN, diag: DIAG) -> Self {
        Self {
            step,
            dir,
            enable,
            diag,
        }
    }

    /// Sets the STEP pin level; a high pulse advances one microstep.
    pub fn set_step(&mut self, high: bool) -> Result<(), E> {
        if high {
            self.step.set_high()
        } else {
            self.step.set_low()
        }
    }

    /// Sets the DIR pin level (true = forward).
    pub fn set_dir(&mut self, forward: bool) -> Result<(), E> {
        if forward {
            self.dir.set_high()
        } else {
            self.dir.set_low()
        }
    }

    /// Energizes or releases the motor coils via the ENABLE pin.
    pub fn energize(&mut self, on: bool) -> Result<(), E> {
        if on {
            self.enable.set_high()
        } else {
            self.enable.set_low()
        }
    }

    /// Samples the DIAG pin; high means StallGuard detected a stall.
    pub fn stalled(&mut self) -> Result<bool, E> {
        self.diag.is_high()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[test]
    fn pin_levels_follow_calls() {
        let step = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let dir = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let enable = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let diag = PinMock::new(&[
            PinTransaction::get(PinState::Low),
            PinTransaction::get(PinState::High),
        ]);

        let mut pins = MotorPins::new(step, dir, enable, diag);
        pins.energize(true).unwrap();
        pins.set_dir(true).unwrap();
        pins.set_step(true).unwrap();
        pins.set_step(false).unwrap();
        assert!(!pins.stalled().unwrap());
        assert!(pins.stalled().unwrap());

        let MotorPins {
            mut step,
            mut dir,
            mut enable,
            mut diag,
        } = pins;
        step.done();
        dir.done();
        enable.done();
        diag.done();
    }
}
