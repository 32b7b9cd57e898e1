//! Simulated stepper motor pins.
//!
//! One [`MotorSim`] models the four discrete pins of a stepper driver. The
//! step counter advances on rising STEP edges in the direction of the DIR
//! level, and the DIAG pin asserts once a scripted number of steps has been
//! observed (for homing/stall tests).

use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin, OutputPin};
use parking_lot::Mutex;
use std::sync::Arc;

/// Pin error type; never actually produced by the simulation.
#[derive(Debug)]
pub struct SimPinError;

impl Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Default)]
struct MotorState {
    position: i64,
    dir_forward: bool,
    step_level: bool,
    enabled: bool,
    steps_seen: u64,
    stall_after_steps: Option<u64>,
}

/// A simulated motor; clone handles share the same state.
#[derive(Clone, Default)]
pub struct MotorSim {
    inner: Arc<Mutex<MotorState>>,
}

impl MotorSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signed microstep position accumulated from STEP edges.
    pub fn position(&self) -> i64 {
        self.inner.lock().position
    }

    /// Total rising STEP edges observed, regardless of direction.
    pub fn steps_seen(&self) -> u64 {
        self.inner.lock().steps_seen
    }

    pub fn enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    /// Asserts DIAG once `steps` rising edges have been observed.
    pub fn stall_after_steps(&self, steps: u64) {
        self.inner.lock().stall_after_steps = Some(steps);
    }

    /// Clears any scripted stall.
    pub fn clear_stall(&self) {
        let mut state = self.inner.lock();
        state.stall_after_steps = None;
        state.steps_seen = 0;
    }

    /// The four pin handles for this motor.
    pub fn pins(&self) -> (StepPin, DirPin, EnablePin, DiagPin) {
        (
            StepPin(self.clone()),
            DirPin(self.clone()),
            EnablePin(self.clone()),
            DiagPin(self.clone()),
        )
    }
}

pub struct StepPin(MotorSim);
pub struct DirPin(MotorSim);
pub struct EnablePin(MotorSim);
pub struct DiagPin(MotorSim);

impl ErrorType for StepPin {
    type Error = SimPinError;
}
impl ErrorType for DirPin {
    type Error = SimPinError;
}
impl ErrorType for EnablePin {
    type Error = SimPinError;
}
impl ErrorType for DiagPin {
    type Error = SimPinError;
}

impl OutputPin for StepPin {
    fn set_low(&mut self) -> Result<(), SimPinError> {
        self.0.inner.lock().step_level = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimPinError> {
        let mut state = self.0.inner.lock();
        if !state.step_level {
            // Rising edge advances one microstep.
            state.position += if state.dir_forward { 1 } else { -1 };
            state.steps_seen += 1;
        }
        state.step_level = true;
        Ok(())
    }
}

impl OutputPin for DirPin {
    fn set_low(&mut self) -> Result<(), SimPinError> {
        self.0.inner.lock().dir_forward = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimPinError> {
        self.0.inner.lock().dir_forward = true;
        Ok(())
    }
}

impl OutputPin for EnablePin {
    fn set_low(&mut self) -> Result<(), SimPinError> {
        self.0.inner.lock().enabled = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimPinError> {
        self.0.inner.lock().enabled = true;
        Ok(())
    }
}

impl InputPin for DiagPin {
    fn is_high(&mut self) -> Result<bool, SimPinError> {
        let state = self.0.inner.lock();
        Ok(matches!(state.stall_after_steps, Some(n) if state.steps_seen >= n))
    }

    fn is_low(&mut self) -> Result<bool, SimPinError> {
        self.is_high().map(|h| !h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_edges_move_position() {
        let motor = MotorSim::new();
        let (mut step, mut dir, _en, _diag) = motor.pins();

        dir.set_high().unwrap();
        for _ in 0..3 {
            step.set_high().unwrap();
            step.set_low().unwrap();
        }
        assert_eq!(motor.position(), 3);

        dir.set_low().unwrap();
        step.set_high().unwrap();
        step.set_low().unwrap();
        assert_eq!(motor.position(), 2);
    }

    #[test]
    fn held_high_step_counts_once() {
        let motor = MotorSim::new();
        let (mut step, mut dir, _en, _diag) = motor.pins();
        dir.set_high().unwrap();
        step.set_high().unwrap();
        step.set_high().unwrap();
        assert_eq!(motor.position(), 1);
    }

    #[test]
    fn diag_asserts_after_scripted_steps() {
        let motor = MotorSim::new();
        let (mut step, mut dir, _en, mut diag) = motor.pins();
        motor.stall_after_steps(2);
        dir.set_high().unwrap();

        assert!(!diag.is_high().unwrap());
        step.set_high().unwrap();
        step.set_low().unwrap();
        assert!(!diag.is_high().unwrap());
        step.set_high().unwrap();
        step.set_low().unwrap();
        assert!(diag.is_high().unwrap());
    }
}
