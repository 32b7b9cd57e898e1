//! The 30 µs step generation engine.
//!
//! Each motor runs a three-state pulse machine that chases an integer step
//! target: one tick raises STEP, the next drops it and moves the counter,
//! and the earliest the following tick can do is raise again. This bounds
//! output to one microstep per two ticks with a one-tick pulse width and a
//! guaranteed low tick between pulses. Because the engine chases the
//! target rather than queueing edges, a direction reversal cancels steps
//! that were never emitted.
//!
//! `current_steps` is mutated only from the tick context; `target_steps` is
//! written atomically by the motion tick, the wirefeed tick, or
//! [`Motors::queue_step`]. DIAG is sampled every tick into a per-motor
//! atomic so other contexts observe stalls without touching pins.

use crate::hal::StepDirPins;
use motion::DrvPos;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Number of stepper motors (X/Y/Z plus auxiliary axes).
pub const MOTOR_COUNT: usize = 7;

/// Step engine tick period.
pub const STEP_TICK_PERIOD_US: u32 = 30;

/// Idle time after which a motor de-energizes by default.
pub const DEFAULT_IDLE_TIMEOUT_MS: i32 = 200;

/// Per-motor state shared across contexts.
#[derive(Debug, Default)]
struct MotorShared {
    target: AtomicI32,
    current: AtomicI32,
    energized: AtomicBool,
    stalled: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepPhase {
    Idle,
    PulseHigh,
    PulseLow,
}

/// Tick-context state of one motor.
struct MotorUnit {
    pins: Box<dyn StepDirPins>,
    phase: StepPhase,
    direction: bool,
    energized: bool,
    idle_ticks: u32,
    idle_timeout_ticks: u32,
    always_energized: bool,
}

/// The step engine for all motors.
pub struct Motors {
    shared: [MotorShared; MOTOR_COUNT],
    bank: Mutex<Vec<MotorUnit>>,
}

impl Motors {
    /// Builds the engine from one pin bundle per motor.
    pub fn new(pins: Vec<Box<dyn StepDirPins>>) -> Self {
        assert_eq!(pins.len(), MOTOR_COUNT, "one pin bundle per motor");
        let default_timeout_ticks =
            (DEFAULT_IDLE_TIMEOUT_MS as u32 * 1000) / STEP_TICK_PERIOD_US;
        let bank = pins
            .into_iter()
            .map(|pins| MotorUnit {
                pins,
                phase: StepPhase::Idle,
                direction: false,
                energized: false,
                idle_ticks: 0,
                idle_timeout_ticks: default_timeout_ticks,
                always_energized: false,
            })
            .collect();
        Self {
            shared: Default::default(),
            bank: Mutex::new(bank),
        }
    }

    /// Advances every motor's pulse machine by one tick.
    pub fn step_tick(&self) {
        let mut bank = self.bank.lock();
        for (unit, shared) in bank.iter_mut().zip(&self.shared) {
            Self::process(unit, shared);
        }
    }

    fn ensure_energized(unit: &mut MotorUnit, shared: &MotorShared, on: bool) {
        if unit.energized != on {
            unit.pins.energize(on);
            unit.energized = on;
            shared.energized.store(on, Ordering::Relaxed);
        }
    }

    fn process(unit: &mut MotorUnit, shared: &MotorShared) {
        match unit.phase {
            // PULSE_LOW returns to idle and may start the next pulse on
            // this very tick, giving the one-step-per-two-ticks ceiling.
            StepPhase::Idle | StepPhase::PulseLow => {
                unit.phase = StepPhase::Idle;
                let target = shared.target.load(Ordering::Relaxed);
                let current = shared.current.load(Ordering::Relaxed);
                if target != current {
                    unit.idle_ticks = 0;
                    Self::ensure_energized(unit, shared, true);

                    let forward = target > current;
                    if forward != unit.direction {
                        unit.direction = forward;
                        unit.pins.set_dir(forward);
                    }

                    unit.pins.set_step(true);
                    unit.phase = StepPhase::PulseHigh;
                } else if !unit.always_energized {
                    if unit.idle_ticks < unit.idle_timeout_ticks {
                        unit.idle_ticks += 1;
                    } else {
                        Self::ensure_energized(unit, shared, false);
                    }
                }
            }
            StepPhase::PulseHigh => {
                unit.pins.set_step(false);
                let target = shared.target.load(Ordering::Relaxed);
                if target > shared.current.load(Ordering::Relaxed) {
                    shared.current.fetch_add(1, Ordering::Relaxed);
                } else {
                    shared.current.fetch_sub(1, Ordering::Relaxed);
                }
                unit.phase = StepPhase::PulseLow;
            }
        }
        shared.stalled.store(unit.pins.stalled(), Ordering::Relaxed);
    }

    /// Nudges the target by one step; opposite nudges cancel out before
    /// reaching hardware.
    pub fn queue_step(&self, motor: usize, forward: bool) {
        if motor >= MOTOR_COUNT {
            return;
        }
        if forward {
            self.shared[motor].target.fetch_add(1, Ordering::SeqCst);
        } else {
            self.shared[motor].target.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Sets the absolute step target of one motor.
    pub fn set_target(&self, motor: usize, steps: i32) {
        if motor < MOTOR_COUNT {
            self.shared[motor].target.store(steps, Ordering::Relaxed);
        }
    }

    /// Publishes the Cartesian axes' targets (motors 0..=2).
    pub fn set_axis_targets(&self, target: DrvPos) {
        for (motor, steps) in target.steps.iter().enumerate() {
            self.shared[motor].target.store(*steps, Ordering::Relaxed);
        }
    }

    pub fn target(&self, motor: usize) -> i32 {
        self.shared[motor].target.load(Ordering::Relaxed)
    }

    pub fn current_steps(&self, motor: usize) -> i32 {
        self.shared[motor].current.load(Ordering::Relaxed)
    }

    /// Step counters of the Cartesian axes.
    pub fn axis_current_steps(&self) -> [i32; motion::AXIS_COUNT] {
        [
            self.current_steps(0),
            self.current_steps(1),
            self.current_steps(2),
        ]
    }

    pub fn stalled(&self, motor: usize) -> bool {
        self.shared[motor].stalled.load(Ordering::Relaxed)
    }

    /// Stall levels of the Cartesian axes.
    pub fn axis_stalled(&self) -> [bool; motion::AXIS_COUNT] {
        [self.stalled(0), self.stalled(1), self.stalled(2)]
    }

    pub fn energized(&self, motor: usize) -> bool {
        self.shared[motor].energized.load(Ordering::Relaxed)
    }

    /// Forces the energization state (step test).
    pub fn set_energized(&self, motor: usize, on: bool) {
        if motor >= MOTOR_COUNT {
            return;
        }
        let mut bank = self.bank.lock();
        Self::ensure_energized(&mut bank[motor], &self.shared[motor], on);
    }

    /// Configures the idle de-energisation timeout; negative keeps the
    /// motor always energized.
    pub fn deenergize_after(&self, motor: usize, timeout_ms: i32) {
        if motor >= MOTOR_COUNT {
            return;
        }
        let mut bank = self.bank.lock();
        let unit = &mut bank[motor];
        if timeout_ms < 0 {
            unit.always_energized = true;
            unit.idle_timeout_ticks = 0;
        } else {
            unit.always_energized = false;
            unit.idle_timeout_ticks = (timeout_ms as u32 * 1000) / STEP_TICK_PERIOD_US;
        }
    }
}
