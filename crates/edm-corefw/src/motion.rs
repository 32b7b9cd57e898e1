//! Glue between the pure motion engine and the rest of the machine.
//!
//! The 1 ms tick gathers the engine's inputs (cancel flag, stall levels,
//! step counters, discharge ratios), runs the engine, and publishes the
//! resulting driver target to the step engine.

use crate::motor::Motors;
use crate::pulser::PulserCtl;
use crate::system::SystemState;
use ::motion::{MotionEngine, MotionState, PhysPos, StopReason, TickInputs};
use parking_lot::Mutex;
use std::sync::Arc;

/// The motion controller as seen by the dispatcher and settings store.
pub struct MotionCtl {
    engine: Mutex<MotionEngine>,
    system: Arc<SystemState>,
    motors: Arc<Motors>,
    pulser: Arc<PulserCtl>,
}

impl MotionCtl {
    pub fn new(system: Arc<SystemState>, motors: Arc<Motors>, pulser: Arc<PulserCtl>) -> Self {
        Self {
            engine: Mutex::new(MotionEngine::new()),
            system,
            motors,
            pulser,
        }
    }

    /// One 1 ms tick (timer context).
    pub fn tick(&self) {
        let snapshot = self.pulser.snapshot();
        let inputs = TickInputs {
            cancel: self.system.cancel_requested(),
            stalled: self.motors.axis_stalled(),
            current_steps: self.motors.axis_current_steps(),
            r_open: snapshot.r_open,
            r_short: snapshot.r_short,
        };
        let target = self.engine.lock().tick(&inputs);
        if let Some(target) = target {
            self.motors.set_axis_targets(target);
        }
    }

    pub fn enqueue_move(&self, to: PhysPos) -> bool {
        self.engine.lock().enqueue_move(to)
    }

    pub fn enqueue_edm_move(&self, to: PhysPos) -> bool {
        self.engine.lock().enqueue_edm_move(to)
    }

    pub fn enqueue_home(&self, axis: usize) -> bool {
        self.engine.lock().enqueue_home(axis)
    }

    pub fn pos(&self) -> PhysPos {
        self.engine.lock().pos()
    }

    pub fn state(&self) -> MotionState {
        self.engine.lock().state()
    }

    pub fn last_stop_reason(&self) -> StopReason {
        self.engine.lock().last_stop_reason()
    }

    pub fn homing_offset(&self, axis: usize) -> i32 {
        self.engine.lock().homing_offset(axis)
    }

    pub fn set_unitsteps(&self, axis: usize, unitsteps: f32) {
        self.engine.lock().set_unitsteps(axis, unitsteps);
    }

    pub fn set_home_origin(&self, axis: usize, origin_mm: f32) {
        self.engine.lock().set_home_origin(axis, origin_mm);
    }

    pub fn set_home_side(&self, axis: usize, side: f32) {
        self.engine.lock().set_home_side(axis, side);
    }
}
