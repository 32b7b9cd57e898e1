//! The 1 ms motion tick: termination predicates, adaptive EDM feed, homing.
//!
//! [`MotionEngine`] owns the physical position, the path buffer of the move
//! in progress, the per-axis unit-step scale, and the homing offset that
//! bridges driver coordinates to the physical frame. Every tick consumes a
//! [`TickInputs`] snapshot and, while a move is active, returns the next
//! driver target.

use crate::path::PathBuffer;
use crate::pos::{DrvPos, PhysPos, AXIS_COUNT};

#[cfg(not(feature = "std"))]
use libm::roundf;

#[cfg(feature = "std")]
#[inline]
fn roundf(x: f32) -> f32 {
    x.round()
}

/// Commanded path velocity for normal (non-EDM) moves.
pub const VELOCITY_MM_PER_S: f32 = 10.0;

/// Tick period of the motion timer.
pub const TICK_PERIOD_S: f32 = 0.001;

/// Homing travel span; stall must occur within this distance.
pub const MAX_TRAVEL_MM: f32 = 500.0;

/// Moves shorter than this are treated as no-ops.
pub const MIN_MOVE_MM: f32 = 0.001;

/// EDM forward inch per tick when the gap reads mostly open (1 mm/s cap).
pub const EDM_ADVANCE_MM: f32 = 1e-3;

/// EDM retraction per tick when the gap reads mostly shorted (5 mm/s cap).
pub const EDM_RETRACT_MM: f32 = 5e-3;

/// A short/open ratio above this triggers the corresponding EDM reaction.
pub const EDM_RATE_THRESHOLD: u8 = 127;

/// Whether a coordinated move is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Stopped,
    Moving,
}

/// Why the last move stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    ProbeTriggered,
    StallDetected,
    Cancelled,
}

impl StopReason {
    /// Host-visible description used in completion reports.
    pub fn describe(self) -> &'static str {
        match self {
            StopReason::TargetReached => "target reached",
            StopReason::ProbeTriggered => "probe triggered",
            StopReason::StallDetected => "stall detected",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// The flavour of the move in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Constant-velocity positioning move.
    Normal,
    /// Discharge-gap controlled move; feed follows the pulser ratios.
    Edm,
    /// Stall-terminated homing move of one axis.
    Homing(usize),
}

/// Snapshot of the external state consumed by one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInputs {
    /// Global cancel flag (highest priority).
    pub cancel: bool,
    /// Per-axis stall level from the stepper DIAG pins.
    pub stalled: [bool; AXIS_COUNT],
    /// Per-axis driver step counters (for homing-offset rewrite).
    pub current_steps: [i32; AXIS_COUNT],
    /// Latest gap-open ratio from the pulser.
    pub r_open: u8,
    /// Latest gap-short ratio from the pulser.
    pub r_short: u8,
}

/// The motion controller state machine.
#[derive(Debug)]
pub struct MotionEngine {
    pos: PhysPos,
    state: MotionState,
    last_stop: StopReason,
    kind: MoveKind,
    path: Option<PathBuffer>,

    unitsteps: [f32; AXIS_COUNT],
    home_origin: [f32; AXIS_COUNT],
    home_side: [f32; AXIS_COUNT],
    homing_offset: [i32; AXIS_COUNT],
}

impl Default for MotionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionEngine {
    pub fn new() -> Self {
        Self {
            pos: PhysPos::default(),
            state: MotionState::Stopped,
            last_stop: StopReason::TargetReached,
            kind: MoveKind::Normal,
            path: None,
            unitsteps: [200.0; AXIS_COUNT],
            home_origin: [0.0; AXIS_COUNT],
            home_side: [1.0; AXIS_COUNT],
            homing_offset: [0; AXIS_COUNT],
        }
    }

    pub fn pos(&self) -> PhysPos {
        self.pos
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn last_stop_reason(&self) -> StopReason {
        self.last_stop
    }

    pub fn homing_offset(&self, axis: usize) -> i32 {
        self.homing_offset[axis]
    }

    /// Sets how many microsteps correspond to +1 mm on `axis`. May be
    /// negative to flip axis polarity.
    pub fn set_unitsteps(&mut self, axis: usize, unitsteps: f32) {
        if axis < AXIS_COUNT {
            self.unitsteps[axis] = unitsteps;
        }
    }

    /// Sets the physical coordinate the axis homes to.
    pub fn set_home_origin(&mut self, axis: usize, origin_mm: f32) {
        if axis < AXIS_COUNT {
            self.home_origin[axis] = origin_mm;
        }
    }

    /// Sets which direction (+1 / -1) the axis travels while homing.
    pub fn set_home_side(&mut self, axis: usize, side: f32) {
        if axis < AXIS_COUNT {
            self.home_side[axis] = side;
        }
    }

    /// Maps a physical position to driver microsteps.
    pub fn phys_to_drv(&self, pos: PhysPos) -> DrvPos {
        let mut steps = [0i32; AXIS_COUNT];
        for (axis, step) in steps.iter_mut().enumerate() {
            *step =
                roundf(pos.axis(axis) * self.unitsteps[axis]) as i32 + self.homing_offset[axis];
        }
        DrvPos::new(steps)
    }

    /// Starts a constant-velocity move. Returns `false` if a move is
    /// already in progress.
    pub fn enqueue_move(&mut self, to: PhysPos) -> bool {
        self.enqueue(to, MoveKind::Normal)
    }

    /// Starts an EDM (gap-controlled) move. Returns `false` if a move is
    /// already in progress.
    pub fn enqueue_edm_move(&mut self, to: PhysPos) -> bool {
        self.enqueue(to, MoveKind::Edm)
    }

    /// Starts homing one axis: travel `home_side × MAX_TRAVEL_MM` until the
    /// axis stalls. Returns `false` if busy or the axis is out of range.
    pub fn enqueue_home(&mut self, axis: usize) -> bool {
        if axis >= AXIS_COUNT {
            return false;
        }
        let mut target = self.pos;
        target.set_axis(axis, target.axis(axis) + self.home_side[axis] * MAX_TRAVEL_MM);
        self.enqueue(target, MoveKind::Homing(axis))
    }

    fn enqueue(&mut self, to: PhysPos, kind: MoveKind) -> bool {
        if self.state == MotionState::Moving {
            return false;
        }
        if self.pos.dist(&to) < MIN_MOVE_MM {
            // Nothing to do; report an immediately satisfied move.
            self.last_stop = StopReason::TargetReached;
            return true;
        }
        self.path = Some(PathBuffer::new(self.pos, to, true));
        self.kind = kind;
        self.state = MotionState::Moving;
        true
    }

    fn stop(&mut self, reason: StopReason) {
        self.state = MotionState::Stopped;
        self.last_stop = reason;
        self.path = None;
    }

    /// Advances the move by one tick. Returns the new driver target while
    /// the move continues; `None` once stopped (by any stop reason).
    pub fn tick(&mut self, inputs: &TickInputs) -> Option<DrvPos> {
        if self.state != MotionState::Moving {
            return None;
        }

        // Cancellation wins over every other condition.
        if inputs.cancel {
            self.stop(StopReason::Cancelled);
            return None;
        }

        // Homing terminates on stall: rebase driver coordinates so the
        // current mechanical position maps to the configured origin.
        if let MoveKind::Homing(axis) = self.kind {
            if inputs.stalled[axis] {
                let expected = roundf(self.home_origin[axis] * self.unitsteps[axis]) as i32;
                self.homing_offset[axis] = inputs.current_steps[axis] - expected;
                self.pos.set_axis(axis, self.home_origin[axis]);
                self.stop(StopReason::StallDetected);
                return None;
            }
        }

        let path = self.path.as_mut()?;
        match self.kind {
            MoveKind::Edm => {
                if inputs.r_open > EDM_RATE_THRESHOLD {
                    // Mostly open: too far from the workpiece, inch forward.
                    let _ = path.move_by(EDM_ADVANCE_MM);
                } else if inputs.r_short > EDM_RATE_THRESHOLD {
                    // Mostly shorted: too close, retract faster.
                    let _ = path.move_by(-EDM_RETRACT_MM);
                }
            }
            MoveKind::Normal | MoveKind::Homing(_) => {
                let _ = path.move_by(VELOCITY_MM_PER_S * TICK_PERIOD_S);
            }
        }
        self.pos = path.get_pos();

        if path.at_end() {
            self.stop(StopReason::TargetReached);
            return None;
        }

        Some(self.phys_to_drv(self.pos))
    }
}
