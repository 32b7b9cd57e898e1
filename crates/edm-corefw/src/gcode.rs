//! G/M-code dispatch.
//!
//! Binds parsed commands to motion, pulser, and wirefeed actions, enforces
//! parameter shape, and blocks on motion completion (polling at 10 ms).
//! A cancelled move additionally de-energises the pulser.

use crate::comm::Comm;
use crate::motion::MotionCtl;
use crate::pulser::PulserCtl;
use crate::wirefeed::WireFeed;
use ::motion::{MotionState, PhysPos, StopReason};
use edm_gcode::{AxisArg, CmdKind, Command};
use std::sync::Arc;
use std::time::Duration;

/// Poll interval while waiting for motion to stop.
pub const MOTION_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Pulse-on time default for M3/M4 (µs).
pub const DEFAULT_PULSE_US: f32 = 500.0;
/// Pulse current default for M3/M4 (A).
pub const DEFAULT_CURRENT_A: f32 = 1.0;
/// Duty factor default for M3/M4 (%).
pub const DEFAULT_DUTY_PCT: f32 = 25.0;

/// Executes G/M-code commands against the machine.
pub struct Dispatcher {
    comm: Arc<Comm>,
    motion: Arc<MotionCtl>,
    pulser: Arc<PulserCtl>,
    wirefeed: Arc<WireFeed>,
}

impl Dispatcher {
    pub fn new(
        comm: Arc<Comm>,
        motion: Arc<MotionCtl>,
        pulser: Arc<PulserCtl>,
        wirefeed: Arc<WireFeed>,
    ) -> Self {
        Self {
            comm,
            motion,
            pulser,
            wirefeed,
        }
    }

    /// Parses and executes one G/M-code line.
    pub fn exec(&self, line: &str) {
        let cmd = match edm_gcode::parse(line) {
            Ok(cmd) => cmd,
            Err(e) => {
                self.comm.print_err(&format!("failed to parse G/M-code: {e}"));
                return;
            }
        };

        match (cmd.kind, cmd.code, cmd.sub_code) {
            (CmdKind::G, 0, None) => self.linear_move(&cmd, false),
            (CmdKind::G, 1, None) => self.linear_move(&cmd, true),
            (CmdKind::G, 28, None) => self.home(&cmd),
            (CmdKind::M, 3, None) => self.energize(&cmd, true),
            (CmdKind::M, 4, None) => self.energize(&cmd, false),
            (CmdKind::M, 5, None) => self.deenergize(),
            (CmdKind::M, 10, None) => self.wirefeed_start(&cmd),
            (CmdKind::M, 11, None) => self.wirefeed.stop(),
            (CmdKind::G, code, _) => {
                self.comm.print_err(&format!("unsupported G-code: G{code}"));
            }
            (CmdKind::M, code, _) => {
                self.comm.print_err(&format!("unsupported M-code: M{code}"));
            }
        }
    }

    /// G0 (rapid) / G1 (EDM): overlay supplied axis values on the current
    /// position.
    fn linear_move(&self, cmd: &Command, edm: bool) {
        let name = if edm { "G1" } else { "G0" };
        if cmd.x.is_bare() || cmd.y.is_bare() || cmd.z.is_bare() {
            self.comm
                .print_err(&format!("{name} requires axis values (e.g., X10.5), not bare axes"));
            return;
        }
        if !cmd.x.is_present() && !cmd.y.is_present() && !cmd.z.is_present() {
            self.comm
                .print_err(&format!("{name} requires at least one axis parameter"));
            return;
        }

        let target = overlay_axes(self.motion.pos(), cmd);
        let started = if edm {
            self.motion.enqueue_edm_move(target)
        } else {
            self.motion.enqueue_move(target)
        };
        if !started {
            self.comm.print_err("motion controller busy");
            return;
        }
        self.wait_motion_completion();
    }

    /// G28: home exactly one bare axis.
    fn home(&self, cmd: &Command) {
        let values = [cmd.x, cmd.y, cmd.z];
        let bare_count = values.iter().filter(|a| a.is_bare()).count();
        let with_value = values.iter().any(|a| a.value().is_some());
        if bare_count != 1 || with_value {
            self.comm
                .print_err("G28 requires exactly one axis without value (X, Y, or Z)");
            return;
        }
        let axis = values
            .iter()
            .position(|a| a.is_bare())
            .unwrap_or_default();

        if !self.motion.enqueue_home(axis) {
            self.comm.print_err("motion controller busy");
            return;
        }
        self.wait_motion_completion();
    }

    /// M3 (tool-negative) / M4 (tool-positive) with P/Q/R defaults.
    fn energize(&self, cmd: &Command, negative: bool) {
        let pulse_us = cmd.p.unwrap_or(DEFAULT_PULSE_US);
        let current_a = cmd.q.unwrap_or(DEFAULT_CURRENT_A);
        let duty_pct = cmd.r.unwrap_or(DEFAULT_DUTY_PCT);

        match self.pulser.energize(negative, pulse_us, current_a, duty_pct) {
            Ok(()) => self.comm.print(&format!(
                "pulser energized: {}, {pulse_us:.0}us, {current_a:.1}A, {duty_pct:.0}%",
                if negative { "T-" } else { "T+" }
            )),
            Err(e) => self.comm.print_err(&format!("pulser energize failed: {e}")),
        }
    }

    fn deenergize(&self) {
        match self.pulser.deenergize() {
            Ok(()) => self.comm.print("pulser de-energized"),
            Err(e) => self
                .comm
                .print_err(&format!("pulser de-energize failed: {e}")),
        }
    }

    /// M10: start wire feed; R is mandatory.
    fn wirefeed_start(&self, cmd: &Command) {
        match cmd.r {
            Some(rate) => self.wirefeed.start(rate),
            None => self
                .comm
                .print_err("M10 requires R parameter (feed rate in mm/min)"),
        }
    }

    /// Polls until motion stops, then reports the stop reason.
    fn wait_motion_completion(&self) {
        loop {
            if self.motion.state() == MotionState::Stopped {
                let reason = self.motion.last_stop_reason();
                match reason {
                    StopReason::Cancelled => {
                        self.comm.print("motion cancelled");
                        match self.pulser.deenergize() {
                            Ok(()) => self.comm.print("pulser de-energized for safety"),
                            Err(e) => self
                                .comm
                                .print_err(&format!("pulser de-energize failed: {e}")),
                        }
                    }
                    reason => self
                        .comm
                        .print(&format!("motion completed: {}", reason.describe())),
                }
                return;
            }
            std::thread::sleep(MOTION_POLL_INTERVAL);
        }
    }
}

/// Overlays the command's axis values on top of `current`; unspecified
/// axes keep their position.
pub fn overlay_axes(current: PhysPos, cmd: &Command) -> PhysPos {
    let mut target = current;
    if let AxisArg::Value(x) = cmd.x {
        target.x = x;
    }
    if let AxisArg::Value(y) = cmd.y {
        target.y = y;
    }
    if let AxisArg::Value(z) = cmd.z {
        target.z = z;
    }
    target
}
