//! Console command handling.
//!
//! The main loop hands each accepted line here: the machine enters
//! `EXEC_INTERACTIVE`, acknowledges, executes, then returns to `IDLE` and
//! reports the current position.

use crate::app::Machine;
use crate::motor::MOTOR_COUNT;
use edm_proto::Mode;
use std::time::Duration;

/// Steps driven by `steptest`: two rotations at 32 microsteps.
const STEPTEST_STEPS: u32 = 2 * 200 * 32;

/// Pacing of `steptest` step emission.
const STEPTEST_STEP_INTERVAL: Duration = Duration::from_micros(250);

/// Executes one console command line end to end.
pub fn handle_console_command(machine: &Machine, command: &str) {
    machine.system.set_mode(Mode::ExecInteractive);
    machine.comm.print_ack();

    // G/M-code lines keep their full text; everything else splits into
    // command word and arguments.
    if command.starts_with('G') || command.starts_with('M') {
        machine.dispatcher.exec(command);
    } else {
        let mut parts = command.splitn(2, char::is_whitespace);
        let word = parts.next().unwrap_or_default();
        let args = parts.next().unwrap_or_default().trim();

        match word {
            "help" => cmd_help(machine),
            "stat" => cmd_stat(machine, args),
            "get" => cmd_get(machine, args),
            "set" => cmd_set(machine, args),
            "steptest" => cmd_steptest(machine, args),
            "dump" => cmd_dump(machine),
            _ => machine.comm.print_err(&format!(
                "unknown command: {word}; type 'help' for available commands"
            )),
        }
    }

    machine.system.clear_cancel();
    machine.system.set_mode(Mode::Idle);
    let pos = machine.motion.pos();
    machine.comm.print(&format!(
        "ready X{:.3} Y{:.3} Z{:.3}",
        pos.x, pos.y, pos.z
    ));
}

fn cmd_help(machine: &Machine) {
    let comm = &machine.comm;
    comm.print("help - Show this help");
    comm.print("stat motor|pulser|wirefeed - Show subsystem status");
    comm.print("get - List all variables with values");
    comm.print("get <var> - Get specific variable value");
    comm.print("set <var> <val> - Set variable to value");
    comm.print("steptest <motor> - Step motor test");
    comm.print("dump - Print EDM sample log as blob");
    comm.print("G0 X.. Y.. Z.. - Rapid move");
    comm.print("G1 X.. Y.. Z.. - EDM move");
    comm.print("G28 X|Y|Z - Home one axis");
    comm.print("M3/M4 [P..] [Q..] [R..] - Energize pulser (tool -/+)");
    comm.print("M5 - De-energize pulser");
    comm.print("M10 R<mm/min> - Start wire feed");
    comm.print("M11 - Stop wire feed");
    comm.print("! - Cancel current operation");
}

fn cmd_stat(machine: &Machine, args: &str) {
    match args {
        "motor" => cmd_stat_motor(machine),
        "pulser" => cmd_stat_pulser(machine),
        "wirefeed" => cmd_stat_wirefeed(machine),
        _ => machine.comm.print_err("usage: stat motor|pulser|wirefeed"),
    }
}

fn cmd_stat_motor(machine: &Machine) {
    for motor in 0..MOTOR_COUNT {
        machine.comm.print(&format!(
            "mot{motor}: current_steps:{} energized:{}",
            machine.motors.current_steps(motor),
            machine.motors.energized(motor)
        ));
        match machine.tmc[motor].lock().dump_regs() {
            Ok(regs) => machine.comm.print(&format!("mot{motor}: {regs}")),
            Err(e) => machine.comm.print(&format!("mot{motor}: error {e}")),
        }
    }
}

fn cmd_stat_pulser(machine: &Machine) {
    let comm = &machine.comm;
    let snapshot = machine.pulser.snapshot();
    comm.print(&format!("poll count: {}", machine.pulser.poll_count()));
    comm.print(&format!(
        "EDM state: n_pulse={}, r_pulse={}, r_short={}, r_open={}",
        snapshot.n_pulse, snapshot.r_pulse, snapshot.r_short, snapshot.r_open
    ));
    comm.print(&format!(
        "EDM buffer: {}/{} entries",
        machine.pulser.sample_count(),
        machine.pulser.sample_capacity()
    ));
    match machine.pulser.temperature() {
        Ok(celsius) => {
            comm.print(&format!("temperature: {celsius}"));
            comm.print("status: ok");
        }
        Err(_) => comm.print("status: i2c read fail"),
    }
}

fn cmd_stat_wirefeed(machine: &Machine) {
    let comm = &machine.comm;
    let status = machine.wirefeed.status();
    comm.print(&format!(
        "wirefeed: {}",
        if status.feeding { "FEEDING" } else { "STOPPED" }
    ));
    comm.print(&format!("  position: {:.3} mm", status.pos_mm));
    comm.print(&format!(
        "  feedrate: {:.3} mm/min",
        status.feedrate_mm_per_min
    ));
    comm.print(&format!("  unitsteps: {:.3} steps/mm", status.unitsteps));
}

fn cmd_get(machine: &Machine, args: &str) {
    if args.is_empty() {
        for (key, value) in machine.settings.list() {
            machine.comm.print(&format!("{key} {value:.1}"));
        }
        return;
    }
    match machine.settings.get(args) {
        Some(value) => machine.comm.print(&format!("{value:.1}")),
        None => machine.comm.print_err(&format!("unknown variable {args}")),
    }
}

fn cmd_set(machine: &Machine, args: &str) {
    let mut parts = args.splitn(2, char::is_whitespace);
    let (key, value_str) = match (parts.next(), parts.next()) {
        (Some(key), Some(value)) if !key.is_empty() => (key, value.trim()),
        _ => {
            machine.comm.print_err("usage: set <var> <val>");
            return;
        }
    };
    let value: f32 = match value_str.parse() {
        Ok(value) => value,
        Err(_) => {
            machine
                .comm
                .print_err(&format!("invalid value for {key}: {value_str}"));
            return;
        }
    };
    if let Err(e) = machine.settings.set(key, value) {
        machine.comm.print_err(&format!("failed to set {key}: {e}"));
    }
}

/// Diagnostic: free-run one motor while watching StallGuard.
fn cmd_steptest(machine: &Machine, args: &str) {
    let motor: usize = match args.parse() {
        Ok(motor) if motor < MOTOR_COUNT => motor,
        _ => {
            machine
                .comm
                .print_err(&format!("invalid motor number: {args}"));
            return;
        }
    };

    machine
        .comm
        .print(&format!("running steptest on motor {motor}"));
    machine.motors.set_energized(motor, true);

    for step in 0..STEPTEST_STEPS {
        if machine.system.cancel_requested() {
            machine
                .comm
                .print(&format!("steptest cancelled at step {step}"));
            break;
        }

        machine.motors.queue_step(motor, true);
        std::thread::sleep(STEPTEST_STEP_INTERVAL);

        // SG_RESULT sampled every 100 steps (50 ms at 500 us/step).
        if step % 100 == 0 {
            match machine.tmc[motor].lock().sg_result() {
                Ok(sg) => machine.comm.print(&format!("SG:{sg}")),
                Err(e) => {
                    machine.comm.print_err(&format!("SG read failed: {e}"));
                    break;
                }
            }
        }

        if machine.motors.stalled(motor) {
            machine
                .comm
                .print(&format!("stall detected at step {step}"));
            break;
        }
    }

    machine.motors.set_energized(motor, false);
}

fn cmd_dump(machine: &Machine) {
    let log = machine.pulser.copy_log();
    machine.comm.print_blob(&log);
}
