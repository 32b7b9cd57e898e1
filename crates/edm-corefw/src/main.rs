//! # EDM Controller Core Firmware
//!
//! Binary entry point. Runs the full control plane against simulated
//! peripherals, speaking the console protocol on stdin/stdout; internal
//! diagnostics go to stderr via `tracing`.

use anyhow::Result;
use clap::Parser;
use driver_pulser::Pulser;
use driver_tmc::{MotorPins, Tmc2209};
use edm_corefw::{Hardware, Machine, StepDirPins, Timing, TmcPort};
use sim::{InstantDelay, MotorSim, PulserSim, TmcSim};
use std::time::Duration;

/// Core firmware of the multi-axis EDM controller.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Step engine tick period in microseconds.
    #[arg(long, default_value_t = 30)]
    step_tick_us: u64,

    /// Motion/pulser tick period in microseconds.
    #[arg(long, default_value_t = 1000)]
    motion_tick_us: u64,
}

fn main() -> Result<()> {
    // The console protocol owns stdout; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let motors: Vec<MotorSim> = (0..edm_corefw::motor::MOTOR_COUNT)
        .map(|_| MotorSim::new())
        .collect();
    let motor_pins = motors
        .iter()
        .map(|motor| {
            let (step, dir, enable, diag) = motor.pins();
            Box::new(MotorPins::new(step, dir, enable, diag)) as Box<dyn StepDirPins>
        })
        .collect();

    let tmc_ports = (0..edm_corefw::motor::MOTOR_COUNT)
        .map(|_| {
            Box::new(Tmc2209::new(TmcSim::new(), InstantDelay)) as Box<dyn TmcPort>
        })
        .collect();

    let board = PulserSim::new();
    let pulser_port = Box::new(Pulser::new(board.clone(), board.gate_pin()));

    let hw = Hardware {
        console_in: Box::new(std::io::stdin()),
        console_out: Box::new(std::io::stdout()),
        motor_pins,
        tmc_ports,
        pulser_port,
        timing: Timing {
            step_tick: Duration::from_micros(cli.step_tick_us),
            motion_tick: Duration::from_micros(cli.motion_tick_us),
        },
    };

    let machine = Machine::start(hw)?;
    machine.run();
    machine.shutdown();
    Ok(())
}
