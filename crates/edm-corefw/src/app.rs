//! Machine assembly, boot sequence, and the main command loop.

use crate::comm::{spawn_reader, Comm};
use crate::commands::handle_console_command;
use crate::gcode::Dispatcher;
use crate::hal::{PulserPort, StepDirPins, TmcPort};
use crate::motion::MotionCtl;
use crate::motor::{Motors, MOTOR_COUNT};
use crate::pulser::PulserCtl;
use crate::settings::{Settings, TmcBank};
use crate::system::SystemState;
use crate::wirefeed::WireFeed;
use anyhow::{ensure, Context, Result};
use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::info;

/// Tick periods of the periodic contexts. Tests shrink these to run the
/// same control laws faster than wall time; the per-tick semantics do not
/// change.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Step engine tick (nominally 30 µs).
    pub step_tick: Duration,
    /// Motion / pulser / wirefeed tick (nominally 1 ms).
    pub motion_tick: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            step_tick: Duration::from_micros(30),
            motion_tick: Duration::from_millis(1),
        }
    }
}

/// Everything the firmware needs from the outside world.
pub struct Hardware {
    pub console_in: Box<dyn Read + Send>,
    pub console_out: Box<dyn Write + Send>,
    pub motor_pins: Vec<Box<dyn StepDirPins>>,
    pub tmc_ports: Vec<Box<dyn TmcPort>>,
    pub pulser_port: Box<dyn PulserPort>,
    pub timing: Timing,
}

/// The assembled controller.
pub struct Machine {
    pub(crate) system: Arc<SystemState>,
    pub(crate) comm: Arc<Comm>,
    pub(crate) motors: Arc<Motors>,
    pub(crate) motion: Arc<MotionCtl>,
    pub(crate) pulser: Arc<PulserCtl>,
    pub(crate) wirefeed: Arc<WireFeed>,
    pub(crate) settings: Arc<Settings>,
    pub(crate) tmc: Arc<TmcBank>,
    pub(crate) dispatcher: Dispatcher,
    commands: Receiver<String>,
    shutdown: Arc<AtomicBool>,
    tick_threads: Vec<JoinHandle<()>>,
}

impl Machine {
    /// Boots the controller: builds every subsystem, pushes settings into
    /// hardware, and starts the periodic contexts and the reader.
    pub fn start(hw: Hardware) -> Result<Self> {
        ensure!(
            hw.motor_pins.len() == MOTOR_COUNT,
            "expected {MOTOR_COUNT} motor pin bundles"
        );
        ensure!(
            hw.tmc_ports.len() == MOTOR_COUNT,
            "expected {MOTOR_COUNT} stepper register ports"
        );

        let system = Arc::new(SystemState::new());
        let comm = Arc::new(Comm::new(system.clone(), hw.console_out));
        let motors = Arc::new(Motors::new(hw.motor_pins));
        let pulser = Arc::new(PulserCtl::new(hw.pulser_port));
        let motion = Arc::new(MotionCtl::new(
            system.clone(),
            motors.clone(),
            pulser.clone(),
        ));
        let wirefeed = Arc::new(WireFeed::new(system.clone(), motors.clone(), comm.clone()));
        let tmc: Arc<TmcBank> = Arc::new(hw.tmc_ports.into_iter().map(Mutex::new).collect());
        let settings = Arc::new(Settings::new(motion.clone(), wirefeed.clone(), tmc.clone()));
        let dispatcher = Dispatcher::new(
            comm.clone(),
            motion.clone(),
            pulser.clone(),
            wirefeed.clone(),
        );

        comm.print("step generation initialized");

        settings.apply_all();
        comm.print("default settings applied");

        // Raise TCOOLTHRS so StallGuard works at homing speed.
        for motor in 0..MOTOR_COUNT {
            if let Err(e) = tmc[motor].lock().set_tcoolthrs(750_000) {
                comm.print_err(&format!("failed to set TCOOLTHRS for motor {motor}: {e}"));
            }
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut tick_threads = Vec::new();

        // 30 µs context: step engine.
        {
            let motors = motors.clone();
            let shutdown = shutdown.clone();
            let period = hw.timing.step_tick;
            tick_threads.push(
                std::thread::Builder::new()
                    .name("step-tick".into())
                    .spawn(move || {
                        while !shutdown.load(Ordering::Relaxed) {
                            motors.step_tick();
                            std::thread::sleep(period);
                        }
                    })
                    .context("spawn step tick thread")?,
            );
        }

        // 1 ms context: motion + wirefeed ticks, pulser poll submission.
        // The I2C burst itself runs on a worker, never in the tick.
        let (poll_tx, poll_rx) = bounded::<()>(1);
        {
            let motion = motion.clone();
            let wirefeed = wirefeed.clone();
            let shutdown = shutdown.clone();
            let period = hw.timing.motion_tick;
            tick_threads.push(
                std::thread::Builder::new()
                    .name("motion-tick".into())
                    .spawn(move || {
                        while !shutdown.load(Ordering::Relaxed) {
                            motion.tick();
                            wirefeed.tick();
                            let _ = poll_tx.try_send(());
                            std::thread::sleep(period);
                        }
                    })
                    .context("spawn motion tick thread")?,
            );
        }
        {
            let pulser = pulser.clone();
            tick_threads.push(
                std::thread::Builder::new()
                    .name("pulser-poll".into())
                    .spawn(move || {
                        while poll_rx.recv().is_ok() {
                            pulser.poll_once();
                        }
                    })
                    .context("spawn pulser poll worker")?,
            );
        }
        comm.print("motion initialized with 1ms tick");
        comm.print("pulser: init ok (1ms tick)");
        comm.print("wirefeed: ready");

        // High-priority input context; single-slot command queue.
        let (cmd_tx, commands) = bounded(1);
        spawn_reader(system.clone(), hw.console_in, cmd_tx).context("spawn console reader")?;

        comm.print("EDM corefw: type 'help' for commands");
        info!("machine boot complete");

        Ok(Self {
            system,
            comm,
            motors,
            motion,
            pulser,
            wirefeed,
            settings,
            tmc,
            dispatcher,
            commands,
            shutdown,
            tick_threads,
        })
    }

    /// The main command loop. Returns when the console reaches EOF.
    pub fn run(&self) {
        while let Ok(command) = self.commands.recv() {
            handle_console_command(self, &command);
        }
        info!("console closed, main loop exiting");
    }

    /// Stops the periodic contexts and joins their threads.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.tick_threads.drain(..) {
            let _ = handle.join();
        }
    }

    /// Current physical position (tests and diagnostics).
    pub fn position(&self) -> ::motion::PhysPos {
        self.motion.pos()
    }
}
