//! Wire-feed controller for the auxiliary feed motor.
//!
//! A 1 ms tick integrates the feed rate into a position and republishes the
//! feed motor's step target. Cancellation stops the feed on the next tick.

use crate::comm::Comm;
use crate::motor::Motors;
use crate::system::SystemState;
use parking_lot::Mutex;
use std::sync::Arc;

/// Motor index driving the wire feed.
pub const WIREFEED_MOTOR: usize = 6;

const TICK_PERIOD_S: f32 = 0.001;

#[derive(Debug)]
struct FeedState {
    feeding: bool,
    pos_mm: f32,
    feedrate_mm_per_min: f32,
    mm_per_tick: f32,
    unitsteps: f32,
}

/// Wire feed status snapshot for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct WireFeedStatus {
    pub feeding: bool,
    pub pos_mm: f32,
    pub feedrate_mm_per_min: f32,
    pub unitsteps: f32,
}

pub struct WireFeed {
    system: Arc<SystemState>,
    motors: Arc<Motors>,
    comm: Arc<Comm>,
    state: Mutex<FeedState>,
}

impl WireFeed {
    pub fn new(system: Arc<SystemState>, motors: Arc<Motors>, comm: Arc<Comm>) -> Self {
        Self {
            system,
            motors,
            comm,
            state: Mutex::new(FeedState {
                feeding: false,
                pos_mm: 0.0,
                feedrate_mm_per_min: 0.0,
                mm_per_tick: 0.0,
                unitsteps: 200.0,
            }),
        }
    }

    /// One 1 ms tick (timer context).
    pub fn tick(&self) {
        let mut state = self.state.lock();
        if !state.feeding {
            return;
        }
        if self.system.cancel_requested() {
            state.feeding = false;
            return;
        }
        state.pos_mm += state.mm_per_tick;
        let target = (state.pos_mm * state.unitsteps) as i32;
        self.motors.set_target(WIREFEED_MOTOR, target);
    }

    /// Starts feeding at `feedrate_mm_per_min`.
    pub fn start(&self, feedrate_mm_per_min: f32) {
        {
            let mut state = self.state.lock();
            state.feedrate_mm_per_min = feedrate_mm_per_min;
            state.mm_per_tick = (feedrate_mm_per_min / 60.0) * TICK_PERIOD_S;
            state.feeding = true;
        }
        self.comm
            .print(&format!("wirefeed: start feed={feedrate_mm_per_min:.3} mm/min"));
    }

    /// Stops feeding.
    pub fn stop(&self) {
        self.state.lock().feeding = false;
        self.comm.print("wirefeed: stop");
    }

    /// Sets the feed motor's steps-per-mm conversion.
    pub fn set_unitsteps(&self, unitsteps: f32) {
        self.state.lock().unitsteps = unitsteps;
    }

    pub fn status(&self) -> WireFeedStatus {
        let state = self.state.lock();
        WireFeedStatus {
            feeding: state.feeding,
            pos_mm: state.pos_mm,
            feedrate_mm_per_min: state.feedrate_mm_per_min,
            unitsteps: state.unitsteps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::StepDirPins;
    use crate::motor::MOTOR_COUNT;

    struct NullPins;

    impl StepDirPins for NullPins {
        fn set_step(&mut self, _high: bool) {}
        fn set_dir(&mut self, _forward: bool) {}
        fn energize(&mut self, _on: bool) {}
        fn stalled(&mut self) -> bool {
            false
        }
    }

    fn fixture() -> (Arc<SystemState>, Arc<Motors>, WireFeed) {
        let system = Arc::new(SystemState::new());
        let pins = (0..MOTOR_COUNT)
            .map(|_| Box::new(NullPins) as Box<dyn StepDirPins>)
            .collect();
        let motors = Arc::new(Motors::new(pins));
        let comm = Arc::new(Comm::new(system.clone(), Box::new(std::io::sink())));
        let feed = WireFeed::new(system.clone(), motors.clone(), comm);
        (system, motors, feed)
    }

    #[test]
    fn feed_advances_motor_target() {
        let (_system, motors, feed) = fixture();
        // 60 mm/min is 1 mm/s, i.e. 1 um per 1 ms tick.
        feed.start(60.0);
        for _ in 0..1000 {
            feed.tick();
        }
        // 1 mm at 200 steps/mm.
        let target = motors.target(WIREFEED_MOTOR);
        assert!((199..=200).contains(&target), "target was {target}");
    }

    #[test]
    fn idle_feed_does_nothing() {
        let (_system, motors, feed) = fixture();
        for _ in 0..100 {
            feed.tick();
        }
        assert_eq!(motors.target(WIREFEED_MOTOR), 0);
    }

    #[test]
    fn cancel_stops_feeding() {
        let (system, _motors, feed) = fixture();
        feed.start(120.0);
        feed.tick();
        system.request_cancel();
        feed.tick();
        assert!(!feed.status().feeding);
    }
}
