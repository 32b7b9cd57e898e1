//! Tick-level tests of the motion engine against scripted inputs.

use motion::{
    MotionEngine, MotionState, PhysPos, StopReason, TickInputs, EDM_ADVANCE_MM, NOTCH_MM,
};

fn quiet() -> TickInputs {
    TickInputs::default()
}

fn run_until_stopped(engine: &mut MotionEngine, inputs: &TickInputs, max_ticks: u32) -> u32 {
    for n in 0..max_ticks {
        engine.tick(inputs);
        if engine.state() == MotionState::Stopped {
            return n + 1;
        }
    }
    panic!("engine did not stop within {max_ticks} ticks");
}

#[test]
fn normal_move_reaches_target() {
    let mut engine = MotionEngine::new();
    assert!(engine.enqueue_move(PhysPos::new(10.0, 0.0, 0.0)));
    assert_eq!(engine.state(), MotionState::Moving);

    // 10 mm at 10 mm/s is 1000 ticks of 1 ms.
    let ticks = run_until_stopped(&mut engine, &quiet(), 1100);
    assert!(ticks >= 1000, "finished implausibly early: {ticks}");
    assert_eq!(engine.last_stop_reason(), StopReason::TargetReached);
    assert!((engine.pos().x - 10.0).abs() < NOTCH_MM + 1e-4);
}

#[test]
fn tick_publishes_driver_targets() {
    let mut engine = MotionEngine::new();
    engine.set_unitsteps(0, 200.0);
    engine.enqueue_move(PhysPos::new(1.0, 0.0, 0.0));

    let target = engine.tick(&quiet()).expect("target while moving");
    // One tick moves 10 µm = 2 notches; 0.01 mm * 200 steps/mm = 2 steps.
    assert_eq!(target.steps[0], 2);
    assert_eq!(target.steps[1], 0);
    assert_eq!(target.steps[2], 0);
}

#[test]
fn cancel_stops_on_next_tick() {
    let mut engine = MotionEngine::new();
    engine.enqueue_move(PhysPos::new(10.0, 0.0, 0.0));
    for _ in 0..100 {
        engine.tick(&quiet());
    }
    let pos_before = engine.pos();

    let cancel = TickInputs {
        cancel: true,
        ..TickInputs::default()
    };
    assert_eq!(engine.tick(&cancel), None);
    assert_eq!(engine.state(), MotionState::Stopped);
    assert_eq!(engine.last_stop_reason(), StopReason::Cancelled);
    // No motion happens past the cancelling tick.
    assert_eq!(engine.pos(), pos_before);
}

#[test]
fn homing_rebases_axis_on_stall() {
    let mut engine = MotionEngine::new();
    engine.set_unitsteps(0, 200.0);
    engine.set_home_origin(0, 2.5);
    engine.set_home_side(0, -1.0);
    assert!(engine.enqueue_home(0));

    // Let it travel for a while, then report a stall with the driver at a
    // known step count.
    for _ in 0..137 {
        engine.tick(&quiet());
    }
    let stall = TickInputs {
        stalled: [true, false, false],
        current_steps: [-274, 0, 0],
        ..TickInputs::default()
    };
    engine.tick(&stall);

    assert_eq!(engine.state(), MotionState::Stopped);
    assert_eq!(engine.last_stop_reason(), StopReason::StallDetected);
    assert_eq!(engine.pos().x, 2.5);
    // offset = current_steps - round(origin * unitsteps) = -274 - 500
    assert_eq!(engine.homing_offset(0), -774);

    // Re-homing made the current mechanical position the origin, so a move
    // to the origin is a no-op.
    assert!(engine.enqueue_move(PhysPos::new(2.5, 0.0, 0.0)));
    assert_eq!(engine.state(), MotionState::Stopped);
    assert_eq!(engine.last_stop_reason(), StopReason::TargetReached);
}

#[test]
fn homing_offset_applies_to_targets() {
    let mut engine = MotionEngine::new();
    engine.set_unitsteps(0, 200.0);
    engine.enqueue_home(0);
    let stall = TickInputs {
        stalled: [true, false, false],
        current_steps: [321, 0, 0],
        ..TickInputs::default()
    };
    engine.tick(&stall);
    assert_eq!(engine.homing_offset(0), 321);

    // phys 1.0 mm maps to 200 raw steps plus the offset.
    let drv = engine.phys_to_drv(PhysPos::new(1.0, 0.0, 0.0));
    assert_eq!(drv.steps[0], 521);
}

#[test]
fn edm_bang_bang_feed() {
    let mut engine = MotionEngine::new();
    assert!(engine.enqueue_edm_move(PhysPos::new(1.0, 0.0, 0.0)));

    // Gap mostly open: inch forward 1 µm per tick.
    let open = TickInputs {
        r_open: 200,
        ..TickInputs::default()
    };
    for _ in 0..100 {
        engine.tick(&open);
    }
    let advanced = engine.pos().x;
    assert!((advanced - 100.0 * EDM_ADVANCE_MM).abs() < NOTCH_MM + 1e-4);

    // Balanced gap: hold position.
    let hold = TickInputs {
        r_open: 50,
        r_short: 50,
        ..TickInputs::default()
    };
    for _ in 0..50 {
        engine.tick(&hold);
    }
    assert_eq!(engine.pos().x, advanced);

    // Mostly shorted: retract 5 µm per tick.
    let shorted = TickInputs {
        r_short: 200,
        ..TickInputs::default()
    };
    for _ in 0..10 {
        engine.tick(&shorted);
    }
    assert!(engine.pos().x < advanced);
    assert_eq!(engine.state(), MotionState::Moving);
}

#[test]
fn edm_threshold_is_exclusive_at_127() {
    let mut engine = MotionEngine::new();
    engine.enqueue_edm_move(PhysPos::new(1.0, 0.0, 0.0));
    let boundary = TickInputs {
        r_open: 127,
        r_short: 127,
        ..TickInputs::default()
    };
    for _ in 0..20 {
        engine.tick(&boundary);
    }
    assert_eq!(engine.pos().x, 0.0, "127 must not trigger either reaction");
}

#[test]
fn busy_engine_rejects_enqueue() {
    let mut engine = MotionEngine::new();
    assert!(engine.enqueue_move(PhysPos::new(5.0, 0.0, 0.0)));
    assert!(!engine.enqueue_move(PhysPos::new(1.0, 0.0, 0.0)));
    assert!(!engine.enqueue_home(0));
}

#[test]
fn enqueue_home_rejects_bad_axis() {
    let mut engine = MotionEngine::new();
    assert!(!engine.enqueue_home(3));
}
