//! Integration tests for the turret controller.
//!
//! These tests exercise multiple modules together: homing into the
//! running state, the tracking → fire → retract cycle across the
//! worker seams, and a full threaded run against the sim backend.

use std::time::Duration;

use sentry_common::{Axis, SensorEvent, TurretConfig};
use sentry_control::fire::{FireSequencer, FireTick};
use sentry_control::homing::{HomingController, HomingTick};
use sentry_control::motion::{MotionTick, PositionLoop};
use sentry_control::piston::{PistonTick, PistonWorker};
use sentry_control::runner::Runner;
use sentry_control::state::Shared;
use sentry_hal::backend::{register_builtin, BackendOptions, BackendRegistry};
use sentry_hal::{FireServo, SimCoilBus, SimPwm, StepperMotor};

// ── Helpers ─────────────────────────────────────────────────────────

fn fast_config() -> TurretConfig {
    let mut config = TurretConfig::with_limits(200, 200);
    config.piston_retract_steps = 12;
    config.step_delay_us = 1;
    config.idle_delay_ms = 1;
    config.lock_delay_ms = 1;
    config.fire_dwell_ms = 0;
    config
}

fn sim_motor() -> (StepperMotor, SimCoilBus) {
    let bus = SimCoilBus::new();
    let probe = bus.probe();
    (StepperMotor::new(Box::new(bus)), probe)
}

fn sim_servo() -> (FireServo, SimPwm) {
    let pwm = SimPwm::new();
    let probe = pwm.probe();
    (FireServo::new(Box::new(pwm)), probe)
}

fn latch(shared: &Shared, axis: Axis) {
    shared.apply_sensor_event(SensorEvent {
        axis,
        triggered: true,
    });
}

// ── Startup: homing into the running state ──────────────────────────

#[test]
fn homing_seeks_until_both_sensors_latch() {
    let config = fast_config();
    let shared = Shared::new(config.center_tolerance);
    let mut homing = HomingController::new(shared.clone(), Duration::ZERO);
    let (mut motor_x, probe_x) = sim_motor();
    let (mut motor_y, probe_y) = sim_motor();

    // X latches at tick 10, Y at tick 15; completion on tick 16.
    let mut completed_at = None;
    for tick in 0..32 {
        if tick == 10 {
            latch(&shared, Axis::X);
        }
        if tick == 15 {
            latch(&shared, Axis::Y);
        }
        if homing.tick(&mut motor_x, &mut motor_y) == HomingTick::Complete {
            completed_at = Some(tick);
            break;
        }
    }
    assert_eq!(completed_at, Some(15));

    let s = shared.snapshot();
    assert!(s.running);
    assert!(!s.calibrating);
    assert_eq!((s.position_x, s.position_y), (0, 0));

    // X stepped 10 times then held while Y kept seeking; both got the
    // final all-off write on completion.
    assert_eq!(probe_x.write_count(), 11);
    assert_eq!(probe_y.write_count(), 16);
    assert_eq!(probe_x.last(), Some([false; 4]));
    assert_eq!(probe_y.last(), Some([false; 4]));
}

#[test]
fn sensor_bounce_during_homing_cannot_unlatch() {
    let config = fast_config();
    let shared = Shared::new(config.center_tolerance);
    let mut homing = HomingController::new(shared.clone(), Duration::ZERO);
    let (mut motor_x, _) = sim_motor();
    let (mut motor_y, _) = sim_motor();

    latch(&shared, Axis::X);
    // Mechanical bounce: the sensor reads untriggered again.
    shared.apply_sensor_event(SensorEvent {
        axis: Axis::X,
        triggered: false,
    });

    // X stays latched; only Y is still seeking.
    assert_eq!(
        homing.tick(&mut motor_x, &mut motor_y),
        HomingTick::Seeking {
            step_x: false,
            step_y: true
        }
    );
}

// ── Tracking → fire → retract, tick by tick ─────────────────────────

#[test]
fn full_shot_cycle_across_workers() {
    let config = fast_config();
    let shared = Shared::new(config.center_tolerance);
    shared.with(|s| {
        s.calibrating = false;
        s.running = true;
    });

    let mut motion = PositionLoop::new(shared.clone(), &config);
    let mut fire = FireSequencer::new(shared.clone(), &config);
    let mut piston = PistonWorker::new(shared.clone(), &config);

    let (mut motor_x, _) = sim_motor();
    let (mut motor_y, _) = sim_motor();
    let (mut piston_motor, piston_probe) = sim_motor();
    let (mut servo, servo_probe) = sim_servo();

    // Target well off-center: tracks without arming a shot.
    assert!(!shared.update_target(90, 0));
    assert_eq!(
        motion.tick(&mut motor_x, &mut motor_y),
        MotionTick::Move {
            step_x: 1,
            step_y: 0
        }
    );
    assert_eq!(fire.tick(&mut servo), FireTick::Idle);
    assert_eq!(piston.tick(&mut piston_motor), PistonTick::Idle);

    // Fresh frame inside the dead-zone: fire request armed.
    assert!(shared.update_target(5, -3));
    assert_eq!(motion.tick(&mut motor_x, &mut motor_y), MotionTick::Locked);

    // The shot completes and hands off to the piston worker.
    assert_eq!(fire.tick(&mut servo), FireTick::Fired);
    let s = shared.snapshot();
    assert!(!s.is_firing);
    assert!(s.piston_trigger);
    assert_eq!(
        servo_probe.history(),
        vec![
            sentry_hal::servo::OFF_DUTY, // idle tick above
            sentry_hal::servo::EXTENDED_DUTY,
            sentry_hal::servo::REST_DUTY,
        ]
    );

    // A centered frame may re-arm already, but the sequencer defers
    // the new request until the retraction handshake has cleared.
    assert!(shared.update_target(0, 0));
    assert_eq!(fire.tick(&mut servo), FireTick::Idle);
    assert!(shared.snapshot().is_firing);

    // Retraction drives the exact configured burst.
    assert_eq!(
        piston.tick(&mut piston_motor),
        PistonTick::Retracted { steps: 12 }
    );
    assert_eq!(piston_probe.write_count(), 13);
    assert_eq!(piston_probe.last(), Some([false; 4]));
    assert!(!shared.snapshot().piston_retracting);

    // Handshake cleared: the deferred request is honored.
    assert_eq!(fire.tick(&mut servo), FireTick::Fired);
}

#[test]
fn tracking_converges_as_frames_arrive() {
    let config = fast_config();
    let shared = Shared::new(config.center_tolerance);
    shared.with(|s| {
        s.calibrating = false;
        s.running = true;
    });

    let mut motion = PositionLoop::new(shared.clone(), &config);
    let (mut motor_x, _) = sim_motor();
    let (mut motor_y, _) = sim_motor();

    // A stationary target: each frame reports the offset left after
    // the steps taken so far. One step per tick closes in until the
    // offset reaches the dead-zone edge, where stepping stops.
    let target_px = 80;
    for _ in 0..200 {
        let position = shared.snapshot().position_x;
        shared.update_target(target_px - position, 0);
        let tick = motion.tick(&mut motor_x, &mut motor_y);
        if tick != (MotionTick::Move { step_x: 1, step_y: 0 }) {
            break;
        }
    }
    assert_eq!(
        shared.snapshot().position_x,
        target_px - config.center_tolerance
    );

    // Exactly at the edge no shot is armed; the first frame strictly
    // inside the dead-zone arms one.
    assert!(!shared.snapshot().is_firing);
    assert!(shared.update_target(config.center_tolerance - 1, 0));
    assert_eq!(motion.tick(&mut motor_x, &mut motor_y), MotionTick::Locked);
}

#[test]
fn target_loss_stops_tracking() {
    let config = fast_config();
    let shared = Shared::new(config.center_tolerance);
    shared.with(|s| {
        s.calibrating = false;
        s.running = true;
    });

    let mut motion = PositionLoop::new(shared.clone(), &config);
    let (mut motor_x, probe_x) = sim_motor();
    let (mut motor_y, _) = sim_motor();

    shared.update_target(90, 0);
    assert!(matches!(
        motion.tick(&mut motor_x, &mut motor_y),
        MotionTick::Move { .. }
    ));

    shared.clear_target();
    assert_eq!(
        motion.tick(&mut motor_x, &mut motor_y),
        MotionTick::NotTracking
    );
    assert_eq!(probe_x.last(), Some([false; 4]));
    // Position is retained for the next acquisition.
    assert_eq!(shared.snapshot().position_x, 1);
}

// ── Threaded end-to-end run against the sim backend ─────────────────

#[test]
fn runner_completes_a_shot_cycle_end_to_end() {
    let config = fast_config();
    let runner = Runner::new(config);
    let shared = runner.shared();

    let mut registry = BackendRegistry::new();
    register_builtin(&mut registry);
    let backend = registry
        .create(
            "sim",
            &BackendOptions {
                seed: Some(11),
                trigger_odds: Some(2),
            },
        )
        .unwrap();

    let feed = {
        let shared = shared.clone();
        std::thread::spawn(move || {
            // Wait out homing.
            while !shared.is_running() {
                if shared.is_shutdown() {
                    return;
                }
                std::thread::sleep(Duration::from_millis(1));
            }

            // Centered target: arms a shot immediately.
            assert!(shared.update_target(0, 0));

            // Wait for the fire → retract handshake to fully clear.
            for _ in 0..500 {
                let s = shared.snapshot();
                if !s.is_firing && !s.piston_trigger && !s.piston_retracting {
                    break;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            let s = shared.snapshot();
            assert!(!s.is_firing, "shot never completed");
            assert!(!s.piston_trigger && !s.piston_retracting);

            shared.request_shutdown();
        })
    };

    runner.run(backend).unwrap();
    feed.join().unwrap();
    assert!(!shared.is_running());
}
