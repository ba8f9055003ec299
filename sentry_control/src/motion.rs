//! Position control: close the loop between target offset and
//! physical position.
//!
//! Each tick reads the latest offset, plans at most one step per
//! axis (dead-zone + travel-limit clamp), applies the position deltas
//! in the same locked region, then drives the actuators. The stored
//! offset may be one frame stale relative to the vision collaborator;
//! that staleness is inherent to the decoupled producer/consumer
//! timing and accepted.

use std::time::Duration;

use tracing::{debug, info};

use sentry_common::{StepDirection, TurretConfig};
use sentry_hal::StepperMotor;

use crate::state::Shared;

/// Plan one axis step against the dead-zone and travel limits.
///
/// Returns +1 / −1 / 0. A +1 is suppressed at `position >= max_steps`
/// and a −1 at `position <= 0`, which keeps `0 <= position <=
/// max_steps` without consulting the sensors at runtime.
pub fn plan_axis_step(offset: i32, tolerance: i32, position: i32, max_steps: i32) -> i32 {
    let desired = if offset > tolerance {
        1
    } else if offset < -tolerance {
        -1
    } else {
        0
    };
    match desired {
        1 if position >= max_steps => 0,
        -1 if position <= 0 => 0,
        d => d,
    }
}

/// Result of a single position-control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionTick {
    /// `running` went false; the loop must exit.
    Halted,
    /// No valid target; both actuators stopped.
    NotTracking,
    /// Target inside the dead-zone on both axes; actuators stopped.
    Locked,
    /// Planned step deltas (either may be 0 after clamping).
    Move { step_x: i32, step_y: i32 },
}

/// The position control loop for the pan/tilt axes.
pub struct PositionLoop {
    shared: Shared,
    tolerance: i32,
    max_steps_x: i32,
    max_steps_y: i32,
    step_delay: Duration,
    idle_delay: Duration,
    lock_delay: Duration,
}

impl PositionLoop {
    pub fn new(shared: Shared, config: &TurretConfig) -> Self {
        Self {
            shared,
            tolerance: config.center_tolerance,
            max_steps_x: config.max_steps_x,
            max_steps_y: config.max_steps_y,
            step_delay: Duration::from_micros(config.step_delay_us),
            idle_delay: Duration::from_millis(config.idle_delay_ms),
            lock_delay: Duration::from_millis(config.lock_delay_ms),
        }
    }

    /// One tick: read → plan → update positions (one locked region),
    /// then act on the actuators.
    pub fn tick(&mut self, motor_x: &mut StepperMotor, motor_y: &mut StepperMotor) -> MotionTick {
        let tick = self.shared.with(|s| {
            if !s.running {
                return MotionTick::Halted;
            }
            if !s.is_tracking {
                return MotionTick::NotTracking;
            }
            let (dx, dy) = (s.target_dx, s.target_dy);
            if dx.abs() < self.tolerance && dy.abs() < self.tolerance {
                return MotionTick::Locked;
            }

            let step_x = plan_axis_step(dx, self.tolerance, s.position_x, self.max_steps_x);
            let step_y = plan_axis_step(dy, self.tolerance, s.position_y, self.max_steps_y);
            s.position_x += step_x;
            s.position_y += step_y;
            MotionTick::Move { step_x, step_y }
        });

        match tick {
            MotionTick::Halted | MotionTick::NotTracking | MotionTick::Locked => {
                motor_x.stop();
                motor_y.stop();
            }
            MotionTick::Move { step_x, step_y } => {
                match StepDirection::from_delta(step_x) {
                    Some(dir) => motor_x.step(dir),
                    None => motor_x.stop(),
                }
                match StepDirection::from_delta(step_y) {
                    Some(dir) => motor_y.step(dir),
                    None => motor_y.stop(),
                }
            }
        }
        tick
    }

    /// Run until `running` goes false.
    pub fn run(&mut self, mut motor_x: StepperMotor, mut motor_y: StepperMotor) {
        info!("position control loop started");
        loop {
            match self.tick(&mut motor_x, &mut motor_y) {
                MotionTick::Halted => break,
                MotionTick::NotTracking => std::thread::sleep(self.idle_delay),
                MotionTick::Locked => std::thread::sleep(self.lock_delay),
                MotionTick::Move { step_x, step_y } => {
                    debug!(step_x, step_y, "stepping");
                    // One shared pacing delay; both axes stepped in
                    // the same tick.
                    std::thread::sleep(self.step_delay);
                }
            }
        }
        motor_x.stop();
        motor_y.stop();
        info!("position control loop stopped");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
