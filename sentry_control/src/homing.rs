//! Homing: drive both axes to their physical zero.
//!
//! Two identical per-axis state machines (seeking → at-limit) ticked
//! together once per step interval. Limit-sensor edges are applied to
//! the shared state by the sensor worker (with the calibration
//! debounce rule, see [`crate::state::Shared::apply_sensor_event`]);
//! the homing tick only reads the latched flags.
//!
//! Terminal condition: both axes latched → both actuators stopped,
//! step counters zeroed, `calibrating = false`, `running = true`.
//! Homing runs to completion (or abort) before any runtime worker
//! starts.

use std::time::Duration;

use tracing::info;

use sentry_common::StepDirection;
use sentry_hal::StepperMotor;

use crate::state::Shared;

/// Result of a single homing tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingTick {
    /// Still seeking; the flagged axes were stepped towards home.
    Seeking { step_x: bool, step_y: bool },
    /// Both axes at their limit; system is now running.
    Complete,
    /// Shutdown was requested before homing finished.
    Aborted,
}

/// Drives the homing procedure against the shared state.
pub struct HomingController {
    shared: Shared,
    step_delay: Duration,
}

impl HomingController {
    pub fn new(shared: Shared, step_delay: Duration) -> Self {
        Self { shared, step_delay }
    }

    /// One homing tick: decide under the lock, then act on the
    /// actuators.
    ///
    /// The calibrating → running transition and the zeroing of both
    /// step counters happen in the same locked region that observed
    /// both sensors latched, so no worker can ever see `running`
    /// without zeroed positions.
    pub fn tick(&mut self, motor_x: &mut StepperMotor, motor_y: &mut StepperMotor) -> HomingTick {
        let tick = self.shared.with(|s| {
            if s.shutdown {
                return HomingTick::Aborted;
            }
            if s.at_sensor_x && s.at_sensor_y {
                s.position_x = 0;
                s.position_y = 0;
                s.calibrating = false;
                s.running = true;
                return HomingTick::Complete;
            }
            HomingTick::Seeking {
                step_x: !s.at_sensor_x,
                step_y: !s.at_sensor_y,
            }
        });

        match tick {
            HomingTick::Seeking { step_x, step_y } => {
                if step_x {
                    motor_x.step(StepDirection::Backward);
                }
                if step_y {
                    motor_y.step(StepDirection::Backward);
                }
            }
            HomingTick::Complete | HomingTick::Aborted => {
                motor_x.stop();
                motor_y.stop();
            }
        }
        tick
    }

    /// Run homing to completion. Returns true if the system reached
    /// the running state, false if shutdown aborted the seek.
    pub fn run(&mut self, motor_x: &mut StepperMotor, motor_y: &mut StepperMotor) -> bool {
        info!("homing started");
        loop {
            match self.tick(motor_x, motor_y) {
                HomingTick::Seeking { .. } => std::thread::sleep(self.step_delay),
                HomingTick::Complete => {
                    info!("homing finished, axes zeroed");
                    return true;
                }
                HomingTick::Aborted => {
                    info!("homing aborted by shutdown");
                    return false;
                }
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
