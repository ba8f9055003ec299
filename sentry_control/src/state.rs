//! Shared turret state.
//!
//! One record behind one mutex, created at process start and handed
//! to every worker by cloning the [`Shared`] handle. Field ownership
//! is strict even though the lock does not enforce it:
//!
//! | Field | Writer(s) | Reader(s) |
//! |---|---|---|
//! | `target_dx/dy`, `is_tracking` | target feed | motion, fire |
//! | `is_firing` | target feed (set), fire (clear) | fire |
//! | `at_sensor_x/y` | sensor worker, homing | homing |
//! | `position_x/y` | motion, homing, calibration | motion |
//! | `running`, `calibrating`, `shutdown` | homing, shutdown path | all |
//! | `piston_trigger` | fire (set), piston (clear) | piston |
//! | `piston_retracting` | piston | fire, target feed |

use std::sync::Arc;

use parking_lot::Mutex;

use sentry_common::{Axis, SensorEvent};

/// The single shared state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurretState {
    /// Latest target offset from frame center [pixel units].
    pub target_dx: i32,
    pub target_dy: i32,
    /// True iff the target feed currently has a valid target.
    pub is_tracking: bool,
    /// Fire request flag. Set by the target feed when locked-on,
    /// cleared by the fire sequencer after a completed shot.
    pub is_firing: bool,
    /// Latched limit-sensor states.
    pub at_sensor_x: bool,
    pub at_sensor_y: bool,
    /// Signed step count from home.
    pub position_x: i32,
    pub position_y: i32,
    /// True once homing completed; false signals all workers to exit.
    pub running: bool,
    /// True while homing is in progress; gates sensor debouncing.
    pub calibrating: bool,
    /// Set by the shutdown path. Distinguishes "not yet running"
    /// (during homing) from "asked to stop".
    pub shutdown: bool,
    /// Piston worker is currently driving the retract burst.
    pub piston_retracting: bool,
    /// One-shot handshake edge: set by the fire sequencer, consumed
    /// and cleared by the piston worker.
    pub piston_trigger: bool,
}

impl TurretState {
    /// Initial state: everything zero/false, calibrating.
    pub const fn new() -> Self {
        Self {
            target_dx: 0,
            target_dy: 0,
            is_tracking: false,
            is_firing: false,
            at_sensor_x: false,
            at_sensor_y: false,
            position_x: 0,
            position_y: 0,
            running: false,
            calibrating: true,
            shutdown: false,
            piston_retracting: false,
            piston_trigger: false,
        }
    }
}

impl Default for TurretState {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to the shared state.
///
/// Carries the center tolerance so the target-feed API can make the
/// lock-on decision without a second configuration channel.
#[derive(Clone)]
pub struct Shared {
    inner: Arc<Mutex<TurretState>>,
    center_tolerance: i32,
}

impl Shared {
    pub fn new(center_tolerance: i32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TurretState::new())),
            center_tolerance,
        }
    }

    /// Dead-zone radius used for the lock-on decision.
    #[inline]
    pub fn center_tolerance(&self) -> i32 {
        self.center_tolerance
    }

    /// Run `f` with the state locked. The closure must not sleep or
    /// touch actuators.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut TurretState) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Copy of the current state (for status display and tests).
    pub fn snapshot(&self) -> TurretState {
        *self.inner.lock()
    }

    /// Whether the runtime workers should keep looping.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    // ─── Target feed API ────────────────────────────────────────────

    /// Record a fresh target offset from the vision collaborator.
    ///
    /// Arms the fire request when the target sits inside the
    /// dead-zone and no shot or retraction is already in progress.
    /// Returns true if a fire request was armed by this update.
    pub fn update_target(&self, dx: i32, dy: i32) -> bool {
        let tolerance = self.center_tolerance;
        self.with(|s| {
            s.target_dx = dx;
            s.target_dy = dy;
            s.is_tracking = true;

            let locked = dx.abs() < tolerance && dy.abs() < tolerance;
            if locked && !s.is_firing && !s.piston_retracting {
                s.is_firing = true;
                return true;
            }
            false
        })
    }

    /// The target feed lost its target.
    pub fn clear_target(&self) {
        self.with(|s| s.is_tracking = false);
    }

    // ─── Sensor API ─────────────────────────────────────────────────

    /// Apply one limit-sensor edge.
    ///
    /// Debounce rule: while calibrating, an untriggered edge on an
    /// axis already latched at-limit is ignored, so bounce noise
    /// cannot re-arm the seek. After calibration the raw state is
    /// always stored.
    pub fn apply_sensor_event(&self, event: SensorEvent) {
        self.with(|s| {
            let latched = match event.axis {
                Axis::X => &mut s.at_sensor_x,
                Axis::Y => &mut s.at_sensor_y,
                Axis::Piston => return,
            };
            if s.calibrating && !event.triggered && *latched {
                return;
            }
            *latched = event.triggered;
        });
    }

    // ─── Shutdown API ───────────────────────────────────────────────

    /// Signal every worker to exit after its current tick.
    pub fn request_shutdown(&self) {
        self.with(|s| {
            s.shutdown = true;
            s.running = false;
        });
    }

    /// Whether shutdown has been requested (also observable during
    /// homing, when `running` is still false).
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.inner.lock().shutdown
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let s = TurretState::new();
        assert!(s.calibrating);
        assert!(!s.running);
        assert!(!s.is_firing);
        assert_eq!((s.position_x, s.position_y), (0, 0));
    }

    #[test]
    fn update_target_arms_fire_only_when_locked() {
        let shared = Shared::new(30);

        // Off-center: tracks, does not arm.
        assert!(!shared.update_target(50, 0));
        let s = shared.snapshot();
        assert!(s.is_tracking);
        assert!(!s.is_firing);
        assert_eq!(s.target_dx, 50);

        // Centered: arms.
        assert!(shared.update_target(10, -5));
        assert!(shared.snapshot().is_firing);
    }

    #[test]
    fn update_target_does_not_rearm_mid_shot() {
        let shared = Shared::new(30);
        assert!(shared.update_target(0, 0));
        // Request already pending: a second locked update is a no-op.
        assert!(!shared.update_target(1, 1));
    }

    #[test]
    fn update_target_defers_while_retracting() {
        let shared = Shared::new(30);
        shared.with(|s| s.piston_retracting = true);
        assert!(!shared.update_target(0, 0));
        assert!(!shared.snapshot().is_firing);

        // Retraction over: next locked update arms.
        shared.with(|s| s.piston_retracting = false);
        assert!(shared.update_target(0, 0));
    }

    #[test]
    fn sensor_debounce_during_calibration() {
        let shared = Shared::new(30);

        shared.apply_sensor_event(SensorEvent {
            axis: Axis::X,
            triggered: true,
        });
        assert!(shared.snapshot().at_sensor_x);

        // Bounce back to untriggered while calibrating: ignored.
        shared.apply_sensor_event(SensorEvent {
            axis: Axis::X,
            triggered: false,
        });
        assert!(shared.snapshot().at_sensor_x);
    }

    #[test]
    fn sensor_raw_after_calibration() {
        let shared = Shared::new(30);
        shared.with(|s| {
            s.calibrating = false;
            s.running = true;
            s.at_sensor_y = true;
        });

        shared.apply_sensor_event(SensorEvent {
            axis: Axis::Y,
            triggered: false,
        });
        assert!(!shared.snapshot().at_sensor_y);
    }

    #[test]
    fn piston_axis_sensor_events_ignored() {
        let shared = Shared::new(30);
        shared.apply_sensor_event(SensorEvent {
            axis: Axis::Piston,
            triggered: true,
        });
        let s = shared.snapshot();
        assert!(!s.at_sensor_x);
        assert!(!s.at_sensor_y);
    }

    #[test]
    fn shutdown_clears_running() {
        let shared = Shared::new(30);
        shared.with(|s| s.running = true);
        shared.request_shutdown();
        assert!(!shared.is_running());
        assert!(shared.is_shutdown());
    }
}
