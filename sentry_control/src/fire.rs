//! Fire sequencer: idle → firing → idle, handing off to the piston
//! worker.
//!
//! A shot is a full extend/rest motion of the trigger servo with a
//! dwell after each half so the horn physically arrives. On
//! completion the sequencer clears the fire request and raises the
//! piston trigger. A fire request that arrives while the piston is
//! still retracting (or while a retraction is pending) stays set and
//! is honored on the first eligible tick: deferred, never dropped.

use std::time::Duration;

use tracing::info;

use sentry_common::TurretConfig;
use sentry_hal::FireServo;

use crate::state::Shared;

/// Result of a single fire-sequencer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireTick {
    /// `running` went false; the loop must exit.
    Halted,
    /// No eligible fire request; servo signal held off.
    Idle,
    /// A complete extend/rest shot was executed.
    Fired,
    /// Shutdown interrupted the shot between dwells; the servo was
    /// returned to rest and no piston trigger was raised.
    Interrupted,
}

/// Drives the trigger servo against the shared fire request flag.
pub struct FireSequencer {
    shared: Shared,
    dwell: Duration,
}

impl FireSequencer {
    pub fn new(shared: Shared, config: &TurretConfig) -> Self {
        Self {
            shared,
            dwell: Duration::from_millis(config.fire_dwell_ms),
        }
    }

    /// One tick of the sequencer.
    pub fn tick(&mut self, servo: &mut FireServo) -> FireTick {
        #[derive(PartialEq)]
        enum Entry {
            Halted,
            Idle,
            Fire,
        }

        let entry = self.shared.with(|s| {
            if !s.running {
                Entry::Halted
            } else if s.is_firing && !s.piston_retracting && !s.piston_trigger {
                // An unconsumed piston trigger counts as a retraction
                // in progress: the request stays pending until the
                // piston worker has both picked it up and finished.
                Entry::Fire
            } else {
                Entry::Idle
            }
        });

        match entry {
            Entry::Halted => {
                servo.off();
                FireTick::Halted
            }
            Entry::Idle => {
                servo.off();
                FireTick::Idle
            }
            Entry::Fire => {
                info!("firing");
                servo.extend();
                std::thread::sleep(self.dwell);

                if !self.shared.is_running() {
                    // Shutdown mid-shot: park the servo, skip the
                    // handshake. Accepted degraded stop.
                    servo.rest();
                    return FireTick::Interrupted;
                }

                servo.rest();
                std::thread::sleep(self.dwell);

                self.shared.with(|s| {
                    s.is_firing = false;
                    s.piston_trigger = true;
                });
                info!("shot complete, piston retraction requested");
                FireTick::Fired
            }
        }
    }

    /// Run until `running` goes false.
    pub fn run(&mut self, mut servo: FireServo, idle_delay: Duration) {
        info!("fire sequencer started");
        loop {
            match self.tick(&mut servo) {
                FireTick::Halted | FireTick::Interrupted => break,
                FireTick::Idle => std::thread::sleep(idle_delay),
                FireTick::Fired => {}
            }
        }
        servo.off();
        info!("fire sequencer stopped");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sentry_hal::servo::{EXTENDED_DUTY, OFF_DUTY, REST_DUTY};
    use sentry_hal::SimPwm;

    fn sim_servo() -> (FireServo, SimPwm) {
        let pwm = SimPwm::new();
        let probe = pwm.probe();
        (FireServo::new(Box::new(pwm)), probe)
    }

    fn zero_dwell_sequencer(shared: &Shared) -> FireSequencer {
        let mut config = TurretConfig::with_limits(100, 100);
        config.fire_dwell_ms = 0;
        FireSequencer::new(shared.clone(), &config)
    }

    fn running_shared() -> Shared {
        let shared = Shared::new(30);
        shared.with(|s| {
            s.calibrating = false;
            s.running = true;
        });
        shared
    }

    #[test]
    fn idle_without_request_holds_servo_off() {
        let shared = running_shared();
        let mut seq = zero_dwell_sequencer(&shared);
        let (mut servo, probe) = sim_servo();

        assert_eq!(seq.tick(&mut servo), FireTick::Idle);
        assert_eq!(probe.last(), Some(OFF_DUTY));
    }

    #[test]
    fn full_shot_sets_piston_trigger() {
        let shared = running_shared();
        shared.with(|s| s.is_firing = true);
        let mut seq = zero_dwell_sequencer(&shared);
        let (mut servo, probe) = sim_servo();

        assert_eq!(seq.tick(&mut servo), FireTick::Fired);
        assert_eq!(probe.history(), vec![EXTENDED_DUTY, REST_DUTY]);

        let s = shared.snapshot();
        assert!(!s.is_firing);
        assert!(s.piston_trigger);
    }

    #[test]
    fn request_deferred_while_retracting() {
        let shared = running_shared();
        shared.with(|s| {
            s.is_firing = true;
            s.piston_retracting = true;
        });
        let mut seq = zero_dwell_sequencer(&shared);
        let (mut servo, _probe) = sim_servo();

        // Deferred: request stays set, no actuation.
        assert_eq!(seq.tick(&mut servo), FireTick::Idle);
        assert!(shared.snapshot().is_firing);

        // Retraction done: honored exactly once.
        shared.with(|s| s.piston_retracting = false);
        assert_eq!(seq.tick(&mut servo), FireTick::Fired);
        assert_eq!(seq.tick(&mut servo), FireTick::Idle);
    }

    #[test]
    fn request_deferred_while_trigger_pending() {
        let shared = running_shared();
        shared.with(|s| {
            s.is_firing = true;
            s.piston_trigger = true;
        });
        let mut seq = zero_dwell_sequencer(&shared);
        let (mut servo, _probe) = sim_servo();

        assert_eq!(seq.tick(&mut servo), FireTick::Idle);
        assert!(shared.snapshot().is_firing);
    }

    #[test]
    fn halts_when_running_cleared() {
        let shared = running_shared();
        shared.request_shutdown();
        let mut seq = zero_dwell_sequencer(&shared);
        let (mut servo, probe) = sim_servo();

        assert_eq!(seq.tick(&mut servo), FireTick::Halted);
        assert_eq!(probe.last(), Some(OFF_DUTY));
    }
}
