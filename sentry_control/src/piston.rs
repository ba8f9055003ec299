//! Piston retraction worker: re-arm the mechanism after each shot.
//!
//! Single consumer of the `piston_trigger` handshake. On trigger it
//! raises `piston_retracting`, drives a fixed burst of steps at the
//! standard step pacing, stops the actuator and clears the flag.
//! Shutdown mid-burst exits after the current step; the truncated
//! retraction is an accepted degraded stop, not an error.

use std::time::Duration;

use tracing::info;

use sentry_common::{StepDirection, TurretConfig};
use sentry_hal::StepperMotor;

use crate::state::Shared;

/// Result of a single piston-worker tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PistonTick {
    /// `running` went false; the loop must exit.
    Halted,
    /// No pending trigger.
    Idle,
    /// A retraction ran; `steps` is the count actually driven
    /// (less than configured only if shutdown truncated the burst).
    Retracted { steps: u32 },
}

/// The piston retraction worker.
pub struct PistonWorker {
    shared: Shared,
    retract_steps: u32,
    step_delay: Duration,
}

impl PistonWorker {
    pub fn new(shared: Shared, config: &TurretConfig) -> Self {
        Self {
            shared,
            retract_steps: config.piston_retract_steps,
            step_delay: Duration::from_micros(config.step_delay_us),
        }
    }

    /// One tick: consume the trigger and, if set, run the burst.
    ///
    /// The trigger consumption and the `piston_retracting` raise
    /// happen in one locked region, so the target feed can never arm
    /// a new shot between the two.
    pub fn tick(&mut self, motor: &mut StepperMotor) -> PistonTick {
        #[derive(PartialEq)]
        enum Entry {
            Halted,
            Idle,
            Retract,
        }

        let entry = self.shared.with(|s| {
            if !s.running {
                Entry::Halted
            } else if std::mem::take(&mut s.piston_trigger) {
                s.piston_retracting = true;
                Entry::Retract
            } else {
                Entry::Idle
            }
        });

        match entry {
            Entry::Halted => PistonTick::Halted,
            Entry::Idle => PistonTick::Idle,
            Entry::Retract => {
                info!(steps = self.retract_steps, "piston retraction started");
                let mut driven = 0;
                for _ in 0..self.retract_steps {
                    if !self.shared.is_running() {
                        break;
                    }
                    motor.step(StepDirection::Forward);
                    driven += 1;
                    std::thread::sleep(self.step_delay);
                }
                motor.stop();
                self.shared.with(|s| s.piston_retracting = false);
                info!(steps = driven, "piston retraction complete");
                PistonTick::Retracted { steps: driven }
            }
        }
    }

    /// Run until `running` goes false.
    pub fn run(&mut self, mut motor: StepperMotor, idle_delay: Duration) {
        info!("piston worker started");
        loop {
            match self.tick(&mut motor) {
                PistonTick::Halted => break,
                PistonTick::Idle => std::thread::sleep(idle_delay),
                PistonTick::Retracted { .. } => {}
            }
        }
        motor.stop();
        info!("piston worker stopped");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sentry_hal::SimCoilBus;

    fn sim_motor() -> (StepperMotor, SimCoilBus) {
        let bus = SimCoilBus::new();
        let probe = bus.probe();
        (StepperMotor::new(Box::new(bus)), probe)
    }

    fn running_shared() -> Shared {
        let shared = Shared::new(30);
        shared.with(|s| {
            s.calibrating = false;
            s.running = true;
        });
        shared
    }

    fn fast_worker(shared: &Shared, retract_steps: u32) -> PistonWorker {
        let mut config = TurretConfig::with_limits(100, 100);
        config.piston_retract_steps = retract_steps;
        config.step_delay_us = 1;
        PistonWorker::new(shared.clone(), &config)
    }

    #[test]
    fn idle_without_trigger() {
        let shared = running_shared();
        let mut worker = fast_worker(&shared, 8);
        let (mut motor, probe) = sim_motor();

        assert_eq!(worker.tick(&mut motor), PistonTick::Idle);
        assert_eq!(probe.write_count(), 0);
    }

    #[test]
    fn retracts_exact_step_count_and_clears_flags() {
        let shared = running_shared();
        shared.with(|s| s.piston_trigger = true);
        let mut worker = fast_worker(&shared, 8);
        let (mut motor, probe) = sim_motor();

        assert_eq!(worker.tick(&mut motor), PistonTick::Retracted { steps: 8 });

        let s = shared.snapshot();
        assert!(!s.piston_trigger);
        assert!(!s.piston_retracting);
        // 8 step patterns + final all-off.
        assert_eq!(probe.write_count(), 9);
        assert_eq!(probe.last(), Some([false; 4]));
    }

    #[test]
    fn trigger_is_one_shot() {
        let shared = running_shared();
        shared.with(|s| s.piston_trigger = true);
        let mut worker = fast_worker(&shared, 4);
        let (mut motor, _probe) = sim_motor();

        assert!(matches!(
            worker.tick(&mut motor),
            PistonTick::Retracted { .. }
        ));
        // Consumed: the next tick idles.
        assert_eq!(worker.tick(&mut motor), PistonTick::Idle);
    }

    #[test]
    fn shutdown_truncates_burst() {
        let shared = running_shared();
        shared.with(|s| s.piston_trigger = true);

        // 1000 steps at 1ms pacing; shutdown arrives ~20ms in.
        let mut config = TurretConfig::with_limits(100, 100);
        config.piston_retract_steps = 1000;
        config.step_delay_us = 1000;
        let mut worker = PistonWorker::new(shared.clone(), &config);
        let (mut motor, probe) = sim_motor();

        let stopper = {
            let shared = shared.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                shared.request_shutdown();
            })
        };

        let tick = worker.tick(&mut motor);
        stopper.join().unwrap();

        match tick {
            PistonTick::Retracted { steps } => {
                assert!(steps < 1000, "burst should be truncated, got {steps}")
            }
            other => panic!("expected truncated retraction, got {other:?}"),
        }
        // Actuator stopped and flag cleared even on truncation.
        assert_eq!(probe.last(), Some([false; 4]));
        assert!(!shared.snapshot().piston_retracting);
    }

    #[test]
    fn halts_when_running_cleared() {
        let shared = running_shared();
        shared.request_shutdown();
        let mut worker = fast_worker(&shared, 8);
        let (mut motor, _probe) = sim_motor();
        assert_eq!(worker.tick(&mut motor), PistonTick::Halted);
    }
}
