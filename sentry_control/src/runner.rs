//! Worker orchestration.
//!
//! Homing runs to completion on the calling thread; the three runtime
//! workers (position control, fire sequencer, piston retraction) then
//! run on named threads until `running` goes false. Limit-sensor
//! edges flow from the backend's sensor source through a bounded
//! channel into a dedicated sensor worker, which is the only context
//! mutating the latched sensor flags.

use std::sync::mpsc::{sync_channel, Receiver, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};

use sentry_common::{SensorEvent, TurretConfig};
use sentry_hal::backend::TurretBackend;
use sentry_hal::sensor::SensorSource;
use sentry_hal::{FireServo, StepperMotor};

use crate::calibrate::{CalInput, ManualCalibration};
use crate::fire::FireSequencer;
use crate::homing::HomingController;
use crate::motion::PositionLoop;
use crate::piston::PistonWorker;
use crate::state::Shared;

/// Capacity of the sensor-edge channel. Edges are rare (two sensors,
/// debounced); a full queue only means a stalled consumer.
const SENSOR_QUEUE_DEPTH: usize = 16;

/// Orchestration error.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Owns the shared state and drives the worker lifecycle.
pub struct Runner {
    shared: Shared,
    config: TurretConfig,
}

impl Runner {
    pub fn new(config: TurretConfig) -> Self {
        Self {
            shared: Shared::new(config.center_tolerance),
            config,
        }
    }

    /// Handle for the target feed, shutdown hook and status display.
    pub fn shared(&self) -> Shared {
        self.shared.clone()
    }

    /// Home, then run the three workers until shutdown.
    pub fn run(self, backend: TurretBackend) -> Result<(), RunnerError> {
        let TurretBackend {
            bus_x,
            bus_y,
            bus_piston,
            servo_pwm,
            sensors,
        } = backend;

        let mut motor_x = StepperMotor::new(bus_x);
        let mut motor_y = StepperMotor::new(bus_y);
        let motor_piston = StepperMotor::new(bus_piston);
        let servo = FireServo::new(servo_pwm);

        let step_delay = Duration::from_micros(self.config.step_delay_us);
        let idle_delay = Duration::from_millis(self.config.idle_delay_ms);
        let poll_delay = Duration::from_millis(self.config.lock_delay_ms);

        let (pump, sensor_worker) = self.spawn_sensor_threads(sensors, step_delay)?;

        let mut homing = HomingController::new(self.shared.clone(), step_delay);
        if !homing.run(&mut motor_x, &mut motor_y) {
            // Shutdown during homing: nothing else ever started.
            join_quietly(pump, "sensor-pump");
            join_quietly(sensor_worker, "sensor-worker");
            return Ok(());
        }

        let mut workers = Vec::new();

        let mut position = PositionLoop::new(self.shared.clone(), &self.config);
        workers.push(
            std::thread::Builder::new()
                .name("motion".into())
                .spawn(move || position.run(motor_x, motor_y))?,
        );

        let mut fire = FireSequencer::new(self.shared.clone(), &self.config);
        workers.push(
            std::thread::Builder::new()
                .name("fire".into())
                .spawn(move || fire.run(servo, idle_delay))?,
        );

        let mut piston = PistonWorker::new(self.shared.clone(), &self.config);
        workers.push(
            std::thread::Builder::new()
                .name("piston".into())
                .spawn(move || piston.run(motor_piston, poll_delay))?,
        );

        info!("all workers started");
        for worker in workers {
            join_quietly(worker, "worker");
        }
        join_quietly(pump, "sensor-pump");
        join_quietly(sensor_worker, "sensor-worker");
        info!("all workers stopped");
        Ok(())
    }

    /// Home, then jog interactively; returns the discovered travel
    /// limits. Runs instead of the runtime workers.
    pub fn run_calibration(
        self,
        backend: TurretBackend,
        inputs: &Receiver<CalInput>,
    ) -> Result<Option<(i32, i32)>, RunnerError> {
        let TurretBackend {
            bus_x,
            bus_y,
            sensors,
            ..
        } = backend;

        let mut motor_x = StepperMotor::new(bus_x);
        let mut motor_y = StepperMotor::new(bus_y);

        let step_delay = Duration::from_micros(self.config.step_delay_us);
        let (pump, sensor_worker) = self.spawn_sensor_threads(sensors, step_delay)?;

        let mut homing = HomingController::new(self.shared.clone(), step_delay);
        let limits = if homing.run(&mut motor_x, &mut motor_y) {
            let mut cal = ManualCalibration::new(self.shared.clone(), &self.config);
            Some(cal.run(&mut motor_x, &mut motor_y, inputs))
        } else {
            None
        };

        // Calibration is a one-shot mode: release the sensor threads.
        self.shared.request_shutdown();
        join_quietly(pump, "sensor-pump");
        join_quietly(sensor_worker, "sensor-worker");
        Ok(limits)
    }

    /// Spawn the sensor pump (polls the source, feeds the bounded
    /// channel) and the sensor worker (applies edges to the shared
    /// state). Both exit on shutdown.
    fn spawn_sensor_threads(
        &self,
        mut sensors: Box<dyn SensorSource>,
        poll_interval: Duration,
    ) -> Result<(JoinHandle<()>, JoinHandle<()>), RunnerError> {
        let (tx, rx) = sync_channel::<SensorEvent>(SENSOR_QUEUE_DEPTH);

        let pump_shared = self.shared.clone();
        let pump = std::thread::Builder::new()
            .name("sensor-pump".into())
            .spawn(move || {
                while !pump_shared.is_shutdown() {
                    if let Some(event) = sensors.poll() {
                        match tx.try_send(event) {
                            Ok(()) => {}
                            Err(TrySendError::Full(ev)) => {
                                debug!(?ev, "sensor queue full, edge dropped")
                            }
                            Err(TrySendError::Disconnected(_)) => break,
                        }
                    }
                    std::thread::sleep(poll_interval);
                }
                // tx drops here; the sensor worker unblocks and exits.
            })?;

        let apply_shared = self.shared.clone();
        let sensor_worker = std::thread::Builder::new()
            .name("sensor-worker".into())
            .spawn(move || {
                while let Ok(event) = rx.recv() {
                    debug!(axis = %event.axis, triggered = event.triggered, "sensor edge");
                    apply_shared.apply_sensor_event(event);
                }
            })?;

        Ok((pump, sensor_worker))
    }
}

fn join_quietly(handle: JoinHandle<()>, name: &str) {
    if handle.join().is_err() {
        error!("{name} thread panicked");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sentry_hal::backend::{BackendOptions, BackendRegistry};

    fn fast_config() -> TurretConfig {
        let mut config = TurretConfig::with_limits(50, 50);
        config.step_delay_us = 100;
        config.idle_delay_ms = 1;
        config.lock_delay_ms = 1;
        config.fire_dwell_ms = 1;
        config
    }

    fn sim_backend(seed: u64) -> TurretBackend {
        let mut registry = BackendRegistry::new();
        sentry_hal::backend::register_builtin(&mut registry);
        registry
            .create(
                "sim",
                &BackendOptions {
                    seed: Some(seed),
                    trigger_odds: Some(3),
                },
            )
            .unwrap()
    }

    #[test]
    fn runner_homes_and_shuts_down() {
        let runner = Runner::new(fast_config());
        let shared = runner.shared();

        let stopper = {
            let shared = shared.clone();
            std::thread::spawn(move || {
                // Wait for homing to finish, then request shutdown.
                while !shared.is_running() {
                    std::thread::sleep(Duration::from_millis(1));
                }
                shared.request_shutdown();
            })
        };

        runner.run(sim_backend(7)).unwrap();
        stopper.join().unwrap();

        let s = shared.snapshot();
        assert!(!s.calibrating);
        assert!(!s.running);
    }

    #[test]
    fn shutdown_during_homing_aborts_cleanly() {
        let runner = Runner::new(fast_config());
        let shared = runner.shared();

        // Backend whose sensors never trigger: homing cannot finish.
        let mut registry = BackendRegistry::new();
        sentry_hal::backend::register_builtin(&mut registry);
        let backend = registry
            .create(
                "sim",
                &BackendOptions {
                    seed: Some(1),
                    trigger_odds: Some(u32::MAX),
                },
            )
            .unwrap();

        let stopper = {
            let shared = shared.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                shared.request_shutdown();
            })
        };

        runner.run(backend).unwrap();
        stopper.join().unwrap();
        assert!(!shared.is_running());
    }
}
