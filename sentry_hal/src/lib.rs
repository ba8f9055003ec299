//! # Sentry HAL
//!
//! Hardware abstraction layer for the turret controller.
//!
//! The control logic never touches pins directly. It is written
//! against three capability traits, with the concrete backend
//! injected at startup:
//!
//! - [`bus::CoilBus`] — 4-bit coil pattern emission for one stepper
//! - [`bus::PwmOut`] — duty-cycle output for the firing servo
//! - [`sensor::SensorSource`] — limit-sensor edge events
//!
//! This crate ships simulation backends (recording bus/PWM, random
//! and scripted sensor sources) used by the `sim` backend and by the
//! test suite. Hardware backends (GPIO character device, PWM chip) live
//! with the embedding binary and implement the same traits.

pub mod backend;
pub mod bus;
pub mod sensor;
pub mod servo;
pub mod stepper;

pub use backend::{BackendOptions, BackendRegistry, TurretBackend};
pub use bus::{CoilBus, PwmOut, SimCoilBus, SimPwm};
pub use sensor::{RandomSensorSource, ScriptedSensorSource, SensorSource};
pub use servo::FireServo;
pub use stepper::{StepperMotor, HALF_STEP_SEQUENCE};
