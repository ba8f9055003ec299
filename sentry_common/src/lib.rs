//! # Sentry Common
//!
//! Shared foundation for the sentry turret controller: axis and
//! direction types, the persisted turret configuration, and the
//! error taxonomy shared by the HAL and control crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::TurretConfig;
pub use error::ConfigError;
pub use types::{Axis, SensorEvent, StepDirection};
