//! TOML configuration loader with validation.
//!
//! The travel limits `max_steps_x` / `max_steps_y` are discovered by
//! the manual calibration mode and persisted here; the controller
//! refuses to start without them. All other fields carry defaults
//! tuned for a 28BYJ-48 class stepper on half-step drive.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default piston retraction burst length [steps].
pub const PISTON_RETRACT_STEPS_DEFAULT: u32 = 512;
/// Default dead-zone around the frame center [pixel units].
pub const CENTER_TOLERANCE_DEFAULT: i32 = 30;
/// Default delay between motor steps [µs].
pub const STEP_DELAY_US_DEFAULT: u64 = 1500;
/// Default idle poll interval when no target is tracked [ms].
pub const IDLE_DELAY_MS_DEFAULT: u64 = 100;
/// Default poll interval while locked on target [ms].
pub const LOCK_DELAY_MS_DEFAULT: u64 = 50;
/// Default servo dwell per firing half-motion [ms].
pub const FIRE_DWELL_MS_DEFAULT: u64 = 500;
/// Default manual-calibration velocity decay timeout [ms].
pub const MANUAL_DECAY_MS_DEFAULT: u64 = 150;

/// Persisted turret configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurretConfig {
    /// Pan travel limit [steps from home]. Required, must be > 0.
    pub max_steps_x: i32,
    /// Tilt travel limit [steps from home]. Required, must be > 0.
    pub max_steps_y: i32,

    /// Steps driven per piston retraction.
    #[serde(default = "default_piston_retract_steps")]
    pub piston_retract_steps: u32,

    /// Dead-zone around center below which an axis stops stepping.
    #[serde(default = "default_center_tolerance")]
    pub center_tolerance: i32,

    /// Pacing delay between motor steps [µs]. Shared by both axes,
    /// which step within the same tick.
    #[serde(default = "default_step_delay_us")]
    pub step_delay_us: u64,

    /// Poll interval when no target is tracked [ms].
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,

    /// Poll interval while locked on target [ms].
    #[serde(default = "default_lock_delay_ms")]
    pub lock_delay_ms: u64,

    /// Servo dwell after each firing half-motion [ms].
    #[serde(default = "default_fire_dwell_ms")]
    pub fire_dwell_ms: u64,

    /// Manual calibration: velocity resets to zero after this long
    /// without an input event [ms].
    #[serde(default = "default_manual_decay_ms")]
    pub manual_decay_ms: u64,
}

fn default_piston_retract_steps() -> u32 {
    PISTON_RETRACT_STEPS_DEFAULT
}
fn default_center_tolerance() -> i32 {
    CENTER_TOLERANCE_DEFAULT
}
fn default_step_delay_us() -> u64 {
    STEP_DELAY_US_DEFAULT
}
fn default_idle_delay_ms() -> u64 {
    IDLE_DELAY_MS_DEFAULT
}
fn default_lock_delay_ms() -> u64 {
    LOCK_DELAY_MS_DEFAULT
}
fn default_fire_dwell_ms() -> u64 {
    FIRE_DWELL_MS_DEFAULT
}
fn default_manual_decay_ms() -> u64 {
    MANUAL_DECAY_MS_DEFAULT
}

impl TurretConfig {
    /// Build a config with the given travel limits and defaults for
    /// everything else. Primarily for tests and calibration output.
    pub fn with_limits(max_steps_x: i32, max_steps_y: i32) -> Self {
        Self {
            max_steps_x,
            max_steps_y,
            piston_retract_steps: PISTON_RETRACT_STEPS_DEFAULT,
            center_tolerance: CENTER_TOLERANCE_DEFAULT,
            step_delay_us: STEP_DELAY_US_DEFAULT,
            idle_delay_ms: IDLE_DELAY_MS_DEFAULT,
            lock_delay_ms: LOCK_DELAY_MS_DEFAULT,
            fire_dwell_ms: FIRE_DWELL_MS_DEFAULT,
            manual_decay_ms: MANUAL_DECAY_MS_DEFAULT,
        }
    }

    /// Load and validate the configuration from a TOML file.
    ///
    /// Any failure here is fatal at startup: the controller must not
    /// move motors with unknown travel limits.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TurretConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate from a TOML string (for testing).
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: TurretConfig =
            toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Persist the configuration (manual calibration output).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps_x <= 0 {
            return Err(ConfigError::Validation(format!(
                "max_steps_x must be > 0, got {}",
                self.max_steps_x
            )));
        }
        if self.max_steps_y <= 0 {
            return Err(ConfigError::Validation(format!(
                "max_steps_y must be > 0, got {}",
                self.max_steps_y
            )));
        }
        if self.piston_retract_steps == 0 {
            return Err(ConfigError::Validation(
                "piston_retract_steps must be > 0".into(),
            ));
        }
        if self.center_tolerance <= 0 {
            return Err(ConfigError::Validation(format!(
                "center_tolerance must be > 0, got {}",
                self.center_tolerance
            )));
        }
        if self.step_delay_us == 0 {
            return Err(ConfigError::Validation("step_delay_us must be > 0".into()));
        }
        Ok(())
    }

    /// Travel limit for a pan/tilt axis. The piston has no limit.
    pub fn max_steps(&self, axis: crate::types::Axis) -> Option<i32> {
        match axis {
            crate::types::Axis::X => Some(self.max_steps_x),
            crate::types::Axis::Y => Some(self.max_steps_y),
            crate::types::Axis::Piston => None,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
