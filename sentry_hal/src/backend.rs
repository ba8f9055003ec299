//! Pluggable turret backends.
//!
//! A backend bundles the output channels and sensor source for one
//! physical (or simulated) turret. The registry uses constructor
//! injection: built at startup, populated via `register()`, and
//! handed to the runner by value. No global state.
//!
//! # Adding New Backends
//!
//! 1. Implement [`CoilBus`], [`PwmOut`] and [`SensorSource`] for the
//!    target hardware (e.g. a GPIO character device + PWM chip).
//! 2. Write a factory `fn(&BackendOptions) -> TurretBackend`.
//! 3. Register it next to the simulation backend in
//!    [`register_builtin`].

use std::collections::HashMap;

use thiserror::Error;

use crate::bus::{CoilBus, PwmOut, SimCoilBus, SimPwm};
use crate::sensor::{RandomSensorSource, SensorSource};

/// Backend construction error.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// No backend with the given name registered.
    #[error("backend not found: {0}")]
    NotFound(String),
}

/// The full output/input channel set for one turret.
pub struct TurretBackend {
    /// Coil bus of the pan stepper.
    pub bus_x: Box<dyn CoilBus>,
    /// Coil bus of the tilt stepper.
    pub bus_y: Box<dyn CoilBus>,
    /// Coil bus of the piston stepper.
    pub bus_piston: Box<dyn CoilBus>,
    /// PWM channel of the firing servo.
    pub servo_pwm: Box<dyn PwmOut>,
    /// Limit-sensor edge source.
    pub sensors: Box<dyn SensorSource>,
}

/// Options passed to backend factories.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendOptions {
    /// Seed for simulated sensor randomness (None = entropy).
    pub seed: Option<u64>,
    /// Simulated sensor trigger odds (1 in N per poll).
    pub trigger_odds: Option<u32>,
}

/// Factory function type for creating backend instances.
pub type BackendFactory = fn(&BackendOptions) -> TurretBackend;

/// Registry of available backends.
pub struct BackendRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        if self.factories.contains_key(name) {
            panic!("Backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Create a backend instance by name.
    pub fn create(
        &self,
        name: &str,
        options: &BackendOptions,
    ) -> Result<TurretBackend, BackendError> {
        let factory = self
            .factories
            .get(name)
            .copied()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        Ok(factory(options))
    }

    /// List all registered backend names.
    pub fn list(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register all built-in backends.
pub fn register_builtin(registry: &mut BackendRegistry) {
    registry.register("sim", sim_backend);

    // Hardware backends are registered here by the embedder:
    // registry.register("gpiochip", gpiochip::create_backend);
}

/// Simulation backend: recording buses and PWM, random sensors.
fn sim_backend(options: &BackendOptions) -> TurretBackend {
    let odds = options
        .trigger_odds
        .unwrap_or(RandomSensorSource::DEFAULT_ODDS);
    let sensors: Box<dyn SensorSource> = match options.seed {
        Some(seed) => Box::new(RandomSensorSource::with_seed(odds, seed)),
        None => Box::new(RandomSensorSource::new(odds)),
    };

    TurretBackend {
        bus_x: Box::new(SimCoilBus::new()),
        bus_y: Box::new(SimCoilBus::new()),
        bus_piston: Box::new(SimCoilBus::new()),
        servo_pwm: Box::new(SimPwm::new()),
        sensors,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
