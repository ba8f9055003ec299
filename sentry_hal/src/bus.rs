//! Output capability traits and their simulation backends.
//!
//! Every write is fire-and-forget: the hardware acknowledges nothing,
//! so the traits return nothing. The simulation backends record each
//! write and hand out cloneable probes so tests can assert on the
//! emitted signal history after the actuator has been moved into a
//! worker.

use std::sync::Arc;

use parking_lot::Mutex;

/// One 4-bit coil energization pattern.
pub type CoilPattern = [bool; 4];

/// All coils de-energized.
pub const COILS_OFF: CoilPattern = [false; 4];

/// Sink for stepper coil patterns (one bus per motor).
pub trait CoilBus: Send {
    /// Emit one coil pattern. Fire-and-forget.
    fn write(&mut self, pattern: CoilPattern);
}

/// Sink for the firing servo's PWM duty cycle.
pub trait PwmOut: Send {
    /// Set the duty cycle [%]. Fire-and-forget.
    fn set_duty(&mut self, duty: f32);
}

// ─── Simulation Backends ────────────────────────────────────────────

/// Recording coil bus for the `sim` backend and tests.
#[derive(Debug, Clone, Default)]
pub struct SimCoilBus {
    log: Arc<Mutex<Vec<CoilPattern>>>,
}

impl SimCoilBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloneable probe observing the same write log.
    pub fn probe(&self) -> SimCoilBus {
        self.clone()
    }

    /// The most recent pattern written, if any.
    pub fn last(&self) -> Option<CoilPattern> {
        self.log.lock().last().copied()
    }

    /// Every pattern written so far, oldest first.
    pub fn history(&self) -> Vec<CoilPattern> {
        self.log.lock().clone()
    }

    /// Number of writes so far.
    pub fn write_count(&self) -> usize {
        self.log.lock().len()
    }
}

impl CoilBus for SimCoilBus {
    fn write(&mut self, pattern: CoilPattern) {
        self.log.lock().push(pattern);
    }
}

/// Recording PWM output for the `sim` backend and tests.
#[derive(Debug, Clone, Default)]
pub struct SimPwm {
    log: Arc<Mutex<Vec<f32>>>,
}

impl SimPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloneable probe observing the same duty log.
    pub fn probe(&self) -> SimPwm {
        self.clone()
    }

    /// The most recent duty cycle written, if any.
    pub fn last(&self) -> Option<f32> {
        self.log.lock().last().copied()
    }

    /// Every duty cycle written so far, oldest first.
    pub fn history(&self) -> Vec<f32> {
        self.log.lock().clone()
    }
}

impl PwmOut for SimPwm {
    fn set_duty(&mut self, duty: f32) {
        self.log.lock().push(duty);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
