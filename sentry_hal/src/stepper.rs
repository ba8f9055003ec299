//! Half-step stepper motor actuator.
//!
//! One instance per axis (X, Y, piston), all driven through the same
//! 8-entry half-step sequence. The actuator keeps a phase index into
//! the sequence; `step` advances it by ±1 and emits the pattern,
//! `stop` de-energizes the coils WITHOUT touching the index, so a
//! resumed motion continues the sequence where it left off.

use sentry_common::StepDirection;

use crate::bus::{CoilBus, CoilPattern, COILS_OFF};

/// Half-step coil sequence for a 4-wire unipolar stepper.
pub const HALF_STEP_SEQUENCE: [CoilPattern; 8] = [
    [true, false, false, true],
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
];

/// A single stepper motor on an injected coil bus.
pub struct StepperMotor {
    bus: Box<dyn CoilBus>,
    phase: usize,
}

impl StepperMotor {
    /// Create a motor at phase 0 on the given bus.
    pub fn new(bus: Box<dyn CoilBus>) -> Self {
        Self { bus, phase: 0 }
    }

    /// Advance one half-step in `direction` and energize the coils.
    ///
    /// Repeated calls with the same direction simply continue through
    /// the sequence; there is no error condition.
    pub fn step(&mut self, direction: StepDirection) {
        let len = HALF_STEP_SEQUENCE.len();
        self.phase = match direction {
            StepDirection::Forward => (self.phase + 1) % len,
            StepDirection::Backward => (self.phase + len - 1) % len,
        };
        self.bus.write(HALF_STEP_SEQUENCE[self.phase]);
    }

    /// De-energize all coils. The phase index is preserved so the
    /// next `step` continues the sequence.
    pub fn stop(&mut self) {
        self.bus.write(COILS_OFF);
    }

    /// Current phase index (0..8).
    #[inline]
    pub fn phase(&self) -> usize {
        self.phase
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
