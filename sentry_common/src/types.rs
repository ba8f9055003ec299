//! Axis, direction and sensor-event primitives.

use serde::{Deserialize, Serialize};

/// A motorized axis of the turret.
///
/// X (pan) and Y (tilt) carry limit sensors and travel limits; the
/// piston axis has neither and is only driven in fixed-count bursts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Pan axis.
    X,
    /// Tilt axis.
    Y,
    /// Piston retraction axis.
    Piston,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Piston => write!(f, "piston"),
        }
    }
}

/// Direction of a single motor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepDirection {
    /// Towards the travel limit (away from home).
    Forward,
    /// Towards home (the limit-sensor end).
    Backward,
}

impl StepDirection {
    /// Signed step delta: `+1` forward, `-1` backward.
    #[inline]
    pub const fn delta(self) -> i32 {
        match self {
            StepDirection::Forward => 1,
            StepDirection::Backward => -1,
        }
    }

    /// Opposite direction.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            StepDirection::Forward => StepDirection::Backward,
            StepDirection::Backward => StepDirection::Forward,
        }
    }

    /// Build a direction from a non-zero signed delta.
    ///
    /// Returns `None` for zero (no step requested).
    #[inline]
    pub const fn from_delta(delta: i32) -> Option<Self> {
        match delta {
            d if d > 0 => Some(StepDirection::Forward),
            d if d < 0 => Some(StepDirection::Backward),
            _ => None,
        }
    }
}

/// A limit-sensor edge: the sensor on `axis` changed to `triggered`.
///
/// Produced by a sensor source or a hardware interrupt handler,
/// consumed by the homing controller through a bounded channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorEvent {
    /// Which axis the sensor belongs to (X or Y; the piston has none).
    pub axis: Axis,
    /// Raw triggered state after the edge.
    pub triggered: bool,
}

// ─── Tests ──────────────────────────────────────────────────────────
