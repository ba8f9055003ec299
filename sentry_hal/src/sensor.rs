//! Limit-sensor event sources.
//!
//! The homing controller consumes [`SensorEvent`]s from a bounded
//! channel; a source is polled on its own pump thread and feeds that
//! channel. Hardware sources (hall-effect sensors behind a GPIO edge
//! interrupt) are provided by the embedder. This module ships the two
//! software sources:
//!
//! - [`RandomSensorSource`] — low-probability random trigger per
//!   poll, for bench setups with no sensors attached
//! - [`ScriptedSensorSource`] — deterministic event list for tests

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sentry_common::{Axis, SensorEvent};

/// Source of limit-sensor edge events.
pub trait SensorSource: Send {
    /// Poll for the next edge event, if one is pending.
    fn poll(&mut self) -> Option<SensorEvent>;
}

/// Random trigger source for sensor-less bench setups.
///
/// Each poll latches the X or Y sensor with probability `1/odds`,
/// each axis at most once. Never emits untriggered edges, so homing
/// always terminates eventually.
pub struct RandomSensorSource {
    rng: StdRng,
    odds: u32,
    latched_x: bool,
    latched_y: bool,
}

impl RandomSensorSource {
    /// Trigger odds used by the `sim` backend (matches roughly half
    /// a second of seek at the default step delay).
    pub const DEFAULT_ODDS: u32 = 500;

    pub fn new(odds: u32) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            odds: odds.max(1),
            latched_x: false,
            latched_y: false,
        }
    }

    /// Seeded constructor for reproducible runs.
    pub fn with_seed(odds: u32, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            odds: odds.max(1),
            latched_x: false,
            latched_y: false,
        }
    }
}

impl SensorSource for RandomSensorSource {
    fn poll(&mut self) -> Option<SensorEvent> {
        if !self.latched_x && self.rng.gen_ratio(1, self.odds) {
            self.latched_x = true;
            return Some(SensorEvent {
                axis: Axis::X,
                triggered: true,
            });
        }
        if !self.latched_y && self.rng.gen_ratio(1, self.odds) {
            self.latched_y = true;
            return Some(SensorEvent {
                axis: Axis::Y,
                triggered: true,
            });
        }
        None
    }
}

/// Deterministic event source for tests: yields a fixed sequence,
/// one event per poll, then `None` forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensorSource {
    events: VecDeque<SensorEvent>,
}

impl ScriptedSensorSource {
    pub fn new(events: impl IntoIterator<Item = SensorEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Remaining unplayed events.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl SensorSource for ScriptedSensorSource {
    fn poll(&mut self) -> Option<SensorEvent> {
        self.events.pop_front()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
