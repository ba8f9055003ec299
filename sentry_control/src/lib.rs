//! # Sentry Control
//!
//! The turret controller: four cooperating workers sharing one
//! mutex-guarded state record.
//!
//! - **Homing** drives both axes towards their limit sensors, zeroes
//!   the step counters and flips the system from calibrating to
//!   running. It completes before anything else moves.
//! - **Position control** converts the latest target offset into
//!   bounded single-step commands for the pan/tilt steppers.
//! - **Fire sequencer** actuates the trigger servo through a full
//!   extend/rest motion when a locked-on fire request is pending.
//! - **Piston retraction** re-arms the mechanism after each shot with
//!   a fixed step burst, exclusively.
//!
//! Every worker is a plain polling loop with sleep pacing; the shared
//! state lock is held only for the read → decide → update span of a
//! tick, never across a sleep or an actuator call.

pub mod calibrate;
pub mod fire;
pub mod homing;
pub mod motion;
pub mod piston;
pub mod rt;
pub mod runner;
pub mod state;
