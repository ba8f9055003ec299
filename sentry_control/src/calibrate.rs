//! Manual step-range calibration.
//!
//! Discovers the travel limits for the config: re-home first, then
//! jog both axes from discrete input events until the operator
//! signals finish; the final absolute position is reported as
//! `{max_steps_x, max_steps_y}`. Runs INSTEAD of the runtime
//! workers, never concurrently with them.
//!
//! Input arrives as events on a channel (fed by the stdin reader or
//! by a test). Velocity on each axis holds at ±1 while events keep
//! coming and decays to zero after `manual_decay_ms` without input.

use std::io::BufRead;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use sentry_common::{StepDirection, TurretConfig};
use sentry_hal::StepperMotor;

use crate::state::Shared;

/// One discrete jog/finish input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalInput {
    /// Jog pan towards the travel limit.
    PanPlus,
    /// Jog pan towards home.
    PanMinus,
    /// Jog tilt towards the travel limit.
    TiltPlus,
    /// Jog tilt towards home.
    TiltMinus,
    /// Stop jogging and report the discovered limits.
    Finish,
}

/// Map a pressed key to an input event.
///
/// `a`/`d` jog pan, `w`/`s` jog tilt, Enter or `q` finishes.
pub fn input_from_char(c: char) -> Option<CalInput> {
    match c {
        'a' => Some(CalInput::PanPlus),
        'd' => Some(CalInput::PanMinus),
        'w' => Some(CalInput::TiltPlus),
        's' => Some(CalInput::TiltMinus),
        '\n' | 'q' => Some(CalInput::Finish),
        _ => None,
    }
}

/// Spawn a thread translating stdin keys into calibration events.
///
/// Exits after sending [`CalInput::Finish`] or on stdin EOF.
pub fn spawn_stdin_reader(tx: Sender<CalInput>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            for c in line.chars().chain(std::iter::once('\n')) {
                let Some(input) = input_from_char(c) else {
                    continue;
                };
                let finish = input == CalInput::Finish;
                if tx.send(input).is_err() || finish {
                    return;
                }
            }
        }
        // EOF: finish so the jog loop does not hang.
        let _ = tx.send(CalInput::Finish);
    })
}

/// The interactive jog loop.
pub struct ManualCalibration {
    shared: Shared,
    decay: Duration,
    step_delay: Duration,
}

impl ManualCalibration {
    pub fn new(shared: Shared, config: &TurretConfig) -> Self {
        Self {
            shared,
            decay: Duration::from_millis(config.manual_decay_ms),
            step_delay: Duration::from_micros(config.step_delay_us),
        }
    }

    /// Jog until a finish event (or shutdown / input disconnect),
    /// then return the final absolute position as the discovered
    /// `(max_steps_x, max_steps_y)`.
    pub fn run(
        &mut self,
        motor_x: &mut StepperMotor,
        motor_y: &mut StepperMotor,
        inputs: &Receiver<CalInput>,
    ) -> (i32, i32) {
        info!("manual calibration: jog with a/d (pan) and w/s (tilt), Enter to finish");

        let mut vx = 0i32;
        let mut vy = 0i32;
        let mut last_input = Instant::now();

        'jog: loop {
            loop {
                match inputs.try_recv() {
                    Ok(CalInput::Finish) => break 'jog,
                    Ok(input) => {
                        last_input = Instant::now();
                        match input {
                            CalInput::PanPlus => vx = 1,
                            CalInput::PanMinus => vx = -1,
                            CalInput::TiltPlus => vy = 1,
                            CalInput::TiltMinus => vy = -1,
                            CalInput::Finish => unreachable!(),
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        warn!("calibration input disconnected, finishing");
                        break 'jog;
                    }
                }
            }

            if self.shared.is_shutdown() {
                break;
            }
            if last_input.elapsed() > self.decay {
                vx = 0;
                vy = 0;
            }

            if vx != 0 || vy != 0 {
                self.shared.with(|s| {
                    s.position_x += vx;
                    s.position_y += vy;
                });
            }
            match StepDirection::from_delta(vx) {
                Some(dir) => motor_x.step(dir),
                None => motor_x.stop(),
            }
            match StepDirection::from_delta(vy) {
                Some(dir) => motor_y.step(dir),
                None => motor_y.stop(),
            }

            let (px, py) = self.shared.with(|s| (s.position_x, s.position_y));
            if px % 50 == 0 && py % 50 == 0 {
                debug!(px, py, "current steps");
            }

            std::thread::sleep(self.step_delay);
        }

        motor_x.stop();
        motor_y.stop();

        let (max_x, max_y) = self.shared.with(|s| (s.position_x, s.position_y));
        info!(max_steps_x = max_x, max_steps_y = max_y, "manual calibration finished");
        (max_x, max_y)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
