//! Firing servo actuator.
//!
//! A standard 50 Hz hobby servo on an injected PWM channel. The fire
//! sequencer drives it between two fixed positions; between shots the
//! signal is held at 0 % duty so the servo does not chatter.

use crate::bus::PwmOut;

/// Duty cycle at the rest position [%].
pub const REST_DUTY: f32 = 2.5;
/// Duty cycle at the fully extended (trigger-pulled) position [%].
pub const EXTENDED_DUTY: f32 = 7.5;
/// Neutral / signal-off duty [%].
pub const OFF_DUTY: f32 = 0.0;

/// The trigger servo on an injected PWM output.
pub struct FireServo {
    pwm: Box<dyn PwmOut>,
}

impl FireServo {
    pub fn new(pwm: Box<dyn PwmOut>) -> Self {
        Self { pwm }
    }

    /// Drive to the extended (trigger-pulled) position.
    pub fn extend(&mut self) {
        self.pwm.set_duty(EXTENDED_DUTY);
    }

    /// Drive back to the rest position.
    pub fn rest(&mut self) {
        self.pwm.set_duty(REST_DUTY);
    }

    /// Drop the control signal entirely.
    pub fn off(&mut self) {
        self.pwm.set_duty(OFF_DUTY);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SimPwm;

    #[test]
    fn servo_motion_duties() {
        let pwm = SimPwm::new();
        let probe = pwm.probe();
        let mut servo = FireServo::new(Box::new(pwm));

        servo.extend();
        servo.rest();
        servo.off();

        assert_eq!(probe.history(), vec![EXTENDED_DUTY, REST_DUTY, OFF_DUTY]);
    }
}
