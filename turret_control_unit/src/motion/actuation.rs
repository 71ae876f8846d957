//! Low-level actuation: stepper pulse bursts and servo pulse widths.

use turret_common::control_unit::config::{PanAxisConfig, TiltAxisConfig};
use turret_common::hal::types::{StepCommand, StepDirection};

// ─── Stepper ────────────────────────────────────────────────────────

/// Converts the smoothed pan angle into step bursts.
///
/// `emitted_angle` is the angle represented by the steps issued so far.
/// While the shaft keeps moving one way, any gap of at least `deadband`
/// yields a step. Turning back needs a full step of gap, so the sub-step
/// overshoot left by a final minimum step is never stepped back.
#[derive(Debug, Clone)]
pub struct StepEmitter {
    emitted_angle: f64,
    step_angle: f64,
    deadband: f64,
    max_steps: u32,
    last_direction: Option<StepDirection>,
    total_steps: u64,
}

impl StepEmitter {
    pub fn new(config: &PanAxisConfig, start: f64) -> Self {
        Self {
            emitted_angle: start,
            step_angle: config.step_angle(),
            deadband: config.step_deadband,
            max_steps: config.max_steps_per_tick,
            last_direction: None,
            total_steps: 0,
        }
    }

    #[inline]
    pub const fn emitted_angle(&self) -> f64 {
        self.emitted_angle
    }

    /// Steps issued since startup.
    #[inline]
    pub const fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Steps needed to bring the shaft to `current`, at most `max_steps`.
    pub fn emit(&mut self, current: f64) -> Option<StepCommand> {
        let delta = current - self.emitted_angle;
        if delta == 0.0 || !(delta.abs() >= self.deadband) {
            return None;
        }
        let direction = if delta > 0.0 {
            StepDirection::Forward
        } else {
            StepDirection::Reverse
        };
        let ratio = delta.abs() / self.step_angle;
        let steps = if self.last_direction.is_none_or(|d| d == direction) {
            (ratio.round() as u32).max(1)
        } else {
            ratio.floor() as u32
        };
        if steps == 0 {
            return None;
        }
        let steps = steps.min(self.max_steps);
        self.emitted_angle += direction.sign() * f64::from(steps) * self.step_angle;
        self.last_direction = Some(direction);
        self.total_steps += u64::from(steps);
        Some(StepCommand {
            steps: steps as u16,
            direction,
        })
    }
}

// ─── Servo ──────────────────────────────────────────────────────────

/// Linear angle → pulse width map for the tilt servo.
#[derive(Debug, Clone, Copy)]
pub struct ServoMap {
    min_angle: f64,
    max_angle: f64,
    pulse_min_us: u16,
    pulse_max_us: u16,
}

impl ServoMap {
    pub fn new(config: &TiltAxisConfig) -> Self {
        Self {
            min_angle: config.min_angle,
            max_angle: config.max_angle,
            pulse_min_us: config.pulse_min_us,
            pulse_max_us: config.pulse_max_us,
        }
    }

    /// Pulse width for `angle`, clamped to the configured pulse range.
    pub fn pulse_us(&self, angle: f64) -> u16 {
        let span = self.max_angle - self.min_angle;
        let frac = ((angle - self.min_angle) / span).clamp(0.0, 1.0);
        let width = f64::from(self.pulse_max_us - self.pulse_min_us);
        self.pulse_min_us + (frac * width).round() as u16
    }
}
