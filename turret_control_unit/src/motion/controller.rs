//! Two-axis motion controller.
//!
//! Owns both axis states and the actuation emitters. Targets pass the
//! anti-jitter filter, the profile integrates each tick, and `actuation()`
//! turns the smoothed pose into a stepper burst and a servo pulse.

use thiserror::Error;
use tracing::{info, warn};
use turret_common::control_unit::config::TurretConfig;
use turret_common::hal::types::{ActuationFrame, ServoOutput};
use turret_common::types::{AxisId, Pose};

use super::actuation::{ServoMap, StepEmitter};
use super::axis::{AxisMotion, MotionProfile};

/// Motion controller rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MotionError {
    /// Targets are refused between `halt()` and `release()`.
    #[error("motion halted")]
    Halted,
}

/// Pan (stepper) and tilt (servo) controller.
#[derive(Debug, Clone)]
pub struct MotionController {
    pan: AxisMotion,
    tilt: AxisMotion,
    stepper: StepEmitter,
    servo: ServoMap,
    halted: bool,
}

impl MotionController {
    /// Power-on pose: both axes at their lower bound.
    pub fn home(config: &TurretConfig) -> Pose {
        Pose::new(config.pan.min_angle, config.tilt.min_angle)
    }

    pub fn new(config: &TurretConfig, start: Pose) -> Self {
        let profile = MotionProfile::from(&config.motion);
        let pan = AxisMotion::new(AxisId::Pan, config.pan.limits(), profile, start.pan_angle);
        let tilt = AxisMotion::new(AxisId::Tilt, config.tilt.limits(), profile, start.tilt_angle);
        let stepper = StepEmitter::new(&config.pan, pan.state().current_angle);
        Self {
            pan,
            tilt,
            stepper,
            servo: ServoMap::new(&config.tilt),
            halted: false,
        }
    }

    #[inline]
    pub fn axis(&self, id: AxisId) -> &AxisMotion {
        match id {
            AxisId::Pan => &self.pan,
            AxisId::Tilt => &self.tilt,
        }
    }

    #[inline]
    fn axis_mut(&mut self, id: AxisId) -> &mut AxisMotion {
        match id {
            AxisId::Pan => &mut self.pan,
            AxisId::Tilt => &mut self.tilt,
        }
    }

    /// Current (smoothed) pose.
    pub fn pose(&self) -> Pose {
        Pose::new(
            self.pan.state().current_angle,
            self.tilt.state().current_angle,
        )
    }

    /// Accepted target pose.
    pub fn target(&self) -> Pose {
        Pose::new(self.pan.state().target_angle, self.tilt.state().target_angle)
    }

    #[inline]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Total stepper pulses issued.
    #[inline]
    pub const fn total_steps(&self) -> u64 {
        self.stepper.total_steps()
    }

    /// Offer a target to one axis. Returns whether the filter accepted it.
    pub fn set_target(&mut self, axis: AxisId, angle: f64, now: f64) -> Result<bool, MotionError> {
        if self.halted {
            return Err(MotionError::Halted);
        }
        Ok(self.axis_mut(axis).offer_target(angle, now))
    }

    /// Offer a target pose to both axes.
    pub fn set_pose_target(&mut self, pose: Pose, now: f64) -> Result<(), MotionError> {
        self.set_target(AxisId::Pan, pose.pan_angle, now)?;
        self.set_target(AxisId::Tilt, pose.tilt_angle, now)?;
        Ok(())
    }

    /// Advance both profiles. No-op while halted.
    pub fn update(&mut self, dt: f64) {
        if self.halted {
            return;
        }
        self.pan.update(dt);
        self.tilt.update(dt);
    }

    /// Both axes at rest within tolerance of their targets.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.pan.is_settled() && self.tilt.is_settled()
    }

    /// Stop where we are and keep holding.
    pub fn hold(&mut self) {
        self.pan.hold();
        self.tilt.hold();
    }

    /// Emergency halt: zero velocity, no steps, stepper disabled, servo detached.
    pub fn halt(&mut self) {
        if !self.halted {
            warn!(
                "Motion halted at pan={:.1} tilt={:.1}",
                self.pan.state().current_angle,
                self.tilt.state().current_angle
            );
        }
        self.pan.stop();
        self.tilt.stop();
        self.halted = true;
    }

    /// Leave the halted state holding the current pose.
    pub fn release(&mut self) {
        if self.halted {
            info!("Motion released");
        }
        self.halted = false;
        self.hold();
    }

    /// Build this tick's output. `fire` must already be gated.
    pub fn actuation(&mut self, fire: bool) -> ActuationFrame {
        if self.halted {
            return ActuationFrame::HALTED;
        }
        ActuationFrame {
            pan_steps: self.stepper.emit(self.pan.state().current_angle),
            pan_enabled: true,
            tilt: ServoOutput::Pulse(self.servo.pulse_us(self.tilt.state().current_angle)),
            fire,
        }
    }
}
