//! Single-axis motion: anti-jitter target acceptance and an
//! acceleration-limited velocity profile.

use tracing::trace;
use turret_common::control_unit::config::MotionConfig;
use turret_common::types::{AxisId, AxisLimits};

/// Mutable state of one axis. Owned by the motion controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisState {
    /// Commanded shaft angle [deg].
    pub current_angle: f64,
    /// Accepted target [deg].
    pub target_angle: f64,
    /// [deg/s]
    pub current_velocity: f64,
    /// Time the stored target was last accepted [s]. `None` before the first.
    pub last_command_time: Option<f64>,
}

impl AxisState {
    /// Axis at rest at `angle`.
    pub const fn at_rest(angle: f64) -> Self {
        Self {
            current_angle: angle,
            target_angle: angle,
            current_velocity: 0.0,
            last_command_time: None,
        }
    }
}

/// Profile parameters shared by both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    pub angle_tolerance: f64,
    pub min_command_interval: f64,
    pub max_velocity: f64,
    pub acceleration_rate: f64,
    pub deceleration_rate: f64,
    pub position_gain: f64,
}

impl From<&MotionConfig> for MotionProfile {
    fn from(cfg: &MotionConfig) -> Self {
        Self {
            angle_tolerance: cfg.angle_tolerance,
            min_command_interval: cfg.min_command_interval,
            max_velocity: cfg.max_velocity,
            acceleration_rate: cfg.acceleration_rate,
            deceleration_rate: cfg.deceleration_rate,
            position_gain: cfg.position_gain,
        }
    }
}

/// One smoothed axis.
#[derive(Debug, Clone)]
pub struct AxisMotion {
    id: AxisId,
    limits: AxisLimits,
    profile: MotionProfile,
    state: AxisState,
}

impl AxisMotion {
    pub fn new(id: AxisId, limits: AxisLimits, profile: MotionProfile, start: f64) -> Self {
        Self {
            id,
            limits,
            profile,
            state: AxisState::at_rest(limits.clamp(start)),
        }
    }

    #[inline]
    pub const fn id(&self) -> AxisId {
        self.id
    }

    #[inline]
    pub const fn state(&self) -> &AxisState {
        &self.state
    }

    #[inline]
    pub const fn limits(&self) -> &AxisLimits {
        &self.limits
    }

    /// Offer a new target. The angle is clamped into range first.
    ///
    /// It replaces the stored target only if it differs by more than
    /// `angle_tolerance` or the last acceptance is older than
    /// `min_command_interval`. Returns whether it was accepted.
    pub fn offer_target(&mut self, angle: f64, now: f64) -> bool {
        let angle = self.limits.clamp(angle);
        let far = (angle - self.state.target_angle).abs() > self.profile.angle_tolerance;
        let due = self
            .state
            .last_command_time
            .is_none_or(|t| now - t > self.profile.min_command_interval);
        if !(far || due) {
            return false;
        }
        self.state.target_angle = angle;
        self.state.last_command_time = Some(now);
        true
    }

    /// Advance the profile by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let p = &self.profile;
        let s = &mut self.state;
        let error = s.target_angle - s.current_angle;

        let desired = if error.abs() <= p.angle_tolerance {
            0.0
        } else {
            // Proportional approach, capped by the speed we can still brake from.
            let braking = (2.0 * p.deceleration_rate * error.abs()).sqrt();
            error.signum()
                * (p.position_gain * error.abs())
                    .min(braking)
                    .min(p.max_velocity)
        };

        let speeding_up = desired.abs() > s.current_velocity.abs()
            && (s.current_velocity == 0.0 || desired.signum() == s.current_velocity.signum());
        let rate = if speeding_up {
            p.acceleration_rate
        } else {
            p.deceleration_rate
        };
        let max_change = rate * dt;
        s.current_velocity += (desired - s.current_velocity).clamp(-max_change, max_change);
        s.current_angle += s.current_velocity * dt;

        if !self.limits.contains(s.current_angle) {
            s.current_angle = self.limits.clamp(s.current_angle);
            s.current_velocity = 0.0;
        }

        trace!(
            "Axis {}: pos={:.3}, vel={:.3}, target={:.3}, err={:.3}",
            self.id, s.current_angle, s.current_velocity, s.target_angle, error
        );
    }

    /// Whether the axis is at rest within tolerance of its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.state.current_velocity == 0.0
            && (self.state.target_angle - self.state.current_angle).abs()
                <= self.profile.angle_tolerance
    }

    /// Target := current, velocity := 0.
    pub fn hold(&mut self) {
        self.state.target_angle = self.state.current_angle;
        self.state.current_velocity = 0.0;
    }

    /// Velocity := 0, target untouched.
    #[inline]
    pub fn stop(&mut self) {
        self.state.current_velocity = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turret_common::control_unit::config::MotionConfig;

    const DT: f64 = 0.01;

    fn pan_axis(start: f64) -> AxisMotion {
        AxisMotion::new(
            AxisId::Pan,
            AxisLimits::new(0.0, 300.0),
            MotionProfile::from(&MotionConfig::default()),
            start,
        )
    }

    #[test]
    fn first_target_always_accepted() {
        let mut ax = pan_axis(0.0);
        assert!(ax.offer_target(0.2, 0.0));
        assert_eq!(ax.state().target_angle, 0.2);
    }

    #[test]
    fn jitter_filtered() {
        let mut ax = pan_axis(100.0);
        assert!(ax.offer_target(100.0, 0.0));
        assert!(!ax.offer_target(100.3, 0.05));
        assert_eq!(ax.state().target_angle, 100.0);
        assert!(ax.offer_target(100.6, 0.06));
        assert!(ax.offer_target(100.7, 0.2));
    }

    #[test]
    fn targets_clamped_into_range() {
        let mut ax = pan_axis(10.0);
        ax.offer_target(-40.0, 0.0);
        assert_eq!(ax.state().target_angle, 0.0);
        ax.offer_target(999.0, 1.0);
        assert_eq!(ax.state().target_angle, 300.0);
    }

    #[test]
    fn acceleration_limited_start() {
        let mut ax = pan_axis(0.0);
        ax.offer_target(200.0, 0.0);
        ax.update(DT);
        let v = ax.state().current_velocity;
        assert!((v - 180.0 * DT).abs() < 1e-9, "v = {v}");
    }

    #[test]
    fn converges_and_holds_without_overshoot() {
        let mut ax = pan_axis(0.0);
        ax.offer_target(90.0, 0.0);
        let mut max_seen: f64 = 0.0;
        for _ in 0..600 {
            ax.update(DT);
            max_seen = max_seen.max(ax.state().current_angle);
        }
        assert!(ax.is_settled());
        assert!((ax.state().current_angle - 90.0).abs() <= 0.5);
        assert!(max_seen <= 90.5);
        let parked = ax.state().current_angle;
        for _ in 0..100 {
            ax.update(DT);
        }
        assert_eq!(ax.state().current_angle, parked);
    }

    #[test]
    fn velocity_bounded() {
        let mut ax = pan_axis(0.0);
        ax.offer_target(300.0, 0.0);
        for _ in 0..300 {
            ax.update(DT);
            assert!(ax.state().current_velocity.abs() <= 90.0 + 1e-9);
        }
    }

    #[test]
    fn hold_freezes_axis() {
        let mut ax = pan_axis(0.0);
        ax.offer_target(100.0, 0.0);
        for _ in 0..50 {
            ax.update(DT);
        }
        ax.hold();
        let here = ax.state().current_angle;
        assert_eq!(ax.state().target_angle, here);
        ax.update(DT);
        assert_eq!(ax.state().current_angle, here);
    }
}
