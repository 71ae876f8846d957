//! Safety interlock between every command producer and actuation.
//!
//! Explicit operator targets outside an axis range are rejected, while
//! autonomous poses are clamped. Fire output is forced OFF inside the
//! no-fire zone and while the emergency stop is latched. Command silence
//! longer than the staleness threshold latches the stop as well.

use thiserror::Error;
use tracing::{info, warn};
use turret_common::control_unit::config::TurretConfig;
use turret_common::control_unit::error::InterlockFlags;
use turret_common::types::{AxisId, AxisLimits, Pose};

/// Interlock rejection.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InterlockError {
    /// Explicit target outside the axis hardware range.
    #[error("{axis} angle {angle} outside [{min}, {max}]")]
    OutOfRange {
        axis: AxisId,
        angle: f64,
        min: f64,
        max: f64,
    },

    /// Emergency stop latched; only RESET clears it.
    #[error("emergency stop active")]
    EstopActive,
}

/// What latched the emergency stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstopCause {
    /// Explicit `ESTOP` command.
    Operator,
    /// No valid command within the staleness threshold.
    CommStale,
}

/// Process-wide safety state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SafetyState {
    pub estop_active: bool,
    /// Inclusive pan range where fire output is OFF.
    pub no_fire_zone: Option<[f64; 2]>,
}

/// Safety interlock.
#[derive(Debug, Clone)]
pub struct SafetyInterlock {
    state: SafetyState,
    flags: InterlockFlags,
    pan: AxisLimits,
    tilt: AxisLimits,
    stale_threshold: Option<f64>,
    last_command_time: f64,
    estop_count: u32,
}

impl SafetyInterlock {
    /// Create the interlock; the staleness clock starts at `now`.
    pub fn new(config: &TurretConfig, now: f64) -> Self {
        Self {
            state: SafetyState {
                estop_active: false,
                no_fire_zone: config.safety.no_fire_zone,
            },
            flags: InterlockFlags::empty(),
            pan: config.pan.limits(),
            tilt: config.tilt.limits(),
            stale_threshold: config.safety.stale_threshold(),
            last_command_time: now,
            estop_count: 0,
        }
    }

    #[inline]
    pub const fn state(&self) -> &SafetyState {
        &self.state
    }

    #[inline]
    pub const fn flags(&self) -> InterlockFlags {
        self.flags
    }

    #[inline]
    pub const fn is_estopped(&self) -> bool {
        self.state.estop_active
    }

    /// Number of times the stop has latched since startup.
    #[inline]
    pub const fn estop_count(&self) -> u32 {
        self.estop_count
    }

    #[inline]
    pub fn limits(&self, axis: AxisId) -> &AxisLimits {
        match axis {
            AxisId::Pan => &self.pan,
            AxisId::Tilt => &self.tilt,
        }
    }

    /// Validate an explicit operator target.
    ///
    /// Returns the angle unchanged when inside the range.
    pub fn validate_target(&mut self, axis: AxisId, angle: f64) -> Result<f64, InterlockError> {
        if self.state.estop_active {
            return Err(InterlockError::EstopActive);
        }
        let lim = *self.limits(axis);
        if !angle.is_finite() || !lim.contains(angle) {
            self.flags.insert(InterlockFlags::RANGE_REJECTED);
            warn!(
                "Rejected {axis} target {angle} (range [{}, {}])",
                lim.min_angle, lim.max_angle
            );
            return Err(InterlockError::OutOfRange {
                axis,
                angle,
                min: lim.min_angle,
                max: lim.max_angle,
            });
        }
        self.flags.remove(InterlockFlags::RANGE_REJECTED);
        Ok(angle)
    }

    /// Clamp an autonomous pose into both axis ranges.
    #[inline]
    pub fn clamp_pose(&self, pose: Pose) -> Pose {
        pose.clamped(&self.pan, &self.tilt)
    }

    /// Whether `pan_angle` lies inside the no-fire zone.
    #[inline]
    pub fn in_no_fire_zone(&self, pan_angle: f64) -> bool {
        self.state
            .no_fire_zone
            .is_some_and(|[lo, hi]| pan_angle >= lo && pan_angle <= hi)
    }

    /// Final fire decision for this tick.
    pub fn gate_fire(&mut self, requested: bool, pan_angle: f64) -> bool {
        if self.state.estop_active {
            return false;
        }
        if requested && self.in_no_fire_zone(pan_angle) {
            if !self.flags.contains(InterlockFlags::FIRE_INHIBITED) {
                info!("Fire inhibited: pan {pan_angle:.1} inside no-fire zone");
            }
            self.flags.insert(InterlockFlags::FIRE_INHIBITED);
            return false;
        }
        self.flags.remove(InterlockFlags::FIRE_INHIBITED);
        requested
    }

    /// Record a successfully decoded command (staleness heartbeat).
    #[inline]
    pub fn note_command(&mut self, now: f64) {
        self.last_command_time = now;
    }

    /// Latch the emergency stop. Returns `false` if it was already latched.
    pub fn trigger_estop(&mut self, cause: EstopCause) -> bool {
        let flag = match cause {
            EstopCause::Operator => InterlockFlags::ESTOP,
            EstopCause::CommStale => InterlockFlags::COMM_STALE,
        };
        self.flags.insert(flag);
        self.flags.remove(InterlockFlags::FIRE_INHIBITED);
        if self.state.estop_active {
            return false;
        }
        self.state.estop_active = true;
        self.estop_count += 1;
        warn!("EMERGENCY STOP latched ({cause:?})");
        true
    }

    /// Latch the stop if the command link has been silent too long.
    ///
    /// Returns `true` when this call latched it.
    pub fn check_staleness(&mut self, now: f64) -> bool {
        let Some(threshold) = self.stale_threshold else {
            return false;
        };
        if self.state.estop_active || now - self.last_command_time <= threshold {
            return false;
        }
        warn!(
            "No valid command for {:.2}s (threshold {threshold:.2}s)",
            now - self.last_command_time
        );
        self.trigger_estop(EstopCause::CommStale)
    }

    /// Clear the latch. Restarts the staleness clock.
    pub fn reset(&mut self, now: f64) {
        if self.state.estop_active {
            info!("Emergency stop cleared");
        }
        self.state.estop_active = false;
        self.flags.remove(InterlockFlags::CRITICAL_MASK | InterlockFlags::RANGE_REJECTED);
        self.last_command_time = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interlock_with_zone(zone: Option<[f64; 2]>) -> SafetyInterlock {
        let mut cfg = TurretConfig::default();
        cfg.safety.no_fire_zone = zone;
        SafetyInterlock::new(&cfg, 0.0)
    }

    #[test]
    fn out_of_range_rejected_not_clamped() {
        let mut il = interlock_with_zone(None);
        assert_eq!(il.validate_target(AxisId::Pan, 200.0), Ok(200.0));
        let err = il.validate_target(AxisId::Pan, 301.0).unwrap_err();
        assert!(matches!(err, InterlockError::OutOfRange { axis: AxisId::Pan, .. }));
        assert!(il.flags().contains(InterlockFlags::RANGE_REJECTED));
        assert!(il.validate_target(AxisId::Tilt, -1.0).is_err());
        assert!(il.validate_target(AxisId::Tilt, f64::NAN).is_err());
        assert_eq!(il.validate_target(AxisId::Tilt, 60.0), Ok(60.0));
        assert!(!il.flags().contains(InterlockFlags::RANGE_REJECTED));
    }

    #[test]
    fn autonomous_pose_clamped() {
        let il = interlock_with_zone(None);
        assert_eq!(il.clamp_pose(Pose::new(-20.0, 75.0)), Pose::new(0.0, 60.0));
    }

    #[test]
    fn fire_gated_inside_zone_inclusive() {
        let mut il = interlock_with_zone(Some([100.0, 140.0]));
        assert!(!il.gate_fire(true, 100.0));
        assert!(il.flags().contains(InterlockFlags::FIRE_INHIBITED));
        assert!(!il.gate_fire(true, 140.0));
        assert!(il.gate_fire(true, 140.5));
        assert!(!il.flags().contains(InterlockFlags::FIRE_INHIBITED));
        assert!(!il.gate_fire(false, 50.0));
    }

    #[test]
    fn estop_forces_fire_off_and_rejects_targets() {
        let mut il = interlock_with_zone(None);
        assert!(il.trigger_estop(EstopCause::Operator));
        assert!(!il.trigger_estop(EstopCause::Operator));
        assert!(il.flags().has_critical());
        assert!(!il.gate_fire(true, 10.0));
        assert_eq!(
            il.validate_target(AxisId::Pan, 10.0),
            Err(InterlockError::EstopActive)
        );
        il.reset(1.0);
        assert!(!il.is_estopped());
        assert!(il.flags().is_empty());
        assert_eq!(il.estop_count(), 1);
    }

    #[test]
    fn staleness_latches_estop() {
        let mut il = interlock_with_zone(None);
        assert!(!il.check_staleness(1.9));
        il.note_command(1.5);
        assert!(!il.check_staleness(3.4));
        assert!(il.check_staleness(3.6));
        assert!(il.flags().contains(InterlockFlags::COMM_STALE));
        assert!(!il.check_staleness(10.0));
        il.reset(10.0);
        assert!(!il.check_staleness(11.0));
    }

    #[test]
    fn staleness_disabled() {
        let mut cfg = TurretConfig::default();
        cfg.safety.comm_stale_threshold = 0.0;
        let mut il = SafetyInterlock::new(&cfg, 0.0);
        assert!(!il.check_staleness(1.0e6));
    }
}
