//! Search pattern phases.
//!
//! Every pattern emits the pose for its current phase and then advances.
//! Sweeps reflect at their bounds; the spiral grows one radius step per
//! revolution and restarts from the center once it would pass the maximum.

use turret_common::control_unit::config::TurretConfig;
use turret_common::control_unit::state::ScanMode;
use turret_common::types::{AxisLimits, Pose};

/// Sweep direction along the pan axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    Up,
    Down,
}

impl SweepDirection {
    #[inline]
    const fn sign(self) -> f64 {
        match self {
            Self::Up => 1.0,
            Self::Down => -1.0,
        }
    }
}

/// Pattern parameters, resolved from configuration once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanParams {
    pub pan: AxisLimits,
    pub tilt: AxisLimits,
    /// [deg/s]
    pub scan_speed: f64,
    pub sweep_tilt: f64,
    pub spiral_center: Pose,
    /// [deg/tick]
    pub spiral_angle_step: f64,
    /// [deg/revolution]
    pub spiral_radius_step: f64,
    pub spiral_max_radius: f64,
    pub sector_lo: f64,
    pub sector_hi: f64,
}

impl From<&TurretConfig> for ScanParams {
    fn from(cfg: &TurretConfig) -> Self {
        let tilt = cfg.tilt.limits();
        Self {
            pan: cfg.pan.limits(),
            tilt,
            scan_speed: cfg.scan.scan_speed,
            sweep_tilt: cfg.scan.sweep_tilt_or(&tilt),
            spiral_center: Pose::new(cfg.scan.spiral_center_pan, cfg.scan.spiral_center_tilt),
            spiral_angle_step: cfg.scan.spiral_angle_step,
            spiral_radius_step: cfg.scan.spiral_radius_step,
            spiral_max_radius: cfg.scan.spiral_max_radius,
            sector_lo: cfg.scan.sector_lo,
            sector_hi: cfg.scan.sector_hi,
        }
    }
}

/// Phase of the active search pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanState {
    Sweep {
        direction: SweepDirection,
        position: f64,
    },
    Spiral {
        radius: f64,
        /// [deg]
        angle: f64,
    },
    Sector {
        lo: f64,
        hi: f64,
        position: f64,
        direction: SweepDirection,
    },
}

impl ScanState {
    /// Initial phase of a pattern. `None` for `Tracking`.
    pub fn initial(mode: ScanMode, params: &ScanParams) -> Option<Self> {
        match mode {
            ScanMode::Sweep => Some(Self::Sweep {
                direction: SweepDirection::Up,
                position: params.pan.min_angle,
            }),
            ScanMode::Spiral => Some(Self::Spiral {
                radius: 0.0,
                angle: 0.0,
            }),
            ScanMode::Sector => Some(Self::Sector {
                lo: params.sector_lo,
                hi: params.sector_hi,
                position: params.sector_lo,
                direction: SweepDirection::Up,
            }),
            ScanMode::Tracking => None,
        }
    }

    /// Pattern this phase belongs to.
    pub const fn mode(&self) -> ScanMode {
        match self {
            Self::Sweep { .. } => ScanMode::Sweep,
            Self::Spiral { .. } => ScanMode::Spiral,
            Self::Sector { .. } => ScanMode::Sector,
        }
    }

    /// Pose for the current phase.
    pub fn pose(&self, params: &ScanParams) -> Pose {
        let raw = match *self {
            Self::Sweep { position, .. } | Self::Sector { position, .. } => {
                Pose::new(position, params.sweep_tilt)
            }
            Self::Spiral { radius, angle } => {
                let theta = angle.to_radians();
                Pose::new(
                    params.spiral_center.pan_angle + radius * theta.cos(),
                    params.spiral_center.tilt_angle + radius * theta.sin(),
                )
            }
        };
        raw.clamped(&params.pan, &params.tilt)
    }

    /// Emit the current pose, then advance by one tick of `dt` seconds.
    ///
    /// The flag is `true` when this step completed a full pattern.
    pub fn step(&mut self, dt: f64, params: &ScanParams) -> (Pose, bool) {
        let pose = self.pose(params);
        let completed = match self {
            Self::Sweep {
                direction,
                position,
            } => bounce(
                position,
                direction,
                params.pan.min_angle,
                params.pan.max_angle,
                params.scan_speed * dt,
            ),
            Self::Sector {
                lo,
                hi,
                position,
                direction,
            } => bounce(position, direction, *lo, *hi, params.scan_speed * dt),
            Self::Spiral { radius, angle } => {
                *angle += params.spiral_angle_step;
                if *angle < 360.0 {
                    false
                } else {
                    *angle -= 360.0;
                    if *radius + params.spiral_radius_step > params.spiral_max_radius {
                        *radius = 0.0;
                        *angle = 0.0;
                        true
                    } else {
                        *radius += params.spiral_radius_step;
                        false
                    }
                }
            }
        };
        (pose, completed)
    }

    /// Completion of the current pattern cycle [%].
    pub fn progress(&self, params: &ScanParams) -> f64 {
        let pct = match *self {
            Self::Sweep {
                direction,
                position,
            } => round_trip(position, direction, params.pan.min_angle, params.pan.max_angle),
            Self::Sector {
                lo,
                hi,
                position,
                direction,
            } => round_trip(position, direction, lo, hi),
            Self::Spiral { radius, .. } => radius / params.spiral_max_radius,
        };
        (pct * 100.0).clamp(0.0, 100.0)
    }
}

/// Move along `[lo, hi]`, reflecting at the ends.
/// Returns `true` when a round trip finishes (back at `lo` heading up).
fn bounce(position: &mut f64, direction: &mut SweepDirection, lo: f64, hi: f64, step: f64) -> bool {
    let mut next = *position + direction.sign() * step;
    let mut completed = false;
    if next >= hi {
        next = (2.0 * hi - next).max(lo);
        *direction = SweepDirection::Down;
    } else if next <= lo {
        next = (2.0 * lo - next).min(hi);
        *direction = SweepDirection::Up;
        completed = true;
    }
    *position = next;
    completed
}

fn round_trip(position: f64, direction: SweepDirection, lo: f64, hi: f64) -> f64 {
    let span = hi - lo;
    if span <= 0.0 {
        return 0.0;
    }
    match direction {
        SweepDirection::Up => (position - lo) / (2.0 * span),
        SweepDirection::Down => 0.5 + (hi - position) / (2.0 * span),
    }
}
