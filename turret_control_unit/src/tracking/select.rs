//! Candidate scoring and image-to-pose mapping.

use turret_common::control_unit::config::TurretConfig;
use turret_common::types::{AxisLimits, Detection, Pose};

/// Scoring weights and frame geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub size_weight: f64,
    pub center_weight: f64,
    pub image_width: f64,
    pub image_height: f64,
}

impl From<&TurretConfig> for ScoreWeights {
    fn from(cfg: &TurretConfig) -> Self {
        Self {
            size_weight: cfg.tracking.size_weight,
            center_weight: cfg.tracking.center_weight,
            image_width: cfg.tracking.image_width,
            image_height: cfg.tracking.image_height,
        }
    }
}

/// `size_weight * size + center_weight * (1 - distance / half_diagonal)`,
/// both terms clamped to `[0, 1]`.
pub fn score(det: &Detection, w: &ScoreWeights) -> f64 {
    let size = if det.size.is_nan() {
        0.0
    } else {
        det.size.clamp(0.0, 1.0)
    };
    let dx = det.center_x - w.image_width / 2.0;
    let dy = det.center_y - w.image_height / 2.0;
    let half_diag = w.image_width.hypot(w.image_height) / 2.0;
    let dist = dx.hypot(dy) / half_diag;
    let dist = if dist.is_nan() { 1.0 } else { dist.clamp(0.0, 1.0) };
    w.size_weight * size + w.center_weight * (1.0 - dist)
}

/// Highest-scoring enemy. Ties go to the lowest id.
pub fn best_candidate<'a>(
    detections: &'a [Detection],
    w: &ScoreWeights,
) -> Option<(&'a Detection, f64)> {
    detections
        .iter()
        .filter(|d| d.is_enemy())
        .map(|d| (d, score(d, w)))
        .fold(None, |best, (d, s)| match best {
            Some((b, bs)) if bs > s || (bs == s && b.id <= d.id) => Some((b, bs)),
            _ => Some((d, s)),
        })
}

/// Linear map from image pixels to the axis ranges, shifted by the
/// camera/laser aim offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMapping {
    pub pan: AxisLimits,
    pub tilt: AxisLimits,
    pub image_width: f64,
    pub image_height: f64,
    pub invert_tilt: bool,
    /// [deg], added after mapping.
    pub aim_offset: Pose,
}

impl From<&TurretConfig> for ImageMapping {
    fn from(cfg: &TurretConfig) -> Self {
        Self {
            pan: cfg.pan.limits(),
            tilt: cfg.tilt.limits(),
            image_width: cfg.tracking.image_width,
            image_height: cfg.tracking.image_height,
            invert_tilt: cfg.tracking.invert_tilt,
            aim_offset: Pose::new(cfg.tracking.aim_offset_pan, cfg.tracking.aim_offset_tilt),
        }
    }
}

impl ImageMapping {
    /// Aim point for an image position. Always inside both axis ranges.
    pub fn to_pose(&self, center_x: f64, center_y: f64) -> Pose {
        let fx = unit(center_x / self.image_width);
        let mut fy = unit(center_y / self.image_height);
        if self.invert_tilt {
            fy = 1.0 - fy;
        }
        Pose::new(
            self.pan
                .clamp(self.pan.min_angle + fx * self.pan.span() + self.aim_offset.pan_angle),
            self.tilt
                .clamp(self.tilt.min_angle + fy * self.tilt.span() + self.aim_offset.tilt_angle),
        )
    }
}

#[inline]
fn unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
