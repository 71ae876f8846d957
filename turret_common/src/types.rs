//! Core value types shared by the control unit, the HAL and detection producers.
//!
//! All angles are degrees (`f64`). Image coordinates are pixels with the
//! origin at the top-left corner of the frame.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::MAX_DETECTIONS;

// ─── Axes ───────────────────────────────────────────────────────────

/// Physical axis of the pointing platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisId {
    /// Horizontal rotation (yaw, axis A, stepper driven).
    Pan,
    /// Vertical rotation (pitch, axis B, servo driven).
    Tilt,
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pan => f.write_str("pan"),
            Self::Tilt => f.write_str("tilt"),
        }
    }
}

/// Closed hardware range of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    /// Lower bound [deg].
    pub min_angle: f64,
    /// Upper bound [deg].
    pub max_angle: f64,
}

impl AxisLimits {
    pub const fn new(min_angle: f64, max_angle: f64) -> Self {
        Self {
            min_angle,
            max_angle,
        }
    }

    /// Clamp `angle` into the range. NaN maps to `min_angle`.
    #[inline]
    pub fn clamp(&self, angle: f64) -> f64 {
        if angle.is_nan() {
            return self.min_angle;
        }
        angle.clamp(self.min_angle, self.max_angle)
    }

    /// Whether `angle` lies inside the range (inclusive).
    #[inline]
    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min_angle && angle <= self.max_angle
    }

    /// Width of the range [deg].
    #[inline]
    pub fn span(&self) -> f64 {
        self.max_angle - self.min_angle
    }

    /// Midpoint of the range [deg].
    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.min_angle + self.max_angle) / 2.0
    }
}

/// Pan/tilt orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub pan_angle: f64,
    pub tilt_angle: f64,
}

impl Pose {
    pub const fn new(pan_angle: f64, tilt_angle: f64) -> Self {
        Self {
            pan_angle,
            tilt_angle,
        }
    }

    /// Clamp both angles into their limits.
    pub fn clamped(self, pan: &AxisLimits, tilt: &AxisLimits) -> Self {
        Self {
            pan_angle: pan.clamp(self.pan_angle),
            tilt_angle: tilt.clamp(self.tilt_angle),
        }
    }

    /// Angle for one axis.
    #[inline]
    pub const fn angle(&self, axis: AxisId) -> f64 {
        match axis {
            AxisId::Pan => self.pan_angle,
            AxisId::Tilt => self.tilt_angle,
        }
    }
}

// ─── Detections ─────────────────────────────────────────────────────

/// Classification assigned by the external detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Enemy,
    Friendly,
    Unknown,
}

/// One object reported by the detection pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Tracker-assigned identity, stable across frames.
    pub id: u32,
    pub classification: Classification,
    /// Center of the bounding box [px].
    pub center_x: f64,
    pub center_y: f64,
    /// Bounding-box area as a fraction of the frame area (0..1).
    pub size: f64,
    /// Detector confidence (0..1).
    #[serde(default)]
    pub confidence: f64,
    /// Producer timestamp [s].
    #[serde(default)]
    pub timestamp: f64,
}

impl Detection {
    /// Convenience constructor used by producers and tests.
    pub const fn new(
        id: u32,
        classification: Classification,
        center_x: f64,
        center_y: f64,
        size: f64,
    ) -> Self {
        Self {
            id,
            classification,
            center_x,
            center_y,
            size,
            confidence: 1.0,
            timestamp: 0.0,
        }
    }

    #[inline]
    pub const fn is_enemy(&self) -> bool {
        matches!(self.classification, Classification::Enemy)
    }
}

/// Bounded list of detections carried by one frame.
pub type DetectionList = heapless::Vec<Detection, MAX_DETECTIONS>;

/// Complete snapshot published by the detection producer once per frame.
#[derive(Debug, Clone, Default)]
pub struct DetectionFrame {
    /// Monotonic frame counter; 0 means "nothing published yet".
    pub sequence: u64,
    /// Producer timestamp [s].
    pub timestamp: f64,
    pub detections: DetectionList,
}

impl DetectionFrame {
    /// Build a frame from a slice, dropping detections beyond capacity.
    ///
    /// Returns the frame and the number of dropped detections.
    pub fn from_slice(sequence: u64, timestamp: f64, detections: &[Detection]) -> (Self, usize) {
        let mut list = DetectionList::new();
        let mut dropped = 0;
        for det in detections {
            if list.push(*det).is_err() {
                dropped += 1;
            }
        }
        (
            Self {
                sequence,
                timestamp,
                detections: list,
            },
            dropped,
        )
    }
}
