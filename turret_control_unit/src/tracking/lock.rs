//! Target lock lifecycle.
//!
//! A frame is consumed once, keyed by its sequence number. Between frames
//! only lock expiry is evaluated, so expiry does not depend on the frame
//! rate. Each sighting of the locked id is kept in a short history; with a
//! non-zero `lead_time` the desired pose is extrapolated along the mean
//! velocity of that history.

use std::sync::Arc;

use heapless::Deque;
use tracing::{debug, info};
use turret_common::consts::{TRACK_HISTORY_LEN, TRACK_HISTORY_MIN};
use turret_common::control_unit::config::TurretConfig;
use turret_common::types::{Classification, DetectionFrame, Pose};

use super::select::{ImageMapping, ScoreWeights, best_candidate, score};

/// Aim point of one sighting at local time `time` [s].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub time: f64,
    pub pose: Pose,
}

/// The single locked target.
#[derive(Debug, Clone)]
pub struct TargetLock {
    pub detection_id: u32,
    pub classification: Classification,
    /// [s]
    pub last_seen_time: f64,
    pub score: f64,
    /// [s]
    pub acquired_time: f64,
    /// Pose derived from the last sighting; held while coasting.
    pub last_pose: Pose,
    /// Most recent frame did not contain the locked id.
    pub coasting: bool,
    /// Oldest first.
    pub history: Deque<Sighting, TRACK_HISTORY_LEN>,
}

impl TargetLock {
    fn sighted(&mut self, time: f64, pose: Pose) {
        self.last_seen_time = time;
        self.last_pose = pose;
        self.coasting = false;
        if self.history.is_full() {
            self.history.pop_front();
        }
        let _ = self.history.push_back(Sighting { time, pose });
    }

    /// Mean velocity over the kept sightings [deg/s]. `None` until
    /// `TRACK_HISTORY_MIN` sightings span a positive time.
    pub fn velocity(&self) -> Option<Pose> {
        if self.history.len() < TRACK_HISTORY_MIN {
            return None;
        }
        let first = self.history.front()?;
        let last = self.history.back()?;
        let dt = last.time - first.time;
        (dt > 0.0).then(|| {
            Pose::new(
                (last.pose.pan_angle - first.pose.pan_angle) / dt,
                (last.pose.tilt_angle - first.pose.tilt_angle) / dt,
            )
        })
    }
}

/// Lock events produced by one update. Both may be set in the same tick
/// when an expired lock is immediately replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackUpdate {
    pub lost: Option<u32>,
    pub acquired: Option<u32>,
}

impl TrackUpdate {
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.lost.is_none() && self.acquired.is_none()
    }
}

#[derive(Debug)]
pub struct Tracker {
    weights: ScoreWeights,
    mapping: ImageMapping,
    target_lost_timeout: f64,
    auto_engage: bool,
    engage_dwell: f64,
    lead_time: f64,
    lock: Option<TargetLock>,
    last_sequence: u64,
    last_frame: Option<Arc<DetectionFrame>>,
    /// Local time the last frame was consumed [s].
    last_frame_time: f64,
    frames_processed: u64,
}

impl Tracker {
    pub fn new(cfg: &TurretConfig) -> Self {
        Self {
            weights: ScoreWeights::from(cfg),
            mapping: ImageMapping::from(cfg),
            target_lost_timeout: cfg.tracking.target_lost_timeout,
            auto_engage: cfg.tracking.auto_engage,
            engage_dwell: cfg.tracking.engage_dwell,
            lead_time: cfg.tracking.lead_time,
            lock: None,
            last_sequence: 0,
            last_frame: None,
            last_frame_time: 0.0,
            frames_processed: 0,
        }
    }

    #[inline]
    pub const fn lock(&self) -> Option<&TargetLock> {
        self.lock.as_ref()
    }

    #[inline]
    pub const fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Desired pose while a lock exists: the last sighting, led by
    /// `velocity * lead_time` once a velocity is known. Coasting locks are
    /// not led.
    pub fn desired_pose(&self) -> Option<Pose> {
        let lock = self.lock.as_ref()?;
        if self.lead_time <= 0.0 || lock.coasting {
            return Some(lock.last_pose);
        }
        let Some(v) = lock.velocity() else {
            return Some(lock.last_pose);
        };
        let led = Pose::new(
            lock.last_pose.pan_angle + v.pan_angle * self.lead_time,
            lock.last_pose.tilt_angle + v.tilt_angle * self.lead_time,
        );
        Some(led.clamped(&self.mapping.pan, &self.mapping.tilt))
    }

    /// Consume `frame` if new, then check lock expiry.
    pub fn update(&mut self, frame: &Arc<DetectionFrame>, now: f64) -> TrackUpdate {
        let mut events = TrackUpdate::default();

        if frame.sequence != 0 && frame.sequence != self.last_sequence {
            self.last_sequence = frame.sequence;
            self.last_frame = Some(Arc::clone(frame));
            self.last_frame_time = now;
            self.frames_processed += 1;
            events.acquired = self.consume(frame, now);
        }

        let expired = self
            .lock
            .as_ref()
            .filter(|l| now - l.last_seen_time > self.target_lost_timeout)
            .map(|l| (l.detection_id, now - l.last_seen_time));
        if let Some((id, unseen_s)) = expired {
            info!(id, unseen_s, "Target lost");
            self.lock = None;
            events.lost = Some(id);
            // Reselect from the latest frame if it is still current.
            if now - self.last_frame_time <= self.target_lost_timeout {
                if let Some(last) = self.last_frame.clone() {
                    events.acquired = self.consume(&last, now);
                }
            }
        }

        events
    }

    /// Whether the tracker asks to fire this tick.
    pub fn engage_request(&self, now: f64, axes_settled: bool) -> bool {
        self.auto_engage
            && axes_settled
            && self
                .lock
                .as_ref()
                .is_some_and(|l| !l.coasting && now - l.acquired_time >= self.engage_dwell)
    }

    /// Drop the lock without reporting a loss. Returns the dropped id.
    pub fn clear(&mut self) -> Option<u32> {
        self.lock.take().map(|l| l.detection_id)
    }

    fn consume(&mut self, frame: &DetectionFrame, now: f64) -> Option<u32> {
        if let Some(lock) = self.lock.as_mut() {
            match frame
                .detections
                .iter()
                .find(|d| d.is_enemy() && d.id == lock.detection_id)
            {
                Some(det) => {
                    lock.score = score(det, &self.weights);
                    lock.sighted(now, self.mapping.to_pose(det.center_x, det.center_y));
                }
                None => {
                    if !lock.coasting {
                        debug!(id = lock.detection_id, "Locked target missing, coasting");
                    }
                    lock.coasting = true;
                }
            }
            return None;
        }

        let (det, score) = best_candidate(&frame.detections, &self.weights)?;
        let pose = self.mapping.to_pose(det.center_x, det.center_y);
        let mut lock = TargetLock {
            detection_id: det.id,
            classification: det.classification,
            last_seen_time: now,
            score,
            acquired_time: now,
            last_pose: pose,
            coasting: false,
            history: Deque::new(),
        };
        lock.sighted(now, pose);
        info!(
            id = det.id,
            score,
            pan = lock.last_pose.pan_angle,
            tilt = lock.last_pose.tilt_angle,
            "Target acquired"
        );
        self.lock = Some(lock);
        Some(det.id)
    }
}
