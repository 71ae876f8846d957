//! Target selection and tracking.
//!
//! Detections arrive as complete frames from a producer thread. The tracker
//! scores enemy candidates, keeps one lock with switching hysteresis,
//! coasts on the last derived pose while the target is missing and drops
//! the lock after `target_lost_timeout`.

pub mod feed;
pub mod lock;
pub mod replay;
pub mod select;

pub use feed::{DetectionFeed, DetectionPublisher, DetectionReader};
pub use lock::{TargetLock, TrackUpdate, Tracker};
pub use replay::{ReplayError, load_replay, parse_replay_line, spawn_replay};
pub use select::{ImageMapping, ScoreWeights, best_candidate, score};
