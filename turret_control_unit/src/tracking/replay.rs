//! Detection replay from newline-delimited JSON.
//!
//! Each non-empty line holds one frame: a JSON array of detections.
//! A replay thread publishes the frames at a fixed rate, standing in for
//! the external detection pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};
use turret_common::types::Detection;

use super::feed::DetectionPublisher;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("frame rate {0} must be positive")]
    BadRate(f64),
    #[error("cannot spawn replay thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Parse one NDJSON line into detections.
pub fn parse_replay_line(line: &str) -> Result<Vec<Detection>, serde_json::Error> {
    serde_json::from_str(line)
}

/// Load every frame of a replay file. Blank lines are skipped.
pub fn load_replay(path: &Path) -> Result<Vec<Vec<Detection>>, ReplayError> {
    let content = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            parse_replay_line(l).map_err(|source| ReplayError::Parse { line: i + 1, source })
        })
        .collect()
}

/// Publish `frames` at `fps`, looping, until `running` clears.
pub fn spawn_replay(
    frames: Vec<Vec<Detection>>,
    mut publisher: DetectionPublisher,
    fps: f64,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, ReplayError> {
    if !(fps > 0.0 && fps.is_finite()) {
        return Err(ReplayError::BadRate(fps));
    }
    let period = Duration::from_secs_f64(1.0 / fps);
    thread::Builder::new()
        .name("detections".into())
        .spawn(move || {
            info!(frames = frames.len(), fps, "Detection replay started");
            if frames.is_empty() {
                return;
            }
            let start = Instant::now();
            let mut next = start;
            for frame in frames.iter().cycle() {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                let seq = publisher.publish(start.elapsed().as_secs_f64(), frame);
                debug!(sequence = seq, detections = frame.len(), "Frame published");
                next += period;
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                } else {
                    next = now;
                }
            }
            info!(published = publisher.sequence(), "Detection replay stopped");
        })
        .map_err(ReplayError::Spawn)
}
