//! Single-writer / single-reader detection frame feed.
//!
//! The producer swaps in a complete `Arc<DetectionFrame>`; the tick loop
//! only ever `try_lock`s and falls back to the frame it saw last, so it
//! never blocks and never observes a partial frame.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;
use turret_common::types::{Detection, DetectionFrame};

type Slot = Arc<Mutex<Arc<DetectionFrame>>>;

/// Constructor for a connected publisher/reader pair.
pub struct DetectionFeed;

impl DetectionFeed {
    pub fn pair() -> (DetectionPublisher, DetectionReader) {
        let initial = Arc::new(DetectionFrame::default());
        let slot: Slot = Arc::new(Mutex::new(Arc::clone(&initial)));
        (
            DetectionPublisher {
                slot: Arc::clone(&slot),
                sequence: 0,
            },
            DetectionReader {
                slot,
                cached: initial,
                contended: 0,
            },
        )
    }
}

/// Producer side. Assigns frame sequence numbers.
pub struct DetectionPublisher {
    slot: Slot,
    sequence: u64,
}

impl DetectionPublisher {
    /// Publish one frame and return its sequence number.
    pub fn publish(&mut self, timestamp: f64, detections: &[Detection]) -> u64 {
        self.sequence += 1;
        let (frame, dropped) = DetectionFrame::from_slice(self.sequence, timestamp, detections);
        if dropped > 0 {
            warn!(sequence = self.sequence, dropped, "Detection frame truncated");
        }
        *self.slot.lock() = Arc::new(frame);
        self.sequence
    }

    #[inline]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Tick-loop side.
pub struct DetectionReader {
    slot: Slot,
    cached: Arc<DetectionFrame>,
    contended: u64,
}

impl DetectionReader {
    /// Latest published frame, or the cached one if the producer holds the lock.
    pub fn latest(&mut self) -> Arc<DetectionFrame> {
        match self.slot.try_lock() {
            Some(guard) => self.cached = Arc::clone(&guard),
            None => self.contended += 1,
        }
        Arc::clone(&self.cached)
    }

    /// Reads served from the cache because the slot was busy.
    #[inline]
    pub const fn contended(&self) -> u64 {
        self.contended
    }
}
