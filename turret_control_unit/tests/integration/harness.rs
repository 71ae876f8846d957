//! Shared test rig: runner + loopback peer + simulated hardware + detection feed.

use turret_common::control_unit::config::TurretConfig;
use turret_common::types::{Classification, Detection};
use turret_control_unit::cycle::CycleRunner;
use turret_control_unit::tracking::{DetectionFeed, DetectionPublisher};
use turret_hal::channel::{LoopbackChannel, LoopbackPeer};
use turret_hal::drivers::simulation::{SimHandle, SimulatedTurret};

pub const DT: f64 = 0.01;

pub struct Rig {
    pub runner: CycleRunner,
    pub peer: LoopbackPeer,
    pub sim: SimHandle,
    pub detections: DetectionPublisher,
    pub now: f64,
}

impl Rig {
    pub fn new(cfg: TurretConfig) -> Self {
        let driver = SimulatedTurret::new();
        let sim = driver.handle();
        let (channel, peer) = LoopbackChannel::pair();
        let (detections, reader) = DetectionFeed::pair();
        let runner = CycleRunner::new(cfg, Box::new(driver), Box::new(channel), reader)
            .expect("runner init");
        Self {
            runner,
            peer,
            sim,
            detections,
            now: 0.0,
        }
    }

    /// Default configuration with the staleness fail-safe disabled.
    pub fn quiet() -> Self {
        Self::new(quiet_config())
    }

    pub fn tick(&mut self) {
        self.runner.tick(self.now);
        self.now += DT;
    }

    pub fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Send one line, run one tick, return the replies.
    pub fn command(&mut self, line: &str) -> Vec<String> {
        self.peer.send_line(line);
        self.tick();
        self.peer.take_replies()
    }

    pub fn publish(&mut self, dets: &[Detection]) -> u64 {
        self.detections.publish(self.now, dets)
    }

    /// Publish `dets` every tick for `n` ticks.
    pub fn track_for(&mut self, dets: &[Detection], n: usize) {
        for _ in 0..n {
            self.publish(dets);
            self.tick();
        }
    }
}

pub fn quiet_config() -> TurretConfig {
    let mut cfg = TurretConfig::default();
    cfg.safety.comm_stale_threshold = 0.0;
    cfg
}

pub fn enemy(id: u32, x: f64, y: f64, size: f64) -> Detection {
    Detection::new(id, Classification::Enemy, x, y, size)
}

/// Enemy placed `dist` half-diagonals from the center of a 640x480 frame.
pub fn enemy_at_distance(id: u32, size: f64, dist: f64) -> Detection {
    // Half diagonal of 640x480 is 400 px; (0.8, 0.6) is a unit vector.
    enemy(id, 320.0 + dist * 400.0 * 0.8, 240.0 + dist * 400.0 * 0.6, size)
}
