//! Scan generator: one candidate pose per tick while no target is locked.

use tracing::{debug, info};
use turret_common::control_unit::config::TurretConfig;
use turret_common::control_unit::state::ScanMode;
use turret_common::types::Pose;

use super::mode::{PhaseAction, ScanEvent, ScanModeMachine, TransitionResult};
use super::pattern::{ScanParams, ScanState, SweepDirection};

/// Pattern phase plus mode machine.
///
/// The stored phase always belongs to the resume pattern; it is frozen
/// while tracking.
#[derive(Debug, Clone)]
pub struct ScanGenerator {
    params: ScanParams,
    machine: ScanModeMachine,
    phase: ScanState,
    completed_patterns: u64,
}

impl ScanGenerator {
    pub fn new(cfg: &TurretConfig) -> Self {
        let params = ScanParams::from(cfg);
        let machine = ScanModeMachine::new(cfg.scan.default_mode);
        let phase = initial_phase(machine.pattern(), &params);
        Self {
            params,
            machine,
            phase,
            completed_patterns: 0,
        }
    }

    #[inline]
    pub const fn mode(&self) -> ScanMode {
        self.machine.mode()
    }

    /// Active or resume pattern.
    #[inline]
    pub const fn pattern(&self) -> ScanMode {
        self.machine.pattern()
    }

    #[inline]
    pub const fn phase(&self) -> &ScanState {
        &self.phase
    }

    #[inline]
    pub const fn params(&self) -> &ScanParams {
        &self.params
    }

    /// Number of full patterns completed since start.
    #[inline]
    pub const fn completed_patterns(&self) -> u64 {
        self.completed_patterns
    }

    /// Completion of the current pattern cycle [%].
    pub fn progress(&self) -> f64 {
        self.phase.progress(&self.params)
    }

    pub fn select_pattern(&mut self, pattern: ScanMode) -> TransitionResult {
        self.apply(ScanEvent::SelectPattern(pattern))
    }

    pub fn target_acquired(&mut self) -> TransitionResult {
        self.apply(ScanEvent::TargetAcquired)
    }

    pub fn target_lost(&mut self) -> TransitionResult {
        self.apply(ScanEvent::TargetLost)
    }

    /// Pose for this tick, then advance by `dt` seconds. `None` while tracking.
    pub fn next_pose(&mut self, dt: f64) -> Option<Pose> {
        if self.machine.is_tracking() {
            return None;
        }
        let (pose, completed) = self.phase.step(dt, &self.params);
        if completed {
            self.completed_patterns += 1;
            debug!(
                pattern = %self.machine.pattern(),
                total = self.completed_patterns,
                "Scan pattern completed"
            );
        }
        Some(pose)
    }

    fn apply(&mut self, event: ScanEvent) -> TransitionResult {
        let result = self.machine.handle_event(event);
        if let TransitionResult::Ok(t) = &result {
            match t.action {
                PhaseAction::Reset => {
                    self.phase = initial_phase(self.machine.pattern(), &self.params);
                }
                PhaseAction::None | PhaseAction::Save | PhaseAction::Restore => {}
            }
            if t.from != t.to {
                info!(from = %t.from, to = %t.to, "Scan mode changed");
            }
        }
        result
    }
}

fn initial_phase(pattern: ScanMode, params: &ScanParams) -> ScanState {
    // Tracking is never the resume pattern.
    ScanState::initial(pattern, params).unwrap_or(ScanState::Sweep {
        direction: SweepDirection::Up,
        position: params.pan.min_angle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.01;

    fn generator() -> ScanGenerator {
        ScanGenerator::new(&TurretConfig::default())
    }

    #[test]
    fn emits_until_tracking() {
        let mut g = generator();
        assert!(g.next_pose(DT).is_some());
        g.target_acquired();
        assert_eq!(g.mode(), ScanMode::Tracking);
        assert!(g.next_pose(DT).is_none());
    }

    #[test]
    fn resumes_at_saved_phase() {
        let mut g = generator();
        for _ in 0..100 {
            g.next_pose(DT);
        }
        let saved = *g.phase();
        g.target_acquired();
        for _ in 0..50 {
            assert!(g.next_pose(DT).is_none());
        }
        g.target_lost();
        assert_eq!(g.mode(), ScanMode::Sweep);
        assert_eq!(*g.phase(), saved);
        let pose = g.next_pose(DT).unwrap();
        assert_eq!(pose, saved.pose(g.params()));
    }

    #[test]
    fn select_resets_phase() {
        let mut g = generator();
        for _ in 0..100 {
            g.next_pose(DT);
        }
        g.select_pattern(ScanMode::Sweep);
        assert_eq!(g.next_pose(DT).unwrap().pan_angle, 0.0);
    }

    #[test]
    fn select_during_tracking_resumes_new_pattern_from_start() {
        let mut g = generator();
        g.next_pose(DT);
        g.target_acquired();
        g.select_pattern(ScanMode::Spiral);
        assert_eq!(g.mode(), ScanMode::Tracking);
        g.target_lost();
        assert_eq!(g.mode(), ScanMode::Spiral);
        assert_eq!(g.next_pose(DT).unwrap(), Pose::new(150.0, 30.0));
    }

    #[test]
    fn counts_completed_spirals() {
        let mut g = generator();
        g.select_pattern(ScanMode::Spiral);
        // 240 ticks per revolution, reset on the 11th wrap.
        for _ in 0..(240 * 11) {
            g.next_pose(DT);
        }
        assert_eq!(g.completed_patterns(), 1);
        assert_eq!(g.progress(), 0.0);
    }
}
