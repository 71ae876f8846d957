//! Scan mode transitions.
//!
//! SWEEP / SPIRAL / SECTOR ↔ TRACKING. The table is total over
//! `(mode, event)`; the only rejected input is selecting `Tracking`
//! explicitly.

use turret_common::control_unit::state::ScanMode;

/// What the generator must do with the pattern phase after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAction {
    /// Keep the phase as is.
    None,
    /// Start the (resume) pattern from its initial phase.
    Reset,
    /// Store the active phase; the generator stops emitting.
    Save,
    /// Resume from the stored phase.
    Restore,
}

/// Accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: ScanMode,
    pub to: ScanMode,
    pub action: PhaseAction,
}

/// Result of a scan mode transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Ok(ModeTransition),
    Rejected(&'static str),
}

/// Events driving the scan mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    /// Operator selected a pattern.
    SelectPattern(ScanMode),
    /// Tracker locked a target.
    TargetAcquired,
    /// Tracker dropped its lock.
    TargetLost,
}

/// Scan mode plus the pattern to resume after tracking.
#[derive(Debug, Clone)]
pub struct ScanModeMachine {
    mode: ScanMode,
    resume: ScanMode,
}

impl ScanModeMachine {
    /// Start in `pattern`. `Tracking` falls back to the default pattern.
    pub fn new(pattern: ScanMode) -> Self {
        let pattern = if pattern.is_pattern() {
            pattern
        } else {
            ScanMode::default()
        };
        Self {
            mode: pattern,
            resume: pattern,
        }
    }

    #[inline]
    pub const fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Pattern that runs (or will resume) when no target is locked.
    #[inline]
    pub const fn pattern(&self) -> ScanMode {
        self.resume
    }

    #[inline]
    pub const fn is_tracking(&self) -> bool {
        matches!(self.mode, ScanMode::Tracking)
    }

    pub fn handle_event(&mut self, event: ScanEvent) -> TransitionResult {
        use PhaseAction as A;
        use ScanEvent::*;
        use ScanMode::*;

        let from = self.mode;
        let (to, action) = match (from, event) {
            (_, SelectPattern(Tracking)) => {
                return TransitionResult::Rejected("TRACKING cannot be selected explicitly");
            }

            // Pattern → pattern, or retarget the resume pattern while tracking.
            (Tracking, SelectPattern(p)) => {
                self.resume = p;
                (Tracking, A::Reset)
            }
            (_, SelectPattern(p)) => {
                self.resume = p;
                (p, A::Reset)
            }

            (Tracking, TargetAcquired) => (Tracking, A::None),
            (_, TargetAcquired) => (Tracking, A::Save),

            (Tracking, TargetLost) => (self.resume, A::Restore),
            (q, TargetLost) => (q, A::None),
        };

        self.mode = to;
        TransitionResult::Ok(ModeTransition { from, to, action })
    }
}

impl Default for ScanModeMachine {
    fn default() -> Self {
        Self::new(ScanMode::default())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
