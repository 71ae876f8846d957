//! Scan module root.
//!
//! Search patterns, the scan mode state machine and the generator that
//! ties them together.

pub mod generator;
pub mod mode;
pub mod pattern;

pub use generator::ScanGenerator;
pub use mode::{ModeTransition, PhaseAction, ScanEvent, ScanModeMachine, TransitionResult};
pub use pattern::{ScanParams, ScanState, SweepDirection};
