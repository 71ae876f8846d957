//! Safety module root.
//!
//! Range validation, pose clamping, fire gating, emergency stop latch and
//! the communication staleness fail-safe.

pub mod interlock;

pub use interlock::{EstopCause, InterlockError, SafetyInterlock, SafetyState};
