//! Motion module root.
//!
//! Per-axis smoothing, step/pulse emission and the two-axis controller.

pub mod actuation;
pub mod axis;
pub mod controller;

pub use axis::{AxisMotion, AxisState, MotionProfile};
pub use controller::{MotionController, MotionError};
