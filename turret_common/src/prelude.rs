//! Prelude module for common re-exports.
//!
//! ```rust
//! use turret_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::control_unit::config::TurretConfig;

// ─── Modes and Flags ────────────────────────────────────────────────
pub use crate::control_unit::error::InterlockFlags;
pub use crate::control_unit::state::{ControlAuthority, ScanMode};

// ─── Value Types ────────────────────────────────────────────────────
pub use crate::types::{
    AxisId, AxisLimits, Classification, Detection, DetectionFrame, DetectionList, Pose,
};

// ─── HAL ────────────────────────────────────────────────────────────
pub use crate::hal::channel::{ByteChannel, ChannelError};
pub use crate::hal::driver::{ActuatorDriver, DriverFactory, HalError};
pub use crate::hal::types::{ActuationFrame, ServoOutput, StepCommand, StepDirection};
