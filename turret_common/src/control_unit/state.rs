//! Mode enums for the control unit.
//!
//! All enums use `#[repr(u8)]` for compact telemetry encoding.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Scan generator mode.
///
/// `Tracking` is entered automatically while a target lock exists; the
/// three patterns are selected explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ScanMode {
    /// Full-range horizontal sweep.
    #[default]
    Sweep = 0,
    /// Expanding spiral around a center pose.
    Spiral = 1,
    /// Sweep restricted to a configured sub-range.
    Sector = 2,
    /// Following a locked target.
    Tracking = 3,
}

impl ScanMode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Sweep),
            1 => Some(Self::Spiral),
            2 => Some(Self::Sector),
            3 => Some(Self::Tracking),
            _ => None,
        }
    }

    /// Whether this mode is one of the search patterns.
    #[inline]
    pub const fn is_pattern(self) -> bool {
        !matches!(self, Self::Tracking)
    }

    /// Wire name, as used by `MODE:` commands and replies.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sweep => "SWEEP",
            Self::Spiral => "SPIRAL",
            Self::Sector => "SECTOR",
            Self::Tracking => "TRACKING",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a pattern name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scan pattern")]
pub struct UnknownPattern;

impl FromStr for ScanMode {
    type Err = UnknownPattern;

    /// Only the selectable patterns parse; `TRACKING` is not selectable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SWEEP" => Ok(Self::Sweep),
            "SPIRAL" => Ok(Self::Spiral),
            "SECTOR" => Ok(Self::Sector),
            _ => Err(UnknownPattern),
        }
    }
}

/// Who currently owns the desired pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ControlAuthority {
    /// Scan generator / tracker drive the axes.
    #[default]
    Autonomous = 0,
    /// Explicit angle commands drive the axes.
    Manual = 1,
}
