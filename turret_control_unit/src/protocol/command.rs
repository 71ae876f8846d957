//! Decoded commands, replies and decode errors.

use core::fmt;

use thiserror::Error;
use turret_common::control_unit::state::ScanMode;
use turret_common::types::AxisId;

use super::text::MAX_TEXT_LINE;

/// Whether a command is answered on success.
///
/// The single-letter and binary commands are fire-and-forget; the
/// `KEY:value` commands acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStyle {
    Silent,
    Acknowledge,
}

/// Target of a `MODE:` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    /// Select a scan pattern and return to autonomous control.
    Pattern(ScanMode),
    /// Return to autonomous control keeping the current pattern.
    Auto,
}

impl fmt::Display for ModeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(mode) => f.write_str(mode.as_str()),
            Self::Auto => f.write_str("AUTO"),
        }
    }
}

/// One decoded operator command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Explicit axis target [deg].
    SetAngle {
        axis: AxisId,
        angle: f64,
        style: ReplyStyle,
    },
    /// Operator fire request.
    Fire { on: bool, style: ReplyStyle },
    EmergencyStop,
    Status,
    Reset,
    SelectMode(ModeRequest),
}

impl Command {
    /// Commands still served while the emergency stop is latched.
    #[inline]
    pub const fn allowed_during_estop(&self) -> bool {
        matches!(self, Self::Reset | Self::Status | Self::EmergencyStop)
    }
}

/// Error code carried by an `ERR:` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    YawRange,
    PitchRange,
    EstopActive,
    UnknownCmd,
    BadArg,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::YawRange => "YAW_RANGE",
            Self::PitchRange => "PITCH_RANGE",
            Self::EstopActive => "ESTOP_ACTIVE",
            Self::UnknownCmd => "UNKNOWN_CMD",
            Self::BadArg => "BAD_ARG",
        }
    }

    /// Range error code for an axis.
    pub const fn range(axis: AxisId) -> Self {
        match axis {
            AxisId::Pan => Self::YawRange,
            AxisId::Tilt => Self::PitchRange,
        }
    }
}

/// Snapshot encoded by the `STATUS` reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub pan_angle: f64,
    pub tilt_angle: f64,
    /// Gated fire output, not the request.
    pub fire: bool,
    pub estop: bool,
}

/// One reply line (terminator excluded).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    YawOk(f64),
    PitchOk(f64),
    FireOk(bool),
    Estop,
    Status(StatusReport),
    ResetOk,
    ModeOk(ModeRequest),
    Error(ErrorCode),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YawOk(v) => write!(f, "YAW_OK:{v:.1}"),
            Self::PitchOk(v) => write!(f, "PITCH_OK:{}", v.round() as i64),
            Self::FireOk(on) => write!(f, "FIRE_OK:{}", u8::from(*on)),
            Self::Estop => f.write_str("ESTOP"),
            Self::Status(s) => write!(
                f,
                "YAW:{:.1};PITCH:{};FIRE:{};ESTOP:{}",
                s.pan_angle,
                s.tilt_angle.round() as i64,
                u8::from(s.fire),
                u8::from(s.estop)
            ),
            Self::ResetOk => f.write_str("RESET OK"),
            Self::ModeOk(m) => write!(f, "MODE_OK:{m}"),
            Self::Error(code) => write!(f, "ERR:{}", code.as_str()),
        }
    }
}

/// Decode failure.
///
/// Framing errors are dropped silently; the rest are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Binary frame did not end with the terminator byte.
    #[error("binary frame terminator 0x{0:02X}, expected 0x55")]
    BadTerminator(u8),

    /// Text line exceeded the line buffer.
    #[error("text line longer than {} bytes", MAX_TEXT_LINE)]
    LineTooLong,

    /// Recognized frame, unrecognized command.
    #[error("unknown command")]
    UnknownCommand,

    /// Recognized command, malformed argument.
    #[error("malformed argument")]
    BadArgument,
}

impl DecodeError {
    /// Framing errors leave no trace on the channel.
    #[inline]
    pub const fn is_framing(&self) -> bool {
        matches!(self, Self::BadTerminator(_) | Self::LineTooLong)
    }

    /// Reply sent for this error, if any.
    pub const fn reply(&self) -> Option<Reply> {
        match self {
            Self::BadTerminator(_) | Self::LineTooLong => None,
            Self::UnknownCommand => Some(Reply::Error(ErrorCode::UnknownCmd)),
            Self::BadArgument => Some(Reply::Error(ErrorCode::BadArg)),
        }
    }
}
