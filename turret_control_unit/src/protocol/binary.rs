//! Fixed 4-byte binary frames: `[0xAA, CMD, DATA, 0x55]`.

use static_assertions::{const_assert, const_assert_eq};
use turret_common::types::AxisId;

use super::command::{Command, DecodeError, ReplyStyle};
use super::text::{TEXT_LEAD_MAX, TEXT_LEAD_MIN};

/// Binary frame lead byte.
pub const FRAME_START: u8 = 0xAA;
/// Binary frame terminator.
pub const FRAME_END: u8 = 0x55;
/// Binary frame length including lead and terminator.
pub const FRAME_LEN: usize = 4;

/// Set tilt (servo) angle = DATA.
pub const CMD_SERVO: u8 = 0x01;
/// Set pan (stepper) angle = DATA.
pub const CMD_STEPPER: u8 = 0x02;
/// Laser on when DATA > 0.
pub const CMD_LASER: u8 = 0x03;

const_assert_eq!(FRAME_LEN, 4);
// The lead byte must never be mistaken for a text command.
const_assert!(FRAME_START < TEXT_LEAD_MIN || FRAME_START > TEXT_LEAD_MAX);

/// Parse one complete binary frame.
///
/// The whole frame is rejected when the terminator is wrong.
pub fn parse_frame(frame: &[u8; FRAME_LEN]) -> Result<Command, DecodeError> {
    let [_, cmd, data, end] = *frame;
    if end != FRAME_END {
        return Err(DecodeError::BadTerminator(end));
    }
    match cmd {
        CMD_SERVO => Ok(Command::SetAngle {
            axis: AxisId::Tilt,
            angle: f64::from(data),
            style: ReplyStyle::Silent,
        }),
        CMD_STEPPER => Ok(Command::SetAngle {
            axis: AxisId::Pan,
            angle: f64::from(data),
            style: ReplyStyle::Silent,
        }),
        CMD_LASER => Ok(Command::Fire {
            on: data > 0,
            style: ReplyStyle::Silent,
        }),
        _ => Err(DecodeError::UnknownCommand),
    }
}

/// Build a binary frame.
#[inline]
pub const fn encode_frame(cmd: u8, data: u8) -> [u8; FRAME_LEN] {
    [FRAME_START, cmd, data, FRAME_END]
}
