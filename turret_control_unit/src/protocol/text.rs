//! Newline-terminated ASCII commands.

use turret_common::control_unit::state::ScanMode;
use turret_common::types::AxisId;

use super::command::{Command, DecodeError, ModeRequest, ReplyStyle};

/// Lowest byte that opens a text line (`!`).
pub const TEXT_LEAD_MIN: u8 = 0x21;
/// Highest byte that opens a text line (`~`).
pub const TEXT_LEAD_MAX: u8 = 0x7E;
/// Longest accepted line, terminator excluded.
pub const MAX_TEXT_LINE: usize = 32;

/// Whether `byte` can open a text line.
#[inline]
pub const fn is_text_lead(byte: u8) -> bool {
    byte >= TEXT_LEAD_MIN && byte <= TEXT_LEAD_MAX
}

/// Parse one line without its `\n`. A trailing `\r` is ignored.
pub fn parse_line(line: &[u8]) -> Result<Command, DecodeError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = core::str::from_utf8(line)
        .map_err(|_| DecodeError::UnknownCommand)?
        .trim();

    match text {
        "ESTOP" => return Ok(Command::EmergencyStop),
        "STATUS" => return Ok(Command::Status),
        "RESET" => return Ok(Command::Reset),
        "a" => {
            return Ok(Command::Fire {
                on: true,
                style: ReplyStyle::Silent,
            });
        }
        "p" => {
            return Ok(Command::Fire {
                on: false,
                style: ReplyStyle::Silent,
            });
        }
        _ => {}
    }

    if let Some(arg) = text.strip_prefix("YAW:") {
        let angle: f64 = arg.parse().map_err(|_| DecodeError::BadArgument)?;
        if !angle.is_finite() {
            return Err(DecodeError::BadArgument);
        }
        return Ok(Command::SetAngle {
            axis: AxisId::Pan,
            angle,
            style: ReplyStyle::Acknowledge,
        });
    }
    if let Some(arg) = text.strip_prefix("PITCH:") {
        return Ok(Command::SetAngle {
            axis: AxisId::Tilt,
            angle: parse_int(arg)?,
            style: ReplyStyle::Acknowledge,
        });
    }
    if let Some(arg) = text.strip_prefix("FIRE:") {
        let on = match arg {
            "0" => false,
            "1" => true,
            _ => return Err(DecodeError::BadArgument),
        };
        return Ok(Command::Fire {
            on,
            style: ReplyStyle::Acknowledge,
        });
    }
    if let Some(arg) = text.strip_prefix("MODE:") {
        let request = match arg {
            "AUTO" => ModeRequest::Auto,
            other => ModeRequest::Pattern(
                other
                    .parse::<ScanMode>()
                    .map_err(|_| DecodeError::BadArgument)?,
            ),
        };
        return Ok(Command::SelectMode(request));
    }

    // Legacy single-letter targets: S = tilt servo, M = pan stepper.
    if let Some(axis) = match text.as_bytes().first() {
        Some(b'S') => Some(AxisId::Tilt),
        Some(b'M') => Some(AxisId::Pan),
        _ => None,
    } {
        let arg = &text[1..];
        if arg.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') {
            return Ok(Command::SetAngle {
                axis,
                angle: parse_int(arg)?,
                style: ReplyStyle::Silent,
            });
        }
    }

    Err(DecodeError::UnknownCommand)
}

fn parse_int(arg: &str) -> Result<f64, DecodeError> {
    arg.parse::<i32>()
        .map(f64::from)
        .map_err(|_| DecodeError::BadArgument)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(axis: AxisId, angle: f64, style: ReplyStyle) -> Result<Command, DecodeError> {
        Ok(Command::SetAngle { axis, angle, style })
    }

    #[test]
    fn lead_byte_range() {
        assert!(is_text_lead(b'S'));
        assert!(is_text_lead(b'~'));
        assert!(!is_text_lead(b' '));
        assert!(!is_text_lead(b'\n'));
        assert!(!is_text_lead(0xAA));
    }

    #[test]
    fn legacy_targets() {
        assert_eq!(parse_line(b"S45"), set(AxisId::Tilt, 45.0, ReplyStyle::Silent));
        assert_eq!(parse_line(b"M120\r"), set(AxisId::Pan, 120.0, ReplyStyle::Silent));
        assert_eq!(parse_line(b"M-5"), set(AxisId::Pan, -5.0, ReplyStyle::Silent));
        assert_eq!(parse_line(b"S4x"), Err(DecodeError::BadArgument));
        assert_eq!(parse_line(b"SWEEP"), Err(DecodeError::UnknownCommand));
        assert_eq!(parse_line(b"M"), Err(DecodeError::UnknownCommand));
    }

    #[test]
    fn keyed_targets() {
        assert_eq!(
            parse_line(b"YAW:12.75"),
            set(AxisId::Pan, 12.75, ReplyStyle::Acknowledge)
        );
        assert_eq!(
            parse_line(b"PITCH:30"),
            set(AxisId::Tilt, 30.0, ReplyStyle::Acknowledge)
        );
        assert_eq!(parse_line(b"YAW:abc"), Err(DecodeError::BadArgument));
        assert_eq!(parse_line(b"YAW:inf"), Err(DecodeError::BadArgument));
        assert_eq!(parse_line(b"PITCH:12.5"), Err(DecodeError::BadArgument));
    }

    #[test]
    fn fire_commands() {
        assert_eq!(
            parse_line(b"a"),
            Ok(Command::Fire {
                on: true,
                style: ReplyStyle::Silent
            })
        );
        assert_eq!(
            parse_line(b"FIRE:0"),
            Ok(Command::Fire {
                on: false,
                style: ReplyStyle::Acknowledge
            })
        );
        assert_eq!(parse_line(b"FIRE:7"), Err(DecodeError::BadArgument));
    }

    #[test]
    fn control_commands() {
        assert_eq!(parse_line(b"ESTOP"), Ok(Command::EmergencyStop));
        assert_eq!(parse_line(b"STATUS\r"), Ok(Command::Status));
        assert_eq!(parse_line(b"RESET"), Ok(Command::Reset));
        assert_eq!(
            parse_line(b"MODE:SECTOR"),
            Ok(Command::SelectMode(ModeRequest::Pattern(ScanMode::Sector)))
        );
        assert_eq!(parse_line(b"MODE:AUTO"), Ok(Command::SelectMode(ModeRequest::Auto)));
        assert_eq!(parse_line(b"MODE:TRACKING"), Err(DecodeError::BadArgument));
    }

    #[test]
    fn unknown_and_non_utf8() {
        assert_eq!(parse_line(b"HELLO"), Err(DecodeError::UnknownCommand));
        assert_eq!(parse_line(&[b'Y', 0xFF]), Err(DecodeError::UnknownCommand));
    }
}
