//! Byte-at-a-time frame decoder.
//!
//! ```text
//!            0xAA                   4th byte
//!   Idle ───────────► Binary ─────────────────► Idle (emit)
//!    │  0x21..=0x7E
//!    └────────────► Text ── '\n' ─────────────► Idle (emit)
//!                    │ overflow
//!                    └────► Discarding ─ '\n' ─► Idle
//! ```
//!
//! Any other byte seen in `Idle` is dropped. Partial frames survive across
//! `feed` calls, so reads may split frames anywhere.

use heapless::Vec;
use tracing::debug;

use super::binary::{FRAME_LEN, FRAME_START, parse_frame};
use super::command::{Command, DecodeError};
use super::text::{MAX_TEXT_LINE, is_text_lead, parse_line};

/// Decoder state, keyed on the lead byte of the frame in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Idle,
    Text,
    Binary,
    Discarding,
}

/// Counters kept by the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub commands: u64,
    pub rejected: u64,
    pub framing_errors: u64,
    /// Bytes dropped while idle (no recognized lead byte).
    pub dropped_bytes: u64,
}

/// Reassembles text lines and binary frames from a byte stream.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    line: Vec<u8, MAX_TEXT_LINE>,
    frame: [u8; FRAME_LEN],
    frame_len: usize,
    stats: DecoderStats,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Idle,
            line: Vec::new(),
            frame: [0; FRAME_LEN],
            frame_len: 0,
            stats: DecoderStats::default(),
        }
    }

    #[inline]
    pub const fn state(&self) -> DecoderState {
        self.state
    }

    #[inline]
    pub const fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Push one byte. Returns a result when a frame completes.
    pub fn push(&mut self, byte: u8) -> Option<Result<Command, DecodeError>> {
        match self.state {
            DecoderState::Idle => {
                if byte == FRAME_START {
                    self.frame[0] = byte;
                    self.frame_len = 1;
                    self.state = DecoderState::Binary;
                } else if is_text_lead(byte) {
                    self.line.clear();
                    // Capacity is at least one.
                    let _ = self.line.push(byte);
                    self.state = DecoderState::Text;
                } else {
                    self.stats.dropped_bytes += 1;
                }
                None
            }
            DecoderState::Text => {
                if byte == b'\n' {
                    self.state = DecoderState::Idle;
                    let result = parse_line(&self.line);
                    self.line.clear();
                    return Some(self.account(result));
                }
                if self.line.push(byte).is_err() {
                    self.line.clear();
                    self.state = DecoderState::Discarding;
                    return Some(self.account(Err(DecodeError::LineTooLong)));
                }
                None
            }
            DecoderState::Discarding => {
                if byte == b'\n' {
                    self.state = DecoderState::Idle;
                }
                None
            }
            DecoderState::Binary => {
                self.frame[self.frame_len] = byte;
                self.frame_len += 1;
                if self.frame_len < FRAME_LEN {
                    return None;
                }
                self.frame_len = 0;
                self.state = DecoderState::Idle;
                let result = parse_frame(&self.frame);
                Some(self.account(result))
            }
        }
    }

    /// Push a slice, calling `sink` for every completed frame.
    pub fn feed<F>(&mut self, bytes: &[u8], mut sink: F)
    where
        F: FnMut(Result<Command, DecodeError>),
    {
        for &byte in bytes {
            if let Some(result) = self.push(byte) {
                sink(result);
            }
        }
    }

    fn account(&mut self, result: Result<Command, DecodeError>) -> Result<Command, DecodeError> {
        match &result {
            Ok(cmd) => {
                self.stats.commands += 1;
                debug!("Decoded {cmd:?}");
            }
            Err(e) if e.is_framing() => {
                self.stats.framing_errors += 1;
                debug!("Framing error: {e}");
            }
            Err(e) => {
                self.stats.rejected += 1;
                debug!("Decode error: {e}");
            }
        }
        result
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::command::ReplyStyle;
    use turret_common::types::AxisId;

    fn decode_all(decoder: &mut FrameDecoder, bytes: &[u8]) -> std::vec::Vec<Result<Command, DecodeError>> {
        let mut out = std::vec::Vec::new();
        decoder.feed(bytes, |r| out.push(r));
        out
    }

    #[test]
    fn mixed_text_and_binary() {
        let mut dec = FrameDecoder::new();
        let out = decode_all(&mut dec, b"STATUS\n\xAA\x02\xC8\x55ESTOP\r\n");
        assert_eq!(
            out,
            vec![
                Ok(Command::Status),
                Ok(Command::SetAngle {
                    axis: AxisId::Pan,
                    angle: 200.0,
                    style: ReplyStyle::Silent
                }),
                Ok(Command::EmergencyStop),
            ]
        );
        assert_eq!(dec.state(), DecoderState::Idle);
        assert_eq!(dec.stats().commands, 3);
    }

    #[test]
    fn frames_split_across_feeds() {
        let mut dec = FrameDecoder::new();
        assert!(decode_all(&mut dec, b"YA").is_empty());
        assert_eq!(dec.state(), DecoderState::Text);
        assert!(decode_all(&mut dec, b"W:15").is_empty());
        assert_eq!(decode_all(&mut dec, b"\n\xAA\x01").len(), 1);
        assert_eq!(dec.state(), DecoderState::Binary);
        let out = decode_all(&mut dec, b"\x1E\x55");
        assert_eq!(
            out,
            vec![Ok(Command::SetAngle {
                axis: AxisId::Tilt,
                angle: 30.0,
                style: ReplyStyle::Silent
            })]
        );
    }

    #[test]
    fn unrecognized_lead_bytes_dropped_silently() {
        let mut dec = FrameDecoder::new();
        let out = decode_all(&mut dec, b"\n\r \x00\xFFRESET\n");
        assert_eq!(out, vec![Ok(Command::Reset)]);
        assert_eq!(dec.stats().dropped_bytes, 5);
    }

    #[test]
    fn overlong_line_discarded_to_newline() {
        let mut dec = FrameDecoder::new();
        let mut bytes = vec![b'Y'; MAX_TEXT_LINE + 10];
        bytes.extend_from_slice(b"\nSTATUS\n");
        let out = decode_all(&mut dec, &bytes);
        assert_eq!(out, vec![Err(DecodeError::LineTooLong), Ok(Command::Status)]);
        assert_eq!(dec.stats().framing_errors, 1);
    }

    #[test]
    fn line_at_capacity_accepted() {
        let mut dec = FrameDecoder::new();
        let mut line = b"YAW:1".to_vec();
        line.resize(MAX_TEXT_LINE, b'0');
        line.push(b'\n');
        let out = decode_all(&mut dec, &line);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_ok());
    }

    #[test]
    fn bad_terminator_discards_frame_then_resyncs() {
        let mut dec = FrameDecoder::new();
        let out = decode_all(&mut dec, &[0xAA, 0x02, 0x10, 0x00, b'p', b'\n']);
        assert_eq!(out[0], Err(DecodeError::BadTerminator(0x00)));
        assert_eq!(
            out[1],
            Ok(Command::Fire {
                on: false,
                style: ReplyStyle::Silent
            })
        );
    }

    #[test]
    fn unknown_text_counted_as_rejected() {
        let mut dec = FrameDecoder::new();
        let out = decode_all(&mut dec, b"JUMP\n");
        assert_eq!(out, vec![Err(DecodeError::UnknownCommand)]);
        assert_eq!(dec.stats().rejected, 1);
    }
}
