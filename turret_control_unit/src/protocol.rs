//! Protocol module root.
//!
//! Two framings share one byte channel and are told apart by the lead byte:
//! newline-terminated ASCII lines and fixed 4-byte binary frames.

pub mod binary;
pub mod codec;
pub mod command;
pub mod text;

pub use codec::{DecoderState, FrameDecoder};
pub use command::{Command, DecodeError, ErrorCode, ModeRequest, Reply, ReplyStyle, StatusReport};
