//! Operator command link.
//!
//! The control unit polls the channel once per tick without blocking and
//! writes one reply line per answered command.

use thiserror::Error;

/// Error types for the command link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Peer closed the link; no further bytes will arrive
    #[error("Channel disconnected")]
    Disconnected,

    /// Underlying transport failure
    #[error("Channel I/O error: {0}")]
    Io(String),
}

/// Non-blocking, byte-oriented command link.
pub trait ByteChannel: Send {
    /// Copy up to `buf.len()` pending bytes into `buf`.
    ///
    /// Returns `Ok(0)` when nothing is pending. Must not block.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError>;

    /// Send one reply line. The newline terminator is appended by the channel.
    fn write_line(&mut self, line: &str) -> Result<(), ChannelError>;
}
