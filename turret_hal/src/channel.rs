//! Byte channel implementations.
//!
//! - [`StreamChannel`] - any blocking `Read` (stdin, serial device, socket)
//!   drained by a reader thread into a queue the tick loop polls
//! - [`LoopbackChannel`] - in-memory link for tests and scripted sessions

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};
use turret_common::hal::channel::{ByteChannel, ChannelError};

const READ_CHUNK: usize = 256;
/// Chunks buffered ahead of the tick loop before the reader thread blocks.
const READ_QUEUE_DEPTH: usize = 16;

// ─── Stream ─────────────────────────────────────────────────────────

/// Channel over a blocking reader and a writer.
///
/// The reader thread owns the `Read` side and forwards chunks over a bounded
/// queue; it stops reading while the queue is full. `read_available` never
/// blocks.
pub struct StreamChannel<W: Write + Send> {
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    writer: W,
    disconnected: bool,
    _reader: JoinHandle<()>,
}

impl<W: Write + Send> StreamChannel<W> {
    /// Start the reader thread and wrap `writer` for replies.
    ///
    /// # Errors
    /// Returns `ChannelError::Io` if the thread cannot be spawned.
    pub fn spawn<R: Read + Send + 'static>(mut reader: R, writer: W) -> Result<Self, ChannelError> {
        let (tx, rx) = mpsc::sync_channel(READ_QUEUE_DEPTH);
        let handle = thread::Builder::new()
            .name("cmd-reader".to_string())
            .spawn(move || {
                let mut buf = [0u8; READ_CHUNK];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => {
                            debug!("Command stream reached EOF");
                            break;
                        }
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => {
                            warn!("Command stream read failed: {e}");
                            break;
                        }
                    }
                }
            })
            .map_err(|e| ChannelError::Io(e.to_string()))?;

        Ok(Self {
            rx,
            pending: VecDeque::with_capacity(READ_CHUNK),
            writer,
            disconnected: false,
            _reader: handle,
        })
    }
}

impl<W: Write + Send> ByteChannel for StreamChannel<W> {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        while self.pending.len() < buf.len() {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend(chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        let n = drain_into(&mut self.pending, buf);
        if n == 0 && self.disconnected {
            return Err(ChannelError::Disconnected);
        }
        Ok(n)
    }

    fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|e| ChannelError::Io(e.to_string()))
    }
}

fn drain_into(pending: &mut VecDeque<u8>, buf: &mut [u8]) -> usize {
    let n = pending.len().min(buf.len());
    for (dst, src) in buf.iter_mut().zip(pending.drain(..n)) {
        *dst = src;
    }
    n
}

// ─── Loopback ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LoopbackInner {
    inbound: VecDeque<u8>,
    replies: Vec<String>,
    closed: bool,
}

/// In-memory channel; the paired [`LoopbackPeer`] plays the operator.
#[derive(Debug, Default)]
pub struct LoopbackChannel {
    inner: Arc<Mutex<LoopbackInner>>,
}

/// Operator side of a [`LoopbackChannel`].
#[derive(Debug, Clone)]
pub struct LoopbackPeer {
    inner: Arc<Mutex<LoopbackInner>>,
}

impl LoopbackChannel {
    /// Create a channel and its operator-side peer.
    pub fn pair() -> (Self, LoopbackPeer) {
        let chan = Self::default();
        let peer = LoopbackPeer {
            inner: Arc::clone(&chan.inner),
        };
        (chan, peer)
    }
}

impl LoopbackPeer {
    /// Queue raw bytes for the control unit.
    pub fn send(&self, bytes: &[u8]) {
        self.inner.lock().inbound.extend(bytes.iter().copied());
    }

    /// Queue a text command, appending the newline.
    pub fn send_line(&self, line: &str) {
        let mut inner = self.inner.lock();
        inner.inbound.extend(line.bytes());
        inner.inbound.push_back(b'\n');
    }

    /// Take every reply written so far.
    pub fn take_replies(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.lock().replies)
    }

    /// Mark the link closed once queued bytes are consumed.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }
}

impl ByteChannel for LoopbackChannel {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        let mut inner = self.inner.lock();
        let n = drain_into(&mut inner.inbound, buf);
        if n == 0 && inner.closed {
            return Err(ChannelError::Disconnected);
        }
        Ok(n)
    }

    fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.inner.lock().replies.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn loopback_respects_buffer_size() {
        let (mut chan, peer) = LoopbackChannel::pair();
        peer.send_line("STATUS");
        let mut buf = [0u8; 4];
        assert_eq!(chan.read_available(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"STAT");
        assert_eq!(chan.read_available(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"US\n");
        assert_eq!(chan.read_available(&mut buf).unwrap(), 0);
    }

    #[test]
    fn loopback_replies_and_close() {
        let (mut chan, peer) = LoopbackChannel::pair();
        chan.write_line("RESET OK").unwrap();
        assert_eq!(peer.take_replies(), vec!["RESET OK".to_string()]);
        assert!(peer.take_replies().is_empty());
        peer.close();
        let mut buf = [0u8; 8];
        assert_eq!(chan.read_available(&mut buf), Err(ChannelError::Disconnected));
    }

    #[test]
    fn stream_channel_delivers_then_disconnects() {
        let input = Cursor::new(b"M120\nESTOP\n".to_vec());
        let mut chan = StreamChannel::spawn(input, Vec::new()).unwrap();
        let mut collected = Vec::new();
        let mut buf = [0u8; 64];
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match chan.read_available(&mut buf) {
                Ok(n) => collected.extend_from_slice(&buf[..n]),
                Err(ChannelError::Disconnected) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
            assert!(Instant::now() < deadline, "reader thread never finished");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(collected, b"M120\nESTOP\n");
    }

    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: Arc<AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(buf)
        }
    }

    #[test]
    fn stream_channel_reader_blocks_when_queue_full() {
        let input: Vec<u8> = (0..READ_CHUNK * READ_QUEUE_DEPTH * 4)
            .map(|i| (i % 251) as u8)
            .collect();
        let reads = Arc::new(AtomicUsize::new(0));
        let reader = CountingReader {
            inner: Cursor::new(input.clone()),
            reads: Arc::clone(&reads),
        };
        let mut chan = StreamChannel::spawn(reader, Vec::new()).unwrap();

        // Queue fills, then the thread parks in send with one chunk in hand.
        let deadline = Instant::now() + Duration::from_secs(2);
        while reads.load(Ordering::SeqCst) < READ_QUEUE_DEPTH + 1 {
            assert!(Instant::now() < deadline, "reader thread never filled the queue");
            std::thread::sleep(Duration::from_millis(1));
        }
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(reads.load(Ordering::SeqCst), READ_QUEUE_DEPTH + 1);
        let deadline = Instant::now() + Duration::from_secs(2);

        // Draining releases it and every byte arrives in order.
        let mut collected = Vec::new();
        let mut buf = [0u8; 100];
        loop {
            match chan.read_available(&mut buf) {
                Ok(n) => collected.extend_from_slice(&buf[..n]),
                Err(ChannelError::Disconnected) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
            assert!(Instant::now() < deadline, "reader thread never finished");
        }
        assert_eq!(collected, input);
    }

    #[test]
    fn stream_channel_writes_lines() {
        let mut chan = StreamChannel::spawn(Cursor::new(Vec::new()), Vec::new()).unwrap();
        chan.write_line("YAW_OK:12.0").unwrap();
        chan.write_line("ESTOP").unwrap();
        assert_eq!(chan.writer, b"YAW_OK:12.0\nESTOP\n");
    }
}
