//! Unbounded byte-chunk queue between a drainer thread and the coordinator.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Producer half of a [`ByteQueue`].
pub type ChunkSender = Sender<Vec<u8>>;

/// Creates a connected sender / queue pair.
pub fn byte_queue() -> (ChunkSender, ByteQueue) {
    let (tx, rx) = mpsc::channel();
    (tx, ByteQueue::new(rx))
}

/// Consumer side of one output stream.
///
/// Pushes never block (the channel is unbounded). Reads take a snapshot of
/// whatever has arrived so far and decode it as UTF-8, holding back an
/// incomplete trailing character until the rest of it shows up.
#[derive(Debug)]
pub struct ByteQueue {
    rx: Receiver<Vec<u8>>,
    /// Bytes received but not yet returned as text.
    pending: Vec<u8>,
    closed: bool,
}

impl ByteQueue {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            closed: false,
        }
    }

    /// True once the producer has gone away and every chunk was received.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Removes everything currently queued and returns it as text.
    ///
    /// Never blocks; returns an empty string when nothing is queued.
    pub fn drain_current(&mut self) -> String {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }

        let mut text = decode_available(&mut self.pending);
        if self.closed && !self.pending.is_empty() {
            // Stream ended mid-character.
            text.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
        text
    }

    /// Blocks up to `timeout` for the next chunk. Returns `true` if one
    /// arrived; it is kept for the next [`drain_current`](Self::drain_current).
    ///
    /// Returns `false` immediately once the queue is closed.
    pub fn wait_for_data(&mut self, timeout: Duration) -> bool {
        if self.closed {
            return false;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => {
                self.pending.extend_from_slice(&chunk);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                false
            }
        }
    }
}

/// Decodes the longest prefix of `buf` that does not end inside a
/// character, removing it from `buf`. Invalid sequences become U+FFFD.
fn decode_available(buf: &mut Vec<u8>) -> String {
    let mut out = String::with_capacity(buf.len());
    let mut start = 0;

    while start < buf.len() {
        match std::str::from_utf8(&buf[start..]) {
            Ok(s) => {
                out.push_str(s);
                start = buf.len();
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&buf[start..start + valid]));
                start += valid;
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        start += len;
                    }
                    None => break,
                }
            }
        }
    }

    buf.drain(..start);
    out
}
