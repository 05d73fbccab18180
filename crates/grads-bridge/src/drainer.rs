//! Background readers that move child output into queues.

use std::io::{ErrorKind, Read};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

use crate::queue::ChunkSender;
use crate::Result;

/// A reader thread bound to one output stream of the child.
#[derive(Debug)]
pub struct Drainer {
    stream: &'static str,
    handle: Option<JoinHandle<u64>>,
}

impl Drainer {
    /// Starts draining `source` into `tx` on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be created.
    pub fn spawn<R>(stream: &'static str, source: R, tx: ChunkSender, chunk_size: usize) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(format!("grads-{}-drainer", stream))
            .spawn(move || pump(stream, source, tx, chunk_size))?;

        Ok(Self {
            stream,
            handle: Some(handle),
        })
    }

    /// Name of the stream this drainer reads.
    pub fn stream(&self) -> &'static str {
        self.stream
    }

    /// True once the stream reached EOF (or failed) and the thread ended.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Waits for the thread and returns the number of bytes it moved.
    pub fn join(mut self) -> Option<u64> {
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(total) => Some(total),
            Err(_) => {
                warn!(stream = self.stream, "drainer thread panicked");
                None
            }
        }
    }
}

/// Copies `source` into `tx` chunk by chunk until EOF. Returns bytes moved.
pub(crate) fn pump<R: Read>(stream: &str, mut source: R, tx: ChunkSender, chunk_size: usize) -> u64 {
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;

    loop {
        match source.read(&mut buffer) {
            Ok(0) => {
                debug!(stream, total, "stream closed");
                break;
            }
            Ok(n) => {
                trace!(stream, bytes = n, "chunk read");
                total += n as u64;
                if tx.send(buffer[..n].to_vec()).is_err() {
                    debug!(stream, "queue consumer gone, stopping drainer");
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(stream, error = %e, "error reading child output");
                break;
            }
        }
    }

    total
}
