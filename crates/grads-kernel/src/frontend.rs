//! Where cell output and figures are presented.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use grads_bridge::CaptureHooks;
use serde::Serialize;
use tracing::warn;

use crate::display::DisplayData;
use crate::kernel::ExecuteReply;
use crate::Result;

/// Output stream a piece of text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
}

/// Presents kernel output to the user.
pub trait Frontend: Send {
    /// Shows interpreter text.
    fn stream(&mut self, name: StreamName, text: &str);

    /// Shows a rendered figure.
    fn display(&mut self, data: &DisplayData) -> Result<()>;

    /// Called after each cell with its reply.
    fn reply(&mut self, _reply: &ExecuteReply) {}
}

/// A front end shared between the kernel and the bridge's sinks.
pub type SharedFrontend = Arc<Mutex<dyn Frontend>>;

/// Wraps a front end for sharing.
pub fn shared(frontend: impl Frontend + 'static) -> SharedFrontend {
    Arc::new(Mutex::new(frontend))
}

/// Locks a shared front end, recovering from a poisoned lock.
pub fn lock(frontend: &SharedFrontend) -> MutexGuard<'_, dyn Frontend + 'static> {
    frontend.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bridge sinks that forward interpreter output to `frontend`.
pub fn capture_hooks(frontend: &SharedFrontend) -> CaptureHooks {
    let out = Arc::clone(frontend);
    let err = Arc::clone(frontend);
    CaptureHooks::new(
        move |text: &str| lock(&out).stream(StreamName::Stdout, text),
        move |text: &str| lock(&err).stream(StreamName::Stderr, text),
    )
}

/// Prints text to the terminal and saves figures as PNG files.
#[derive(Debug)]
pub struct TerminalFrontend {
    save_dir: PathBuf,
    figures: usize,
}

impl TerminalFrontend {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            figures: 0,
        }
    }

    /// Path the next figure will be written to.
    pub fn next_figure_path(&self) -> PathBuf {
        self.save_dir.join(format!("grads-{}.png", self.figures + 1))
    }
}

impl Frontend for TerminalFrontend {
    fn stream(&mut self, name: StreamName, text: &str) {
        match name {
            StreamName::Stdout => println!("{}", text),
            StreamName::Stderr => eprintln!("{}", text),
        }
    }

    fn display(&mut self, data: &DisplayData) -> Result<()> {
        let png = data
            .png_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let path = self.next_figure_path();
        fs::create_dir_all(&self.save_dir)?;
        fs::write(&path, png)?;
        self.figures += 1;

        println!("[figure {} saved to {}]", data.size, path.display());
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "msg_type", content = "content", rename_all = "snake_case")]
enum Message<'a> {
    Stream { name: StreamName, text: &'a str },
    DisplayData(serde_json::Value),
    ExecuteReply(&'a ExecuteReply),
}

/// Emits one JSON object per line, shaped like notebook iopub messages.
#[derive(Debug)]
pub struct JsonFrontend<W> {
    out: W,
}

impl<W: Write + Send> JsonFrontend<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the front end, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, message: &Message<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl JsonFrontend<io::Stdout> {
    /// JSON front end on the process stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Frontend for JsonFrontend<W> {
    fn stream(&mut self, name: StreamName, text: &str) {
        if let Err(e) = self.emit(&Message::Stream { name, text }) {
            warn!(error = %e, "failed to emit stream message");
        }
    }

    fn display(&mut self, data: &DisplayData) -> Result<()> {
        self.emit(&Message::DisplayData(data.to_message()))
    }

    fn reply(&mut self, reply: &ExecuteReply) {
        if let Err(e) = self.emit(&Message::ExecuteReply(reply)) {
            warn!(error = %e, "failed to emit execute reply");
        }
    }
}
