//! Error types for the kernel front end.

use std::path::PathBuf;

use grads_bridge::BridgeError;
use thiserror::Error;

/// Errors that can occur while running cells.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Interpreter bridge error.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Interpreter binary not found in PATH.
    #[error("'{0}' not found in PATH")]
    NotFound(String),

    /// The exported figure was missing or empty.
    #[error("exported figure '{0}' is empty")]
    EmptyCapture(PathBuf),

    /// Line editor error.
    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// JSON encoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
