//! Capturing the current figure as a PNG payload.

use std::fs;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use grads_bridge::Supervisor;
use serde_json::json;
use tracing::debug;

use crate::{KernelError, Result};

/// Size at which figures are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl DisplaySize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for DisplaySize {
    fn default() -> Self {
        Self::new(400, 280)
    }
}

impl std::fmt::Display for DisplaySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A rendered figure ready to hand to a front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayData {
    /// Base64-encoded PNG bytes.
    pub png_base64: String,
    pub size: DisplaySize,
}

impl DisplayData {
    /// Wraps raw PNG bytes.
    pub fn from_png(png: &[u8], size: DisplaySize) -> Self {
        Self {
            png_base64: STANDARD.encode(png),
            size,
        }
    }

    /// Decodes the PNG bytes back out of the payload.
    pub fn png_bytes(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.png_base64)
    }

    /// Notebook-style `display_data` content.
    pub fn to_message(&self) -> serde_json::Value {
        json!({
            "data": { "image/png": self.png_base64 },
            "metadata": {
                "image/png": { "width": self.size.width, "height": self.size.height }
            }
        })
    }
}

/// Exports the interpreter's current figure to a temporary PNG and returns
/// its contents. The temporary file is removed afterwards.
///
/// # Errors
///
/// Bridge and I/O errors, or `KernelError::EmptyCapture` if the interpreter
/// produced no image.
pub fn capture_png(grads: &mut Supervisor, size: DisplaySize) -> Result<DisplayData> {
    let path = tempfile::Builder::new()
        .prefix("grads-")
        .suffix(".png")
        .tempfile()?
        .into_temp_path();

    grads.export_artifact(&path)?;

    let png = match fs::read(&path) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(KernelError::EmptyCapture(path.to_path_buf())),
    };
    debug!(bytes = png.len(), size = %size, "captured figure");

    Ok(DisplayData::from_png(&png, size))
}
