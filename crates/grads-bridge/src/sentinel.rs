//! Idle-prompt detection over accumulated output.
//!
//! Detection is pure text scanning so it can be tested without a child
//! process. A prompt only counts when it starts the buffer or directly
//! follows a newline; the same characters in the middle of a line (an echoed
//! command, say) are ordinary output.

use regex::Regex;

use crate::{BridgeError, Result};

/// The marker an interpreter prints when it is ready for input.
#[derive(Debug, Clone)]
pub struct PromptSentinel {
    marker: String,
    regex: Regex,
}

impl PromptSentinel {
    /// Creates a sentinel for `marker`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` if the marker is empty or
    /// contains a newline (it could never be line-anchored).
    pub fn new(marker: impl Into<String>) -> Result<Self> {
        let marker = marker.into();
        if marker.is_empty() || marker.contains('\n') {
            return Err(BridgeError::Configuration(format!(
                "invalid prompt marker: {:?}",
                marker
            )));
        }

        let pattern = format!("(?m)^{}", regex::escape(&marker));
        let regex = Regex::new(&pattern)
            .map_err(|e| BridgeError::Configuration(format!("prompt pattern: {}", e)))?;

        Ok(Self { marker, regex })
    }

    /// The raw marker text.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Byte offset of the first line-anchored prompt in `text`.
    pub fn find(&self, text: &str) -> Option<usize> {
        self.find_from(text, 0)
    }

    /// Like [`find`](Self::find) but starts scanning at `from`, which must
    /// be 0 or the offset just after a newline.
    pub fn find_from(&self, text: &str, from: usize) -> Option<usize> {
        if from > text.len() {
            return None;
        }
        self.regex.find_at(text, from).map(|m| m.start())
    }

    /// Splits `text` at the first anchored prompt, returning the output that
    /// preceded it.
    pub fn strip<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.find(text).map(|idx| &text[..idx])
    }
}

/// Offset where rescanning should resume once `scanned` bytes of `text` have
/// been searched without a match: the start of the last incomplete line.
pub fn resume_offset(text: &str, scanned: usize) -> usize {
    let scanned = scanned.min(text.len());
    text.as_bytes()[..scanned]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1)
}
