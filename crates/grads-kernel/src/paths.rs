//! Locations of kernel state on disk.

use std::path::{Path, PathBuf};

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "GRADS_KERNEL_STATE_DIR";

/// State directory used when nothing else is configured: `~/.grads-kernel`.
pub fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".grads-kernel"))
        .unwrap_or_else(|| PathBuf::from(".grads-kernel"))
}

/// REPL history file inside `state_dir`.
pub fn history_file(state_dir: &Path) -> PathBuf {
    state_dir.join("history.txt")
}
