//! Exporting rendered figures to files.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{BridgeError, Result, Supervisor};

impl Supervisor {
    /// Asks the interpreter to write its current figure to `path` and waits
    /// until it is idle again, so the file is complete on return.
    ///
    /// Interpreter complaints printed during the export are logged, not
    /// returned; check the file if the outcome matters.
    ///
    /// # Errors
    ///
    /// Write failures, or `BridgeError::ProcessExited` if the interpreter
    /// died while exporting.
    pub fn export_artifact(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let command = self.config().export_command_for(&path.to_string_lossy());

        self.execute(&command, false)?;
        let discarded = self.flush_idle()?;

        if let Some(code) = discarded.exit_code() {
            return Err(BridgeError::ProcessExited(code));
        }
        let stderr = discarded.stderr.trim_end();
        if !stderr.is_empty() {
            warn!(path = %path.display(), stderr = %stderr, "export reported errors");
        }
        debug!(path = %path.display(), output = %discarded.stdout.trim_end(), "artifact exported");

        Ok(path.to_path_buf())
    }
}
