//! Executing cells against a GrADS session.

use std::io::Write;
use std::path::{Path, PathBuf};

use grads_bridge::{BridgeConfig, Supervisor};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cell::{CellPlan, SizeRequest, Step, INVALID_SIZE_MESSAGE};
use crate::display::{capture_png, DisplaySize};
use crate::frontend::{capture_hooks, lock, SharedFrontend, StreamName};
use crate::Result;

/// Outcome of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    /// The interpreter exited or a command failed during the cell.
    Error,
}

/// Reply sent after each cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteReply {
    pub status: ReplyStatus,
    pub execution_count: u64,
}

/// A GrADS session plus the display state of the front end.
pub struct GradsKernel {
    grads: Supervisor,
    frontend: SharedFrontend,
    display_size: DisplaySize,
    execution_count: u64,
}

impl GradsKernel {
    /// Starts GrADS with `config`, sending its output to `frontend`.
    pub fn start(config: BridgeConfig, frontend: SharedFrontend) -> Result<Self> {
        let hooks = capture_hooks(&frontend);
        let grads = Supervisor::start_with_config(config, hooks)?;

        Ok(Self {
            grads,
            frontend,
            display_size: DisplaySize::default(),
            execution_count: 0,
        })
    }

    /// Runs one cell: its statements in order, then any script, then a
    /// figure if the cell drew something or asked for one.
    ///
    /// # Errors
    ///
    /// Bridge, I/O and capture errors; an error reply is still sent to the
    /// front end first. An interpreter that exits during the cell is
    /// reported through the reply status instead.
    pub fn execute_cell(&mut self, code: &str) -> Result<ExecuteReply> {
        self.execution_count += 1;
        let plan = CellPlan::parse(code);
        debug!(
            execution_count = self.execution_count,
            steps = plan.steps.len(),
            script = plan.script.is_some(),
            display = plan.display,
            "executing cell"
        );

        match self.run_plan(&plan) {
            Ok(status) => Ok(self.reply(status)),
            Err(e) => {
                warn!(execution_count = self.execution_count, error = %e, "cell failed");
                self.reply(ReplyStatus::Error);
                Err(e)
            }
        }
    }

    fn reply(&mut self, status: ReplyStatus) -> ExecuteReply {
        let reply = ExecuteReply {
            status,
            execution_count: self.execution_count,
        };
        lock(&self.frontend).reply(&reply);
        reply
    }

    fn run_plan(&mut self, plan: &CellPlan) -> Result<ReplyStatus> {
        for step in &plan.steps {
            match step {
                Step::Statement(line) => {
                    if !self.run_statement(line)? {
                        return Ok(ReplyStatus::Error);
                    }
                }
                Step::Resize(request) => self.apply_size(*request),
            }
        }

        if let Some(script) = &plan.script {
            if !self.run_script(script)? {
                return Ok(ReplyStatus::Error);
            }
        }

        if plan.display {
            self.display()?;
        }
        Ok(ReplyStatus::Ok)
    }

    /// Returns false if the interpreter exited.
    fn run_statement(&mut self, line: &str) -> Result<bool> {
        let output = self.grads.execute(line, true)?;
        match output.and_then(|o| o.exit_code()) {
            Some(code) => {
                warn!(code = ?code, statement = %line, "GrADS exited");
                let code = code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
                lock(&self.frontend)
                    .stream(StreamName::Stderr, &format!("GrADS exited (code {})", code));
                Ok(false)
            }
            None => Ok(true),
        }
    }

    /// Writes the script to a temporary `.gs` file and runs it.
    fn run_script(&mut self, body: &str) -> Result<bool> {
        let mut file = tempfile::Builder::new()
            .prefix("grads-")
            .suffix(".gs")
            .tempfile()?;
        file.write_all(body.as_bytes())?;
        file.flush()?;
        let path = file.into_temp_path();

        debug!(path = %path.display(), bytes = body.len(), "running staged script");
        self.run_statement(&format!("run {}", path.display()))
    }

    fn apply_size(&mut self, request: SizeRequest) {
        match request {
            SizeRequest::Default => self.display_size = DisplaySize::default(),
            SizeRequest::Custom(size) => self.display_size = size,
            SizeRequest::Invalid => {
                lock(&self.frontend).stream(StreamName::Stderr, INVALID_SIZE_MESSAGE);
            }
        }
    }

    /// Captures the current figure and shows it.
    pub fn display(&mut self) -> Result<()> {
        let data = capture_png(&mut self.grads, self.display_size)?;
        lock(&self.frontend).display(&data)
    }

    /// Exports the current figure to `path`.
    pub fn save_figure(&mut self, path: &Path) -> Result<PathBuf> {
        let path = self.grads.export_artifact(path)?;
        info!(path = %path.display(), "figure saved");
        Ok(path)
    }

    pub fn display_size(&self) -> DisplaySize {
        self.display_size
    }

    /// Applies a size request as `*%display_size` would.
    pub fn set_display_size(&mut self, request: SizeRequest) {
        self.apply_size(request);
    }

    /// Number of cells executed so far.
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    pub fn is_alive(&mut self) -> bool {
        self.grads.is_alive()
    }

    /// Stops the GrADS session.
    pub fn shutdown(&mut self) -> Result<Option<i32>> {
        Ok(self.grads.shutdown()?)
    }
}
