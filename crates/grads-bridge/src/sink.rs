//! Caller-supplied destinations for command output.

use std::io::Write;

use crate::CommandOutput;

/// Receives finalized output text.
pub trait OutputSink: Send {
    fn write(&mut self, text: &str);
}

impl<F> OutputSink for F
where
    F: FnMut(&str) + Send,
{
    fn write(&mut self, text: &str) {
        self(text)
    }
}

/// Writes to the current process's stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", text);
    }
}

/// Writes to the current process's stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl OutputSink for StderrSink {
    fn write(&mut self, text: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", text);
    }
}

/// The pair of sinks a session forwards echoed output to.
pub struct CaptureHooks {
    stdout: Box<dyn OutputSink>,
    stderr: Box<dyn OutputSink>,
}

impl CaptureHooks {
    /// Creates hooks from two sinks.
    pub fn new(stdout: impl OutputSink + 'static, stderr: impl OutputSink + 'static) -> Self {
        Self {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        }
    }

    /// Hooks that drop everything.
    pub fn discard() -> Self {
        Self::new(|_: &str| {}, |_: &str| {})
    }

    /// Sends each stream's text, with trailing whitespace removed, to its
    /// sink. Empty streams are skipped.
    pub fn forward(&mut self, output: &CommandOutput) {
        self.forward_text(&output.stdout, &output.stderr);
    }

    /// Like [`forward`](Self::forward), for text not tied to a finished
    /// command.
    pub fn forward_text(&mut self, stdout: &str, stderr: &str) {
        let out = stdout.trim_end();
        if !out.is_empty() {
            self.stdout.write(out);
        }
        let err = stderr.trim_end();
        if !err.is_empty() {
            self.stderr.write(err);
        }
    }
}

impl Default for CaptureHooks {
    fn default() -> Self {
        Self::new(StdoutSink, StderrSink)
    }
}

impl std::fmt::Debug for CaptureHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHooks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdleStatus;
    use std::sync::{Arc, Mutex};

    fn recording() -> (Arc<Mutex<Vec<String>>>, impl OutputSink + 'static) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&log);
        (log, move |text: &str| sink_log.lock().unwrap().push(text.to_string()))
    }

    fn output(stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            status: IdleStatus::Idle,
        }
    }

    #[test]
    fn test_forward_trims_trailing_whitespace() {
        let (out_log, out_sink) = recording();
        let (err_log, err_sink) = recording();
        let mut hooks = CaptureHooks::new(out_sink, err_sink);

        hooks.forward(&output("  Contouring\n\n", "Warning: no data  \n"));

        assert_eq!(*out_log.lock().unwrap(), vec!["  Contouring".to_string()]);
        assert_eq!(*err_log.lock().unwrap(), vec!["Warning: no data".to_string()]);
    }

    #[test]
    fn test_forward_skips_empty_streams() {
        let (out_log, out_sink) = recording();
        let (err_log, err_sink) = recording();
        let mut hooks = CaptureHooks::new(out_sink, err_sink);

        hooks.forward(&output(" \n\t", ""));

        assert!(out_log.lock().unwrap().is_empty());
        assert!(err_log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_each_sink_called_once() {
        let (out_log, out_sink) = recording();
        let mut hooks = CaptureHooks::new(out_sink, |_: &str| {});

        hooks.forward(&output("line 1\nline 2\nline 3\n", ""));

        assert_eq!(out_log.lock().unwrap().len(), 1);
        assert_eq!(out_log.lock().unwrap()[0], "line 1\nline 2\nline 3");
    }

    #[test]
    fn test_discard() {
        let mut hooks = CaptureHooks::discard();
        hooks.forward(&output("ignored", "ignored"));
    }
}
