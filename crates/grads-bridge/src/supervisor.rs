//! Owner of the interpreter process and its command sequencing.

use std::io::Write;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::accumulator::{IdleTiming, OutputAccumulator, ProcessProbe};
use crate::drainer::Drainer;
use crate::queue::byte_queue;
use crate::sentinel::PromptSentinel;
use crate::{BridgeConfig, BridgeError, CaptureHooks, CommandOutput, IdleStatus, LayoutMode, Liveness, Result, Stream};

/// A running interpreter session.
///
/// Commands are written one at a time and each echoed command is resolved
/// by waiting for the interpreter's prompt. Dropping the supervisor shuts
/// the interpreter down.
#[derive(Debug)]
pub struct Supervisor {
    config: BridgeConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    accumulator: OutputAccumulator,
    drainers: Vec<Drainer>,
    hooks: CaptureHooks,
    exit_code: Option<Option<i32>>,
}

impl Supervisor {
    /// Starts `executable` in the named layout `mode` with default settings.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` for an unknown mode, before any
    /// process is spawned.
    pub fn start(executable: &str, mode: &str, hooks: CaptureHooks) -> Result<Self> {
        let mode: LayoutMode = mode.parse()?;
        let config = BridgeConfig::new().with_executable(executable).with_mode(mode);
        Self::start_with_config(config, hooks)
    }

    /// Starts the interpreter described by `config` and waits for its first
    /// prompt. The startup banner goes to `hooks` when
    /// [`BridgeConfig::echo_banner`] is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt marker is invalid, the process cannot
    /// be spawned, or it exits before printing a prompt.
    pub fn start_with_config(config: BridgeConfig, hooks: CaptureHooks) -> Result<Self> {
        let sentinel = PromptSentinel::new(config.prompt.as_str())?;
        let args = config.launch_args();

        info!(executable = %config.executable, args = ?args, "starting interpreter");

        let mut command = Command::new(&config.executable);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| BridgeError::Spawn {
            executable: config.executable.clone(),
            source,
        })?;
        debug!(pid = child.id(), "interpreter spawned");

        let (stdin, stdout, stderr) = match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            (stdin, stdout, _) => {
                let _ = child.kill();
                let _ = child.wait();
                let missing = if stdin.is_none() {
                    "stdin"
                } else if stdout.is_none() {
                    "stdout"
                } else {
                    "stderr"
                };
                return Err(BridgeError::MissingPipe(missing));
            }
        };

        let (out_tx, out_queue) = byte_queue();
        let (err_tx, err_queue) = byte_queue();
        let accumulator = OutputAccumulator::new(out_queue, err_queue, sentinel, IdleTiming::from(&config));

        let mut supervisor = Self {
            config,
            child,
            stdin: Some(stdin),
            accumulator,
            drainers: Vec::with_capacity(2),
            hooks,
            exit_code: None,
        };

        // From here on, an early return drops the supervisor and reaps the child.
        let chunk = supervisor.config.read_chunk_size;
        supervisor.drainers.push(Drainer::spawn("stdout", stdout, out_tx, chunk)?);
        supervisor.drainers.push(Drainer::spawn("stderr", stderr, err_tx, chunk)?);

        let banner = supervisor.accumulator.wait_until_idle(&mut supervisor.child)?;
        if let Some(code) = banner.exit_code() {
            warn!(code = ?code, stderr = %banner.stderr.trim_end(), "interpreter exited during startup");
            return Err(BridgeError::ProcessExited(code));
        }
        if supervisor.config.echo_banner {
            supervisor.hooks.forward(&banner);
        }

        info!(pid = supervisor.pid(), mode = %supervisor.config.mode, "interpreter ready");
        Ok(supervisor)
    }

    /// Sends `command` to the interpreter.
    ///
    /// With `echo`, waits for the prompt, forwards the output to the sinks
    /// and returns it. Without `echo` the output is left queued and `None`
    /// is returned; it can be read with [`drain_current`](Self::drain_current)
    /// or [`flush_idle`](Self::flush_idle), and is skipped by the next
    /// echoed command otherwise.
    ///
    /// # Errors
    ///
    /// `BridgeError::ProcessExited` if the interpreter is already gone,
    /// `BridgeError::Write` if the command cannot be written, and
    /// `BridgeError::IdleTimeout` if the prompt does not come back in time.
    /// Partial output collected before a timeout is still forwarded, and the
    /// next command skips the late prompt.
    pub fn execute(&mut self, command: &str, echo: bool) -> Result<Option<CommandOutput>> {
        self.send_line(command)?;
        if !echo {
            return Ok(None);
        }

        match self.accumulator.wait_until_idle(&mut self.child) {
            Ok(output) => {
                self.hooks.forward(&output);
                Ok(Some(output))
            }
            Err(e) => {
                if let BridgeError::IdleTimeout { timeout, stdout, stderr } = &e {
                    warn!(timeout = ?timeout, command = %command, "command still running after timeout");
                    self.hooks.forward_text(stdout, stderr);
                }
                Err(e)
            }
        }
    }

    /// Sends `command`, waits for the prompt and returns the output without
    /// forwarding it to the sinks.
    pub fn run(&mut self, command: &str) -> Result<CommandOutput> {
        self.send_line(command)?;
        self.accumulator.wait_until_idle(&mut self.child)
    }

    /// Waits for the prompt and returns (without forwarding) whatever was
    /// produced since the last idle cycle. Returns at once if no command is
    /// still owed a prompt.
    pub fn flush_idle(&mut self) -> Result<CommandOutput> {
        if self.accumulator.awaiting() == 0 {
            return Ok(CommandOutput {
                stdout: self.accumulator.drain_current(Stream::Stdout),
                stderr: self.accumulator.drain_current(Stream::Stderr),
                status: IdleStatus::Idle,
            });
        }

        let output = self.accumulator.wait_until_idle(&mut self.child)?;
        trace!(
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "flushed idle output"
        );
        Ok(output)
    }

    /// Takes whatever `stream` has produced so far, without waiting.
    /// Prompts are cut out of stdout and count as seen.
    pub fn drain_current(&mut self, stream: Stream) -> String {
        self.accumulator.drain_current(stream)
    }

    /// Forwards whatever output is available right now to the sinks,
    /// without waiting for the prompt.
    pub fn write_outputs(&mut self) {
        let stdout = self.accumulator.drain_current(Stream::Stdout);
        let stderr = self.accumulator.drain_current(Stream::Stderr);
        trace!(stdout_len = stdout.len(), stderr_len = stderr.len(), "forwarding available output");
        self.hooks.forward_text(&stdout, &stderr);
    }

    /// True while the interpreter process is running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.liveness(), Ok(Liveness::Running))
    }

    /// OS process id of the interpreter.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Settings this session was started with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Stops the interpreter: sends the quit command, closes stdin, waits
    /// up to the shutdown timeout and kills the process if it is still
    /// running. Returns the exit code. Calling it again is a no-op.
    pub fn shutdown(&mut self) -> Result<Option<i32>> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }

        if self.is_alive() {
            if let Some(quit) = self.config.quit_command.clone() {
                if let Err(e) = self.send_line(&quit) {
                    debug!(error = %e, "could not send quit command");
                }
            }
        }
        drop(self.stdin.take());

        let code = match self.wait_with_timeout(self.config.shutdown_timeout)? {
            Some(status) => status.code(),
            None => {
                warn!(pid = self.pid(), "interpreter did not exit, killing");
                if let Err(e) = self.child.kill() {
                    debug!(error = %e, "kill failed");
                }
                self.child.wait()?.code()
            }
        };
        self.exit_code = Some(code);

        self.join_drainers();
        info!(code = ?code, "interpreter stopped");
        Ok(code)
    }

    fn send_line(&mut self, command: &str) -> Result<()> {
        if let Liveness::Exited(code) = self.child.liveness()? {
            return Err(BridgeError::ProcessExited(code));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or(BridgeError::ProcessExited(None))?;

        debug!(command = %command, "sending command");
        stdin
            .write_all(format!("{}\n", command).as_bytes())
            .and_then(|_| stdin.flush())
            .map_err(BridgeError::Write)?;
        self.accumulator.expect_prompt();
        Ok(())
    }

    fn wait_with_timeout(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(self.config.poll_interval.max(Duration::from_millis(1)));
        }
    }

    /// Joins drainers that reached EOF within the exit grace period. A
    /// drainer whose pipe is still held open by a grandchild is left behind.
    fn join_drainers(&mut self) {
        let deadline = Instant::now() + self.config.exit_grace;
        while self.drainers.iter().any(|d| !d.is_finished()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        for drainer in self.drainers.drain(..) {
            if drainer.is_finished() {
                let stream = drainer.stream();
                let total = drainer.join();
                trace!(stream, total = ?total, "drainer joined");
            } else {
                debug!(stream = drainer.stream(), "drainer still attached, detaching");
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "interpreter shutdown failed");
        }
    }
}
