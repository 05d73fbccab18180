//! Collects queued output until the interpreter is idle again.

use std::process::Child;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::queue::ByteQueue;
use crate::sentinel::{resume_offset, PromptSentinel};
use crate::{BridgeConfig, BridgeError, Result};

/// One of the child's output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Whether a child process is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,
    Exited(Option<i32>),
}

/// Something whose exit can be polled without blocking.
pub trait ProcessProbe {
    /// Reports whether the process has exited.
    fn liveness(&mut self) -> std::io::Result<Liveness>;
}

impl ProcessProbe for Child {
    fn liveness(&mut self) -> std::io::Result<Liveness> {
        Ok(match self.try_wait()? {
            Some(status) => Liveness::Exited(status.code()),
            None => Liveness::Running,
        })
    }
}

/// How an idle cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleStatus {
    /// The prompt was seen; the interpreter is waiting for input.
    Idle,
    /// The child exited before printing a prompt.
    Exited(Option<i32>),
}

/// Output produced by one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output up to (not including) the prompt.
    pub stdout: String,
    /// Standard error collected during the cycle.
    pub stderr: String,
    pub status: IdleStatus,
}

impl CommandOutput {
    /// True when the interpreter came back to its prompt.
    pub fn is_idle(&self) -> bool {
        self.status == IdleStatus::Idle
    }

    /// Exit code if the child terminated during the cycle.
    pub fn exit_code(&self) -> Option<Option<i32>> {
        match self.status {
            IdleStatus::Exited(code) => Some(code),
            IdleStatus::Idle => None,
        }
    }
}

/// Timing knobs for the idle loop, taken from [`BridgeConfig`].
#[derive(Debug, Clone, Copy)]
pub struct IdleTiming {
    pub poll_interval: Duration,
    pub stderr_settle: Duration,
    pub stderr_settle_max: Duration,
    pub exit_grace: Duration,
    pub idle_timeout: Option<Duration>,
}

impl From<&BridgeConfig> for IdleTiming {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            stderr_settle: config.stderr_settle,
            stderr_settle_max: config.stderr_settle_max,
            exit_grace: config.exit_grace,
            idle_timeout: config.idle_timeout,
        }
    }
}

/// Owns both output queues and turns them into per-command results.
///
/// Every command sent is owed one prompt. A wait that gives up leaves its
/// prompt owed, and the next wait skips past it (discarding the stale
/// output) before collecting its own.
#[derive(Debug)]
pub struct OutputAccumulator {
    stdout: ByteQueue,
    stderr: ByteQueue,
    sentinel: PromptSentinel,
    timing: IdleTiming,
    /// Stdout already read that belongs to a later cycle.
    carry: String,
    /// Prompts owed by commands already sent.
    awaiting: usize,
}

impl OutputAccumulator {
    /// Creates an accumulator over the two stream queues.
    pub fn new(stdout: ByteQueue, stderr: ByteQueue, sentinel: PromptSentinel, timing: IdleTiming) -> Self {
        Self {
            stdout,
            stderr,
            sentinel,
            timing,
            carry: String::new(),
            awaiting: 0,
        }
    }

    /// Records that a command was sent and will end with a prompt.
    pub fn expect_prompt(&mut self) {
        self.awaiting += 1;
    }

    /// Prompts still owed by commands already sent.
    pub fn awaiting(&self) -> usize {
        self.awaiting
    }

    /// Returns everything currently available on `stream` without waiting.
    ///
    /// Prompts on stdout are cut out of the text and settle the commands
    /// that owed them. A partial prompt at the end is held back.
    pub fn drain_current(&mut self, stream: Stream) -> String {
        match stream {
            Stream::Stderr => self.stderr.drain_current(),
            Stream::Stdout => {
                let mut text = std::mem::take(&mut self.carry);
                text.push_str(&self.stdout.drain_current());
                self.cut_prompts(text)
            }
        }
    }

    fn cut_prompts(&mut self, mut text: String) -> String {
        let mut out = String::with_capacity(text.len());
        while let Some(idx) = self.sentinel.find(&text) {
            out.push_str(&text[..idx]);
            text = self.after_prompt(&text, idx).to_string();
            self.awaiting = self.awaiting.saturating_sub(1);
        }

        let tail = resume_offset(&text, text.len());
        if tail < text.len() && self.sentinel.marker().starts_with(&text[tail..]) {
            self.carry = text.split_off(tail);
        }
        out.push_str(&text);
        out
    }

    /// Text following the prompt at `idx`, without the prompt's padding.
    fn after_prompt<'a>(&self, text: &'a str, idx: usize) -> &'a str {
        text[idx + self.sentinel.marker().len()..].trim_start_matches(|c: char| c == ' ' || c == '\t')
    }

    /// Accumulates output until the prompt appears on stdout or the child
    /// exits.
    ///
    /// The prompt is dropped from stdout; anything after it is kept for the
    /// next cycle. If the child exits first, whatever it wrote is returned
    /// with [`IdleStatus::Exited`].
    ///
    /// # Errors
    ///
    /// `BridgeError::IdleTimeout` (carrying the partial output) when an idle
    /// timeout is configured and expires; `BridgeError::Io` if the child's
    /// status cannot be polled.
    pub fn wait_until_idle<P: ProcessProbe>(&mut self, probe: &mut P) -> Result<CommandOutput> {
        let started = Instant::now();
        let mut remaining = self.awaiting.max(1);
        let mut stdout = std::mem::take(&mut self.carry);
        let mut stderr = String::new();
        let mut scan_from = 0;

        loop {
            while let Some(idx) = self.sentinel.find_from(&stdout, scan_from) {
                let rest = self.after_prompt(&stdout, idx).to_string();
                stdout.truncate(idx);
                remaining -= 1;

                if remaining == 0 {
                    self.awaiting = 0;
                    self.carry = rest;
                    self.settle_stderr(&mut stderr);
                    trace!(
                        stdout_len = stdout.len(),
                        stderr_len = stderr.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "interpreter idle"
                    );
                    return Ok(CommandOutput {
                        stdout,
                        stderr,
                        status: IdleStatus::Idle,
                    });
                }

                debug!(stale_len = stdout.len(), remaining, "skipped output of an earlier command");
                stdout = rest;
                stderr.clear();
                scan_from = 0;
            }
            scan_from = resume_offset(&stdout, stdout.len());

            if let Liveness::Exited(code) = probe.liveness()? {
                self.collect_after_exit(&mut stdout, &mut stderr);
                if let Some(idx) = self.sentinel.find_from(&stdout, scan_from) {
                    stdout.truncate(idx);
                }
                self.awaiting = 0;
                debug!(code = ?code, stdout_len = stdout.len(), "interpreter exited before prompt");
                return Ok(CommandOutput {
                    stdout,
                    stderr,
                    status: IdleStatus::Exited(code),
                });
            }

            if let Some(timeout) = self.timing.idle_timeout {
                if started.elapsed() >= timeout {
                    self.awaiting = remaining;
                    debug!(owed = remaining, "idle timeout, prompt still owed");
                    return Err(BridgeError::IdleTimeout {
                        timeout,
                        stdout,
                        stderr,
                    });
                }
            }

            if !self.stdout.wait_for_data(self.timing.poll_interval) && self.stdout.is_closed() {
                thread::sleep(self.timing.poll_interval);
            }
            stdout.push_str(&self.stdout.drain_current());
            stderr.push_str(&self.stderr.drain_current());
        }
    }

    /// Stderr is not ordered against stdout, so keep reading it until it
    /// has been quiet for the settle period, but no longer than the cap.
    fn settle_stderr(&mut self, stderr: &mut String) {
        if self.timing.stderr_settle.is_zero() {
            return;
        }
        let deadline = Instant::now() + self.timing.stderr_settle_max;
        loop {
            let now = Instant::now();
            if now >= deadline {
                trace!("stderr still busy, settle cap reached");
                break;
            }
            if !self.stderr.wait_for_data(self.timing.stderr_settle.min(deadline - now)) {
                break;
            }
            stderr.push_str(&self.stderr.drain_current());
        }
        stderr.push_str(&self.stderr.drain_current());
    }

    /// Picks up output still in flight after the child exited, until both
    /// streams close or the grace period runs out.
    fn collect_after_exit(&mut self, stdout: &mut String, stderr: &mut String) {
        let deadline = Instant::now() + self.timing.exit_grace;

        loop {
            stdout.push_str(&self.stdout.drain_current());
            stderr.push_str(&self.stderr.drain_current());

            let now = Instant::now();
            if (self.stdout.is_closed() && self.stderr.is_closed()) || now >= deadline {
                break;
            }

            let step = (deadline - now).min(self.timing.poll_interval);
            if !self.stdout.is_closed() {
                self.stdout.wait_for_data(step);
            } else {
                self.stderr.wait_for_data(step);
            }
        }
    }
}
