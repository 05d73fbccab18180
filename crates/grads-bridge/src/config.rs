//! Launch and synchronisation settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::LayoutMode;

/// Default interpreter binary, resolved through `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "grads";

/// Prompt GrADS prints when it is waiting for a command.
pub const DEFAULT_PROMPT: &str = "ga->";

/// Command template used to export the current figure.
pub const DEFAULT_EXPORT_COMMAND: &str = "gxprint {path}";

/// Configuration for an interpreter session.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Interpreter binary.
    pub executable: String,
    /// Page layout, mapped to launch flags.
    pub mode: LayoutMode,
    /// Extra arguments appended after the layout flags.
    pub extra_args: Vec<String>,
    /// Working directory for the child.
    pub working_dir: Option<PathBuf>,
    /// Idle prompt marker.
    pub prompt: String,
    /// Export command; `{path}` is replaced with the target file.
    pub export_command: String,
    /// Command sent on shutdown before stdin is closed.
    pub quit_command: Option<String>,
    /// Forward the startup banner to the sinks.
    pub echo_banner: bool,
    /// Maximum bytes per read on each output stream.
    pub read_chunk_size: usize,
    /// How long one idle-wait iteration blocks on stdout.
    pub poll_interval: Duration,
    /// Quiet period stderr must show before a finished command is returned.
    pub stderr_settle: Duration,
    /// Upper bound on the stderr settle wait while stderr keeps producing.
    pub stderr_settle_max: Duration,
    /// How long to collect trailing output after the child exits.
    pub exit_grace: Duration,
    /// Give up waiting for the prompt after this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// How long shutdown waits for a clean exit before killing the child.
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            mode: LayoutMode::default(),
            extra_args: Vec::new(),
            working_dir: None,
            prompt: DEFAULT_PROMPT.to_string(),
            export_command: DEFAULT_EXPORT_COMMAND.to_string(),
            quit_command: Some("quit".to_string()),
            echo_banner: true,
            read_chunk_size: 4096,
            poll_interval: Duration::from_millis(10),
            stderr_settle: Duration::from_millis(5),
            stderr_settle_max: Duration::from_millis(100),
            exit_grace: Duration::from_millis(200),
            idle_timeout: None,
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

impl BridgeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interpreter binary.
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Sets the layout mode.
    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }

    /// Appends an extra launch argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Sets the child's working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the idle prompt marker.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Sets the export command template.
    pub fn with_export_command(mut self, template: impl Into<String>) -> Self {
        self.export_command = template.into();
        self
    }

    /// Sets (or clears) the command sent on shutdown.
    pub fn with_quit_command(mut self, command: Option<String>) -> Self {
        self.quit_command = command;
        self
    }

    /// Enables or disables forwarding of the startup banner.
    pub fn with_echo_banner(mut self, echo: bool) -> Self {
        self.echo_banner = echo;
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Renders the export command for `path`.
    pub fn export_command_for(&self, path: &str) -> String {
        self.export_command.replace("{path}", path)
    }

    /// Full argument list passed to the interpreter.
    pub fn launch_args(&self) -> Vec<String> {
        self.mode
            .launch_flags()
            .iter()
            .map(|f| f.to_string())
            .chain(self.extra_args.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();

        assert_eq!(config.executable, "grads");
        assert_eq!(config.mode, LayoutMode::Landscape);
        assert_eq!(config.prompt, "ga->");
        assert_eq!(config.read_chunk_size, 4096);
        assert_eq!(config.quit_command.as_deref(), Some("quit"));
        assert!(config.idle_timeout.is_none());
        assert!(config.stderr_settle < config.stderr_settle_max);
        assert!(config.echo_banner);
    }

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::new()
            .with_executable("/opt/grads/bin/grads")
            .with_mode(LayoutMode::Portrait)
            .with_arg("-H")
            .with_prompt(">>")
            .with_poll_interval(Duration::from_millis(1))
            .with_idle_timeout(Some(Duration::from_secs(5)))
            .with_quit_command(None);

        assert_eq!(config.executable, "/opt/grads/bin/grads");
        assert_eq!(config.launch_args(), vec!["-b", "-p", "-H"]);
        assert_eq!(config.prompt, ">>");
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(5)));
        assert!(config.quit_command.is_none());
    }

    #[test]
    fn test_export_command_for() {
        let config = BridgeConfig::default();
        assert_eq!(config.export_command_for("/tmp/out.png"), "gxprint /tmp/out.png");

        let config = config.with_export_command("printim {path} white");
        assert_eq!(config.export_command_for("a.png"), "printim a.png white");
    }
}
