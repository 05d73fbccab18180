//! Command-line interface definition using clap.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use grads_bridge::{BridgeConfig, LayoutMode};

use crate::paths::{self, STATE_DIR_ENV};
use crate::{KernelError, Result};

/// Build version string with git hash and build date.
fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const BUILD_DATE: &str = env!("BUILD_DATE");

    // Format: "0.1.0 (abc1234, 2026-01-29)"
    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} ({}, {})", VERSION, GIT_HASH, BUILD_DATE))
}

/// grads-kernel - run GrADS interactively, one cell at a time
#[derive(Parser, Debug)]
#[command(name = "grads-kernel")]
#[command(author, version = version_string(), about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// GrADS executable (name on PATH or a path)
    #[arg(long, env = "GRADS_BIN", default_value = grads_bridge::config::DEFAULT_EXECUTABLE)]
    pub grads: String,

    /// Page layout (landscape or portrait)
    #[arg(short, long, default_value = "landscape")]
    pub mode: String,

    /// Idle prompt printed by GrADS
    #[arg(long, default_value = grads_bridge::config::DEFAULT_PROMPT)]
    pub prompt: String,

    /// Give up on a command after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub idle_timeout: Option<u64>,

    /// Emit JSON messages instead of plain text
    #[arg(long)]
    pub json: bool,

    /// Directory figures are saved to
    #[arg(long, default_value = ".")]
    pub save_dir: PathBuf,

    /// Path to state directory
    #[arg(short, long, env = STATE_DIR_ENV)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start interactive REPL mode
    Repl,

    /// Execute a file as a single cell
    Run {
        /// Cell file to execute
        #[arg(required = true)]
        file: PathBuf,
    },
}

impl Cli {
    /// Returns the state directory path, using default if not specified.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(paths::default_state_dir)
    }

    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Bridge configuration described by the flags.
    ///
    /// # Errors
    ///
    /// An unknown layout mode, or a GrADS binary that cannot be found.
    pub fn bridge_config(&self) -> Result<BridgeConfig> {
        let mode: LayoutMode = self.mode.parse()?;
        let executable = resolve_executable(&self.grads)?;

        Ok(BridgeConfig::default()
            .with_executable(executable.to_string_lossy())
            .with_mode(mode)
            .with_prompt(self.prompt.clone())
            .with_idle_timeout(self.idle_timeout.map(Duration::from_secs)))
    }
}

/// Resolves the GrADS binary, expanding `~` and searching PATH for bare names.
pub fn resolve_executable(name: &str) -> Result<PathBuf> {
    let expanded = shellexpand::tilde(name).into_owned();
    let path = PathBuf::from(&expanded);

    if path.components().count() > 1 {
        return if path.exists() {
            Ok(path)
        } else {
            Err(KernelError::NotFound(expanded))
        };
    }

    which::which(&expanded).map_err(|_| KernelError::NotFound(expanded))
}
