//! Prompt-synchronised bridge to a long-running GrADS interpreter.
//!
//! This crate launches a prompt-driven interpreter as a child process,
//! writes commands to it one line at a time and decides that a command has
//! finished when the idle prompt (`ga->`) shows up at the start of a line of
//! its stdout:
//! - One drainer thread per output stream feeds an unbounded queue
//! - The accumulator drains both queues and scans for the prompt
//! - The supervisor sequences writes with idle waits
//! - Figures are exported to files with a synchronous round trip
//!
//! # Example
//!
//! ```no_run
//! use grads_bridge::{CaptureHooks, Supervisor};
//!
//! let mut grads = Supervisor::start("grads", "landscape", CaptureHooks::default()).unwrap();
//!
//! // Output is printed through the hooks and also returned
//! let output = grads.execute("q config", true).unwrap();
//! println!("{:?}", output);
//!
//! grads.execute("set display color white", true).unwrap();
//! grads.export_artifact("/tmp/out.png").unwrap();
//!
//! grads.shutdown().unwrap();
//! ```
//!
//! # Configuring the Session
//!
//! ```no_run
//! use std::time::Duration;
//! use grads_bridge::{BridgeConfig, CaptureHooks, LayoutMode, Supervisor};
//!
//! let config = BridgeConfig::new()
//!     .with_executable("/opt/grads/bin/grads")
//!     .with_mode(LayoutMode::Portrait)
//!     .with_idle_timeout(Some(Duration::from_secs(60)));
//!
//! let grads = Supervisor::start_with_config(config, CaptureHooks::discard()).unwrap();
//! ```

pub mod accumulator;
pub mod config;
pub mod drainer;
pub mod error;
mod export;
pub mod mode;
pub mod queue;
pub mod sentinel;
pub mod sink;
pub mod supervisor;

pub use accumulator::{CommandOutput, IdleStatus, Liveness, OutputAccumulator, ProcessProbe, Stream};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use mode::LayoutMode;
pub use sentinel::PromptSentinel;
pub use sink::{CaptureHooks, OutputSink, StderrSink, StdoutSink};
pub use supervisor::Supervisor;
