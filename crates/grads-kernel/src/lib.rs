//! Terminal kernel for GrADS.
//!
//! Cells typed at the REPL (or read from a file) are split into GrADS
//! statements and `*%` directives, run through a [`grads_bridge::Supervisor`],
//! and their output and figures are handed to a [`frontend::Frontend`].

pub mod cell;
pub mod cli;
pub mod display;
pub mod error;
pub mod frontend;
pub mod kernel;
pub mod paths;
pub mod repl;

pub use error::{KernelError, Result};
pub use kernel::{ExecuteReply, GradsKernel, ReplyStatus};
