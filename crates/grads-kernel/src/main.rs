//! grads-kernel entry point.

use std::fs;
use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use grads_kernel::cli::{Cli, Commands};
use grads_kernel::frontend::{shared, JsonFrontend, SharedFrontend, TerminalFrontend};
use grads_kernel::repl::Repl;
use grads_kernel::{GradsKernel, ReplyStatus, Result};

fn main() {
    // Load .env.local if it exists (for GRADS_BIN etc.)
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    // Logs go to stderr so stdout stays clean for cell output.
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Some(Commands::Run { file }) => run_file(&cli, file),
        Some(Commands::Repl) | None => run_repl(&cli),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn start_kernel(cli: &Cli) -> Result<GradsKernel> {
    let config = cli.bridge_config()?;
    let frontend: SharedFrontend = if cli.json {
        shared(JsonFrontend::stdout())
    } else {
        shared(TerminalFrontend::new(cli.save_dir.clone()))
    };

    info!(executable = %config.executable, mode = %config.mode, "starting GrADS");
    GradsKernel::start(config, frontend)
}

fn run_repl(cli: &Cli) -> Result<bool> {
    let kernel = start_kernel(cli)?;
    let mut repl = Repl::new(kernel, &cli.state_dir())?;
    repl.run()?;
    Ok(true)
}

/// Runs a file as one cell. Returns false if GrADS exited during it.
fn run_file(cli: &Cli, file: &Path) -> Result<bool> {
    let code = fs::read_to_string(file)?;
    let mut kernel = start_kernel(cli)?;

    let reply = kernel.execute_cell(&code)?;
    kernel.shutdown()?;
    Ok(reply.status == ReplyStatus::Ok)
}
