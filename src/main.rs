//! Statelock: a lock around a shared build state artifact.
//!
//! This is the main entry point for the `statelock` CLI. It parses arguments,
//! sets up logging, dispatches to the appropriate command handler, and
//! handles errors with proper exit codes.

mod cli;
mod commands;
pub mod config;
pub mod confirm;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod git;
pub mod identity;
pub mod logging;
pub mod protocol;
pub mod record;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(e) = logging::init_tracing(cli.verbose) {
        eprintln!("Warning: {:#}", e);
    }

    match commands::dispatch(cli.command, cli.config.as_deref()) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
