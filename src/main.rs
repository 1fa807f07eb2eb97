//! Binary entry point for finrag.
//!
//! Command output is JSON on stdout; logs and errors go to stderr.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for error reporting
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::Parser;
use finrag::cli::{self, Cli};
use finrag::observability::{self, InitOptions};
use std::io::Write;
use std::process::ExitCode;

/// Main entry point.
fn main() -> ExitCode {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let _observability = match observability::init_from_config(
        &config.observability,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = cli::run(&cli.command, config, &mut out).and_then(|()| {
        out.flush()
            .map_err(|e| finrag::Error::operation("write_output", e.to_string()))
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}
