//! Rampart CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Decode failure
//! - 4: Validation failure
//! - 5: Policy application failure

use std::process::ExitCode;

use clap::Parser;
use rampart_config::{ConfigError, ErrorCategory};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands, InvalidArgument};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const DECODE_FAILURE: u8 = 3;
    pub const VALIDATION_FAILURE: u8 = 4;
    pub const POLICY_FAILURE: u8 = 5;
}

const DEFAULT_LOG_FILTER: &str = "rampart=info,warn";

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    // Logging may already be initialized
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(log_filter(cli.verbose, cli.quiet))
        .try_init();

    let result = match cli.command {
        Commands::Normalize(args) => commands::normalize::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Manifest(args) => commands::manifest::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// `RAMPART_LOG` wins over `RUST_LOG`; the verbosity flags override both.
fn log_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("rampart=debug,warn");
    }
    if quiet {
        return EnvFilter::new("warn");
    }

    EnvFilter::try_from_env("RAMPART_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<InvalidArgument>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
        if let Some(config_error) = cause.downcast_ref::<ConfigError>() {
            return match config_error.category() {
                ErrorCategory::Decode => ExitCodes::DECODE_FAILURE,
                ErrorCategory::Validation => ExitCodes::VALIDATION_FAILURE,
                ErrorCategory::Policy => ExitCodes::POLICY_FAILURE,
                ErrorCategory::Other => ExitCodes::GENERAL_ERROR,
            };
        }
    }
    ExitCodes::GENERAL_ERROR
}
