//! # tagging CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber, loads
//! configuration, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tagging_cli::check::{run_check, run_list};
use tagging_cli::load_config;
use tagging_cli::validate::{run_validate, ValidateArgs};

/// Tag policy tooling.
///
/// Checks deployment tag policies and validates candidate tags against
/// them without a running service.
#[derive(Parser, Debug)]
#[command(name = "tagging", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to configuration file. Defaults to $TAGGING_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile every configured policy and report all defects.
    Check,

    /// List configured tag types with their compiled clauses.
    List,

    /// Validate a candidate tag against the configured policies.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "tagging CLI starting");

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Check => run_check(&config),
        Commands::List => run_list(&config),
        Commands::Validate(args) => run_validate(args, &config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
