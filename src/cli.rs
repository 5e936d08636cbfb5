// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `actionlane`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "actionlane",
    version,
    about = "Run a suite of dependent actions on parallel lanes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the suite file (TOML).
    ///
    /// Default: `Suite.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Suite.toml")]
    pub suite: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ACTIONLANE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print lanes and dependencies, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
