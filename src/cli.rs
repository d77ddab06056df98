// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `modbuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "modbuild",
    version,
    about = "Build module-based front-end assets, once or incrementally on change.",
    long_about = None
)]
pub struct CliArgs {
    /// What to run: `build`, `dev` (build, then rebuild on change until
    /// Ctrl-C) or the name of any single task (`compile`, `icons`, `minify`,
    /// `manifest`, `styles`).
    #[arg(value_name = "TARGET", default_value = "build")]
    pub target: String,

    /// Path to the config file (TOML). Its directory is the project root.
    ///
    /// Default: `Modbuild.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Modbuild.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MODBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config, print the task graph and module load order, but
    /// don't write anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn is_dev(&self) -> bool {
        self.target == DEV_TARGET
    }
}

/// Target that builds once and then watches.
pub const DEV_TARGET: &str = "dev";

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
