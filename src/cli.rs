// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `wildfire-wrf`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wildfire-wrf",
    version,
    about = "Run WPS/WRF for fires in selected US states.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Wildfire.toml")]
    pub config: String,

    /// Filter by US state name or abbreviation (e.g. Washington, WA).
    #[arg(short = 's', long, num_args = 1.., value_name = "STATE")]
    pub states: Vec<String>,

    /// Filter by fire ID.
    #[arg(short = 'f', long, num_args = 1.., value_name = "FIRE_ID")]
    pub fireids: Vec<String>,

    /// Max fires processed. Overrides `[limits].max_fires`.
    #[arg(short = 'm', long, value_name = "N")]
    pub max_fires: Option<usize>,

    /// Number of days to process per fire. Overrides `[limits].max_days`.
    #[arg(short = 'n', long, value_name = "N")]
    pub num_days: Option<usize>,

    /// Number of fires running at once. Overrides `[limits].max_workers`.
    #[arg(short = 't', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Launch the no-op test script instead of the real WPS/WRF runner.
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Materialize configs, print the run plan, and exit without launching.
    #[arg(long)]
    pub plan: bool,

    /// Skip copying wrfout files into the archive after the run.
    #[arg(long)]
    pub no_archive: bool,

    /// Remove the per-fire configs written for this run before exiting.
    #[arg(long)]
    pub cleanup: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WILDFIRE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
