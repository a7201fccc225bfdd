// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::OutputFormat;

/// Command-line arguments for `treewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "treewatch",
    version,
    about = "Watch a directory tree and report file changes as they happen.",
    long_about = None
)]
pub struct CliArgs {
    /// Workspace root to watch.
    ///
    /// Default: `[watch].root` from the config file, else the current
    /// directory.
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Treewatch.toml` in the current working directory, if it
    /// exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TREEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print every change as it arrives instead of debounced reload batches.
    #[arg(long)]
    pub raw: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Quiet period before a batch of changes is reported.
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Upper bound on a single backend poll.
    #[arg(long, value_name = "MS")]
    pub poll_timeout_ms: Option<u64>,

    /// Only report paths matching this root-relative glob. Repeatable;
    /// replaces `[reload].include` from the config file.
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Ignore deletions.
    #[arg(long)]
    pub skip_deleted: bool,
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

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
