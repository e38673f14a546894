//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Used when `--config` is not given; a missing file here means built-in defaults.
pub const DEFAULT_CONFIG: &str = "etc/scalelink.toml";

#[derive(Parser, Debug)]
#[command(name = "scalelink", version, about = "Read weights from a CH340 USB scale")]
pub struct Cli {
    /// Path to config TOML [default: etc/scalelink.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit JSON lines (output and logs) instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Subscribe to the scale and print readings as they arrive
    Stream {
        /// Stop after this many readings
        #[arg(long, value_name = "N")]
        count: Option<usize>,
        /// Stop after this long even if fewer readings arrived
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Also print a line for every cycle without data
        #[arg(long, action = ArgAction::SetTrue)]
        show_absent: bool,
    },
    /// List attached USB devices and flag the ones the reader would pick
    List,
    /// Quick health check (config valid, backend enumerates)
    SelfCheck,
}
