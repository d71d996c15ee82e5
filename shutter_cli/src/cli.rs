//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "shutter_cli", version, about = "Smart shutter position controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/shutter.toml")]
    pub config: PathBuf,

    /// Cover to act on, by name; required when several are configured.
    /// `status`, `calibrate` and `self-check` cover all of them without it
    #[arg(long, value_name = "NAME")]
    pub cover: Option<String>,

    /// Optional calibration CSV (strict header); the row named like a
    /// cover overrides its travel times
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log and print results as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); overrides [logging] level,
    /// `RUST_LOG` overrides both
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Give up waiting for a movement to settle after this many ms
    /// (default: twice the slower full travel)
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive fully open
    Open,
    /// Drive fully closed
    Close,
    /// Halt the shutter where it is
    Stop,
    /// Move to a position in percent (0 = closed, 100 = open)
    Move {
        /// Target position
        #[arg(long, allow_negative_numbers = true)]
        position: i64,
    },
    /// Measure full travel times, one cover after another
    Calibrate {
        /// Write the measured travel times here: a calibration CSV when the
        /// name ends in `.csv`, a TOML snippet otherwise
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Print the last known position of each cover
    Status,
    /// Quick health check (config, calibration, device construction)
    SelfCheck,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Open => "open",
            Commands::Close => "close",
            Commands::Stop => "stop",
            Commands::Move { .. } => "move",
            Commands::Calibrate { .. } => "calibrate",
            Commands::Status => "status",
            Commands::SelfCheck => "self-check",
        }
    }
}
