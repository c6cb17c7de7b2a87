//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::classifier::LandingStatus;

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Poll once, print any landing and exit
    #[arg(long)]
    pub once: bool,

    /// Replay a saved telemetry file instead of the live feed
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Do not ring the terminal bell on alerts
    #[arg(long)]
    pub no_sound: bool,
}

/// Classify command arguments.
#[derive(Debug, Args)]
pub struct ClassifyCommand {
    /// Saved telemetry feed (`{"aircraft": [...]}`)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Include aircraft with no landing status
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Match command arguments.
#[derive(Debug, Args)]
pub struct MatchCommand {
    /// Flight number or registration to look up
    pub ident: String,

    /// Schedule file (`{"flights": [...]}`)
    #[arg(short, long, value_name = "FILE")]
    pub schedule: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Trace log commands.
#[derive(Debug, Subcommand)]
pub enum TraceCommand {
    /// Show recorded trace batches, newest first
    Show {
        /// Only show entries with this status
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete all recorded trace batches
    Clear,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

/// Landing status argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// The alert was displayed
    AlertTriggered,
    /// Met all landing criteria
    CriteriaMet,
    /// Met some landing criteria
    PartialCriteria,
    /// Inside the debug altitude band only
    AltitudeOnly,
}

impl From<StatusArg> for LandingStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::AlertTriggered => Self::AlertTriggered,
            StatusArg::CriteriaMet => Self::CriteriaMet,
            StatusArg::PartialCriteria => Self::PartialCriteria,
            StatusArg::AltitudeOnly => Self::AltitudeOnly,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// JSON output
    Json,
}
