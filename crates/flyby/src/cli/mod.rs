//! Command-line interface for flyby.
//!
//! This module provides the CLI structure for the `flyby` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ClassifyCommand, ConfigCommand, MatchCommand, OutputFormat, StatusArg, TraceCommand,
    WatchCommand,
};

/// flyby - Know which aircraft is about to land
///
/// Watches a live aircraft feed around an airport and raises an alert,
/// enriched with scheduled flight data, when an aircraft is on final.
#[derive(Debug, Parser)]
#[command(name = "flyby")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch the feed and show landing alerts
    Watch(WatchCommand),

    /// Classify every aircraft in a saved feed
    Classify(ClassifyCommand),

    /// Look up a flight in a schedule file
    Match(MatchCommand),

    /// Inspect the debug trace log
    #[command(subcommand)]
    Trace(TraceCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "flyby");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        use crate::logging::Verbosity;

        let verbosity = |args: &[&str]| parse(args).verbosity();

        assert_eq!(verbosity(&["flyby", "watch"]), Verbosity::Normal);
        assert_eq!(verbosity(&["flyby", "-v", "watch"]), Verbosity::Verbose);
        assert_eq!(verbosity(&["flyby", "-vv", "watch"]), Verbosity::Trace);
        assert_eq!(verbosity(&["flyby", "-q", "-v", "watch"]), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_watch_once() {
        let cli = parse(&["flyby", "watch", "--once", "--replay", "feed.json"]);
        match cli.command {
            Command::Watch(cmd) => {
                assert!(cmd.once);
                assert_eq!(cmd.replay, Some(PathBuf::from("feed.json")));
                assert!(!cmd.no_sound);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_classify() {
        let cli = parse(&["flyby", "classify", "feed.json", "--format", "json"]);
        match cli.command {
            Command::Classify(cmd) => {
                assert_eq!(cmd.file, PathBuf::from("feed.json"));
                assert_eq!(cmd.format, OutputFormat::Json);
                assert!(!cmd.all);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_match_requires_schedule() {
        assert!(Cli::try_parse_from(["flyby", "match", "DAL1234"]).is_err());

        let cli = parse(&["flyby", "match", "DAL1234", "-s", "flights.json"]);
        match cli.command {
            Command::Match(cmd) => {
                assert_eq!(cmd.ident, "DAL1234");
                assert_eq!(cmd.schedule, PathBuf::from("flights.json"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_trace() {
        let cli = parse(&["flyby", "trace", "show", "--status", "criteria-met"]);
        assert!(matches!(
            cli.command,
            Command::Trace(TraceCommand::Show {
                status: Some(StatusArg::CriteriaMet),
                ..
            })
        ));
        assert!(matches!(
            parse(&["flyby", "trace", "clear"]).command,
            Command::Trace(TraceCommand::Clear)
        ));
    }

    #[test]
    fn test_parse_config() {
        assert!(matches!(
            parse(&["flyby", "config", "show", "--json"]).command,
            Command::Config(ConfigCommand::Show { json: true })
        ));
        assert!(matches!(
            parse(&["flyby", "config", "path"]).command,
            Command::Config(ConfigCommand::Path)
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["flyby", "-c", "/custom/config.toml", "watch"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
