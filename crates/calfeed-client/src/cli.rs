//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use calfeed_core::{MalformedPolicy, TracingOutputFormat};

/// calfeed - expand a calendar feed into dated occurrences
#[derive(Debug, Parser)]
#[command(name = "calfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALFEED_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long, global = true)]
    pub log_format: Option<TracingOutputFormat>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download the feed and save its events
    Fetch {
        /// Feed URL (overrides [feed] url)
        #[arg(long)]
        url: Option<String>,

        /// Where to write the events (overrides [paths] calendar)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Expand recurring events from a saved events file
    Expand {
        /// Events file to read (overrides [paths] calendar)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Where to write the occurrences (overrides [paths] expanded)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// What to do with malformed recurring events: fail or skip
        #[arg(long)]
        on_malformed: Option<MalformedPolicy>,
    },

    /// Fetch then expand
    Sync {
        #[command(flatten)]
        args: SyncArgs,
    },

    /// Sync periodically until interrupted
    Watch {
        #[command(flatten)]
        args: SyncArgs,

        /// Seconds between refreshes (overrides [watch] interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides shared by `sync` and `watch`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SyncArgs {
    /// Feed URL (overrides [feed] url)
    #[arg(long)]
    pub url: Option<String>,

    /// Where to write the fetched events (overrides [paths] calendar)
    #[arg(long)]
    pub calendar: Option<PathBuf>,

    /// Where to write the occurrences (overrides [paths] expanded)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// What to do with malformed recurring events: fail or skip
    #[arg(long)]
    pub on_malformed: Option<MalformedPolicy>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
