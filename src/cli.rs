//! Command line interface definition.

use crate::config::{Config, Verbosity};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "git-daily-pull",
    version,
    about = "Keep every local git clone up to date without losing local work"
)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only print errors and the final count
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print every step and git command
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pull all repositories now
    Run(FolderArgs),
    /// Stay in the foreground and pull once a day
    Daemon,
    /// List the repositories that would be pulled
    List(FolderArgs),
    /// Show recent runs
    History {
        /// Number of runs to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Ask a running pull to stop after the current repository
    Abort {
        /// Abort secret; prompted for when omitted
        #[arg(long)]
        secret: Option<String>,
    },
}

/// Overrides for the folders stored in the settings file.
#[derive(Debug, Clone, Default, Args)]
pub struct FolderArgs {
    /// Folder to scan instead of the configured one
    #[arg(long, value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Skip ~/Documents/GitHub
    #[arg(long)]
    pub no_default_folder: bool,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    pub fn runtime_config(&self) -> Config {
        Config {
            verbosity: self.verbosity(),
            ..Config::default()
        }
    }
}
