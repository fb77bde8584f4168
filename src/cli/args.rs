//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Nested-logit land allocation: share trees, calibration and per-period runs
#[derive(Parser, Debug)]
#[command(name = "landalloc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Config file overriding ./landalloc.toml
    #[arg(short, long, global = true, env = "LANDALLOC_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the allocation trees of a scenario
    Tree {
        /// Scenario file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Run through this period and show its values
        #[arg(short, long)]
        period: Option<usize>,
    },

    /// Calibrate, run every period up to --period and report allocations
    Run {
        /// Scenario file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Last period to run (default: last model period)
        #[arg(short, long)]
        period: Option<usize>,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Emit CSV instead of a table
        #[arg(long)]
        csv: bool,
    },

    /// Show the children shares of every node and their sum
    Shares {
        /// Scenario file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Period to show (default: 0)
        #[arg(short, long)]
        period: Option<usize>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented template
    Template,
    /// Show config file locations
    Path,
}
