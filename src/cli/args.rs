//! CLI argument definitions using clap
//!
//! Commands:
//! - school-ledger serve --config <path> [--port <port>]
//! - school-ledger check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// school-ledger - budget allocation and usage ledger for school districts
#[derive(Parser, Debug)]
#[command(name = "school-ledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the ledger HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./school-ledger.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate a configuration file and print a summary
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./school-ledger.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
