//! CLI module
//!
//! Provides the command-line interface:
//! - serve: boot the ledger HTTP server
//! - check-config: validate a configuration file

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{run, run_command};
pub use errors::{CliError, CliResult};
