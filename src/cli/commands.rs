//! CLI command implementations
//!
//! `serve` loads configuration, seeds the school directory, builds the
//! tokio runtime and runs the HTTP server. `check-config` validates a
//! configuration file without booting anything.

use std::path::Path;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::http::LedgerServer;
use crate::observability::Logger;
use crate::scope::StaticDirectory;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Parse arguments and dispatch.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Dispatch a parsed command.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve { config, port } => serve(&config, port),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Load configuration from a JSON file.
///
/// A missing file yields the defaults, so a bare `serve` boots a working
/// development instance. A present but unparseable file is fatal.
fn load_config(path: &Path) -> CliResult<ServiceConfig> {
    if !path.exists() {
        Logger::warn(
            "CONFIG_DEFAULTED",
            &[("path", &path.display().to_string())],
        );
        return Ok(ServiceConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| CliError::config_error(format!("cannot parse {}: {}", path.display(), e)))
}

/// Start the ledger server.
fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }

    let directory = Arc::new(StaticDirectory::from_map(&config.districts));
    let server = LedgerServer::new(config, directory);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Validate a configuration file and print a summary.
fn check_config(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;

    let school_count: usize = config.districts.values().map(|schools| schools.len()).sum();
    println!("listen        {}", config.socket_addr());
    println!("delete_policy {:?}", config.delete_policy);
    println!("districts     {}", config.districts.len());
    println!("schools       {}", school_count);
    Ok(())
}
