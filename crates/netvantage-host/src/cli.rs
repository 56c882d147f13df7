//! Command-line arguments for the host process.

use std::path::PathBuf;

use clap::Parser;

/// NetVantage host process - composes the vault and gateway modules into
/// the plugin fabric and serves their combined HTTP/WebSocket surface.
#[derive(Debug, Parser)]
#[command(name = "netvantaged", version, about)]
pub struct Args {
    /// Path to the TOML config file. Defaults to `<platform config
    /// dir>/config.toml`, created with defaults if absent.
    #[arg(long, env = "NETVANTAGE_CONFIG")]
    pub config: Option<PathBuf>,
}
