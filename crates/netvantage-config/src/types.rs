//! Top-level configuration shape.

use serde::{Deserialize, Serialize};

/// Host-wide settings that aren't owned by any single plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// TCP port the HTTP gateway listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log level passed to the tracing env-filter.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { port: default_port(), log_level: default_log_level() }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// The whole config file: host settings plus one `plugins.<name>`
/// sub-table per module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Host-wide settings.
    #[serde(default)]
    pub host: HostConfig,
    /// Per-plugin config sub-trees, keyed by plugin name.
    #[serde(default)]
    pub plugins: toml::value::Table,
}
