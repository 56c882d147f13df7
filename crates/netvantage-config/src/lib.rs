//! Configuration loading and per-plugin scoping for the plugin fabric.
//!
//! The host reads a single TOML file on startup: host-wide settings
//! under `[host]`, and one `[plugins.<name>]` sub-table per module.
//! [`ConfigStore`] owns the parsed value and can be watched for
//! changes; [`PluginConfigScope`] hands each plugin a view scoped to
//! its own sub-table, implementing [`netvantage_core::ConfigScope`].

pub mod prelude;

mod error;
mod loader;
mod scope;
mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config_dir, load_file, ConfigStore};
pub use scope::PluginConfigScope;
pub use types::{Config, HostConfig};
