//! NetVantage Registry - the plugin lifecycle engine shared by the host
//! process.
//!
//! Plugins are registered once at process start, then driven through
//! `Init` -> `Start` -> `Stop` in dependency order by [`PluginRegistry`].
//! A plugin panicking during any lifecycle phase is isolated: a required
//! plugin's panic is fatal to the whole boot, an optional plugin's panic
//! only disables that plugin and its transitive dependents.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod plugin;
mod registry;

pub use error::{RegistryError, RegistryResult};
pub use plugin::{Plugin, SubscriptionSpec};
pub use registry::PluginRegistry;
