//! NetVantage host process - composes the vault and gateway modules into
//! the plugin fabric and serves their combined HTTP/WebSocket surface.
//!
//! [`cli::Args`] is the process entry point's command-line surface;
//! [`boot::run`] does the actual work: load config, register modules with
//! the [`netvantage_registry::PluginRegistry`], run `validate` / `init_all`
//! / `start_all`, serve [`router::build`]'s axum app until
//! [`shutdown::signal`] resolves, then `stop_all` in reverse order.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod boot;
pub mod cli;

mod config;
mod router;
mod shutdown;

pub use boot::run;
pub use cli::Args;
