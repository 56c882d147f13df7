//! NetVantage Gateway - remote-access session gateway module.
//!
//! This crate provides:
//! - [`SessionManager`] / [`ReverseProxyManager`] — the bounded concurrent
//!   session map and the reverse-proxy target registry backing it
//! - [`ssh_bridge::run`] — the WebSocket-to-SSH bridge mounted by the host
//!   at `/ws/gateway/ssh/:device_id`
//! - [`GatewayPlugin`] — the `Plugin` implementation wiring all of the above
//!   into the fabric's lifecycle and advertising `remote_access` capacity
//! - [`routes::router`] — the axum HTTP surface mounted under `/api/v1/gateway`

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod maintenance;
mod model;
mod plugin;
mod proxy;
pub mod routes;
mod session;
mod ssh_bridge;
mod state;

pub use error::{GatewayError, GatewayResult};
pub use model::{GatewayStatus, Session, SessionKind, SessionSnapshot, Target};
pub use plugin::{GatewayPlugin, REMOTE_ACCESS_ROLE};
pub use proxy::ReverseProxyManager;
pub use session::SessionManager;
pub use ssh_bridge::upgrade as ssh_bridge_upgrade;
pub use state::{GatewayConfig, GatewayState};
