//! NetVantage Core - foundation types shared by every fabric crate and module.
//!
//! This crate provides:
//! - The [`Timestamp`] and [`Version`] primitives used throughout the fabric
//! - [`PluginInfo`] / [`ApiVersion`] — the metadata a module declares at registration
//! - [`Dependencies`] — the scoped bundle of shared services handed to a module on `Init`
//! - Capability contracts (device lookup, token validation, credential provisioning,
//!   health reporting, HTTP route publication) declared where they are *consumed*,
//!   per the plugin resolver's role-based lookup model
//! - [`Problem`] — the problem+json error envelope every HTTP surface returns

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod capability;
pub mod dependencies;
pub mod error;
pub mod plugin;
pub mod prelude;
pub mod problem;
pub mod timestamp;
pub mod version;

pub use capability::{
    CredentialProvider, DeviceLookup, DeviceRecord, EventSubscriber, HealthCheck, HealthProvider,
    HealthState, HttpRouteProvider, RemoteAccessProvider, RouteDescriptor, RouteMethod, TokenValidator,
};
pub use dependencies::{ConfigScope, Dependencies, EventPublisher, PersistentStore, PluginResolver};
pub use error::{CoreError, CoreResult};
pub use plugin::{ApiVersion, PluginInfo, PluginState, API_VERSION_CURRENT, API_VERSION_MIN};
pub use problem::Problem;
pub use timestamp::Timestamp;
pub use version::{Version, VersionParseError, Versioned};
