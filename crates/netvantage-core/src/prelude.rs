//! Convenience re-exports for crates implementing a module against the
//! fabric. `use netvantage_core::prelude::*;` pulls in the types a typical
//! `Plugin` impl needs.

pub use crate::capability::{
    CredentialPayload, CredentialProvider, DeviceLookup, DeviceRecord, EventSubscriber,
    HealthCheck, HealthProvider, HealthState, HttpRouteProvider, RouteDescriptor, RouteMethod,
    TokenIdentity, TokenValidator,
};
pub use crate::dependencies::{ConfigScope, Dependencies, EventPublisher, PersistentStore, PluginResolver};
pub use crate::error::{CoreError, CoreResult};
pub use crate::plugin::{ApiVersion, PluginInfo, PluginState};
pub use crate::problem::Problem;
pub use crate::timestamp::Timestamp;
pub use crate::version::{Version, Versioned};
