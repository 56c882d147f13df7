//! Shared error vocabulary for the plugin fabric.
//!
//! Individual crates (vault, gateway, registry) define their own richer
//! error enums; [`CoreError`] is what crosses crate boundaries through the
//! capability contracts in [`crate::capability`].

use thiserror::Error;

/// Errors raised by fabric-level operations (capability lookup, dependency
/// wiring) that aren't owned by any single module.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No plugin registered for the requested role.
    #[error("no plugin resolves role: {role}")]
    NoPluginForRole {
        /// The role that had no resolver.
        role: String,
    },

    /// A capability call failed on the resolved plugin's side.
    #[error("capability '{capability}' failed: {reason}")]
    CapabilityFailed {
        /// The capability that was invoked (e.g. `"device_lookup"`).
        capability: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A config scope lookup found no value and no default was supplied.
    #[error("missing config key: {0}")]
    MissingConfig(String),

    /// Serialization/deserialization of a config or stored value failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
