//! Plugin metadata and lifecycle state.
//!
//! [`PluginInfo`] is the static declaration a module makes when it is handed
//! to the registry at process start; [`PluginState`] is the mutable
//! lifecycle state the registry tracks for each registered entry.

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Lowest `api_version` the registry accepts.
pub const API_VERSION_MIN: ApiVersion = ApiVersion(1);

/// Highest `api_version` the registry accepts.
pub const API_VERSION_CURRENT: ApiVersion = ApiVersion(1);

/// The small integer contract version a plugin negotiates with the host.
///
/// Distinct from [`Version`] (the plugin's own semantic package version):
/// `ApiVersion` is the registry's compatibility gate, bumped only when the
/// `Plugin` trait or `Dependencies` shape changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiVersion(pub u32);

impl ApiVersion {
    /// Whether this version falls within `[MIN, CURRENT]`.
    #[must_use]
    pub fn is_supported(self) -> bool {
        (API_VERSION_MIN..=API_VERSION_CURRENT).contains(&self)
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static metadata a module declares when composed into the host process.
///
/// `name` must be unique across the set handed to the registry;
/// `dependencies` names other plugins (by `name`) that must be `Started`
/// before this one; `roles` are the tags other plugins use to resolve this
/// one by capability rather than by name (see [`crate::dependencies::PluginResolver`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Unique plugin name, also the `plugins.<name>` config scope segment.
    pub name: String,
    /// The plugin's own semantic package version.
    pub version: Version,
    /// Contract version negotiated with the registry.
    pub api_version: ApiVersion,
    /// If true, any fatal validation problem (missing dependency, rejected
    /// `api_version`) propagates as a fatal `validate()` error instead of
    /// disabling this plugin.
    pub required: bool,
    /// Names of other plugins that must initialise and start before this one.
    pub dependencies: Vec<String>,
    /// Role tags under which other plugins may resolve this one.
    pub roles: Vec<String>,
}

impl PluginInfo {
    /// Construct plugin metadata with no dependencies or roles.
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version, required: bool) -> Self {
        Self {
            name: name.into(),
            version,
            api_version: API_VERSION_CURRENT,
            required,
            dependencies: Vec::new(),
            roles: Vec::new(),
        }
    }

    /// Builder method: add a dependency by name.
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Builder method: advertise a role tag.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Builder method: override the negotiated `api_version`.
    #[must_use]
    pub const fn with_api_version(mut self, v: ApiVersion) -> Self {
        self.api_version = v;
        self
    }
}

/// Lifecycle state the registry tracks for a registered plugin.
///
/// Transitions: `Registered -> Initialised -> Started -> Stopped`, or
/// `Registered -> Disabled` at any point before `Started` (cascade-disable,
/// unsupported `api_version`, missing optional dependency, or a panic in an
/// optional plugin's lifecycle call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginState {
    /// Registered but not yet validated/initialised.
    Registered,
    /// `Init` completed successfully.
    Initialised,
    /// `Start` completed successfully; serving traffic.
    Started,
    /// `Stop` completed (normally, during shutdown).
    Stopped,
    /// Excluded from the lifecycle walk, with a reason.
    Disabled {
        /// Why this plugin was disabled.
        reason: String,
    },
}

impl PluginState {
    /// Whether this state participates in lifecycle traversal.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Disabled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_bounds() {
        assert!(API_VERSION_MIN.is_supported());
        assert!(API_VERSION_CURRENT.is_supported());
        assert!(!ApiVersion(0).is_supported());
        assert!(!ApiVersion(999).is_supported());
    }

    #[test]
    fn builder_accumulates() {
        let info = PluginInfo::new("gateway", Version::new(0, 1, 0), true)
            .depends_on("vault")
            .with_role("remote_access");
        assert_eq!(info.dependencies, vec!["vault".to_string()]);
        assert_eq!(info.roles, vec!["remote_access".to_string()]);
    }

    #[test]
    fn disabled_is_not_active() {
        let s = PluginState::Disabled {
            reason: "missing dependency".into(),
        };
        assert!(!s.is_active());
        assert!(PluginState::Started.is_active());
    }
}
