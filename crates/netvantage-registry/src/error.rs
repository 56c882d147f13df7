//! Registry error types.

use thiserror::Error;

/// Errors raised while registering or running the plugin lifecycle.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `register` was called with an empty plugin name.
    #[error("plugin name must not be empty")]
    EmptyName,

    /// Two plugins were registered under the same name.
    #[error("duplicate plugin name: {0}")]
    DuplicateName(String),

    /// `validate` was called more than once.
    #[error("registry already validated")]
    AlreadyValidated,

    /// A lifecycle method was called before `validate`.
    #[error("registry has not been validated")]
    NotValidated,

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected among: {}", .0.join(", "))]
    CycleDetected(Vec<String>),

    /// A required plugin depends on a name that was never registered.
    #[error("plugin '{name}' has a missing required dependency: '{dependency}'")]
    MissingDependency {
        /// The plugin with the unmet dependency.
        name: String,
        /// The dependency that was never registered.
        dependency: String,
    },

    /// A required plugin declared an `api_version` outside
    /// `[API_VERSION_MIN, API_VERSION_CURRENT]`.
    #[error("plugin '{name}' declares unsupported api_version {version}")]
    UnsupportedApiVersion {
        /// The offending plugin.
        name: String,
        /// The declared version.
        version: u32,
    },

    /// A plugin's `Init`, `Start`, or `Stop` panicked.
    #[error("{name} panicked: {message}")]
    Panicked {
        /// The plugin that panicked.
        name: String,
        /// The panic payload, stringified.
        message: String,
    },

    /// A plugin's lifecycle call returned an error.
    #[error("plugin '{name}' failed during {phase}: {reason}")]
    LifecycleFailed {
        /// The plugin that failed.
        name: String,
        /// Which lifecycle phase (`"init"`, `"start"`, `"stop"`).
        phase: &'static str,
        /// The error the plugin returned.
        reason: String,
    },

    /// No plugin registered under the requested name.
    #[error("no plugin registered under name: {0}")]
    NotFound(String),
}

/// Result alias for [`RegistryError`].
pub type RegistryResult<T> = Result<T, RegistryError>;
