//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or accessing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A requested key is absent and no default was supplied.
    #[error("missing config key: {0}")]
    MissingKey(String),

    /// A value exists but does not match the requested type.
    #[error("config value at {key} does not match expected shape: {reason}")]
    Shape {
        /// Dotted key path.
        key: String,
        /// Deserialization failure reason.
        reason: String,
    },
}

/// Result alias for [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
