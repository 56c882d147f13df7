//! Gateway error types and their HTTP problem+json mapping.

use netvantage_core::Problem;
use thiserror::Error;

/// Errors raised by gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The bearer token did not validate, or carried no usable identity.
    #[error("authentication failed: {0}")]
    Unauthenticated(String),

    /// The caller's token validated but lacks the scope for this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No session exists under the requested id.
    #[error("session not found: {0}")]
    NotFound(String),

    /// The requested device is unknown to the fabric.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The session exists but has already expired and been reaped.
    #[error("session expired: {0}")]
    Expired(String),

    /// The gateway is at its configured concurrent-session capacity.
    #[error("gateway at capacity")]
    AtCapacity,

    /// Dialing or operating the upstream SSH/HTTP target failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// A capability call into another module failed.
    #[error("capability error: {0}")]
    Capability(#[from] netvantage_core::CoreError),

    /// The persistent store rejected a read or write.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON (de)serialization of stored or request data failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// Map to the RFC 7807 problem body every gateway route returns on error.
    #[must_use]
    pub fn to_problem(&self) -> Problem {
        match self {
            Self::Validation(_) => Problem::bad_request("gateway/validation_failed", self.to_string()),
            Self::Unauthenticated(_) => Problem::unauthorized(self.to_string()),
            Self::Forbidden(_) => Problem::forbidden(self.to_string()),
            Self::NotFound(_) => Problem::not_found("gateway/session_not_found", self.to_string()),
            Self::DeviceNotFound(_) => Problem::not_found("gateway/device_not_found", self.to_string()),
            Self::Expired(_) => Problem::gone("gateway/session_expired", self.to_string()),
            Self::AtCapacity => Problem::unavailable("gateway/at_capacity", self.to_string()),
            Self::Upstream(_) => Problem::new("gateway/upstream_failure", "Bad Gateway", 502, self.to_string()),
            Self::Capability(_) | Self::Storage(_) | Self::Serialization(_) => Problem::internal(self.to_string()),
        }
    }
}

/// Result alias for [`GatewayError`].
pub type GatewayResult<T> = Result<T, GatewayError>;
