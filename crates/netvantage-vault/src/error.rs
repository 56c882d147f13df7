//! Vault error types and their HTTP problem+json mapping.

use netvantage_core::Problem;
use thiserror::Error;

/// Errors raised by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The operation requires an unsealed vault.
    #[error("vault is sealed")]
    Sealed,

    /// `unseal` was attempted with a passphrase that doesn't match.
    #[error("wrong passphrase")]
    WrongPassphrase,

    /// Credential input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No credential (or key row) exists under the requested id.
    #[error("credential not found: {0}")]
    NotFound(String),

    /// A lower-level crypto operation failed.
    #[error(transparent)]
    Crypto(#[from] netvantage_crypto::CryptoError),

    /// The persistent store rejected a read or write.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON (de)serialization of stored or request data failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A single credential-key rewrap failed during key rotation; the
    /// rotation is aborted and the old KEK remains authoritative.
    #[error("key rotation aborted: failed to rewrap credential {credential_id}: {reason}")]
    RotationAborted {
        /// The credential whose rewrap failed.
        credential_id: String,
        /// Why the rewrap failed.
        reason: String,
    },
}

impl VaultError {
    /// Map to the RFC 7807 problem body every vault route returns on error.
    #[must_use]
    pub fn to_problem(&self) -> Problem {
        match self {
            Self::Sealed => Problem::unavailable("vault/sealed", self.to_string()),
            Self::WrongPassphrase => Problem::bad_request("vault/wrong_passphrase", self.to_string()),
            Self::Validation(_) => Problem::bad_request("vault/validation_failed", self.to_string()),
            Self::NotFound(_) => Problem::not_found("vault/credential_not_found", self.to_string()),
            Self::Crypto(_) | Self::Storage(_) | Self::Serialization(_) | Self::RotationAborted { .. } => {
                Problem::internal(self.to_string())
            },
        }
    }
}

/// Result alias for [`VaultError`].
pub type VaultResult<T> = Result<T, VaultError>;
