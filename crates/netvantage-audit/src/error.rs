//! Audit-related error types.

use thiserror::Error;

/// Errors that can occur while recording or querying audit history.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The underlying key-value store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An entry could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Signature verification failed for a stored entry.
    #[error("invalid signature on entry {entry_id}")]
    InvalidSignature {
        /// The entry whose signature didn't verify.
        entry_id: String,
    },

    /// An entry's `previous_hash` does not match the prior entry's content
    /// hash for the same subject.
    #[error("chain integrity violation at entry {entry_id}: {reason}")]
    IntegrityViolation {
        /// The entry where the break was detected.
        entry_id: String,
        /// Why the chain is invalid.
        reason: String,
    },

    /// Underlying crypto operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] netvantage_crypto::CryptoError),
}

/// Result alias for [`AuditError`].
pub type AuditResult<T> = Result<T, AuditError>;
