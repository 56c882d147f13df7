//! Cryptographic error types.

use thiserror::Error;

/// Errors raised by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Wrong key length for the operation.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Wrong signature length for the operation.
    #[error("invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// A public key failed to parse.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// An I/O failure while reading or writing key material.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Argon2id key derivation failed (e.g. memory allocation refused).
    #[error("key derivation failed: {0}")]
    KdfFailure(String),

    /// AES-256-GCM encryption or decryption failed (includes tag mismatch).
    #[error("AEAD operation failed: {0}")]
    AeadFailure(String),

    /// Ciphertext shorter than the minimum nonce-plus-tag length.
    #[error("ciphertext too short to contain a nonce and tag")]
    InvalidCiphertext,

    /// A KEK-bound operation was attempted while the vault is sealed.
    #[error("vault is sealed")]
    Sealed,

    /// `unseal` was called with a passphrase that doesn't match the stored
    /// verification blob.
    #[error("wrong passphrase")]
    WrongPassphrase,

    /// `first_run_setup` was called on an already-initialised key manager.
    #[error("key manager is already initialised")]
    AlreadyInitialised,

    /// A KEK-bound operation was attempted before `initialise` or
    /// `first_run_setup` ran.
    #[error("key manager is not initialised")]
    NotInitialised,
}

/// Result alias for [`CryptoError`].
pub type CryptoResult<T> = Result<T, CryptoError>;
