//! Commonly used types for convenient import.
//!
//! `use netvantage_crypto::prelude::*;` pulls in the types a module
//! implementing credential storage or audit signing typically needs.

pub use crate::{
    aead_decrypt, aead_encrypt, derive_kek, ContentHash, CryptoError, CryptoResult, Dek, Kek,
    KeyId, KeyManager, KeyManagerState, KeyPair, PublicKey, RewrapFn, Salt, Signature,
    SignatureVerifier,
};
