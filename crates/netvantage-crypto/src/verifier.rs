//! Signature verification against a registry of trusted public keys.

use std::collections::HashMap;

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::PublicKey;
use crate::signature::Signature;

/// Key identifier: the first 8 bytes of a public key.
pub type KeyId = [u8; 8];

/// A registry of trusted public keys for signature verification.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    trusted_keys: HashMap<KeyId, PublicKey>,
}

impl SignatureVerifier {
    /// Construct an empty verifier.
    #[must_use]
    pub fn new() -> Self {
        Self { trusted_keys: HashMap::new() }
    }

    /// Trust `key`, returning its key id.
    pub fn add_trusted_key(&mut self, key: PublicKey) -> KeyId {
        let key_id = key.key_id();
        self.trusted_keys.insert(key_id, key);
        key_id
    }

    /// Stop trusting `key_id`. Returns whether it was present.
    pub fn remove_trusted_key(&mut self, key_id: &KeyId) -> bool {
        self.trusted_keys.remove(key_id).is_some()
    }

    /// Whether `key_id` is currently trusted.
    #[must_use]
    pub fn is_trusted(&self, key_id: &KeyId) -> bool {
        self.trusted_keys.contains_key(key_id)
    }

    /// Verify a signature against a specific trusted key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if `key_id` is not
    /// trusted, or [`CryptoError::SignatureVerificationFailed`] on
    /// mismatch.
    pub fn verify(&self, key_id: &KeyId, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        let key = self
            .trusted_keys
            .get(key_id)
            .ok_or_else(|| CryptoError::InvalidPublicKey(format!("key {key_id:?} not trusted")))?;
        key.verify(message, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn trust_then_verify() {
        let keypair = KeyPair::generate();
        let mut verifier = SignatureVerifier::new();
        let key_id = verifier.add_trusted_key(keypair.export_public_key());

        let message = b"test message";
        let sig = keypair.sign(message);
        assert!(verifier.verify(&key_id, message, &sig).is_ok());
        assert!(verifier.verify(&key_id, b"other", &sig).is_err());
    }

    #[test]
    fn untrusted_key_rejected() {
        let keypair = KeyPair::generate();
        let verifier = SignatureVerifier::new();
        let sig = keypair.sign(b"data");
        assert!(verifier.verify(&keypair.export_public_key().key_id(), b"data", &sig).is_err());
    }

    #[test]
    fn remove_is_idempotent_false_on_second_call() {
        let keypair = KeyPair::generate();
        let mut verifier = SignatureVerifier::new();
        let key_id = verifier.add_trusted_key(keypair.export_public_key());
        assert!(verifier.remove_trusted_key(&key_id));
        assert!(!verifier.remove_trusted_key(&key_id));
    }
}
