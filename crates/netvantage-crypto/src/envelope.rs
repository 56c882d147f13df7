//! AES-256-GCM envelope encryption primitives shared by DEK wrapping
//! (vault credential data) and KEK wrapping (DEK storage).
//!
//! Every ciphertext produced here has the shape `nonce(12) ‖ AEAD(...)`, per
//! the data model's `encrypted_data` and `wrapped_dek` definitions.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::Kek;

const NONCE_LEN: usize = 12;
const DEK_LEN: usize = 32;

/// A 256-bit per-credential data-encryption key, zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct Dek([u8; DEK_LEN]);

impl Dek {
    /// Generate a fresh random DEK from the OS CSRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; DEK_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DEK_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DEK_LEN] {
        &self.0
    }

    /// Zero every byte in place, independent of `Drop` timing.
    pub fn zeroize_in_place(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for Dek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dek").finish_non_exhaustive()
    }
}

/// Encrypt `plaintext` under `key` (a raw 32-byte AES-256 key), producing
/// `nonce(12) ‖ ciphertext‖tag`.
///
/// # Errors
///
/// Returns [`CryptoError::AeadFailure`] if encryption fails.
pub fn aead_encrypt(key: &[u8; 32], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::AeadFailure(e.to_string()))?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt `nonce(12) ‖ ciphertext‖tag` under `key`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidCiphertext`] if `blob` is shorter than a
/// nonce, or [`CryptoError::AeadFailure`] on authentication failure.
pub fn aead_decrypt(key: &[u8; 32], blob: &[u8]) -> CryptoResult<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return Err(CryptoError::InvalidCiphertext);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher.decrypt(nonce, ciphertext).map_err(|e| CryptoError::AeadFailure(e.to_string()))
}

/// Wrap a DEK under a KEK: `nonce(12) ‖ AEAD(KEK, DEK)`.
///
/// # Errors
///
/// Returns [`CryptoError::AeadFailure`] on encryption failure.
pub(crate) fn wrap_dek(kek: &Kek, dek: &Dek) -> CryptoResult<Vec<u8>> {
    aead_encrypt(kek.as_bytes(), dek.as_bytes())
}

/// Unwrap a wrapped DEK under a KEK.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyLength`] if the decrypted payload isn't
/// 32 bytes, or [`CryptoError::AeadFailure`]/[`CryptoError::InvalidCiphertext`]
/// from the underlying AEAD call.
pub(crate) fn unwrap_dek(kek: &Kek, wrapped: &[u8]) -> CryptoResult<Dek> {
    let plaintext = aead_decrypt(kek.as_bytes(), wrapped)?;
    if plaintext.len() != DEK_LEN {
        return Err(CryptoError::InvalidKeyLength { expected: DEK_LEN, actual: plaintext.len() });
    }
    let mut bytes = [0u8; DEK_LEN];
    bytes.copy_from_slice(&plaintext);
    Ok(Dek::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::{derive_kek, Salt};

    #[test]
    fn encrypt_decrypt_roundtrips_with_fresh_nonce_each_time() {
        let key = [7u8; 32];
        let a = aead_encrypt(&key, b"hello").unwrap();
        let b = aead_encrypt(&key, b"hello").unwrap();
        assert_ne!(a, b, "nonces must differ between calls");
        assert_eq!(aead_decrypt(&key, &a).unwrap(), b"hello");
        assert_eq!(aead_decrypt(&key, &b).unwrap(), b"hello");
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let key = [7u8; 32];
        let mut blob = aead_encrypt(&key, b"hello").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(aead_decrypt(&key, &blob).is_err());
    }

    #[test]
    fn decrypt_rejects_short_blob() {
        let key = [7u8; 32];
        assert!(matches!(aead_decrypt(&key, &[0u8; 4]), Err(CryptoError::InvalidCiphertext)));
    }

    #[test]
    fn wrap_unwrap_dek_roundtrips() {
        let kek = derive_kek(b"passphrase", &Salt::generate()).unwrap();
        let dek = Dek::generate();
        let wrapped = wrap_dek(&kek, &dek).unwrap();
        let unwrapped = unwrap_dek(&kek, &wrapped).unwrap();
        assert_eq!(dek.as_bytes(), unwrapped.as_bytes());
    }
}
