//! Argon2id key derivation for the vault's key-encryption key.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

const ARGON2_TIME_COST: u32 = 1;
const ARGON2_MEM_COST_KIB: u32 = 64 * 1024;
const ARGON2_PARALLELISM: u32 = 4;
const KEK_LEN: usize = 32;

/// A 16-byte random salt persisted alongside the verification blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt(pub [u8; 16]);

impl Salt {
    /// Generate a fresh random salt from the OS CSRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// A 256-bit key-encryption key, zeroized on drop.
///
/// Never serialized or logged; it only ever exists in process memory while
/// the vault is unsealed.
#[derive(ZeroizeOnDrop)]
pub struct Kek([u8; KEK_LEN]);

impl Kek {
    /// Wrap raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEK_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEK_LEN] {
        &self.0
    }

    /// Zero every byte in place. Called explicitly by `KeyManager::seal`
    /// before the reference is dropped, so the zeroization is observable
    /// independent of `Drop` ordering.
    pub fn zeroize_in_place(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for Kek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kek").finish_non_exhaustive()
    }
}

/// Derive a KEK from `passphrase` and `salt` using
/// Argon2id(time=1, memory=64MiB, parallelism=4, keylen=32).
///
/// # Errors
///
/// Returns [`CryptoError::KdfFailure`] if Argon2id itself fails (invalid
/// parameters or an allocation refusal).
pub fn derive_kek(passphrase: &[u8], salt: &Salt) -> CryptoResult<Kek> {
    let params = Params::new(ARGON2_MEM_COST_KIB, ARGON2_TIME_COST, ARGON2_PARALLELISM, Some(KEK_LEN))
        .map_err(|e| CryptoError::KdfFailure(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut out = [0u8; KEK_LEN];
    argon2
        .hash_password_into(passphrase, &salt.0, &mut out)
        .map_err(|e| CryptoError::KdfFailure(e.to_string()))?;
    Ok(Kek(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_derive_same_kek() {
        let salt = Salt::generate();
        let a = derive_kek(b"correct horse", &salt).unwrap();
        let b = derive_kek(b"correct horse", &salt).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_passphrase_derives_different_kek() {
        let salt = Salt::generate();
        let a = derive_kek(b"correct horse", &salt).unwrap();
        let b = derive_kek(b"wrong horse", &salt).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn zeroize_in_place_clears_bytes() {
        let mut kek = derive_kek(b"passphrase", &Salt::generate()).unwrap();
        kek.zeroize_in_place();
        assert_eq!(kek.as_bytes(), &[0u8; KEK_LEN]);
    }
}
