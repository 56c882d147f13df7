//! The vault's key-encryption-key state machine.
//!
//! States: `Uninitialised -> Initialised(sealed) <-> Unsealed`. The manager
//! itself holds no lock — the vault module wraps it in a reader-writer lock
//! alongside the rest of its state, since unseal/seal/rotate are rare
//! writes against a read-heavy `wrap_dek`/`unwrap_dek` workload.

use crate::envelope::{aead_decrypt, aead_encrypt, unwrap_dek, wrap_dek, Dek};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_kek, Kek, Salt};

/// Domain-separated known plaintext sealed inside the verification blob.
/// Changing this invalidates every previously-initialised vault.
const MAGIC: &[u8] = b"netvantage-vault-v1";

/// The key manager's current lifecycle state, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyManagerState {
    /// No master-key material has been loaded or created yet.
    Uninitialised,
    /// Master-key material exists on disk but the KEK is not in memory.
    Sealed,
    /// The KEK is resident in memory; wrap/unwrap operations succeed.
    Unsealed,
}

/// A closure that rewraps one DEK under the new KEK established by
/// [`KeyManager::rotate_kek`], given its old wrapped bytes.
///
/// The caller must invoke this once per `CredentialKey` row and persist the
/// result before considering the rotation complete; the new KEK is already
/// active in the manager the moment `rotate_kek` returns.
pub type RewrapFn = Box<dyn Fn(&[u8]) -> CryptoResult<Vec<u8>> + Send + Sync>;

/// Manages the vault's master key-encryption key.
pub struct KeyManager {
    salt: Option<Salt>,
    verification_blob: Option<Vec<u8>>,
    kek: Option<Kek>,
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyManager {
    /// Construct an uninitialised key manager.
    #[must_use]
    pub const fn new() -> Self {
        Self { salt: None, verification_blob: None, kek: None }
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> KeyManagerState {
        if self.salt.is_none() {
            KeyManagerState::Uninitialised
        } else if self.kek.is_some() {
            KeyManagerState::Unsealed
        } else {
            KeyManagerState::Sealed
        }
    }

    /// Load previously-persisted master-key material. Stays sealed.
    ///
    /// Called once at host startup with the `MasterKeyRecord` read from
    /// storage, before any `unseal` call.
    pub fn initialise(&mut self, salt: Salt, verification_blob: Vec<u8>) {
        self.salt = Some(salt);
        self.verification_blob = Some(verification_blob);
        self.kek = None;
    }

    /// Perform first-run setup: derive a KEK from `passphrase`, generate a
    /// fresh salt, and seal a verification blob. Transitions to unsealed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::AlreadyInitialised`] if master-key material
    /// already exists.
    pub fn first_run_setup(&mut self, passphrase: &[u8]) -> CryptoResult<(Salt, Vec<u8>)> {
        if self.salt.is_some() {
            return Err(CryptoError::AlreadyInitialised);
        }
        let salt = Salt::generate();
        let kek = derive_kek(passphrase, &salt)?;
        let verification_blob = aead_encrypt(kek.as_bytes(), MAGIC)?;
        self.salt = Some(salt);
        self.verification_blob = Some(verification_blob.clone());
        self.kek = Some(kek);
        Ok((salt, verification_blob))
    }

    /// Derive a candidate KEK from `passphrase` and unseal if it matches the
    /// stored verification blob. Idempotent when already unsealed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NotInitialised`] if no master-key material has
    /// been loaded, or [`CryptoError::WrongPassphrase`] on mismatch (the
    /// candidate KEK is dropped and zeroized).
    pub fn unseal(&mut self, passphrase: &[u8]) -> CryptoResult<()> {
        if self.kek.is_some() {
            return Ok(());
        }
        let salt = self.salt.ok_or(CryptoError::NotInitialised)?;
        let blob = self.verification_blob.as_ref().ok_or(CryptoError::NotInitialised)?;
        let candidate = derive_kek(passphrase, &salt)?;
        match aead_decrypt(candidate.as_bytes(), blob) {
            Ok(plaintext) if plaintext == MAGIC => {
                self.kek = Some(candidate);
                Ok(())
            },
            _ => Err(CryptoError::WrongPassphrase),
        }
    }

    /// Zeroise the KEK in place and clear it from memory.
    pub fn seal(&mut self) {
        if let Some(mut kek) = self.kek.take() {
            kek.zeroize_in_place();
        }
    }

    /// Wrap a DEK under the resident KEK.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Sealed`] if the manager is sealed.
    pub fn wrap_dek(&self, dek: &Dek) -> CryptoResult<Vec<u8>> {
        let kek = self.kek.as_ref().ok_or(CryptoError::Sealed)?;
        wrap_dek(kek, dek)
    }

    /// Unwrap a DEK under the resident KEK.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Sealed`] if the manager is sealed.
    pub fn unwrap_dek(&self, wrapped: &[u8]) -> CryptoResult<Dek> {
        let kek = self.kek.as_ref().ok_or(CryptoError::Sealed)?;
        unwrap_dek(kek, wrapped)
    }

    /// Rotate the KEK: derive a new one from `new_passphrase`, make it the
    /// active KEK, and return a rewrap closure over the old one.
    ///
    /// The caller must walk every `CredentialKey`, rewrap it through the
    /// returned closure, and persist the result alongside the new
    /// `(salt, verification_blob)` pair — only then is the rotation
    /// considered durable. If the caller aborts partway, the new
    /// `(salt, verification_blob)` returned here must not be persisted, so
    /// that a restart still unseals with the old passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Sealed`] if the manager is sealed (rotation
    /// needs the old KEK to build the rewrap closure).
    pub fn rotate_kek(&mut self, new_passphrase: &[u8]) -> CryptoResult<(Salt, Vec<u8>, RewrapFn)> {
        let old_kek = self.kek.take().ok_or(CryptoError::Sealed)?;
        let new_salt = Salt::generate();
        let new_kek = derive_kek(new_passphrase, &new_salt)?;
        let verification_blob = aead_encrypt(new_kek.as_bytes(), MAGIC)?;
        let new_kek_bytes = *new_kek.as_bytes();

        self.salt = Some(new_salt);
        self.verification_blob = Some(verification_blob.clone());
        self.kek = Some(new_kek);

        let rewrap: RewrapFn = Box::new(move |wrapped: &[u8]| -> CryptoResult<Vec<u8>> {
            let dek = unwrap_dek(&old_kek, wrapped)?;
            wrap_dek(&Kek::from_bytes(new_kek_bytes), &dek)
        });

        Ok((new_salt, verification_blob, rewrap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_then_unseal_same_passphrase() {
        let mut km = KeyManager::new();
        assert_eq!(km.state(), KeyManagerState::Uninitialised);
        km.first_run_setup(b"p1").unwrap();
        assert_eq!(km.state(), KeyManagerState::Unsealed);
        km.seal();
        assert_eq!(km.state(), KeyManagerState::Sealed);
        km.unseal(b"p1").unwrap();
        assert_eq!(km.state(), KeyManagerState::Unsealed);
    }

    #[test]
    fn unseal_wrong_passphrase_leaves_sealed() {
        let mut km = KeyManager::new();
        km.first_run_setup(b"p1").unwrap();
        km.seal();
        let result = km.unseal(b"p2");
        assert!(matches!(result, Err(CryptoError::WrongPassphrase)));
        assert_eq!(km.state(), KeyManagerState::Sealed);
    }

    #[test]
    fn unseal_is_idempotent() {
        let mut km = KeyManager::new();
        km.first_run_setup(b"p1").unwrap();
        assert!(km.unseal(b"p1").is_ok());
        assert_eq!(km.state(), KeyManagerState::Unsealed);
    }

    #[test]
    fn second_first_run_setup_rejected() {
        let mut km = KeyManager::new();
        km.first_run_setup(b"p1").unwrap();
        assert!(matches!(km.first_run_setup(b"p2"), Err(CryptoError::AlreadyInitialised)));
    }

    #[test]
    fn wrap_unwrap_require_unsealed() {
        let mut km = KeyManager::new();
        km.first_run_setup(b"p1").unwrap();
        let dek = Dek::generate();
        let wrapped = km.wrap_dek(&dek).unwrap();
        km.seal();
        assert!(matches!(km.wrap_dek(&dek), Err(CryptoError::Sealed)));
        assert!(matches!(km.unwrap_dek(&wrapped), Err(CryptoError::Sealed)));
    }

    #[test]
    fn rotation_rewraps_to_same_plaintext_dek() {
        let mut km = KeyManager::new();
        km.first_run_setup(b"p1").unwrap();
        let dek = Dek::generate();
        let wrapped_old = km.wrap_dek(&dek).unwrap();

        let (_, _, rewrap) = km.rotate_kek(b"p2").unwrap();
        let wrapped_new = rewrap(&wrapped_old).unwrap();

        let unwrapped = km.unwrap_dek(&wrapped_new).unwrap();
        assert_eq!(unwrapped.as_bytes(), dek.as_bytes());

        km.seal();
        assert!(km.unseal(b"p1").is_err());
        assert!(km.unseal(b"p2").is_ok());
    }
}
