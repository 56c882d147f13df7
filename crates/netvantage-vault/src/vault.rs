//! The vault's credential CRUD and seal/unseal state machine.

use std::sync::Arc;

use netvantage_audit::{AuditEntry, AuditLog};
use netvantage_core::{EventPublisher, PersistentStore, Timestamp};
use netvantage_crypto::{aead_decrypt, aead_encrypt, Dek, KeyManager, KeyManagerState};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::model::{CredentialKey, CredentialMetadata, CredentialRecord, CredentialType, MasterKeyRecord, VaultStatus};
use crate::{store, validation};

/// Everything the vault module needs once initialised: the key manager, the
/// namespaced store, the event bus, and the audit log.
pub struct VaultState {
    key_manager: Mutex<KeyManager>,
    store: Arc<dyn PersistentStore>,
    event_bus: Arc<dyn EventPublisher>,
    audit: Arc<AuditLog>,
}

fn state_label(state: KeyManagerState) -> &'static str {
    match state {
        KeyManagerState::Uninitialised => "uninitialised",
        KeyManagerState::Sealed => "sealed",
        KeyManagerState::Unsealed => "unsealed",
    }
}

impl VaultState {
    /// Construct a vault state, loading any existing master-key record from
    /// `store` so the key manager starts `Sealed` rather than
    /// `Uninitialised` across a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored master-key record exists but cannot be
    /// read back.
    pub async fn load(
        store: Arc<dyn PersistentStore>,
        event_bus: Arc<dyn EventPublisher>,
        audit: Arc<AuditLog>,
    ) -> VaultResult<Self> {
        let mut key_manager = KeyManager::new();
        if let Some(record) = store::get_master_key(store.as_ref()).await? {
            key_manager.initialise(netvantage_crypto::Salt(record.salt), record.verification_blob);
        }
        Ok(Self { key_manager: Mutex::new(key_manager), store, event_bus, audit })
    }

    fn require_unsealed(&self) -> VaultResult<()> {
        if self.key_manager.lock().state() == KeyManagerState::Unsealed {
            Ok(())
        } else {
            Err(VaultError::Sealed)
        }
    }

    /// Current seal state and credential count.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential list cannot be read.
    pub async fn status(&self) -> VaultResult<VaultStatus> {
        let state = self.key_manager.lock().state();
        let credentials = store::list_credentials(self.store.as_ref()).await?;
        Ok(VaultStatus { state: state_label(state).to_string(), credential_count: credentials.len() })
    }

    /// First-run setup (if uninitialised) or passphrase verification
    /// (otherwise). Empty passphrases are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Validation`] for an empty passphrase, or
    /// [`VaultError::WrongPassphrase`] if already initialised and the
    /// passphrase doesn't match.
    pub async fn unseal(&self, passphrase: &str) -> VaultResult<()> {
        if passphrase.is_empty() {
            return Err(VaultError::Validation("passphrase must not be empty".into()));
        }

        let existing = store::get_master_key(self.store.as_ref()).await?;
        if existing.is_none() {
            let (salt, blob) = {
                let mut km = self.key_manager.lock();
                km.first_run_setup(passphrase.as_bytes())?
            };
            store::put_master_key(self.store.as_ref(), &MasterKeyRecord { salt: salt.0, verification_blob: blob })
                .await?;
        } else {
            let mut km = self.key_manager.lock();
            km.unseal(passphrase.as_bytes())?;
        }

        self.event_bus.publish("vault.status.changed", "vault", serde_json::json!({"state": "unsealed"})).await;
        Ok(())
    }

    /// Zeroise and drop the in-memory KEK. Always safe to call.
    pub async fn seal(&self) {
        self.key_manager.lock().seal();
        self.event_bus.publish("vault.status.changed", "vault", serde_json::json!({"state": "sealed"})).await;
    }

    /// Create a new credential. Requires unsealed.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Sealed`] if sealed, [`VaultError::Validation`]
    /// if `name`/`data` fail validation, or a storage/crypto error.
    pub async fn create_credential(
        &self,
        name: String,
        kind: CredentialType,
        data: serde_json::Value,
        device_id: Option<String>,
        description: Option<String>,
    ) -> VaultResult<CredentialMetadata> {
        self.require_unsealed()?;
        validation::validate_name(&name)?;
        validation::validate_data(kind, &data)?;

        let plaintext = serde_json::to_vec(&data).map_err(|e| VaultError::Serialization(e.to_string()))?;
        let mut dek = Dek::generate();
        let encrypted_data = aead_encrypt(dek.as_bytes(), &plaintext)?;
        let wrapped_dek = self.key_manager.lock().wrap_dek(&dek)?;
        dek.zeroize_in_place();

        let now = Timestamp::now();
        let record = CredentialRecord {
            id: Uuid::new_v4().to_string(),
            name,
            kind,
            device_id,
            description,
            encrypted_data,
            created_at: now,
            updated_at: now,
        };

        store::put_credential(self.store.as_ref(), &record).await?;
        let key_row = CredentialKey { credential_id: record.id.clone(), wrapped_dek };
        if let Err(e) = store::put_credential_key(self.store.as_ref(), &key_row).await {
            let _ = store::delete_credential(self.store.as_ref(), &record.id).await;
            return Err(e);
        }

        self.event_bus
            .publish("vault.credential.created", "vault", serde_json::json!({"credential_id": record.id}))
            .await;
        Ok(record.without_data())
    }

    /// Fetch metadata (everything but `encrypted_data`). Works sealed.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if no such credential exists.
    pub async fn get_metadata(&self, id: &str) -> VaultResult<CredentialMetadata> {
        let record = store::get_credential(self.store.as_ref(), id).await?.ok_or_else(|| VaultError::NotFound(id.to_string()))?;
        Ok(record.without_data())
    }

    /// List every credential's metadata associated with `device_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store read fails.
    pub async fn list_by_device(&self, device_id: &str) -> VaultResult<Vec<CredentialMetadata>> {
        let all = store::list_credentials(self.store.as_ref()).await?;
        Ok(all.into_iter().filter(|r| r.device_id.as_deref() == Some(device_id)).map(|r| r.without_data()).collect())
    }

    /// List every credential's metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store read fails.
    pub async fn list_all(&self) -> VaultResult<Vec<CredentialMetadata>> {
        Ok(store::list_credentials(self.store.as_ref()).await?.into_iter().map(|r| r.without_data()).collect())
    }

    /// Decrypt and return a credential's data. Requires unsealed. Writes an
    /// audit entry under `subject_id = id` in the same call; a failure to
    /// write the audit entry is logged but does not fail the read.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Sealed`] if sealed, [`VaultError::NotFound`] if
    /// absent, or a crypto/storage error.
    pub async fn get_data(
        &self,
        id: &str,
        user_id: Option<String>,
        purpose: Option<String>,
        source_ip: Option<String>,
    ) -> VaultResult<serde_json::Value> {
        self.require_unsealed()?;
        let record = store::get_credential(self.store.as_ref(), id).await?.ok_or_else(|| VaultError::NotFound(id.to_string()))?;
        let key_row =
            store::get_credential_key(self.store.as_ref(), id).await?.ok_or_else(|| VaultError::NotFound(id.to_string()))?;

        let mut dek = self.key_manager.lock().unwrap_dek(&key_row.wrapped_dek)?;
        let plaintext = aead_decrypt(dek.as_bytes(), &record.encrypted_data)?;
        dek.zeroize_in_place();
        let data: serde_json::Value = serde_json::from_slice(&plaintext).map_err(|e| VaultError::Serialization(e.to_string()))?;

        self.audit.append_best_effort(id, user_id, "read", purpose, source_ip).await;
        Ok(data)
    }

    /// Update a credential's metadata and, optionally, its data. Metadata
    /// updates work sealed; a data update requires unsealed and reuses the
    /// existing DEK under a fresh nonce. A present-but-empty `description`
    /// clears it.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if absent, [`VaultError::Sealed`] if
    /// `data` is supplied while sealed, or a validation/crypto/storage error.
    pub async fn update_credential(
        &self,
        id: &str,
        name: Option<String>,
        description: Option<String>,
        device_id: Option<String>,
        data: Option<serde_json::Value>,
    ) -> VaultResult<CredentialMetadata> {
        let mut record = store::get_credential(self.store.as_ref(), id).await?.ok_or_else(|| VaultError::NotFound(id.to_string()))?;

        if let Some(name) = name {
            validation::validate_name(&name)?;
            record.name = name;
        }
        if let Some(description) = description {
            record.description = if description.is_empty() { None } else { Some(description) };
        }
        if let Some(device_id) = device_id {
            record.device_id = if device_id.is_empty() { None } else { Some(device_id) };
        }

        if let Some(data) = data {
            self.require_unsealed()?;
            validation::validate_data(record.kind, &data)?;
            let key_row =
                store::get_credential_key(self.store.as_ref(), id).await?.ok_or_else(|| VaultError::NotFound(id.to_string()))?;
            let mut dek = self.key_manager.lock().unwrap_dek(&key_row.wrapped_dek)?;
            let plaintext = serde_json::to_vec(&data).map_err(|e| VaultError::Serialization(e.to_string()))?;
            record.encrypted_data = aead_encrypt(dek.as_bytes(), &plaintext)?;
            dek.zeroize_in_place();
        }

        record.updated_at = Timestamp::now();
        store::put_credential(self.store.as_ref(), &record).await?;
        self.event_bus
            .publish("vault.credential.updated", "vault", serde_json::json!({"credential_id": record.id}))
            .await;
        Ok(record.without_data())
    }

    /// Delete a credential and its key row. Works sealed. Idempotent at the
    /// storage layer but returns [`VaultError::NotFound`] if the credential
    /// never existed.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if absent, or a storage error.
    pub async fn delete_credential(&self, id: &str) -> VaultResult<()> {
        if store::get_credential(self.store.as_ref(), id).await?.is_none() {
            return Err(VaultError::NotFound(id.to_string()));
        }
        store::delete_credential_key(self.store.as_ref(), id).await?;
        store::delete_credential(self.store.as_ref(), id).await?;
        self.event_bus.publish("vault.credential.deleted", "vault", serde_json::json!({"credential_id": id})).await;
        Ok(())
    }

    /// Rotate the KEK under `new_passphrase` and rewrap every credential
    /// key. If any single rewrap fails, the whole rotation aborts: no
    /// credential key and no master-key record are persisted, so the vault
    /// still unseals with the old passphrase after a restart.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Sealed`] if sealed, or
    /// [`VaultError::RotationAborted`] if any rewrap fails.
    pub async fn rotate_keys(&self, new_passphrase: &str) -> VaultResult<()> {
        self.require_unsealed()?;
        let keys = {
            let all = store::list_credentials(self.store.as_ref()).await?;
            let mut rows = Vec::with_capacity(all.len());
            for record in &all {
                if let Some(key) = store::get_credential_key(self.store.as_ref(), &record.id).await? {
                    rows.push(key);
                }
            }
            rows
        };

        let (salt, blob, rewrap) = {
            let mut km = self.key_manager.lock();
            km.rotate_kek(new_passphrase.as_bytes())?
        };

        let mut rewrapped = Vec::with_capacity(keys.len());
        for key in &keys {
            match rewrap(&key.wrapped_dek) {
                Ok(new_wrapped) => rewrapped.push(CredentialKey { credential_id: key.credential_id.clone(), wrapped_dek: new_wrapped }),
                Err(e) => {
                    return Err(VaultError::RotationAborted { credential_id: key.credential_id.clone(), reason: e.to_string() });
                },
            }
        }

        for key in &rewrapped {
            store::put_credential_key(self.store.as_ref(), key).await?;
        }
        store::put_master_key(self.store.as_ref(), &MasterKeyRecord { salt: salt.0, verification_blob: blob }).await?;
        Ok(())
    }

    /// Audit entries written under `subject_id = credential_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit log cannot be read.
    pub async fn audit_for_credential(&self, credential_id: &str) -> VaultResult<Vec<AuditEntry>> {
        self.audit.entries_for_subject(credential_id).await.map_err(|e| VaultError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use netvantage_audit::KvAuditStorage;
    use netvantage_crypto::KeyPair;
    use netvantage_events::EventBus;
    use netvantage_storage::MemoryKvStore;
    use serde_json::json;

    use super::*;

    async fn state() -> VaultState {
        let store: Arc<dyn PersistentStore> = Arc::new(netvantage_storage::ScopedKvStore::new("vault", Arc::new(MemoryKvStore::new())));
        let bus = Arc::new(EventBus::new());
        let audit = Arc::new(AuditLog::new(Arc::new(KvAuditStorage::new(Arc::new(MemoryKvStore::new()))), Arc::new(KeyPair::generate())));
        VaultState::load(store, bus, audit).await.unwrap()
    }

    #[tokio::test]
    async fn create_requires_unsealed() {
        let vault = state().await;
        let result = vault
            .create_credential("r1".into(), CredentialType::ApiKey, json!({"key": "abc"}), None, None)
            .await;
        assert!(matches!(result, Err(VaultError::Sealed)));
    }

    #[tokio::test]
    async fn create_read_round_trips_after_unseal() {
        let vault = state().await;
        vault.unseal("correct horse").await.unwrap();

        let meta = vault
            .create_credential("r1".into(), CredentialType::ApiKey, json!({"key": "abc"}), None, None)
            .await
            .unwrap();

        let data = vault.get_data(&meta.id, None, None, None).await.unwrap();
        assert_eq!(data, json!({"key": "abc"}));
        assert_eq!(vault.audit_for_credential(&meta.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unseal_wrong_passphrase_after_first_run() {
        let vault = state().await;
        vault.unseal("p1").await.unwrap();
        vault.seal().await;
        assert!(matches!(vault.unseal("p2").await, Err(VaultError::WrongPassphrase)));
    }

    #[tokio::test]
    async fn rotation_preserves_plaintext() {
        let vault = state().await;
        vault.unseal("p1").await.unwrap();
        let meta = vault
            .create_credential("r1".into(), CredentialType::ApiKey, json!({"key": "abc"}), None, None)
            .await
            .unwrap();

        vault.rotate_keys("p2").await.unwrap();
        let data = vault.get_data(&meta.id, None, None, None).await.unwrap();
        assert_eq!(data, json!({"key": "abc"}));

        vault.seal().await;
        assert!(vault.unseal("p1").await.is_err());
        assert!(vault.unseal("p2").await.is_ok());
    }

    #[tokio::test]
    async fn delete_cascades_key_row() {
        let vault = state().await;
        vault.unseal("p1").await.unwrap();
        let meta = vault
            .create_credential("r1".into(), CredentialType::ApiKey, json!({"key": "abc"}), None, None)
            .await
            .unwrap();
        vault.delete_credential(&meta.id).await.unwrap();
        assert!(matches!(vault.get_metadata(&meta.id).await, Err(VaultError::NotFound(_))));
        assert!(matches!(vault.delete_credential(&meta.id).await, Err(VaultError::NotFound(_))));
    }
}
