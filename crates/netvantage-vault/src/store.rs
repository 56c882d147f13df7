//! Persistence helpers over a module's namespaced [`PersistentStore`].

use netvantage_core::PersistentStore;

use crate::error::{VaultError, VaultResult};
use crate::model::{CredentialKey, CredentialRecord, MasterKeyRecord};

const CREDENTIAL_PREFIX: &str = "credentials/";
const KEY_PREFIX: &str = "credential_keys/";
const MASTER_KEY_KEY: &str = "master_key";

fn to_storage_err(e: netvantage_core::CoreError) -> VaultError {
    VaultError::Storage(e.to_string())
}

fn credential_key(id: &str) -> String {
    format!("{CREDENTIAL_PREFIX}{id}")
}

fn key_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Fetch a credential record by id.
pub(crate) async fn get_credential(store: &dyn PersistentStore, id: &str) -> VaultResult<Option<CredentialRecord>> {
    let Some(bytes) = store.get(&credential_key(id)).await.map_err(to_storage_err)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes).map(Some).map_err(|e| VaultError::Serialization(e.to_string()))
}

/// Persist a credential record.
pub(crate) async fn put_credential(store: &dyn PersistentStore, record: &CredentialRecord) -> VaultResult<()> {
    let bytes = serde_json::to_vec(record).map_err(|e| VaultError::Serialization(e.to_string()))?;
    store.put(&credential_key(&record.id), bytes).await.map_err(to_storage_err)
}

/// Delete a credential record. Idempotent.
pub(crate) async fn delete_credential(store: &dyn PersistentStore, id: &str) -> VaultResult<()> {
    store.delete(&credential_key(id)).await.map_err(to_storage_err)
}

/// List every stored credential record.
pub(crate) async fn list_credentials(store: &dyn PersistentStore) -> VaultResult<Vec<CredentialRecord>> {
    let keys = store.list(CREDENTIAL_PREFIX).await.map_err(to_storage_err)?;
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        if let Some(bytes) = store.get(&key).await.map_err(to_storage_err)? {
            out.push(serde_json::from_slice(&bytes).map_err(|e| VaultError::Serialization(e.to_string()))?);
        }
    }
    Ok(out)
}

/// Fetch a credential's wrapped DEK.
pub(crate) async fn get_credential_key(store: &dyn PersistentStore, id: &str) -> VaultResult<Option<CredentialKey>> {
    let Some(bytes) = store.get(&key_key(id)).await.map_err(to_storage_err)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes).map(Some).map_err(|e| VaultError::Serialization(e.to_string()))
}

/// Persist a credential's wrapped DEK.
pub(crate) async fn put_credential_key(store: &dyn PersistentStore, key: &CredentialKey) -> VaultResult<()> {
    let bytes = serde_json::to_vec(key).map_err(|e| VaultError::Serialization(e.to_string()))?;
    store.put(&key_key(&key.credential_id), bytes).await.map_err(to_storage_err)
}

/// Delete a credential's wrapped DEK. Idempotent.
pub(crate) async fn delete_credential_key(store: &dyn PersistentStore, id: &str) -> VaultResult<()> {
    store.delete(&key_key(id)).await.map_err(to_storage_err)
}

/// Fetch the singleton master-key record, if the vault has ever been
/// initialised.
pub(crate) async fn get_master_key(store: &dyn PersistentStore) -> VaultResult<Option<MasterKeyRecord>> {
    let Some(bytes) = store.get(MASTER_KEY_KEY).await.map_err(to_storage_err)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes).map(Some).map_err(|e| VaultError::Serialization(e.to_string()))
}

/// Persist the singleton master-key record.
pub(crate) async fn put_master_key(store: &dyn PersistentStore, record: &MasterKeyRecord) -> VaultResult<()> {
    let bytes = serde_json::to_vec(record).map_err(|e| VaultError::Serialization(e.to_string()))?;
    store.put(MASTER_KEY_KEY, bytes).await.map_err(to_storage_err)
}
