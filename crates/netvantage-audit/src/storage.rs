//! Audit entry persistence on top of [`netvantage_storage::KvStore`].

use std::sync::Arc;

use async_trait::async_trait;
use netvantage_core::Timestamp;
use netvantage_storage::KvStore;
use uuid::Uuid;

use crate::entry::AuditEntry;
use crate::error::{AuditError, AuditResult};

const NS_ENTRIES: &str = "entries";
const NS_SUBJECT_INDEX: &str = "subject_index";
const NS_CHAIN_HEADS: &str = "chain_heads";

/// Storage backend for audit entries.
///
/// Implementations must support per-subject chain-head tracking so a
/// new entry can be linked to the last one recorded for the same
/// subject.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Persist `entry`, updating the subject index and chain head.
    async fn store(&self, entry: &AuditEntry) -> AuditResult<()>;

    /// Fetch an entry by id.
    async fn get(&self, id: Uuid) -> AuditResult<Option<AuditEntry>>;

    /// The content hash of the latest entry recorded for `subject_id`,
    /// i.e. what the next entry's `previous_hash` should be.
    async fn chain_head(&self, subject_id: &str) -> AuditResult<Option<Uuid>>;

    /// All entries for a subject, oldest first.
    async fn entries_for_subject(&self, subject_id: &str) -> AuditResult<Vec<AuditEntry>>;

    /// Delete every entry whose timestamp is strictly before `cutoff`.
    /// Returns the number of entries removed.
    async fn prune_older_than(&self, cutoff: Timestamp) -> AuditResult<usize>;

    /// Total number of stored entries.
    async fn count(&self) -> AuditResult<usize>;
}

/// [`AuditStorage`] backed by any [`KvStore`] (in-memory for tests, a
/// durable implementation in production).
pub struct KvAuditStorage {
    store: Arc<dyn KvStore>,
}

impl KvAuditStorage {
    /// Wrap a raw key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn entry_key(id: Uuid) -> String {
        format!("{NS_ENTRIES}/{id}")
    }

    fn subject_index_key(subject_id: &str) -> String {
        format!("{NS_SUBJECT_INDEX}/{subject_id}")
    }

    fn chain_head_key(subject_id: &str) -> String {
        format!("{NS_CHAIN_HEADS}/{subject_id}")
    }

    async fn subject_entry_ids(&self, subject_id: &str) -> AuditResult<Vec<Uuid>> {
        let data = self.store.get(&Self::subject_index_key(subject_id)).await.map_err(|e| AuditError::Storage(e.to_string()))?;
        match data {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| AuditError::Serialization(e.to_string())),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl AuditStorage for KvAuditStorage {
    async fn store(&self, entry: &AuditEntry) -> AuditResult<()> {
        let entry_data = serde_json::to_vec(entry).map_err(|e| AuditError::Serialization(e.to_string()))?;
        self.store.put(&Self::entry_key(entry.id), entry_data).await.map_err(|e| AuditError::Storage(e.to_string()))?;

        let mut ids = self.subject_entry_ids(&entry.subject_id).await?;
        ids.push(entry.id);
        let index_data = serde_json::to_vec(&ids).map_err(|e| AuditError::Serialization(e.to_string()))?;
        self.store
            .put(&Self::subject_index_key(&entry.subject_id), index_data)
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;

        self.store
            .put(&Self::chain_head_key(&entry.subject_id), entry.id.as_bytes().to_vec())
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> AuditResult<Option<AuditEntry>> {
        let data = self.store.get(&Self::entry_key(id)).await.map_err(|e| AuditError::Storage(e.to_string()))?;
        match data {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(|e| AuditError::Serialization(e.to_string()))?)),
            None => Ok(None),
        }
    }

    async fn chain_head(&self, subject_id: &str) -> AuditResult<Option<Uuid>> {
        let data = self.store.get(&Self::chain_head_key(subject_id)).await.map_err(|e| AuditError::Storage(e.to_string()))?;
        match data {
            Some(bytes) => {
                let array: [u8; 16] =
                    bytes.as_slice().try_into().map_err(|_| AuditError::Storage("malformed chain head".into()))?;
                Ok(Some(Uuid::from_bytes(array)))
            },
            None => Ok(None),
        }
    }

    async fn entries_for_subject(&self, subject_id: &str) -> AuditResult<Vec<AuditEntry>> {
        let ids = self.subject_entry_ids(subject_id).await?;
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entry) = self.get(id).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn prune_older_than(&self, cutoff: Timestamp) -> AuditResult<usize> {
        let keys = self.store.list(&format!("{NS_ENTRIES}/")).await.map_err(|e| AuditError::Storage(e.to_string()))?;
        let mut pruned = 0;
        for key in keys {
            let Some(bytes) = self.store.get(&key).await.map_err(|e| AuditError::Storage(e.to_string()))? else {
                continue;
            };
            let entry: AuditEntry = serde_json::from_slice(&bytes).map_err(|e| AuditError::Serialization(e.to_string()))?;
            if entry.timestamp < cutoff {
                self.store.delete(&key).await.map_err(|e| AuditError::Storage(e.to_string()))?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    async fn count(&self) -> AuditResult<usize> {
        let keys = self.store.list(&format!("{NS_ENTRIES}/")).await.map_err(|e| AuditError::Storage(e.to_string()))?;
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netvantage_crypto::{ContentHash, KeyPair};
    use netvantage_storage::MemoryKvStore;

    fn storage() -> KvAuditStorage {
        KvAuditStorage::new(Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn store_and_retrieve_round_trips() {
        let storage = storage();
        let key = KeyPair::generate();
        let entry = AuditEntry::create("cred-1", None, "created", None, None, ContentHash::zero(), &key);
        storage.store(&entry).await.unwrap();

        let fetched = storage.get(entry.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, entry.id);
        assert_eq!(storage.chain_head("cred-1").await.unwrap(), Some(entry.id));
    }

    #[tokio::test]
    async fn entries_accumulate_per_subject() {
        let storage = storage();
        let key = KeyPair::generate();
        let mut prev = ContentHash::zero();
        for i in 0..3 {
            let entry = AuditEntry::create("sess-1", None, format!("event-{i}"), None, None, prev, &key);
            prev = entry.content_hash();
            storage.store(&entry).await.unwrap();
        }
        let entries = storage.entries_for_subject("sess-1").await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn prune_removes_only_old_entries() {
        let storage = storage();
        let key = KeyPair::generate();
        let old = AuditEntry::create("cred-1", None, "created", None, None, ContentHash::zero(), &key);
        storage.store(&old).await.unwrap();

        let cutoff = Timestamp::from_datetime(old.timestamp.0 + chrono::Duration::seconds(1));
        let fresh = AuditEntry::create("cred-2", None, "created", None, None, ContentHash::zero(), &key);
        let fresh = AuditEntry { timestamp: Timestamp::from_datetime(cutoff.0 + chrono::Duration::days(1)), ..fresh };
        storage.store(&fresh).await.unwrap();

        let pruned = storage.prune_older_than(cutoff).await.unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(storage.count().await.unwrap(), 1);
    }
}
