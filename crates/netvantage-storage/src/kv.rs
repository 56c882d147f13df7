//! Raw key-value storage, the backend every module's scoped store runs on
//! top of.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StorageResult;

/// A flat, byte-oriented key-value store.
///
/// Modules never talk to this directly — [`crate::ScopedKvStore`] wraps it
/// with a namespace prefix per the fabric's per-module isolation contract.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the bytes at `key`, or `None` if absent.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store `value` at `key`, overwriting any existing value.
    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Remove `key`. Idempotent.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List every key starting with `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// An in-memory [`KvStore`] backed by a concurrent hash map.
///
/// Used for tests and for the host's default configuration when no durable
/// backend is configured; data does not survive a process restart.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryKvStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).filter(|k| k.starts_with(prefix)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = MemoryKvStore::new();
        store.put("a", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryKvStore::new();
        store.put("a", b"x".to_vec()).await.unwrap();
        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryKvStore::new();
        store.put("vault/c1", vec![]).await.unwrap();
        store.put("vault/c2", vec![]).await.unwrap();
        store.put("gateway/s1", vec![]).await.unwrap();
        let mut keys = store.list("vault/").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["vault/c1".to_string(), "vault/c2".to_string()]);
    }
}
