//! Per-module namespacing over a shared [`KvStore`] backend.

use std::sync::Arc;

use async_trait::async_trait;
use netvantage_core::{CoreError, CoreResult, PersistentStore};

use crate::kv::KvStore;

/// A module's private, prefixed view of the shared key-value store.
///
/// Every key this module writes is transparently prefixed with
/// `"<namespace>/"`; a module can never read or overwrite another
/// namespace's keys through this handle.
pub struct ScopedKvStore {
    namespace: String,
    backend: Arc<dyn KvStore>,
}

impl ScopedKvStore {
    /// Scope `backend` under `namespace` (conventionally the plugin name).
    #[must_use]
    pub fn new(namespace: impl Into<String>, backend: Arc<dyn KvStore>) -> Self {
        Self { namespace: namespace.into(), backend }
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }
}

#[async_trait]
impl PersistentStore for ScopedKvStore {
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        self.backend
            .get(&self.prefixed(key))
            .await
            .map_err(|e| CoreError::CapabilityFailed { capability: "persistent_store".into(), reason: e.to_string() })
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> CoreResult<()> {
        self.backend
            .put(&self.prefixed(key), value)
            .await
            .map_err(|e| CoreError::CapabilityFailed { capability: "persistent_store".into(), reason: e.to_string() })
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        self.backend
            .delete(&self.prefixed(key))
            .await
            .map_err(|e| CoreError::CapabilityFailed { capability: "persistent_store".into(), reason: e.to_string() })
    }

    async fn list(&self, prefix: &str) -> CoreResult<Vec<String>> {
        let full_prefix = self.prefixed(prefix);
        let keys = self
            .backend
            .list(&full_prefix)
            .await
            .map_err(|e| CoreError::CapabilityFailed { capability: "persistent_store".into(), reason: e.to_string() })?;
        let strip = format!("{}/", self.namespace);
        Ok(keys.into_iter().map(|k| k.trim_start_matches(&strip).to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;

    #[tokio::test]
    async fn namespaces_do_not_see_each_other() {
        let backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let vault = ScopedKvStore::new("vault", Arc::clone(&backend));
        let gateway = ScopedKvStore::new("gateway", Arc::clone(&backend));

        vault.put("k", b"vault-value".to_vec()).await.unwrap();
        gateway.put("k", b"gateway-value".to_vec()).await.unwrap();

        assert_eq!(vault.get("k").await.unwrap(), Some(b"vault-value".to_vec()));
        assert_eq!(gateway.get("k").await.unwrap(), Some(b"gateway-value".to_vec()));
    }

    #[tokio::test]
    async fn list_strips_namespace_prefix() {
        let backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let vault = ScopedKvStore::new("vault", backend);
        vault.put("credentials/c1", vec![]).await.unwrap();
        vault.put("credentials/c2", vec![]).await.unwrap();

        let mut keys = vault.list("credentials/").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["credentials/c1".to_string(), "credentials/c2".to_string()]);
    }
}
