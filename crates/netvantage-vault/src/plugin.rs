//! The vault's `Plugin` implementation, wiring the key manager and
//! credential store into the fabric's lifecycle.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use netvantage_audit::AuditLog;
use netvantage_core::{PluginInfo, RouteDescriptor, RouteMethod, Version};
use netvantage_registry::Plugin;
use parking_lot::RwLock;

use crate::vault::VaultState;

/// Environment variable carrying the vault's startup unseal passphrase.
/// Absent or empty means the vault starts sealed.
pub const VAULT_PASSPHRASE_ENV: &str = "VAULT_PASSPHRASE";

/// Role tag this plugin advertises for [`netvantage_core::CredentialProvider`]
/// resolution.
pub const CREDENTIAL_PROVIDER_ROLE: &str = "credential_provider";

/// The vault module.
pub struct VaultPlugin {
    info: PluginInfo,
    state: RwLock<Option<Arc<VaultState>>>,
}

impl Default for VaultPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultPlugin {
    /// Construct the vault plugin, advertising the `credential_provider` role.
    #[must_use]
    pub fn new() -> Self {
        let info = PluginInfo::new("vault", Version::new(0, 1, 0), true).with_role(CREDENTIAL_PROVIDER_ROLE);
        Self { info, state: RwLock::new(None) }
    }

    /// The constructed [`VaultState`], available once `Init` has run.
    #[must_use]
    pub fn state(&self) -> Option<Arc<VaultState>> {
        self.state.read().clone()
    }

    /// The vault's axum router, available once `Init` has run.
    ///
    /// # Panics
    ///
    /// Panics if called before `Init` has completed.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        crate::routes::router(self.state().expect("vault router requested before Init"))
    }
}

#[async_trait]
impl Plugin for VaultPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn init(&self, deps: netvantage_core::Dependencies) -> Result<(), String> {
        let audit_storage = Arc::new(netvantage_audit::KvAuditStorage::new(Arc::new(DependenciesKvStore {
            store: Arc::clone(&deps.store),
        })));
        let key_path = netvantage_config::default_config_dir().map_err(|e| e.to_string())?.join("audit.key");
        let runtime_key = Arc::new(netvantage_crypto::KeyPair::load_or_generate(&key_path).map_err(|e| e.to_string())?);
        let audit = Arc::new(AuditLog::new(audit_storage, runtime_key));

        let vault_state = VaultState::load(Arc::clone(&deps.store), Arc::clone(&deps.event_bus), audit)
            .await
            .map_err(|e| e.to_string())?;
        let vault_state = Arc::new(vault_state);

        if let Ok(passphrase) = std::env::var(VAULT_PASSPHRASE_ENV) {
            if !passphrase.is_empty() {
                vault_state.unseal(&passphrase).await.map_err(|e| e.to_string())?;
                deps.log_info("unsealed at startup from VAULT_PASSPHRASE");
            }
        }

        *self.state.write() = Some(vault_state);
        Ok(())
    }

    async fn start(&self, deps: netvantage_core::Dependencies) -> Result<(), String> {
        deps.log_info("vault started");
        Ok(())
    }

    async fn stop(&self, deps: netvantage_core::Dependencies) -> Result<(), String> {
        if let Some(state) = self.state() {
            state.seal().await;
        }
        deps.log_info("vault stopped, sealed");
        Ok(())
    }

    fn routes(&self) -> Vec<RouteDescriptor> {
        vec![
            RouteDescriptor { path: "/credentials".into(), method: RouteMethod::Get, description: "List credential metadata".into() },
            RouteDescriptor { path: "/credentials".into(), method: RouteMethod::Post, description: "Create a credential".into() },
            RouteDescriptor { path: "/credentials/:id".into(), method: RouteMethod::Get, description: "Read credential metadata".into() },
            RouteDescriptor { path: "/credentials/:id".into(), method: RouteMethod::Put, description: "Update a credential".into() },
            RouteDescriptor { path: "/credentials/:id".into(), method: RouteMethod::Delete, description: "Delete a credential".into() },
            RouteDescriptor { path: "/credentials/:id/data".into(), method: RouteMethod::Get, description: "Read decrypted credential data".into() },
            RouteDescriptor {
                path: "/credentials/device/:device_id".into(),
                method: RouteMethod::Get,
                description: "List credentials for a device".into(),
            },
            RouteDescriptor { path: "/rotate-keys".into(), method: RouteMethod::Post, description: "Rotate the master key".into() },
            RouteDescriptor { path: "/seal".into(), method: RouteMethod::Post, description: "Seal the vault".into() },
            RouteDescriptor { path: "/unseal".into(), method: RouteMethod::Post, description: "Unseal the vault".into() },
            RouteDescriptor { path: "/status".into(), method: RouteMethod::Get, description: "Vault seal state and counts".into() },
            RouteDescriptor { path: "/audit".into(), method: RouteMethod::Get, description: "All credential audit entries".into() },
            RouteDescriptor {
                path: "/audit/:credential_id".into(),
                method: RouteMethod::Get,
                description: "Audit entries for one credential".into(),
            },
        ]
    }

    fn capability(self: Arc<Self>) -> Option<Arc<dyn Any + Send + Sync>> {
        let provider = Arc::new(VaultCredentialProvider { plugin: self }) as Arc<dyn netvantage_core::CredentialProvider>;
        Some(Arc::new(provider) as Arc<dyn Any + Send + Sync>)
    }
}

/// Adapts [`netvantage_core::Dependencies::store`] (a module-scoped
/// [`netvantage_core::PersistentStore`]) to the raw [`netvantage_storage::KvStore`]
/// shape [`netvantage_audit::KvAuditStorage`] expects, since the audit log's
/// storage lives one namespace below the vault's own credential keys.
struct DependenciesKvStore {
    store: Arc<dyn netvantage_core::PersistentStore>,
}

#[async_trait]
impl netvantage_storage::KvStore for DependenciesKvStore {
    async fn get(&self, key: &str) -> netvantage_storage::StorageResult<Option<Vec<u8>>> {
        self.store.get(key).await.map_err(|e| netvantage_storage::StorageError::Internal(e.to_string()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> netvantage_storage::StorageResult<()> {
        self.store.put(key, value).await.map_err(|e| netvantage_storage::StorageError::Internal(e.to_string()))
    }

    async fn delete(&self, key: &str) -> netvantage_storage::StorageResult<()> {
        self.store.delete(key).await.map_err(|e| netvantage_storage::StorageError::Internal(e.to_string()))
    }

    async fn list(&self, prefix: &str) -> netvantage_storage::StorageResult<Vec<String>> {
        self.store.list(prefix).await.map_err(|e| netvantage_storage::StorageError::Internal(e.to_string()))
    }
}

/// Implements [`netvantage_core::CredentialProvider`] over the vault's
/// decrypted-read path, resolved by other modules via the `credential_provider`
/// role.
struct VaultCredentialProvider {
    plugin: Arc<VaultPlugin>,
}

#[async_trait]
impl netvantage_core::CredentialProvider for VaultCredentialProvider {
    async fn credential_by_id(
        &self,
        credential_id: &str,
        requesting_plugin: &str,
    ) -> netvantage_core::CoreResult<netvantage_core::capability::CredentialPayload> {
        let state = self.plugin.state().ok_or_else(|| netvantage_core::CoreError::CapabilityFailed {
            capability: CREDENTIAL_PROVIDER_ROLE.into(),
            reason: "vault not initialised".into(),
        })?;
        let metadata = state.get_metadata(credential_id).await.map_err(|e| netvantage_core::CoreError::CapabilityFailed {
            capability: CREDENTIAL_PROVIDER_ROLE.into(),
            reason: e.to_string(),
        })?;
        let data = state
            .get_data(credential_id, None, Some(format!("resolved by {requesting_plugin}")), None)
            .await
            .map_err(|e| netvantage_core::CoreError::CapabilityFailed { capability: CREDENTIAL_PROVIDER_ROLE.into(), reason: e.to_string() })?;
        Ok(netvantage_core::capability::CredentialPayload { kind: format!("{:?}", metadata.kind), data })
    }
}
