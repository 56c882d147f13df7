//! The gateway's `Plugin` implementation: wires the session/proxy managers
//! and maintenance loop into the fabric's lifecycle, and advertises
//! `remote_access` capacity reporting.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use netvantage_audit::AuditLog;
use netvantage_core::{PluginInfo, RouteDescriptor, RouteMethod, Version};
use netvantage_registry::Plugin;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::state::{GatewayConfig, GatewayState};

/// Role tag this plugin advertises for [`netvantage_core::RemoteAccessProvider`]
/// resolution.
pub const REMOTE_ACCESS_ROLE: &str = "remote_access";

/// The gateway module.
pub struct GatewayPlugin {
    info: PluginInfo,
    state: RwLock<Option<Arc<GatewayState>>>,
    shutdown: CancellationToken,
    maintenance: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl Default for GatewayPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayPlugin {
    /// Construct the gateway plugin, advertising the `remote_access` role.
    ///
    /// Depends on `vault` so credential-bearing deployments have it ready
    /// before the gateway starts accepting sessions, even though the SSH
    /// bridge's first-message login doesn't itself call through the vault.
    #[must_use]
    pub fn new() -> Self {
        let info = PluginInfo::new("gateway", Version::new(0, 1, 0), true).depends_on("vault").with_role(REMOTE_ACCESS_ROLE);
        Self { info, state: RwLock::new(None), shutdown: CancellationToken::new(), maintenance: RwLock::new(None) }
    }

    /// The constructed [`GatewayState`], available once `Init` has run.
    #[must_use]
    pub fn state(&self) -> Option<Arc<GatewayState>> {
        self.state.read().clone()
    }

    /// The gateway's axum router, available once `Init` has run.
    ///
    /// # Panics
    ///
    /// Panics if called before `Init` has completed.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        crate::routes::router(self.state().expect("gateway router requested before Init"))
    }
}

#[async_trait]
impl Plugin for GatewayPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn init(&self, deps: netvantage_core::Dependencies) -> Result<(), String> {
        let audit_storage = Arc::new(netvantage_audit::KvAuditStorage::new(Arc::new(DependenciesKvStore { store: Arc::clone(&deps.store) })));
        let key_path = netvantage_config::default_config_dir().map_err(|e| e.to_string())?.join("audit.key");
        let runtime_key = Arc::new(netvantage_crypto::KeyPair::load_or_generate(&key_path).map_err(|e| e.to_string())?);
        let audit = Arc::new(AuditLog::new(audit_storage, runtime_key));

        let max_sessions = deps.config.get_or("max_sessions", 64usize);
        let session_ttl_minutes = deps.config.get_or("session_ttl_minutes", 30i64);
        let maintenance_interval_secs = deps.config.get_or("maintenance_interval_seconds", 30u64);
        let audit_retention_days = deps.config.get_or("audit_retention_days", 90i64);
        let ssh_dial_timeout_secs = deps.config.get_or("ssh_dial_timeout_seconds", 10u64);

        let config = GatewayConfig {
            max_sessions,
            session_ttl: chrono::Duration::minutes(session_ttl_minutes),
            maintenance_interval: std::time::Duration::from_secs(maintenance_interval_secs),
            audit_retention_days,
            ssh_dial_timeout: std::time::Duration::from_secs(ssh_dial_timeout_secs),
        };

        let gateway_state = Arc::new(GatewayState::new(Arc::clone(&deps.event_bus), Arc::clone(&deps.resolver), audit, config));
        *self.state.write() = Some(gateway_state);
        Ok(())
    }

    async fn start(&self, deps: netvantage_core::Dependencies) -> Result<(), String> {
        let state = self.state().ok_or("gateway started before Init")?;
        let shutdown = self.shutdown.clone();
        *self.maintenance.write() = Some(tokio::spawn(crate::maintenance::run(state, shutdown)));
        deps.log_info("gateway started");
        Ok(())
    }

    async fn stop(&self, deps: netvantage_core::Dependencies) -> Result<(), String> {
        self.shutdown.cancel();
        let handle = self.maintenance.write().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        if let Some(state) = self.state() {
            for session in state.sessions.list() {
                state.sessions.delete(&session.id);
                state.proxies.remove(&session.id);
            }
            state.proxies.close_all();
        }
        deps.log_info("gateway stopped");
        Ok(())
    }

    fn routes(&self) -> Vec<RouteDescriptor> {
        vec![
            RouteDescriptor { path: "/sessions".into(), method: RouteMethod::Get, description: "List live sessions".into() },
            RouteDescriptor { path: "/sessions/:id".into(), method: RouteMethod::Get, description: "Read one session".into() },
            RouteDescriptor { path: "/sessions/:id".into(), method: RouteMethod::Delete, description: "Close a session".into() },
            RouteDescriptor { path: "/status".into(), method: RouteMethod::Get, description: "Gateway capacity and session count".into() },
            RouteDescriptor { path: "/audit".into(), method: RouteMethod::Get, description: "Session audit entries".into() },
            RouteDescriptor { path: "/proxy/:device_id".into(), method: RouteMethod::Post, description: "Open a reverse-proxy session".into() },
            RouteDescriptor {
                path: "/proxy/s/:session_id/*path".into(),
                method: RouteMethod::Get,
                description: "Reverse-proxied traffic for a session".into(),
            },
        ]
    }

    fn capability(self: Arc<Self>) -> Option<Arc<dyn Any + Send + Sync>> {
        let provider = Arc::new(GatewayCapacityProvider { plugin: self }) as Arc<dyn netvantage_core::RemoteAccessProvider>;
        Some(Arc::new(provider) as Arc<dyn Any + Send + Sync>)
    }
}

/// Adapts [`netvantage_core::Dependencies::store`] to the raw
/// [`netvantage_storage::KvStore`] shape the gateway's own audit log needs,
/// mirroring the vault module's equivalent adapter.
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

struct GatewayCapacityProvider {
    plugin: Arc<GatewayPlugin>,
}

#[async_trait]
impl netvantage_core::RemoteAccessProvider for GatewayCapacityProvider {
    async fn available(&self, _device_id: &str) -> netvantage_core::CoreResult<bool> {
        let state = self.plugin.state().ok_or_else(|| netvantage_core::CoreError::CapabilityFailed {
            capability: REMOTE_ACCESS_ROLE.into(),
            reason: "gateway not initialised".into(),
        })?;
        Ok(state.sessions.count() < state.sessions.max_sessions())
    }
}
