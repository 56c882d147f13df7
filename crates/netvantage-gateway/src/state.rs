//! Shared gateway state: the session/proxy managers, audit log, and the
//! capability lookups every handler needs, bundled so axum can hold one
//! `Arc<GatewayState>` as its router state.

use std::sync::Arc;
use std::time::Duration;

use netvantage_core::capability::TokenIdentity;
use netvantage_core::{DeviceLookup, DeviceRecord, EventPublisher, PluginResolver, TokenValidator};
use netvantage_audit::AuditLog;

use crate::error::{GatewayError, GatewayResult};
use crate::model::Target;
use crate::proxy::ReverseProxyManager;
use crate::session::SessionManager;

/// Runtime-tunable gateway parameters, sourced from the module's config
/// scope at `Init`.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Maximum concurrent sessions the gateway will hold open.
    pub max_sessions: usize,
    /// How long a newly created session lives before it is eligible for
    /// reaping by the maintenance loop.
    pub session_ttl: chrono::Duration,
    /// Interval between maintenance-loop sweeps.
    pub maintenance_interval: Duration,
    /// Audit rows older than this are pruned on each maintenance sweep.
    pub audit_retention_days: i64,
    /// Timeout for dialing the upstream SSH server.
    pub ssh_dial_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            session_ttl: chrono::Duration::minutes(30),
            maintenance_interval: Duration::from_secs(30),
            audit_retention_days: 90,
            ssh_dial_timeout: Duration::from_secs(10),
        }
    }
}

/// Everything the gateway's HTTP routes and WebSocket bridge share.
pub struct GatewayState {
    /// The concurrent session map.
    pub sessions: SessionManager,
    /// Reverse-proxy target registry.
    pub proxies: ReverseProxyManager,
    /// The gateway's own audit trail (session create/close events).
    pub audit: Arc<AuditLog>,
    /// Shared event bus handle, for `gateway.session.*` publishes.
    pub event_bus: Arc<dyn EventPublisher>,
    /// Handle back to the registry, for resolving `TokenValidator`/
    /// `DeviceLookup` by role.
    pub resolver: Arc<dyn PluginResolver>,
    /// Runtime configuration.
    pub config: GatewayConfig,
}

impl GatewayState {
    /// Construct gateway state over an already-sized [`SessionManager`].
    #[must_use]
    pub fn new(event_bus: Arc<dyn EventPublisher>, resolver: Arc<dyn PluginResolver>, audit: Arc<AuditLog>, config: GatewayConfig) -> Self {
        Self { sessions: SessionManager::new(config.max_sessions), proxies: ReverseProxyManager::new(), audit, event_bus, resolver, config }
    }

    /// Resolve the `token_validator` role and validate `token` against it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] if no validator is
    /// registered or the token is rejected.
    pub async fn validate_token(&self, token: &str) -> GatewayResult<TokenIdentity> {
        if token.is_empty() {
            return Err(GatewayError::Unauthenticated("missing token".into()));
        }
        let validator = self
            .resolver
            .resolve_by_role("token_validator")
            .and_then(|any| any.downcast::<Arc<dyn TokenValidator>>().ok())
            .ok_or_else(|| GatewayError::Unauthenticated("no token validator registered".into()))?;
        validator.validate_access_token(token).await.map_err(|e| GatewayError::Unauthenticated(e.to_string()))
    }

    /// Resolve the `device_lookup` role, if any plugin currently advertises
    /// it. Absence is not an error — callers fall back to explicit
    /// `host`/`port` parameters.
    #[must_use]
    pub fn device_lookup(&self) -> Option<Arc<dyn DeviceLookup>> {
        self.resolver.resolve_by_role("device_lookup").and_then(|any| any.downcast::<Arc<dyn DeviceLookup>>().ok()).map(|arc| (*arc).clone())
    }

    /// Resolve the upstream target for `device_id`, preferring
    /// [`DeviceLookup`] and falling back to explicit `host`/`port` query
    /// parameters. Port defaults to 22 and is clamped to `1..=65535`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DeviceNotFound`] if neither the lookup nor an
    /// explicit host is available.
    pub async fn resolve_target(&self, device_id: &str, host_param: Option<String>, port_param: Option<u16>) -> GatewayResult<Target> {
        let mut record: Option<DeviceRecord> = None;
        if let Some(lookup) = self.device_lookup() {
            record = lookup.device_by_id(device_id).await.map_err(GatewayError::Capability)?;
        }

        let host = match (&record, &host_param) {
            (Some(device), _) => device.address.clone(),
            (None, Some(host)) => host.clone(),
            (None, None) => return Err(GatewayError::DeviceNotFound(device_id.to_string())),
        };

        let port = port_param.unwrap_or(22).clamp(1, 65535);
        Ok(Target { host, port })
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState").field("sessions", &self.sessions).field("proxies", &self.proxies).finish()
    }
}
