//! Capability contracts — traits declared where they are *consumed*, not
//! where they are implemented.
//!
//! A module that needs to look up a device doesn't depend on the module that
//! owns device inventory; it depends on [`DeviceLookup`] and asks the
//! [`crate::dependencies::PluginResolver`] for whichever live plugin
//! currently advertises the `device_lookup` role. This keeps modules
//! decoupled from one another's crates entirely — only `netvantage-core`
//! sits between them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::timestamp::Timestamp;

/// A network device as known to whichever module owns inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Stable device identifier.
    pub id: String,
    /// Operator-facing display name.
    pub display_name: String,
    /// Primary management address (hostname or IP).
    pub address: String,
    /// Free-form tags (site, role, vendor, ...).
    pub tags: Vec<String>,
}

/// Resolves device identifiers to inventory records.
///
/// Role tag: `"device_lookup"`.
#[async_trait]
pub trait DeviceLookup: Send + Sync {
    /// Fetch a device by its stable id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::CapabilityFailed`] if the lookup
    /// itself fails (not merely absent — that's `Ok(None)`).
    async fn device_by_id(&self, id: &str) -> CoreResult<Option<DeviceRecord>>;
}

/// The identity a validated access token resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIdentity {
    /// Subject identifier the token was issued to.
    pub user_id: String,
    /// Role/permission tags carried by the token.
    pub scopes: Vec<String>,
}

/// Validates bearer tokens presented to module-owned HTTP or WebSocket
/// surfaces.
///
/// Role tag: `"token_validator"`.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validate `token`, returning the identity it resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::CapabilityFailed`] if the token is
    /// missing, expired, or otherwise rejected.
    async fn validate_access_token(&self, token: &str) -> CoreResult<TokenIdentity>;
}

/// A decrypted credential payload handed to a caller that holds the right
/// to read it (the vault module is the sole expected implementer, but the
/// contract lives here so gateway-side consumers never link against it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialPayload {
    /// Credential type (`password`, `ssh_key`, `api_token`, ...).
    pub kind: String,
    /// Opaque secret material, already decrypted for this caller.
    pub data: serde_json::Value,
}

/// Provisions credential material to other modules (e.g. the gateway
/// fetching SSH login secrets for a device).
///
/// Role tag: `"credential_provider"`.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetch and decrypt the credential named `credential_id`, on behalf of
    /// `requesting_plugin` (recorded in the audit trail).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::CapabilityFailed`] if the
    /// credential is absent, the vault is sealed, or access is denied.
    async fn credential_by_id(
        &self,
        credential_id: &str,
        requesting_plugin: &str,
    ) -> CoreResult<CredentialPayload>;
}

/// A single named health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Name of the check (e.g. `"vault_unsealed"`, `"db_reachable"`).
    pub name: String,
    /// Current state of this check.
    pub state: HealthState,
    /// Human-readable detail, empty when healthy.
    pub detail: String,
    /// When this check was last evaluated.
    pub checked_at: Timestamp,
}

/// Overall or per-check health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Fully operational.
    Healthy,
    /// Operational with reduced functionality.
    Degraded,
    /// Not operational.
    Unhealthy,
    /// Not enough information to judge.
    Unknown,
}

/// Reports module health for the host's aggregate `/healthz` surface.
///
/// Role tag: `"health_provider"`.
#[async_trait]
pub trait HealthProvider: Send + Sync {
    /// Run this module's health checks and return their current results.
    async fn health_checks(&self) -> Vec<HealthCheck>;
}

/// HTTP method an [`RouteDescriptor`] is mounted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

/// A single HTTP route a module publishes, for the host to mount under
/// `/api/v1/<plugin-name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Path relative to the module's mount point (e.g. `"/credentials/:id"`).
    pub path: String,
    /// Method this path responds to.
    pub method: RouteMethod,
    /// Short operator-facing description, surfaced in `/api/v1/_routes`.
    pub description: String,
}

/// Declares the HTTP surface a module wants mounted.
///
/// Unlike the other capabilities, this one is consumed by the host process
/// directly rather than by a peer module, but it lives in `core` so modules
/// implement it without depending on the host crate.
pub trait HttpRouteProvider: Send + Sync {
    /// List the routes this module wants mounted.
    fn routes(&self) -> Vec<RouteDescriptor>;
}

/// Reports whether a module has spare capacity to serve a given device.
///
/// Role tag: `"remote_access"`. The gateway module is the expected sole
/// implementer, advertising it so a scheduler elsewhere in the fabric can
/// ask before routing a session request.
#[async_trait]
pub trait RemoteAccessProvider: Send + Sync {
    /// Whether a new session could currently be opened for `device_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::CapabilityFailed`] if capacity
    /// cannot be determined.
    async fn available(&self, device_id: &str) -> CoreResult<bool>;
}

/// Receives events published on the shared bus.
///
/// Implementers subscribe through the event bus crate directly; this trait
/// is the shape the bus invokes, kept here so modules don't need to depend
/// on `netvantage-events` just to receive callbacks.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handle one delivered event. The bus guarantees in-order, non-reentrant
    /// delivery to a single subscriber instance (see `netvantage-events` for
    /// the ordering guarantees across sync/async publish paths).
    async fn on_event(&self, topic: &str, source: &str, payload: &serde_json::Value);
}
