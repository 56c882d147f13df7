//! Assembles the host's combined HTTP/WebSocket surface: each module's own
//! router nested under `/api/v1/<plugin>`, the gateway's WebSocket SSH
//! bridge mounted at the host level, and a couple of host-owned routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use netvantage_gateway::GatewayPlugin;
use netvantage_registry::PluginRegistry;
use netvantage_vault::VaultPlugin;
use serde::Serialize;

/// Build the full host router.
///
/// # Panics
///
/// Panics if either module's router is requested before its `Init` has run
/// (the caller is expected to build this only after `init_all` succeeds).
#[must_use]
pub fn build(vault: &Arc<VaultPlugin>, gateway: &Arc<GatewayPlugin>, registry: Arc<PluginRegistry>) -> Router {
    let gateway_state = gateway.state().expect("gateway router built before Init");

    let ssh_bridge = Router::new()
        .route("/ws/gateway/ssh/:device_id", get(netvantage_gateway::ssh_bridge_upgrade))
        .with_state(gateway_state);

    Router::new()
        .nest("/api/v1/vault", vault.router())
        .nest("/api/v1/gateway", gateway.router())
        .merge(ssh_bridge)
        .route("/healthz", get(healthz))
        .route("/api/v1/_routes", get(routes_index))
        .with_state(registry)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    plugins: Vec<PluginHealth>,
}

#[derive(Debug, Serialize)]
struct PluginHealth {
    name: String,
    state: Option<netvantage_core::PluginState>,
}

async fn healthz(State(registry): State<Arc<PluginRegistry>>) -> Json<HealthResponse> {
    let plugins: Vec<PluginHealth> = registry
        .all_info()
        .into_iter()
        .map(|info| PluginHealth { state: registry.state(&info.name), name: info.name })
        .collect();
    let status = if plugins.iter().all(|p| matches!(p.state, Some(netvantage_core::PluginState::Started))) {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status, plugins })
}

async fn routes_index(State(registry): State<Arc<PluginRegistry>>) -> Json<Vec<(String, Vec<netvantage_core::RouteDescriptor>)>> {
    Json(registry.all_routes())
}
