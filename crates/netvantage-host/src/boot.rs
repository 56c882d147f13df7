//! Wires every module into the plugin fabric, drives the lifecycle walk,
//! and serves the combined HTTP surface until shutdown is requested.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use netvantage_config::{ConfigStore, PluginConfigScope};
use netvantage_core::{ConfigScope, Dependencies, EventPublisher, PersistentStore, PluginResolver};
use netvantage_events::EventBus;
use netvantage_gateway::GatewayPlugin;
use netvantage_registry::PluginRegistry;
use netvantage_storage::{KvStore, MemoryKvStore, ScopedKvStore};
use netvantage_vault::VaultPlugin;

use crate::cli::Args;

/// Everything `Dependencies::for_plugin` needs to build a scoped bundle.
///
/// Cloning is cheap: [`EventBus`] and [`ConfigStore`] share their inner
/// state, and the kv backend and registry are held behind `Arc`.
#[derive(Clone)]
struct DepsFactory {
    config: ConfigStore,
    bus: EventBus,
    kv_backend: Arc<dyn KvStore>,
    resolver: Arc<PluginRegistry>,
}

impl DepsFactory {
    fn for_plugin(&self, name: &str) -> Dependencies {
        Dependencies {
            config: Arc::new(PluginConfigScope::new(name, self.config.clone())) as Arc<dyn ConfigScope>,
            plugin_name: name.to_string(),
            event_bus: Arc::new(self.bus.clone()) as Arc<dyn EventPublisher>,
            store: Arc::new(ScopedKvStore::new(name, Arc::clone(&self.kv_backend))) as Arc<dyn PersistentStore>,
            resolver: Arc::clone(&self.resolver) as Arc<dyn PluginResolver>,
        }
    }
}

/// Run the host process to completion: boot every module, serve HTTP until
/// a shutdown signal arrives, then stop every module in reverse order.
///
/// # Errors
///
/// Returns an error if the config can't be loaded, the listener can't
/// bind, or a required plugin fails its lifecycle walk.
pub async fn run(args: Args) -> anyhow::Result<()> {
    let config_path = crate::config::resolve_path(args.config)?;
    let config_store = crate::config::load_or_seed(&config_path)?;
    let host_config = config_store.current().host;

    let _watcher = config_store.watch().context("starting config file watcher")?;

    let bus = EventBus::new();
    let kv_backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let registry = Arc::new(PluginRegistry::new());

    let vault = Arc::new(VaultPlugin::new());
    let gateway = Arc::new(GatewayPlugin::new());

    registry.register(vault.clone()).context("registering vault")?;
    registry.register(gateway.clone()).context("registering gateway")?;
    registry.validate().context("validating plugin dependency graph")?;

    let factory = DepsFactory { config: config_store, bus: bus.clone(), kv_backend, resolver: Arc::clone(&registry) };

    registry.init_all(|name| factory.for_plugin(name), &bus).await.context("initialising plugins")?;
    registry.start_all(|name| factory.for_plugin(name)).await.context("starting plugins")?;

    let app = crate::router::build(&vault, &gateway, Arc::clone(&registry));

    let addr = SocketAddr::from(([0, 0, 0, 0], host_config.port));
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "netvantage host listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(crate::shutdown::signal())
        .await
        .context("serving http")?;

    tracing::info!("shutdown signal received, stopping plugins");
    registry.stop_all(|name| factory.for_plugin(name)).await.context("stopping plugins")?;

    Ok(())
}
