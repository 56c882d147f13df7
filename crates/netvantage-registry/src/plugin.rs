//! The `Plugin` trait every module implements to be composed into the
//! host process.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use netvantage_core::{Dependencies, EventSubscriber, PluginInfo, RouteDescriptor};

/// What topics a plugin wants delivered to its [`EventSubscriber`]
/// implementation, returned alongside the subscriber itself from
/// [`Plugin::event_subscriber`].
#[derive(Debug, Clone)]
pub enum SubscriptionSpec {
    /// Subscribe to one exact topic.
    Topic(String),
    /// Subscribe to every topic (`subscribe_all`).
    All,
}

/// A module composed into the NetVantage host process.
///
/// Implementors are registered once at process start; the
/// [`crate::PluginRegistry`] drives `init`/`start`/`stop` in dependency
/// order and wires routes, event subscriptions, and role-based
/// resolution on the plugin's behalf.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Static metadata: name, version, dependencies, declared roles.
    fn info(&self) -> &PluginInfo;

    /// Called once, in topological order, before `start`. Scoped
    /// config, event bus, store, and resolver are provided via `deps`.
    ///
    /// # Errors
    ///
    /// Any `Err` here is treated per [`PluginInfo::required`]: fatal for
    /// a required plugin, `Disabled` for an optional one.
    async fn init(&self, deps: Dependencies) -> Result<(), String>;

    /// Called once, in topological order, after every dependency has
    /// started.
    ///
    /// # Errors
    ///
    /// Same disable/fatal rule as [`Plugin::init`].
    async fn start(&self, deps: Dependencies) -> Result<(), String>;

    /// Called once per shutdown, in reverse topological order. Errors
    /// are logged but never abort the shutdown walk.
    ///
    /// # Errors
    ///
    /// Logged by the registry; does not change lifecycle state.
    async fn stop(&self, deps: Dependencies) -> Result<(), String>;

    /// HTTP routes this plugin serves, mounted under
    /// `/api/v1/<plugin-name>`. Empty by default.
    fn routes(&self) -> Vec<RouteDescriptor> {
        Vec::new()
    }

    /// Topics this plugin wants delivered to its event subscriber, and
    /// the subscriber itself. `None` if this plugin doesn't subscribe
    /// to anything.
    fn event_subscriber(self: Arc<Self>) -> Option<(SubscriptionSpec, Arc<dyn EventSubscriber>)> {
        None
    }

    /// The capability this plugin exposes under its declared
    /// [`PluginInfo::roles`], resolved by other plugins through
    /// [`netvantage_core::PluginResolver`]. `None` if this plugin
    /// exposes no capability (declares no roles).
    fn capability(self: Arc<Self>) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }
}
