//! The scoped bundle of shared services a module receives on `Init`.
//!
//! [`Dependencies`] is assembled once per plugin by the registry's
//! `deps_factory` closure (see `netvantage-registry::PluginRegistry::init_all`).
//! The concrete [`EventPublisher`], [`PersistentStore`], [`ConfigScope`] and
//! [`PluginResolver`] implementations live in their own crates
//! (`netvantage-events`, `netvantage-storage`, `netvantage-config`,
//! `netvantage-registry`) and are injected here as trait objects so this
//! crate stays at the bottom of the dependency graph.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreResult;

/// A module's private view of the config tree, rooted at `plugins.<name>`.
///
/// Mutating one module's scope never affects another's — implementations
/// must enforce this at the scope boundary, not merely by convention.
///
/// The trait itself is kept object-safe (no generic methods, since every
/// module holds this behind `Arc<dyn ConfigScope>`); the typed `get`/`set`
/// callers actually use are inherent methods on `dyn ConfigScope` built on
/// top of [`ConfigScope::get_value`]/[`ConfigScope::set_value`] below.
pub trait ConfigScope: Send + Sync {
    /// Fetch the raw value at `key` within this scope, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_value(&self, key: &str) -> CoreResult<Option<serde_json::Value>>;

    /// Persist a raw value at `key` within this scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written back.
    fn set_value(&self, key: &str, value: serde_json::Value) -> CoreResult<()>;
}

impl dyn ConfigScope + '_ {
    /// Fetch and deserialize a value at `key` within this scope.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::MissingConfig`] if absent, or a
    /// serialization error if the stored value doesn't match `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> CoreResult<T> {
        let value = self.get_value(key)?.ok_or_else(|| crate::error::CoreError::MissingConfig(key.to_string()))?;
        serde_json::from_value(value).map_err(|e| crate::error::CoreError::Serialization(e.to_string()))
    }

    /// Fetch a value at `key`, or `default` if absent or malformed.
    #[must_use]
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Persist a value at `key` within this scope.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `value` cannot be encoded.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> CoreResult<()> {
        let encoded = serde_json::to_value(value).map_err(|e| crate::error::CoreError::Serialization(e.to_string()))?;
        self.set_value(key, encoded)
    }
}

/// A module's handle to the shared event bus.
///
/// Narrower than the full `netvantage_events::EventBus` API: modules publish,
/// they don't need to manage the bus's lifecycle.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Deliver to every subscriber of `topic` and every wildcard
    /// subscriber, in registration order, awaiting each handler before
    /// moving to the next. The call only returns once every subscriber has
    /// run.
    async fn publish(&self, topic: &str, source: &str, payload: serde_json::Value);

    /// Hand `topic` off to a background task and return immediately;
    /// delivery order across distinct `publish_async` calls is not
    /// guaranteed, but a single subscriber never receives two overlapping
    /// invocations.
    fn publish_async(&self, topic: &str, source: &str, payload: serde_json::Value);
}

/// A module's namespaced view of the shared persistent store.
///
/// Each module owns a namespace (conventionally its plugin name) and must
/// not read or write another module's keys; implementations enforce this by
/// prefixing every key before it reaches the backing store.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Fetch the raw bytes at `key`, or `None` if absent.
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>>;

    /// Store raw bytes at `key`, overwriting any existing value.
    async fn put(&self, key: &str, value: Vec<u8>) -> CoreResult<()>;

    /// Remove `key`. Idempotent — succeeds whether or not it existed.
    async fn delete(&self, key: &str) -> CoreResult<()>;

    /// List keys under `prefix` (relative to this module's namespace).
    async fn list(&self, prefix: &str) -> CoreResult<Vec<String>>;
}

/// Resolves other registered plugins, by name or by advertised role.
///
/// Capability lookups through this trait must happen during `Start` or
/// lazily at request time — never during `Init`, where a cyclic resolve
/// between two plugins would deadlock (see the fabric's design notes on
/// plugin resolver cycles).
pub trait PluginResolver: Send + Sync {
    /// Look up a capability implementation advertised under `role`, if any
    /// plugin currently in a live (`Started`) state offers it.
    ///
    /// Returns `None` rather than erroring: a missing capability puts the
    /// caller in degraded mode, it is never fatal.
    fn resolve_by_role(&self, role: &str) -> Option<Arc<dyn std::any::Any + Send + Sync>>;
}

/// Everything a module needs to initialise: its scoped config, a named
/// logger target, the shared event bus, its namespaced store, and a handle
/// back to the registry for role-based capability lookup.
#[derive(Clone)]
pub struct Dependencies {
    /// This module's `plugins.<name>` config sub-tree.
    pub config: Arc<dyn ConfigScope>,
    /// The plugin name this bundle was scoped for (used as the logger target).
    pub plugin_name: String,
    /// Shared in-process event bus.
    pub event_bus: Arc<dyn EventPublisher>,
    /// This module's namespaced slice of the shared persistent store.
    pub store: Arc<dyn PersistentStore>,
    /// Handle back to the registry for resolving other modules by role.
    pub resolver: Arc<dyn PluginResolver>,
}

impl Dependencies {
    /// Emit an info-level log line tagged with this module's plugin name.
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin_name, "{message}");
    }

    /// Emit a warn-level log line tagged with this module's plugin name.
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin_name, "{message}");
    }
}
