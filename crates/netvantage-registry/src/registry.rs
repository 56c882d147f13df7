//! The plugin registry: dependency validation, topological lifecycle
//! ordering, cascade-disable, and panic isolation.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use netvantage_core::{Dependencies, PluginInfo, PluginResolver, PluginState, RouteDescriptor};
use netvantage_events::EventBus;
use parking_lot::RwLock;

use crate::error::{RegistryError, RegistryResult};
use crate::plugin::{Plugin, SubscriptionSpec};

struct Inner {
    plugins: Vec<Arc<dyn Plugin>>,
    states: HashMap<String, PluginState>,
    order: Vec<String>,
    validated: bool,
    unsub_handles: Vec<netvantage_events::UnsubscribeHandle>,
}

/// Owns every module composed into the host process and drives their
/// lifecycle in dependency order.
///
/// Register every plugin, call [`PluginRegistry::validate`] once, then
/// [`PluginRegistry::init_all`] and [`PluginRegistry::start_all`] in
/// that order at boot; [`PluginRegistry::stop_all`] in reverse at
/// shutdown.
pub struct PluginRegistry {
    inner: RwLock<Inner>,
}

impl PluginRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                plugins: Vec::new(),
                states: HashMap::new(),
                order: Vec::new(),
                validated: false,
                unsub_handles: Vec::new(),
            }),
        }
    }

    /// Register a plugin. Must be called before [`PluginRegistry::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyName`] or
    /// [`RegistryError::DuplicateName`].
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> RegistryResult<()> {
        let mut inner = self.inner.write();
        let name = plugin.info().name.clone();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if inner.states.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        tracing::info!(plugin = %name, "registered plugin");
        inner.states.insert(name, PluginState::Registered);
        inner.plugins.push(plugin);
        Ok(())
    }

    /// Validate the dependency graph: checks API versions, missing
    /// dependencies, cascades disablement, and computes a deterministic
    /// topological order (Kahn's algorithm, ties broken by insertion
    /// order).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyValidated`] on a second call,
    /// [`RegistryError::UnsupportedApiVersion`] or
    /// [`RegistryError::MissingDependency`] for a *required* plugin that
    /// fails those checks (optional plugins are `Disabled` instead), or
    /// [`RegistryError::CycleDetected`] if the remaining active graph
    /// has a cycle.
    pub fn validate(&self) -> RegistryResult<()> {
        let mut inner = self.inner.write();
        if inner.validated {
            return Err(RegistryError::AlreadyValidated);
        }

        let names: HashSet<String> = inner.plugins.iter().map(|p| p.info().name.clone()).collect();

        for plugin in &inner.plugins {
            let info = plugin.info();
            if !info.api_version.is_supported() {
                if info.required {
                    return Err(RegistryError::UnsupportedApiVersion { name: info.name.clone(), version: info.api_version.0 });
                }
                disable(&mut inner.states, &info.name, format!("unsupported api_version {}", info.api_version));
                continue;
            }
            for dep in &info.dependencies {
                if !names.contains(dep) {
                    if info.required {
                        return Err(RegistryError::MissingDependency { name: info.name.clone(), dependency: dep.clone() });
                    }
                    disable(&mut inner.states, &info.name, format!("missing dependency '{dep}'"));
                    break;
                }
            }
        }

        cascade_disable(&inner.plugins, &mut inner.states);

        let order = topological_order(&inner.plugins, &inner.states)?;
        inner.order = order;
        inner.validated = true;
        Ok(())
    }

    /// Run `Init` on every active plugin in topological order,
    /// constructing each plugin's [`Dependencies`] via `deps_factory`.
    /// On success, wires any declared event subscription onto `bus`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotValidated`] if called before
    /// [`PluginRegistry::validate`]. A required plugin whose `Init`
    /// panics or errors is fatal; an optional one is `Disabled` and the
    /// walk continues.
    pub async fn init_all(&self, deps_factory: impl Fn(&str) -> Dependencies, bus: &EventBus) -> RegistryResult<()> {
        self.run_phase_all("init", deps_factory, Some(bus)).await
    }

    /// Run `Start` on every active plugin in topological order.
    ///
    /// # Errors
    ///
    /// Same rules as [`PluginRegistry::init_all`].
    pub async fn start_all(&self, deps_factory: impl Fn(&str) -> Dependencies) -> RegistryResult<()> {
        self.run_phase_all("start", deps_factory, None).await
    }

    /// Run `Stop` on every active plugin in reverse topological order.
    /// Errors and panics are logged but never abort the walk.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotValidated`] if called before
    /// [`PluginRegistry::validate`].
    pub async fn stop_all(&self, deps_factory: impl Fn(&str) -> Dependencies) -> RegistryResult<()> {
        let (order, plugins): (Vec<String>, HashMap<String, Arc<dyn Plugin>>) = {
            let inner = self.inner.read();
            if !inner.validated {
                return Err(RegistryError::NotValidated);
            }
            let mut order = inner.order.clone();
            order.reverse();
            let plugins = inner.plugins.iter().map(|p| (p.info().name.clone(), Arc::clone(p))).collect();
            (order, plugins)
        };

        for name in order {
            let active = matches!(self.state_of(&name), Some(s) if s.is_active());
            if !active {
                continue;
            }
            let Some(plugin) = plugins.get(&name) else { continue };
            let deps = deps_factory(&name);
            if let Err(e) = run_lifecycle(Arc::clone(plugin), deps, "stop").await {
                tracing::warn!(plugin = %name, error = %e, "plugin stop failed");
            }
            {
                let mut inner = self.inner.write();
                inner.states.insert(name.clone(), PluginState::Stopped);
            }
        }

        let mut inner = self.inner.write();
        for handle in inner.unsub_handles.drain(..) {
            handle.unsubscribe();
        }
        Ok(())
    }

    async fn run_phase_all(
        &self,
        phase: &'static str,
        deps_factory: impl Fn(&str) -> Dependencies,
        bus: Option<&EventBus>,
    ) -> RegistryResult<()> {
        let (order, plugins): (Vec<String>, HashMap<String, Arc<dyn Plugin>>) = {
            let inner = self.inner.read();
            if !inner.validated {
                return Err(RegistryError::NotValidated);
            }
            let plugins = inner.plugins.iter().map(|p| (p.info().name.clone(), Arc::clone(p))).collect();
            (inner.order.clone(), plugins)
        };

        for name in order {
            let active = matches!(self.state_of(&name), Some(s) if s.is_active());
            if !active {
                continue;
            }
            let Some(plugin) = plugins.get(&name).cloned() else { continue };
            let required = plugin.info().required;
            let deps = deps_factory(&name);

            match run_lifecycle(Arc::clone(&plugin), deps, phase).await {
                Ok(()) => {
                    let new_state = if phase == "init" { PluginState::Initialised } else { PluginState::Started };
                    let mut inner = self.inner.write();
                    inner.states.insert(name.clone(), new_state);

                    if phase == "init" {
                        if let Some(bus) = bus {
                            if let Some((spec, subscriber)) = Arc::clone(&plugin).event_subscriber() {
                                let handle = match spec {
                                    SubscriptionSpec::Topic(topic) => bus.subscribe(&topic, subscriber),
                                    SubscriptionSpec::All => bus.subscribe_all(subscriber),
                                };
                                inner.unsub_handles.push(handle);
                            }
                        }
                    }
                },
                Err(e) => {
                    if required {
                        return Err(e);
                    }
                    tracing::warn!(plugin = %name, phase, error = %e, "optional plugin disabled after lifecycle failure");
                    let mut inner = self.inner.write();
                    disable(&mut inner.states, &name, e.to_string());
                    cascade_disable(&inner.plugins, &mut inner.states);
                },
            }
        }
        Ok(())
    }

    fn state_of(&self, name: &str) -> Option<PluginState> {
        self.inner.read().states.get(name).cloned()
    }

    /// Look up a plugin by name, regardless of lifecycle state.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.inner.read().plugins.iter().find(|p| p.info().name == name).map(Arc::clone)
    }

    /// The lifecycle state of a registered plugin.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.state_of(name)
    }

    /// HTTP routes for every `Started` plugin, keyed by plugin name.
    #[must_use]
    pub fn all_routes(&self) -> Vec<(String, Vec<RouteDescriptor>)> {
        let inner = self.inner.read();
        inner
            .plugins
            .iter()
            .filter(|p| matches!(inner.states.get(&p.info().name), Some(PluginState::Started)))
            .map(|p| (p.info().name.clone(), p.routes()))
            .collect()
    }

    /// Every registered plugin's static metadata, in insertion order.
    #[must_use]
    pub fn all_info(&self) -> Vec<PluginInfo> {
        self.inner.read().plugins.iter().map(|p| p.info().clone()).collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginResolver for PluginRegistry {
    fn resolve_by_role(&self, role: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let inner = self.inner.read();
        inner
            .plugins
            .iter()
            .find(|p| {
                p.info().roles.iter().any(|r| r == role)
                    && matches!(inner.states.get(&p.info().name), Some(PluginState::Started))
            })
            .and_then(|p| Arc::clone(p).capability())
    }
}

fn disable(states: &mut HashMap<String, PluginState>, name: &str, reason: String) {
    states.insert(name.to_string(), PluginState::Disabled { reason });
}

/// Propagate `Disabled` to every plugin that (transitively) depends on
/// an already-disabled one, to a fixed point.
fn cascade_disable(plugins: &[Arc<dyn Plugin>], states: &mut HashMap<String, PluginState>) {
    loop {
        let mut changed = false;
        for plugin in plugins {
            let info = plugin.info();
            if matches!(states.get(&info.name), Some(PluginState::Disabled { .. })) {
                continue;
            }
            for dep in &info.dependencies {
                if matches!(states.get(dep), Some(PluginState::Disabled { .. })) {
                    disable(states, &info.name, format!("dependency '{dep}' is disabled"));
                    changed = true;
                    break;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

/// Kahn's algorithm over the active subgraph, ties broken by insertion
/// order (i.e. lowest index in `plugins`).
fn topological_order(plugins: &[Arc<dyn Plugin>], states: &HashMap<String, PluginState>) -> RegistryResult<Vec<String>> {
    let active: Vec<&str> = plugins
        .iter()
        .map(|p| p.info().name.as_str())
        .filter(|n| states.get(*n).is_some_and(PluginState::is_active))
        .collect();
    let position: HashMap<&str, usize> = active.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let by_name: HashMap<&str, &Arc<dyn Plugin>> = plugins.iter().map(|p| (p.info().name.as_str(), p)).collect();

    let mut indegree: HashMap<&str, usize> = active.iter().map(|n| (*n, 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = active.iter().map(|n| (*n, Vec::new())).collect();

    for &name in &active {
        for dep in &by_name[name].info().dependencies {
            if position.contains_key(dep.as_str()) {
                *indegree.get_mut(name).unwrap() += 1;
                dependents.get_mut(dep.as_str()).unwrap().push(name);
            }
        }
    }

    let mut ready: Vec<&str> = active.iter().copied().filter(|n| indegree[n] == 0).collect();
    ready.sort_by_key(|n| position[n]);

    let mut order = Vec::with_capacity(active.len());
    while !ready.is_empty() {
        let idx = (0..ready.len()).min_by_key(|&i| position[ready[i]]).expect("ready is non-empty");
        let name = ready.remove(idx);
        order.push(name.to_string());
        for &dependent in &dependents[name] {
            let e = indegree.get_mut(dependent).unwrap();
            *e -= 1;
            if *e == 0 {
                ready.push(dependent);
            }
        }
    }

    if order.len() != active.len() {
        let remaining: Vec<String> = active.iter().filter(|n| !order.contains(&n.to_string())).map(|s| s.to_string()).collect();
        return Err(RegistryError::CycleDetected(remaining));
    }

    Ok(order)
}

async fn run_lifecycle(plugin: Arc<dyn Plugin>, deps: Dependencies, phase: &'static str) -> RegistryResult<()> {
    let name = plugin.info().name.clone();
    let handle = tokio::spawn(async move {
        match phase {
            "init" => plugin.init(deps).await,
            "start" => plugin.start(deps).await,
            "stop" => plugin.stop(deps).await,
            _ => unreachable!("unknown lifecycle phase"),
        }
    });

    match handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(reason)) => Err(RegistryError::LifecycleFailed { name, phase, reason }),
        Err(join_err) => {
            let message = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                "task was cancelled".to_string()
            };
            Err(RegistryError::Panicked { name, message })
        },
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use netvantage_core::{ConfigScope, CoreResult, Dependencies, EventPublisher, PersistentStore, PluginInfo, Version};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct NullConfig;
    impl ConfigScope for NullConfig {
        fn get_value(&self, _key: &str) -> CoreResult<Option<serde_json::Value>> {
            Ok(None)
        }
        fn set_value(&self, _key: &str, _value: serde_json::Value) -> CoreResult<()> {
            Ok(())
        }
    }

    struct NullStore;
    #[async_trait]
    impl PersistentStore for NullStore {
        async fn get(&self, _key: &str) -> CoreResult<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn put(&self, _key: &str, _value: Vec<u8>) -> CoreResult<()> {
            Ok(())
        }
        async fn delete(&self, _key: &str) -> CoreResult<()> {
            Ok(())
        }
        async fn list(&self, _prefix: &str) -> CoreResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn test_deps(bus: Arc<dyn EventPublisher>, name: &str) -> Dependencies {
        Dependencies {
            config: Arc::new(NullConfig),
            plugin_name: name.to_string(),
            event_bus: bus,
            store: Arc::new(NullStore),
            resolver: Arc::new(PluginRegistry::new()),
        }
    }

    struct TestPlugin {
        info: PluginInfo,
        init_called: Arc<AtomicBool>,
        fail_init: bool,
        panic_init: bool,
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn info(&self) -> &PluginInfo {
            &self.info
        }

        async fn init(&self, _deps: Dependencies) -> Result<(), String> {
            self.init_called.store(true, Ordering::SeqCst);
            if self.panic_init {
                panic!("boom");
            }
            if self.fail_init {
                return Err("synthetic failure".to_string());
            }
            Ok(())
        }

        async fn start(&self, _deps: Dependencies) -> Result<(), String> {
            Ok(())
        }

        async fn stop(&self, _deps: Dependencies) -> Result<(), String> {
            Ok(())
        }
    }

    fn plugin(name: &str, deps: Vec<&str>, required: bool) -> Arc<TestPlugin> {
        let mut info = PluginInfo::new(name, Version::new(0, 1, 0), required);
        for d in deps {
            info = info.depends_on(d);
        }
        Arc::new(TestPlugin { info, init_called: Arc::new(AtomicBool::new(false)), fail_init: false, panic_init: false })
    }

    #[test]
    fn register_rejects_empty_and_duplicate_names() {
        let registry = PluginRegistry::new();
        assert!(registry.register(plugin("", vec![], true)).is_err());
        registry.register(plugin("vault", vec![], true)).unwrap();
        assert!(matches!(registry.register(plugin("vault", vec![], true)), Err(RegistryError::DuplicateName(_))));
    }

    #[test]
    fn validate_orders_dependencies_before_dependents() {
        let registry = PluginRegistry::new();
        registry.register(plugin("gateway", vec!["vault"], true)).unwrap();
        registry.register(plugin("vault", vec![], true)).unwrap();
        registry.validate().unwrap();

        let order = registry.inner.read().order.clone();
        let vault_pos = order.iter().position(|n| n == "vault").unwrap();
        let gateway_pos = order.iter().position(|n| n == "gateway").unwrap();
        assert!(vault_pos < gateway_pos);
    }

    #[test]
    fn validate_detects_cycle() {
        let registry = PluginRegistry::new();
        registry.register(plugin("a", vec!["b"], true)).unwrap();
        registry.register(plugin("b", vec!["a"], true)).unwrap();
        assert!(matches!(registry.validate(), Err(RegistryError::CycleDetected(_))));
    }

    #[test]
    fn missing_required_dependency_is_fatal() {
        let registry = PluginRegistry::new();
        registry.register(plugin("gateway", vec!["vault"], true)).unwrap();
        assert!(matches!(registry.validate(), Err(RegistryError::MissingDependency { .. })));
    }

    #[test]
    fn missing_optional_dependency_disables() {
        let registry = PluginRegistry::new();
        registry.register(plugin("gateway", vec!["vault"], false)).unwrap();
        registry.validate().unwrap();
        assert!(matches!(registry.state("gateway"), Some(PluginState::Disabled { .. })));
    }

    #[test]
    fn cascade_disable_propagates_to_dependents() {
        let registry = PluginRegistry::new();
        registry.register(plugin("vault", vec!["missing"], false)).unwrap();
        registry.register(plugin("gateway", vec!["vault"], false)).unwrap();
        registry.validate().unwrap();
        assert!(matches!(registry.state("vault"), Some(PluginState::Disabled { .. })));
        assert!(matches!(registry.state("gateway"), Some(PluginState::Disabled { .. })));
    }

    #[tokio::test]
    async fn init_all_runs_in_topological_order_and_marks_initialised() {
        let registry = PluginRegistry::new();
        registry.register(plugin("vault", vec![], true)).unwrap();
        registry.register(plugin("gateway", vec!["vault"], true)).unwrap();
        registry.validate().unwrap();

        let bus = EventBus::new();
        let bus_dyn: Arc<dyn EventPublisher> = Arc::new(bus.clone());
        registry.init_all(|name| test_deps(Arc::clone(&bus_dyn), name), &bus).await.unwrap();

        assert_eq!(registry.state("vault"), Some(PluginState::Initialised));
        assert_eq!(registry.state("gateway"), Some(PluginState::Initialised));
    }

    #[tokio::test]
    async fn required_plugin_panic_is_fatal() {
        let registry = PluginRegistry::new();
        let p = Arc::new(TestPlugin {
            info: PluginInfo::new("vault", Version::new(0, 1, 0), true),
            init_called: Arc::new(AtomicBool::new(false)),
            fail_init: false,
            panic_init: true,
        });
        registry.register(p).unwrap();
        registry.validate().unwrap();

        let bus = EventBus::new();
        let bus_dyn: Arc<dyn EventPublisher> = Arc::new(bus.clone());
        let result = registry.init_all(|name| test_deps(Arc::clone(&bus_dyn), name), &bus).await;
        assert!(matches!(result, Err(RegistryError::Panicked { .. })));
    }

    #[tokio::test]
    async fn optional_plugin_panic_disables_without_failing_the_walk() {
        let registry = PluginRegistry::new();
        let p = Arc::new(TestPlugin {
            info: PluginInfo::new("optional", Version::new(0, 1, 0), false),
            init_called: Arc::new(AtomicBool::new(false)),
            fail_init: false,
            panic_init: true,
        });
        registry.register(p).unwrap();
        registry.validate().unwrap();

        let bus = EventBus::new();
        let bus_dyn: Arc<dyn EventPublisher> = Arc::new(bus.clone());
        registry.init_all(|name| test_deps(Arc::clone(&bus_dyn), name), &bus).await.unwrap();
        assert!(matches!(registry.state("optional"), Some(PluginState::Disabled { .. })));
    }

    #[tokio::test]
    async fn stop_all_runs_in_reverse_order_and_tolerates_errors() {
        let registry = PluginRegistry::new();
        registry.register(plugin("vault", vec![], true)).unwrap();
        registry.register(plugin("gateway", vec!["vault"], true)).unwrap();
        registry.validate().unwrap();

        let bus = EventBus::new();
        let bus_dyn: Arc<dyn EventPublisher> = Arc::new(bus.clone());
        registry.init_all(|name| test_deps(Arc::clone(&bus_dyn), name), &bus).await.unwrap();
        registry.start_all(|name| test_deps(Arc::clone(&bus_dyn), name)).await.unwrap();
        registry.stop_all(|name| test_deps(Arc::clone(&bus_dyn), name)).await.unwrap();

        assert_eq!(registry.state("vault"), Some(PluginState::Stopped));
        assert_eq!(registry.state("gateway"), Some(PluginState::Stopped));
    }
}
