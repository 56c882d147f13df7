//! Per-plugin view over the shared config store.

use netvantage_core::{ConfigScope, CoreError, CoreResult};

use crate::loader::ConfigStore;

/// A [`ConfigScope`] rooted at `plugins.<name>` in the shared config.
///
/// Reads always see the latest value, including ones picked up by a
/// hot-reload watcher on the underlying [`ConfigStore`]. Writes update
/// only the in-memory value; they are not persisted back to disk.
pub struct PluginConfigScope {
    plugin_name: String,
    store: ConfigStore,
}

impl PluginConfigScope {
    /// Scope `store` to the `plugins.<plugin_name>` sub-table.
    #[must_use]
    pub fn new(plugin_name: impl Into<String>, store: ConfigStore) -> Self {
        Self { plugin_name: plugin_name.into(), store }
    }
}

impl ConfigScope for PluginConfigScope {
    fn get_value(&self, key: &str) -> CoreResult<Option<serde_json::Value>> {
        let config = self.store.current();
        let Some(table) = config.plugins.get(&self.plugin_name) else {
            return Ok(None);
        };
        let Some(value) = table.get(key) else {
            return Ok(None);
        };
        serde_json::to_value(value).map(Some).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    fn set_value(&self, key: &str, value: serde_json::Value) -> CoreResult<()> {
        let serialized = toml::Value::try_from(value).map_err(|e| CoreError::Serialization(e.to_string()))?;

        let mut config = self.store.current();
        let table =
            config.plugins.entry(self.plugin_name.clone()).or_insert_with(|| toml::Value::Table(Default::default()));
        let toml::Value::Table(table) = table else {
            return Err(CoreError::Serialization(format!("plugins.{} is not a table", self.plugin_name)));
        };
        table.insert(key.to_string(), serialized);
        self.store.replace(config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(contents: &str) -> ConfigStore {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        let store = ConfigStore::load(&path).unwrap();
        std::mem::forget(dir);
        store
    }

    fn as_scope(scope: &PluginConfigScope) -> &dyn ConfigScope {
        scope
    }

    #[test]
    fn get_reads_from_plugin_subtree() {
        let store = store_with("[plugins.vault]\nmax_credentials = 250\n");
        let scope = PluginConfigScope::new("vault", store);
        let value: u32 = as_scope(&scope).get("max_credentials").unwrap();
        assert_eq!(value, 250);
    }

    #[test]
    fn get_or_falls_back_when_key_absent() {
        let store = store_with("[plugins.vault]\n");
        let scope = PluginConfigScope::new("vault", store);
        let value: u32 = as_scope(&scope).get_or("max_credentials", 100);
        assert_eq!(value, 100);
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = store_with("[plugins.vault]\n");
        let scope = PluginConfigScope::new("vault", store);
        as_scope(&scope).set("max_credentials", &250u32).unwrap();
        let value: u32 = as_scope(&scope).get("max_credentials").unwrap();
        assert_eq!(value, 250);
    }

    #[test]
    fn set_creates_missing_plugin_table() {
        let store = store_with("[host]\nport = 8080\n");
        let scope = PluginConfigScope::new("vault", store);
        as_scope(&scope).set("max_credentials", &10u32).unwrap();
        let value: u32 = as_scope(&scope).get("max_credentials").unwrap();
        assert_eq!(value, 10);
    }
}
