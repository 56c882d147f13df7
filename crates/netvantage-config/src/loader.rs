//! Loading a [`Config`] from disk and watching it for changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecursiveMode, Watcher};
use parking_lot::RwLock;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Parse a config file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file can't be read, or
/// [`ConfigError::Parse`] if it isn't valid TOML matching [`Config`].
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
}

/// A loaded config file, kept live by an optional file watcher.
///
/// Cloning a [`ConfigStore`] is cheap; every clone observes the same
/// underlying config, so a reload from any handle is visible to all.
#[derive(Clone)]
pub struct ConfigStore {
    path: PathBuf,
    inner: Arc<RwLock<Config>>,
}

impl ConfigStore {
    /// Load `path` into a store with no watcher attached.
    ///
    /// # Errors
    ///
    /// Same as [`load_file`].
    pub fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let config = load_file(&path)?;
        Ok(Self { path, inner: Arc::new(RwLock::new(config)) })
    }

    /// The current config snapshot.
    #[must_use]
    pub fn current(&self) -> Config {
        self.inner.read().clone()
    }

    /// Swap in an already-built config, bypassing the file on disk.
    ///
    /// Used by [`crate::scope::PluginConfigScope::set`] to apply
    /// in-memory writes; a subsequent [`ConfigStore::reload`] (or file
    /// watcher tick) will overwrite them with whatever is on disk.
    pub fn replace(&self, config: Config) {
        *self.inner.write() = config;
    }

    /// Re-read the config file and swap it in, if it still parses.
    ///
    /// A malformed file during a hot reload is logged and ignored — the
    /// previous valid config keeps serving rather than taking the host
    /// down over an operator typo.
    pub fn reload(&self) {
        match load_file(&self.path) {
            Ok(fresh) => {
                *self.inner.write() = fresh;
                tracing::info!(path = %self.path.display(), "config reloaded");
            },
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "config reload failed, keeping previous config");
            },
        }
    }

    /// Start watching the config file for changes, reloading on every
    /// write event. The returned watcher must be kept alive for the
    /// duration the hot reload should remain active; dropping it stops
    /// watching.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the underlying filesystem watcher
    /// can't be installed.
    pub fn watch(&self) -> ConfigResult<notify::RecommendedWatcher> {
        let store = self.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if event.kind.is_modify() || event.kind.is_create() {
                    store.reload();
                }
            }
        })
        .map_err(|e| ConfigError::Io { path: self.path.display().to_string(), source: std::io::Error::other(e) })?;

        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Io { path: self.path.display().to_string(), source: std::io::Error::other(e) })?;

        Ok(watcher)
    }
}

/// The user-level config directory (`~/.config/netvantage` or platform
/// equivalent), creating it if absent.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the directory cannot be determined or
/// created.
pub fn default_config_dir() -> ConfigResult<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "netvantage").ok_or_else(|| ConfigError::Io {
        path: "<platform config dir>".to_string(),
        source: std::io::Error::other("could not determine a home directory"),
    })?;
    let dir = dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Io { path: dir.display().to_string(), source })?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_file_parses_plugin_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [host]
            port = 9090

            [plugins.vault]
            max_credentials = 500
            "#,
        )
        .unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.host.port, 9090);
        assert!(config.plugins.contains_key("vault"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn reload_keeps_previous_on_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[host]\nport = 1234\n").unwrap();
        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.current().host.port, 1234);

        std::fs::write(&path, "not valid toml {{{").unwrap();
        store.reload();
        assert_eq!(store.current().host.port, 1234, "bad reload must not clobber the previous config");
    }
}
