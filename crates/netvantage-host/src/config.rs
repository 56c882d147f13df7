//! Resolving and, if necessary, seeding the host's config file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use netvantage_config::ConfigStore;

/// A config path together with whether the caller named it explicitly
/// (`--config`) or it was filled in from the platform default.
pub struct ResolvedPath {
    pub path: PathBuf,
    pub explicit: bool,
}

/// Resolve the config path to load: `explicit` if given, otherwise
/// `<platform config dir>/config.toml`.
pub fn resolve_path(explicit: Option<PathBuf>) -> anyhow::Result<ResolvedPath> {
    match explicit {
        Some(path) => Ok(ResolvedPath { path, explicit: true }),
        None => Ok(ResolvedPath { path: netvantage_config::default_config_dir()?.join("config.toml"), explicit: false }),
    }
}

/// Load the config at `resolved.path`, writing a default file first if
/// nothing is there yet. First-run convenience only applies to the
/// default-resolved path: an explicit `--config` pointing at a missing
/// file is still an error.
pub fn load_or_seed(resolved: &ResolvedPath) -> anyhow::Result<ConfigStore> {
    let path = resolved.path.as_path();
    if !path.exists() {
        if resolved.explicit {
            anyhow::bail!("config file not found: {}", path.display());
        }
        seed_default(path)?;
    }
    ConfigStore::load(path).with_context(|| format!("loading config at {}", path.display()))
}

fn seed_default(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating config dir {}", parent.display()))?;
    }
    let default = netvantage_config::Config::default();
    let toml = toml::to_string_pretty(&default).context("serializing default config")?;
    std::fs::write(path, toml).with_context(|| format!("writing default config to {}", path.display()))?;
    tracing::info!(path = %path.display(), "seeded default config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_path_is_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = ResolvedPath { path: dir.path().join("config.toml"), explicit: false };
        load_or_seed(&resolved).unwrap();
        assert!(resolved.path.exists());
    }

    #[test]
    fn missing_explicit_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = ResolvedPath { path: dir.path().join("nope.toml"), explicit: true };
        let err = load_or_seed(&resolved).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(!resolved.path.exists());
    }

    #[test]
    fn existing_explicit_path_loads_without_seeding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml::to_string_pretty(&netvantage_config::Config::default()).unwrap()).unwrap();
        let resolved = ResolvedPath { path, explicit: true };
        load_or_seed(&resolved).unwrap();
    }
}
