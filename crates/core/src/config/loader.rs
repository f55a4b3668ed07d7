//! Configuration file loader.

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::LauncherConfig;
use std::path::{Path, PathBuf};

/// Load launcher settings from `launcher.toml` under `root`.
///
/// A missing file returns the defaults; read and parse failures are typed
/// errors.
pub fn load_config(root: &Path) -> ConfigResult<LauncherConfig> {
    let config_path = root.join("launcher.toml");

    if !config_path.exists() {
        return Ok(LauncherConfig::default());
    }

    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;

    let config: LauncherConfig =
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: config_path,
            source,
        })?;

    Ok(config)
}

/// Resolve the runtime executable to try first: the configured override, or
/// whatever a system lookup finds on PATH.
pub fn resolve_runtime_executable(config: &LauncherConfig) -> Option<PathBuf> {
    if let Some(ref explicit) = config.runtime_executable {
        return Some(explicit.clone());
    }
    which::which("java").ok()
}
