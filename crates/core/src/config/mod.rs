//! Launcher configuration loading.
//!
//! Settings are read from a single `launcher.toml` inside the launcher data
//! directory. A missing file yields defaults; a malformed one is a typed
//! error.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, resolve_runtime_executable};
pub use models::LauncherConfig;
