//! Launcher configuration model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::collaborators::Account;

/// Settings loaded from `launcher.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Root directory for launcher data (instances, runtimes, caches).
    pub data_directory: PathBuf,

    /// Directory shared across instances (assets, libraries).
    pub common_directory: PathBuf,

    /// Directory holding per-entry game instances.
    pub instance_directory: PathBuf,

    /// Path to the worker executable driven over the channel.
    pub worker_binary: PathBuf,

    /// Explicit runtime executable. When unset, the runtime-acquisition
    /// flow discovers or installs one.
    pub runtime_executable: Option<PathBuf>,

    /// Id of the selected distribution entry, if any.
    pub selected_entry: Option<String>,

    /// The selected account. Account management proper lives outside the
    /// engine; this is only the selection snapshot.
    pub account: Option<Account>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        let data = PathBuf::from(".launchkit");
        Self {
            common_directory: data.join("common"),
            instance_directory: data.join("instances"),
            worker_binary: data.join("bin").join("launch-worker"),
            data_directory: data,
            runtime_executable: None,
            selected_entry: None,
            account: None,
        }
    }
}

impl LauncherConfig {
    /// The crash-report directory for one instance.
    pub fn crash_report_directory(&self, entry_id: &str) -> PathBuf {
        self.instance_directory.join(entry_id).join("crash-reports")
    }
}
