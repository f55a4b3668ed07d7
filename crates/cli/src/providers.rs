//! File-backed collaborator implementations for the CLI.
//!
//! The engine only knows the collaborator traits; these are the concrete
//! pieces the CLI wires in. The distribution index is a JSON file in the
//! data directory, the account comes from `launcher.toml`, and the game
//! process is a plain child process of the resolved runtime.

use anyhow::Context;
use async_trait::async_trait;
use launch_core::collaborators::{
    Account, AccountStore, ChildProcessHandle, DistributionEntry, DistributionIndex,
    DistributionProvider, GameProcessBuilder, GameProcessHandle,
};
use launch_protocol::ValidationOutcome;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Distribution index read from `distribution.json` in the data directory.
///
/// Retrieval and cache maintenance live outside the engine; as far as the
/// CLI is concerned, whatever is on disk is the cache, and a fresh read is
/// the closest thing to a remote pull.
pub struct FileDistributionProvider {
    path: PathBuf,
}

impl FileDistributionProvider {
    pub fn new(data_directory: &Path) -> Self {
        Self {
            path: data_directory.join("distribution.json"),
        }
    }

    fn read(&self) -> anyhow::Result<DistributionIndex> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))
    }
}

#[async_trait]
impl DistributionProvider for FileDistributionProvider {
    fn get_distribution(&self) -> Option<DistributionIndex> {
        self.read().ok()
    }

    async fn pull_remote_if_outdated(&self) -> anyhow::Result<DistributionIndex> {
        self.read()
    }
}

/// Account selection snapshotted from the launcher configuration.
pub struct ConfigAccountStore {
    account: Option<Account>,
}

impl ConfigAccountStore {
    pub fn new(account: Option<Account>) -> Self {
        Self { account }
    }
}

impl AccountStore for ConfigAccountStore {
    fn selected_account(&self) -> Option<Account> {
        self.account.clone()
    }
}

/// Builds the game as a child process of the resolved runtime executable.
///
/// The validated launch metadata is written to a per-instance profile file
/// and handed to the client on its command line.
pub struct CommandGameBuilder {
    instance_directory: PathBuf,
}

impl CommandGameBuilder {
    pub fn new(instance_directory: PathBuf) -> Self {
        Self { instance_directory }
    }
}

#[async_trait]
impl GameProcessBuilder for CommandGameBuilder {
    async fn build(
        &self,
        entry: &DistributionEntry,
        account: &Account,
        runtime_path: &Path,
        outcome: &ValidationOutcome,
    ) -> anyhow::Result<Box<dyn GameProcessHandle>> {
        let instance = self.instance_directory.join(&entry.id);
        tokio::fs::create_dir_all(&instance)
            .await
            .with_context(|| format!("creating {}", instance.display()))?;

        let profile = instance.join("launch-profile.json");
        let payload = serde_json::json!({
            "entry": entry.id,
            "account": { "displayName": account.display_name, "uuid": account.uuid },
            "versionData": outcome.version_data,
            "buildData": outcome.build_data,
        });
        tokio::fs::write(&profile, serde_json::to_vec_pretty(&payload)?)
            .await
            .with_context(|| format!("writing {}", profile.display()))?;

        let mut command = Command::new(runtime_path);
        command
            .arg("-jar")
            .arg(instance.join("client.jar"))
            .arg("--profile")
            .arg(&profile)
            .current_dir(&instance);

        let handle = ChildProcessHandle::spawn(command).context("spawning game process")?;
        Ok(Box::new(handle))
    }
}
