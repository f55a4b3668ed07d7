//! Interfaces to external collaborators.
//!
//! The orchestrator treats the distribution index, the account store and the
//! game process builder as black boxes behind these traits. Implementations
//! live outside the engine (renderer glue, REST clients); tests script them.

use async_trait::async_trait;
use launch_protocol::ValidationOutcome;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

/// One launchable entry in the distribution index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub id: String,
    pub name: String,
    /// Client version the entry targets, used for runtime compatibility.
    pub client_version: String,
}

/// The distribution index: the set of launchable entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionIndex {
    pub entries: Vec<DistributionEntry>,
}

impl DistributionIndex {
    pub fn entry(&self, id: &str) -> Option<&DistributionEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

/// A user account selected for the launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub display_name: String,
    pub uuid: String,
}

/// Provider of the distribution index.
#[async_trait]
pub trait DistributionProvider: Send + Sync {
    /// The locally cached index, if any copy has ever been stored.
    fn get_distribution(&self) -> Option<DistributionIndex>;

    /// Refresh the index from the remote when outdated.
    async fn pull_remote_if_outdated(&self) -> anyhow::Result<DistributionIndex>;
}

/// Source of the currently selected account.
pub trait AccountStore: Send + Sync {
    fn selected_account(&self) -> Option<Account>;
}

/// A handle to a spawned game process: an output-line stream, a kill switch
/// and an exit notification.
#[async_trait]
pub trait GameProcessHandle: Send {
    /// Next line of combined process output, `None` at end of stream.
    async fn next_line(&mut self) -> Option<String>;

    /// Force-terminate the process (non-graceful). Must not error if the
    /// process already exited.
    async fn kill(&mut self);

    /// Wait for exit and return the status code, if any.
    async fn wait(&mut self) -> Option<i32>;
}

/// Builds the game process from the session's launch metadata.
#[async_trait]
pub trait GameProcessBuilder: Send + Sync {
    async fn build(
        &self,
        entry: &DistributionEntry,
        account: &Account,
        runtime_path: &Path,
        outcome: &ValidationOutcome,
    ) -> anyhow::Result<Box<dyn GameProcessHandle>>;
}

/// [`GameProcessHandle`] backed by a `tokio::process::Child`.
pub struct ChildProcessHandle {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl ChildProcessHandle {
    /// Spawn `command` with stdout piped and wrap the result.
    pub fn spawn(mut command: Command) -> std::io::Result<Self> {
        command.stdout(Stdio::piped());
        command.stderr(Stdio::null());
        command.stdin(Stdio::null());
        let mut child = command.spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "failed to capture game stdout")
        })?;
        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl GameProcessHandle for ChildProcessHandle {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.next_line().await.ok().flatten()
    }

    async fn kill(&mut self) {
        // start_kill is a no-op error if the child already exited.
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }

    async fn wait(&mut self) -> Option<i32> {
        self.child.wait().await.ok().and_then(|status| status.code())
    }
}
