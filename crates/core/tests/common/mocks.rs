//! Mock collaborators for driving the orchestrator without any real
//! network, account system or game process.

use async_trait::async_trait;
use launch_core::collaborators::{
    Account, AccountStore, DistributionEntry, DistributionIndex, DistributionProvider,
    GameProcessBuilder, GameProcessHandle,
};
use launch_protocol::ValidationOutcome;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Distribution provider with a fixed index and a scriptable remote.
pub struct StaticDistributionProvider {
    cached: Option<DistributionIndex>,
    remote_ok: bool,
}

impl StaticDistributionProvider {
    /// Remote pulls succeed and return `index`.
    pub fn online(index: DistributionIndex) -> Self {
        Self {
            cached: Some(index),
            remote_ok: true,
        }
    }

    /// Remote pulls fail, but a cached copy exists.
    pub fn cached_only(index: DistributionIndex) -> Self {
        Self {
            cached: Some(index),
            remote_ok: false,
        }
    }

    /// Remote pulls fail and nothing is cached.
    pub fn unavailable() -> Self {
        Self {
            cached: None,
            remote_ok: false,
        }
    }
}

#[async_trait]
impl DistributionProvider for StaticDistributionProvider {
    fn get_distribution(&self) -> Option<DistributionIndex> {
        self.cached.clone()
    }

    async fn pull_remote_if_outdated(&self) -> anyhow::Result<DistributionIndex> {
        if !self.remote_ok {
            anyhow::bail!("remote distribution host unreachable");
        }
        self.cached
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no distribution"))
    }
}

/// Account store returning a fixed selection.
pub struct StaticAccountStore {
    account: Option<Account>,
}

impl StaticAccountStore {
    pub fn new(account: Option<Account>) -> Self {
        Self { account }
    }
}

impl AccountStore for StaticAccountStore {
    fn selected_account(&self) -> Option<Account> {
        self.account.clone()
    }
}

/// Game process that replays scripted output lines, then exits.
pub struct ScriptedGameProcess {
    lines: VecDeque<String>,
    exit_code: Option<i32>,
    killed: Arc<AtomicBool>,
}

#[async_trait]
impl GameProcessHandle for ScriptedGameProcess {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    async fn kill(&mut self) {
        self.killed.store(true, Ordering::SeqCst);
        self.lines.clear();
    }

    async fn wait(&mut self) -> Option<i32> {
        self.exit_code
    }
}

/// Game process builder handing out scripted processes, recording every
/// build request.
pub struct ScriptedGameBuilder {
    lines: Vec<String>,
    exit_code: Option<i32>,
    fail_build: bool,
    builds: AtomicUsize,
    killed: Arc<AtomicBool>,
    runtime_paths: Mutex<Vec<PathBuf>>,
}

impl ScriptedGameBuilder {
    pub fn new(lines: Vec<&str>, exit_code: Option<i32>) -> Self {
        Self {
            lines: lines.into_iter().map(str::to_string).collect(),
            exit_code,
            fail_build: false,
            builds: AtomicUsize::new(0),
            killed: Arc::new(AtomicBool::new(false)),
            runtime_paths: Mutex::new(Vec::new()),
        }
    }

    /// A builder whose `build` always fails.
    pub fn failing() -> Self {
        let mut builder = Self::new(Vec::new(), None);
        builder.fail_build = true;
        builder
    }

    /// How many times the orchestrator asked for a game process.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Whether the last scripted process was force-killed.
    pub fn killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Runtime executables the orchestrator built with.
    pub fn runtime_paths(&self) -> Vec<PathBuf> {
        self.runtime_paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl GameProcessBuilder for ScriptedGameBuilder {
    async fn build(
        &self,
        _entry: &DistributionEntry,
        _account: &Account,
        runtime_path: &Path,
        _outcome: &ValidationOutcome,
    ) -> anyhow::Result<Box<dyn GameProcessHandle>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.runtime_paths
            .lock()
            .unwrap()
            .push(runtime_path.to_path_buf());
        if self.fail_build {
            anyhow::bail!("scripted build failure");
        }
        Ok(Box::new(ScriptedGameProcess {
            lines: self.lines.iter().cloned().collect(),
            exit_code: self.exit_code,
            killed: Arc::clone(&self.killed),
        }))
    }
}
