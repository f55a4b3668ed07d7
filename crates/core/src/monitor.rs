//! Game process lifecycle supervision.
//!
//! Once the game process is spawned, every output line is classified against
//! a small ordered pattern set (first match wins) to detect readiness,
//! session join/leave, and the two known fatal signatures. Independently, the
//! session's crash-report directory is watched for new files.

use launch_protocol::{FatalKind, ProcessEvent};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::collaborators::GameProcessHandle;

/// The main launch class is missing: a dependency failed to download.
const MISSING_LAUNCH_CLASS_SIGNATURE: &str =
    "Could not find or load main class net.minecraft.launchwrapper.Launch";

/// The security manager trapped an exit before the window opened.
const EXIT_TRAPPED_SIGNATURE: &str =
    "net.minecraftforge.fml.relauncher.FMLSecurityManager$ExitTrappedException";

/// Per-line output classifier scoped to the launching account.
pub struct OutputClassifier {
    ready: Regex,
    joined: Regex,
    left: Regex,
}

impl OutputClassifier {
    /// Build the pattern set for one session. The join/leave markers are
    /// scoped to the selected account's display name.
    pub fn new(display_name: &str) -> Result<Self, regex::Error> {
        let name = regex::escape(display_name);
        Ok(Self {
            ready: Regex::new(r"\[.+\]: Sound engine started")?,
            joined: Regex::new(&format!(r"\[.+\]: \[CHAT\] {} has joined!", name))?,
            left: Regex::new(&format!(r"\[.+\]: \[CHAT\] {} has left!", name))?,
        })
    }

    /// Classify one output line. Ordered, first match wins; most lines
    /// match nothing.
    pub fn classify(&self, line: &str) -> Option<ProcessEvent> {
        if self.ready.is_match(line) {
            Some(ProcessEvent::Ready)
        } else if self.joined.is_match(line) {
            Some(ProcessEvent::Joined)
        } else if self.left.is_match(line) {
            Some(ProcessEvent::Left)
        } else if line.contains(MISSING_LAUNCH_CLASS_SIGNATURE) {
            Some(ProcessEvent::Fatal(FatalKind::DependencyDownload))
        } else if line.contains(EXIT_TRAPPED_SIGNATURE) {
            Some(ProcessEvent::Fatal(FatalKind::EarlyModInit))
        } else {
            None
        }
    }
}

/// A signal from the supervised game process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameSignal {
    Output(ProcessEvent),
    Exited(Option<i32>),
}

/// Supervise a spawned game process: classify its output and report exit.
///
/// On a fatal signature the process is force-terminated and no further
/// lines are classified. The task ends when the process does; dropping the
/// returned handle aborts supervision (detaching the output listener).
pub fn supervise(
    mut handle: Box<dyn GameProcessHandle>,
    classifier: OutputClassifier,
    tx: mpsc::UnboundedSender<GameSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = handle.next_line().await {
            let Some(event) = classifier.classify(line.trim()) else {
                continue;
            };
            let fatal = matches!(event, ProcessEvent::Fatal(_));
            if tx.send(GameSignal::Output(event)).is_err() {
                return;
            }
            if fatal {
                handle.kill().await;
                return;
            }
        }
        let code = handle.wait().await;
        let _ = tx.send(GameSignal::Exited(code));
    })
}

/// Live watch on a crash-report directory. Dropping it detaches the watch.
pub struct CrashWatcher {
    _watcher: RecommendedWatcher,
}

/// Watch `dir` for newly created files, reporting each as a crash artifact
/// path. Event-driven, never polling; the watcher does not touch the files.
pub fn watch_crash_reports(
    dir: &Path,
    tx: mpsc::UnboundedSender<PathBuf>,
) -> notify::Result<CrashWatcher> {
    let mut watcher =
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Create(_)) {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
            }
            Err(error) => tracing::warn!("crash watcher error: {}", error),
        })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(CrashWatcher { _watcher: watcher })
}
