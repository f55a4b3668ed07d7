//! Game process output classification results.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Distinguishes the two known fatal output signatures, each with its own
/// recommended remediation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub enum FatalKind {
    /// The main launch class is missing: a required dependency failed to
    /// download properly.
    DependencyDownload,
    /// The security manager trapped an exit before the game window could
    /// open: an early mod-initialization crash.
    EarlyModInit,
}

/// Classification of a single line of game process output.
///
/// Derived per line against an ordered pattern set (first match wins);
/// never persisted. Lines matching nothing yield no event.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(tag = "event", content = "detail", rename_all = "camelCase")]
pub enum ProcessEvent {
    /// The client finished loading (sound engine started).
    Ready,
    /// The selected account joined a hosted session.
    Joined,
    /// The selected account left a hosted session.
    Left,
    /// A known fatal signature; the process will be force-terminated.
    Fatal(FatalKind),
}
