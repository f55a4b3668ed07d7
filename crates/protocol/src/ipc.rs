//! Inter-process communication protocol.
//!
//! This module defines the message types for asynchronous communication
//! between the renderer (user interface) and the Core (launch engine).
//!
//! The protocol follows an Operation/Event pattern:
//! - `Op`: Commands sent from the renderer to the Core
//! - `Event`: Status updates sent from the Core to the renderer
//!
//! Communication is asynchronous and channel-based, allowing the UI to
//! remain responsive while the core drives a launch attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ts_rs::TS;
use uuid::Uuid;

use crate::envelope::Phase;
use crate::launch_models::{FailureKind, LaunchState};

/// Operations sent from the UI (renderer) to the Core logic.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "installRuntime",
///   "payload": null
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Start a launch attempt for the currently selected distribution entry.
    ///
    /// Rejected while another session is non-terminal.
    Launch,

    /// Resolve the runtime choice: download and install a managed runtime.
    InstallRuntime,

    /// Resolve the runtime choice: the user will install a runtime manually.
    ///
    /// The session returns to Idle.
    InstallManually,

    /// Abandon the attempt before the game process is spawned.
    Abort,
}

/// State of the OS-level progress indicator (taskbar/dock).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "mode", content = "value", rename_all = "camelCase")]
pub enum OsProgress {
    /// Show a determinate fraction in `[0,1]`.
    Fraction(f64),
    /// Show an indeterminate marquee (extraction in progress).
    Indeterminate,
    /// Remove the indicator.
    Clear,
}

/// Events sent from the Core logic to the UI (renderer).
///
/// These represent state changes and status updates that the UI should
/// reflect to the user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// The session moved to a new pipeline position.
    StateChanged {
        #[ts(type = "string")]
        session_id: Uuid,
        state: LaunchState,
    },

    /// New human-readable detail text for the loading area.
    Details {
        #[ts(type = "string")]
        session_id: Uuid,
        text: String,
    },

    /// The aggregate progress percentage changed. Never decreases within
    /// one pipeline flow; it resets to zero when the content flow begins.
    Progress {
        #[ts(type = "string")]
        session_id: Uuid,
        percent: f64,
    },

    /// A phase with a presentation concern (e.g. the extraction ticker)
    /// was entered.
    PhaseEntered {
        #[ts(type = "string")]
        session_id: Uuid,
        phase: Phase,
    },

    /// The matching phase was left. Always emitted on every exit path so
    /// presentation timers can be stopped.
    PhaseLeft {
        #[ts(type = "string")]
        session_id: Uuid,
        phase: Phase,
    },

    /// No compatible runtime was found; the UI must ask the user to choose
    /// between a managed install and a manual one.
    RuntimeChoiceRequired {
        #[ts(type = "string")]
        session_id: Uuid,
    },

    /// The OS-level progress indicator should change.
    OsProgress {
        #[ts(type = "string")]
        session_id: Uuid,
        progress: OsProgress,
    },

    /// The attempt failed. Carries the classified kind and its remediation
    /// text. Emitted exactly once per failed attempt.
    LaunchFailed {
        #[ts(type = "string")]
        session_id: Uuid,
        kind: FailureKind,
        remediation: String,
    },

    /// A new file appeared in the session's crash-report directory. The
    /// process may still be alive or already dead.
    CrashReportDetected {
        #[ts(type = "string")]
        session_id: Uuid,
        path: PathBuf,
        #[ts(type = "string")]
        detected_at: DateTime<Utc>,
    },

    /// The game finished loading and the minimum linger elapsed; the UI
    /// loading phase is complete.
    GameReady {
        #[ts(type = "string")]
        session_id: Uuid,
    },

    /// The selected account joined a hosted session.
    GameSessionJoined {
        #[ts(type = "string")]
        session_id: Uuid,
    },

    /// The selected account left a hosted session.
    GameSessionLeft {
        #[ts(type = "string")]
        session_id: Uuid,
    },

    /// The game process exited.
    GameExited {
        #[ts(type = "string")]
        session_id: Uuid,
        code: Option<i32>,
    },
}
