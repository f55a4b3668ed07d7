//! Launch session state and failure taxonomy.
//!
//! These models are shared between the core engine and the renderer so the
//! presentation layer can display the current pipeline position without
//! understanding the worker protocol.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::process_models::FatalKind;

/// The position of a launch session within the pipeline.
///
/// Runtime-acquisition sub-flow:
/// `Idle -> CheckingRuntime -> { content flow, AwaitingRuntimeChoice ->
/// { DownloadingRuntime -> ExtractingRuntime -> RuntimeInstalled,
///   back to Idle on manual install } }`
///
/// Content sub-flow:
/// `ValidatingDistribution -> ValidatingVersion -> ValidatingAssets ->
/// ValidatingLibraries -> ValidatingFiles -> Downloading -> Extracting ->
/// PreparingLaunch -> Spawning -> Running -> Terminated`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchState {
    /// No attempt in flight. A session that returns to Idle (manual runtime
    /// install chosen) is abandoned, never resumed.
    Idle,

    /// Scanning the system for a compatible runtime installation.
    CheckingRuntime,

    /// No compatible runtime was found; waiting for the user to pick
    /// between a managed install and a manual one.
    AwaitingRuntimeChoice,

    /// Downloading the managed runtime archive.
    DownloadingRuntime,

    /// Extracting the managed runtime archive.
    ExtractingRuntime,

    /// The managed runtime is installed and selected.
    RuntimeInstalled,

    /// Content pipeline: validating the distribution index.
    ValidatingDistribution,

    /// Content pipeline: loading version metadata.
    ValidatingVersion,

    /// Content pipeline: checking asset integrity.
    ValidatingAssets,

    /// Content pipeline: checking library integrity.
    ValidatingLibraries,

    /// Content pipeline: checking miscellaneous file integrity.
    ValidatingFiles,

    /// Downloading missing content.
    Downloading,

    /// Extracting downloaded archives.
    Extracting,

    /// Waiting for the worker's final launch metadata.
    PreparingLaunch,

    /// Building and starting the game process.
    Spawning,

    /// The game process is alive and being supervised.
    Running,

    /// The attempt is over, successfully or not.
    Terminated,
}

impl LaunchState {
    /// True once the session can never advance again.
    pub fn is_terminal(self) -> bool {
        matches!(self, LaunchState::Terminated)
    }

    /// True while the session holds resources (worker channel, timers,
    /// watchers) that a new launch attempt must not inherit.
    pub fn is_active(self) -> bool {
        !matches!(self, LaunchState::Idle | LaunchState::Terminated)
    }
}

/// Classified launch failure.
///
/// Every failure transitions the session to [`LaunchState::Terminated`], is
/// surfaced upward exactly once, and maps to a distinct remediation message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum FailureKind {
    /// Connect-failure style error codes while downloading.
    NetworkUnavailable,
    /// Enqueue or download of the managed runtime failed, e.g. due to
    /// upstream page-format drift.
    RuntimeAcquisitionFailed,
    /// The worker reported (or silently omitted) required result fields.
    ValidationFailed,
    /// The game process could not start, or exited non-zero before reaching
    /// a running state.
    ProcessSpawnFailed,
    /// The game output matched a known fatal signature.
    ProcessFatalSignature(FatalKind),
    /// Any other worker-reported error.
    Unclassified,
}
