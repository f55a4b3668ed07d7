//! Failure classification.
//!
//! Turns worker error envelopes and process exit codes into the small
//! [`FailureKind`] taxonomy and maps each kind to user-facing remediation
//! text. Classification is pure; the state machine decides what to do with
//! the result (always: terminate, disconnect, clear the OS indicator).

use launch_protocol::{ErrorDetail, FailureKind, FatalKind};

/// Error codes indicating the file server could not be reached.
const CONNECT_FAILURE_CODES: &[&str] = &[
    "ENOENT",
    "ECONNREFUSED",
    "ECONNRESET",
    "ETIMEDOUT",
    "ENOTFOUND",
];

/// Classify a worker-reported error envelope.
pub fn classify_error(detail: &ErrorDetail) -> FailureKind {
    match detail.code.as_deref() {
        Some(code) if CONNECT_FAILURE_CODES.contains(&code) => FailureKind::NetworkUnavailable,
        _ => FailureKind::Unclassified,
    }
}

/// Classify a worker process that exited with non-zero status without
/// having sent an error envelope first.
pub fn classify_worker_exit(code: Option<i32>) -> Option<FailureKind> {
    match code {
        Some(0) => None,
        _ => Some(FailureKind::Unclassified),
    }
}

/// User-facing remediation text for a classified failure.
pub fn remediation(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::NetworkUnavailable => {
            "Could not connect to the file server. Ensure that you are \
             connected to the internet and try again."
        }
        FailureKind::RuntimeAcquisitionFailed => {
            "We could not download a managed runtime. You will need to \
             install a copy manually, then launch again."
        }
        FailureKind::ValidationFailed => {
            "Launch validation did not produce the required metadata. \
             Try again; if this keeps happening, contact support."
        }
        FailureKind::ProcessSpawnFailed => {
            "The game process could not be started. Check the log output \
             and try again."
        }
        FailureKind::ProcessFatalSignature(FatalKind::DependencyDownload) => {
            "A required launch dependency failed to download properly, so \
             the game cannot start. Temporarily disable your antivirus \
             software and launch again."
        }
        FailureKind::ProcessFatalSignature(FatalKind::EarlyModInit) => {
            "The game crashed before it could open a window, commonly \
             caused by a mod mismatch early during launch. Remove any \
             custom drop-in mods and try again."
        }
        FailureKind::Unclassified => {
            "An unexpected error occurred during launch. Check the log \
             output for details and try again."
        }
    }
}
