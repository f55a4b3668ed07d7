//! Worker wire protocol.
//!
//! The worker is an isolated process that performs runtime discovery, content
//! validation and downloads on behalf of the orchestrator. It reports back
//! with [`Envelope`] values (one JSON object per line) and accepts
//! [`WorkerCommand`] values on its stdin.
//!
//! Every envelope belongs to exactly one in-flight request. Envelopes arrive
//! in phase order, but `progress` envelopes within a phase may repeat any
//! number of times before the `complete` for that phase.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Discriminant identifying what an envelope is reporting.
///
/// Unknown contexts fail deserialization at the channel boundary instead of
/// being dispatched on ad hoc field presence.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub enum EnvelopeContext {
    /// A validation stage finished for the phase named in `phase`.
    Validate,
    /// Phase-local progress; `value`/`total` carry the counter.
    Progress,
    /// The phase named in `phase` is done.
    Complete,
    /// The worker hit an error; `error` carries the detail.
    Error,
    /// Result of the system runtime scan; `result` is the discovered
    /// executable path, or null when none was found.
    ValidateJava,
    /// Final validation result; `result` carries the launch metadata.
    ValidateEverything,
    /// Result of enqueueing the managed runtime download; `result` is a
    /// boolean success flag.
    EnqueueRuntime,
}

/// A named stage within a pipeline, each with its own progress counter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Distribution,
    Version,
    Assets,
    Libraries,
    Files,
    Download,
    Extract,
    Runtime,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Distribution => "distribution",
            Phase::Version => "version",
            Phase::Assets => "assets",
            Phase::Libraries => "libraries",
            Phase::Files => "files",
            Phase::Download => "download",
            Phase::Extract => "extract",
            Phase::Runtime => "runtime",
        };
        write!(f, "{}", name)
    }
}

/// Structured failure detail reported by the worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. `ENOENT`), when the worker has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

/// A unit of worker-to-orchestrator communication.
///
/// Conceptual JSON shape:
///
/// ```json
/// { "context": "progress", "phase": "download",
///   "value": 1024, "total": 4096, "percent": 25.0 }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Envelope {
    pub context: EnvelopeContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    /// Context-specific payload, decoded into a typed value by the state
    /// machine (see [`ValidationOutcome`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "any")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl Envelope {
    fn bare(context: EnvelopeContext) -> Self {
        Self {
            context,
            phase: None,
            value: None,
            total: None,
            percent: None,
            result: None,
            error: None,
        }
    }

    /// A `validate` envelope for the given phase.
    pub fn validate(phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            ..Self::bare(EnvelopeContext::Validate)
        }
    }

    /// A `progress` envelope carrying a phase-local counter.
    pub fn progress(phase: Phase, value: u64, total: u64) -> Self {
        Self {
            phase: Some(phase),
            value: Some(value),
            total: Some(total),
            ..Self::bare(EnvelopeContext::Progress)
        }
    }

    /// A `complete` envelope for the given phase.
    pub fn complete(phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            ..Self::bare(EnvelopeContext::Complete)
        }
    }

    /// An `error` envelope with structured detail.
    pub fn error(phase: Option<Phase>, error: ErrorDetail) -> Self {
        Self {
            phase,
            error: Some(error),
            ..Self::bare(EnvelopeContext::Error)
        }
    }

    /// An envelope carrying a context-specific result payload.
    pub fn result(context: EnvelopeContext, result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            ..Self::bare(context)
        }
    }
}

/// Launch metadata reported by the worker's final `validateEverything` pass.
///
/// Both payloads are required to build the game process. The worker sometimes
/// omits one without sending an explicit error envelope; the state machine
/// treats that as a fatal validation failure.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    /// Runtime version metadata for the selected client version.
    #[ts(type = "any")]
    pub version_data: Option<serde_json::Value>,
    /// Distribution build metadata for the selected entry.
    #[ts(type = "any")]
    pub build_data: Option<serde_json::Value>,
}

impl ValidationOutcome {
    /// True when both required metadata payloads are present.
    pub fn is_complete(&self) -> bool {
        self.version_data.is_some() && self.build_data.is_some()
    }
}

/// Fire-and-forget command sent to the worker.
///
/// Wire shape matches the worker side exactly:
///
/// ```json
/// { "task": "execute", "function": "validateEverything", "argsArr": [...] }
/// { "task": "changeContext", "class": "AssetGuard", "args": [...] }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "task", rename_all = "camelCase")]
pub enum WorkerCommand {
    Execute {
        function: String,
        #[serde(rename = "argsArr")]
        #[ts(type = "any[]")]
        args_arr: Vec<serde_json::Value>,
    },
    ChangeContext {
        class: String,
        #[ts(type = "any[]")]
        args: Vec<serde_json::Value>,
    },
}

impl WorkerCommand {
    /// Shorthand for an `execute` command.
    pub fn execute(function: &str, args_arr: Vec<serde_json::Value>) -> Self {
        WorkerCommand::Execute {
            function: function.to_string(),
            args_arr,
        }
    }

    /// Shorthand for a `changeContext` command.
    pub fn change_context(class: &str, args: Vec<serde_json::Value>) -> Self {
        WorkerCommand::ChangeContext {
            class: class.to_string(),
            args,
        }
    }
}
