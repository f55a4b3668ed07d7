//! The launch state machine.
//!
//! An explicit transition table: `handle(event)` is a pure-ish function from
//! the current state and one input to the next state plus a list of
//! [`Effect`]s. The machine performs no I/O; the orchestrator interprets the
//! effects (send a worker command, spawn the game, emit a UI event). This
//! keeps every transition independently testable without a worker process.
//!
//! Two sub-flows share the table. The runtime flow scans for a usable
//! runtime and, if the user accepts, downloads and installs a managed one.
//! The content flow validates and downloads game content, then spawns and
//! supervises the game process. A session that fails anywhere ends in
//! [`LaunchState::Terminated`] with exactly one classified failure.

use launch_protocol::{
    Envelope, EnvelopeContext, FailureKind, LaunchState, OsProgress, Phase, ProcessEvent,
    ValidationOutcome,
};
use std::path::PathBuf;

use crate::failure::{classify_error, classify_worker_exit};
use crate::progress::{ProgressTracker, CONTENT_WEIGHTS, RUNTIME_WEIGHTS};
use crate::worker::WorkerExit;

/// One input to the state machine.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A protocol message from the live worker channel.
    Envelope(Envelope),
    /// The live worker channel delivered its exit notice.
    WorkerExited(WorkerExit),
    /// The user chose the managed runtime install.
    RuntimeInstallAccepted,
    /// The user will install a runtime manually; the attempt is abandoned.
    ManualInstallChosen,
    /// The user abandoned the attempt before the game was spawned.
    Aborted,
    /// The game process started successfully.
    GameSpawned,
    /// The game process could not be built or started.
    SpawnFailed,
    /// A classified line of game output.
    GameOutput(ProcessEvent),
    /// The game process exited.
    GameExited(Option<i32>),
    /// The minimum linger after spawn elapsed.
    LingerElapsed,
}

/// A worker function the orchestrator should invoke on the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRequest {
    /// Scan the system for a compatible runtime (`validateJava`).
    ScanRuntime,
    /// Enqueue the managed runtime download (`enqueueRuntime`).
    AcquireRuntime,
    /// Drain the download queue built by [`WorkerRequest::AcquireRuntime`].
    ProcessDownloadQueue,
}

/// An instruction to the orchestrator, produced by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Invoke a worker function on the live channel.
    SendWorker(WorkerRequest),
    /// Disconnect the live worker channel (idempotent).
    DisconnectWorker,
    /// Tear down the runtime worker and start the content flow: spawn the
    /// content worker and invoke its full validation pass.
    BeginContentFlow,
    /// New loading-area detail text.
    SetDetails(&'static str),
    /// New aggregate progress percent for the current flow.
    SetProgress(f64),
    /// New OS-level progress indicator state.
    OsProgress(OsProgress),
    /// A phase with a presentation concern was entered.
    EnterPhase(Phase),
    /// The matching phase was left; emitted on every exit path.
    LeavePhase(Phase),
    /// Ask the user to choose between a managed and a manual runtime
    /// install.
    AwaitRuntimeChoice,
    /// Record the resolved runtime executable for this and future attempts.
    PersistRuntimePath(PathBuf),
    /// Build and start the game process from the validated metadata.
    SpawnGame(ValidationOutcome),
    /// Arm the minimum-linger timer.
    ScheduleLinger,
    /// The game finished loading and the linger elapsed.
    NotifyReady,
    /// The account joined a hosted session.
    NotifyJoined,
    /// The account left a hosted session.
    NotifyLeft,
    /// The attempt failed; emitted at most once per session.
    Fail(FailureKind),
    /// The attempt ran to completion and the game exited.
    Finished(Option<i32>),
}

/// The transition table plus the per-attempt bookkeeping it needs.
#[derive(Debug)]
pub struct LaunchMachine {
    state: LaunchState,
    tracker: ProgressTracker,
    failure: Option<FailureKind>,
    ready_seen: bool,
    linger_done: bool,
    ready_notified: bool,
    in_extract: bool,
}

impl Default for LaunchMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchMachine {
    pub fn new() -> Self {
        Self {
            state: LaunchState::Idle,
            tracker: ProgressTracker::new(RUNTIME_WEIGHTS),
            failure: None,
            ready_seen: false,
            linger_done: false,
            ready_notified: false,
            in_extract: false,
        }
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    /// The classified failure, once the session has failed.
    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    /// Start the attempt: scan the system for a compatible runtime.
    pub fn begin(&mut self) -> Vec<Effect> {
        self.state = LaunchState::CheckingRuntime;
        vec![
            Effect::SetDetails("Checking system runtime.."),
            Effect::SendWorker(WorkerRequest::ScanRuntime),
        ]
    }

    /// Feed one event through the transition table.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        match event {
            SessionEvent::Envelope(envelope) => self.on_envelope(envelope),
            SessionEvent::WorkerExited(exit) => self.on_worker_exited(exit),
            SessionEvent::RuntimeInstallAccepted => self.on_install_accepted(),
            SessionEvent::ManualInstallChosen => self.on_manual_install(),
            SessionEvent::Aborted => self.on_aborted(),
            SessionEvent::GameSpawned => self.on_game_spawned(),
            SessionEvent::SpawnFailed => self.fail(FailureKind::ProcessSpawnFailed),
            SessionEvent::GameOutput(output) => self.on_game_output(output),
            SessionEvent::GameExited(code) => self.on_game_exited(code),
            SessionEvent::LingerElapsed => self.on_linger_elapsed(),
        }
    }

    fn on_envelope(&mut self, envelope: Envelope) -> Vec<Effect> {
        match envelope.context {
            EnvelopeContext::Validate => match envelope.phase {
                Some(phase) => self.on_validated(phase),
                None => Vec::new(),
            },
            EnvelopeContext::Progress => match envelope.phase {
                Some(phase) => self.on_progress(
                    phase,
                    envelope.value.unwrap_or(0),
                    envelope.total.unwrap_or(0),
                ),
                None => Vec::new(),
            },
            EnvelopeContext::Complete => match envelope.phase {
                Some(phase) => self.on_complete(phase, envelope.result),
                None => Vec::new(),
            },
            EnvelopeContext::Error => {
                let kind = envelope
                    .error
                    .as_ref()
                    .map(classify_error)
                    .unwrap_or(FailureKind::Unclassified);
                self.fail(kind)
            }
            EnvelopeContext::ValidateJava => self.on_runtime_scanned(envelope.result),
            EnvelopeContext::ValidateEverything => self.on_validated_everything(envelope.result),
            EnvelopeContext::EnqueueRuntime => self.on_runtime_enqueued(envelope.result),
        }
    }

    /// A `validate` envelope reports that the named phase finished; the
    /// session advances to the next pipeline position. Envelopes naming any
    /// other phase than the one in flight are ignored.
    fn on_validated(&mut self, phase: Phase) -> Vec<Effect> {
        let transition = match (self.state, phase) {
            (LaunchState::ValidatingDistribution, Phase::Distribution) => Some((
                LaunchState::ValidatingVersion,
                "Loading version information..",
            )),
            (LaunchState::ValidatingVersion, Phase::Version) => Some((
                LaunchState::ValidatingAssets,
                "Validating asset integrity..",
            )),
            (LaunchState::ValidatingAssets, Phase::Assets) => Some((
                LaunchState::ValidatingLibraries,
                "Validating library integrity..",
            )),
            (LaunchState::ValidatingLibraries, Phase::Libraries) => Some((
                LaunchState::ValidatingFiles,
                "Validating miscellaneous file integrity..",
            )),
            (LaunchState::ValidatingFiles, Phase::Files) => {
                Some((LaunchState::Downloading, "Downloading files.."))
            }
            _ => None,
        };

        let Some((next, details)) = transition else {
            return Vec::new();
        };
        self.state = next;
        let mut effects = vec![Effect::SetDetails(details)];
        if let Some(percent) = self.tracker.complete(phase) {
            effects.push(Effect::SetProgress(percent));
        }
        effects
    }

    fn on_progress(&mut self, phase: Phase, value: u64, total: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        match (self.state, phase) {
            (LaunchState::ValidatingAssets, Phase::Assets) => {
                if let Some(percent) = self.tracker.update(phase, value, total) {
                    effects.push(Effect::SetProgress(percent));
                }
            }
            (LaunchState::DownloadingRuntime, Phase::Download)
            | (LaunchState::ValidatingFiles | LaunchState::Downloading, Phase::Download) => {
                if self.state == LaunchState::ValidatingFiles {
                    self.state = LaunchState::Downloading;
                }
                if let Some(percent) = self.tracker.update(phase, value, total) {
                    effects.push(Effect::SetProgress(percent));
                    effects.push(Effect::OsProgress(OsProgress::Fraction(percent / 100.0)));
                }
            }
            (
                LaunchState::Downloading | LaunchState::Extracting | LaunchState::ExtractingRuntime,
                Phase::Extract,
            ) => {
                if self.state == LaunchState::Downloading {
                    self.state = LaunchState::Extracting;
                }
                effects.extend(self.enter_extract("Extracting libraries"));
                if let Some(percent) = self.tracker.update(phase, value, total) {
                    effects.push(Effect::SetProgress(percent));
                }
            }
            _ => {}
        }
        effects
    }

    fn on_complete(&mut self, phase: Phase, result: Option<serde_json::Value>) -> Vec<Effect> {
        match (self.state, phase) {
            // Runtime flow: the archive is downloaded, extraction begins.
            (LaunchState::DownloadingRuntime, Phase::Download) => {
                self.state = LaunchState::ExtractingRuntime;
                let mut effects = self.enter_extract("Extracting");
                if let Some(percent) = self.tracker.complete(Phase::Download) {
                    effects.push(Effect::SetProgress(percent));
                }
                effects
            }
            // Runtime flow: extraction finished; the result carries the
            // installed executable path.
            (
                LaunchState::DownloadingRuntime | LaunchState::ExtractingRuntime,
                Phase::Runtime,
            ) => {
                self.state = LaunchState::RuntimeInstalled;
                let mut effects = self.leave_extract();
                if let Some(percent) = self.tracker.complete(Phase::Extract) {
                    effects.push(Effect::SetProgress(percent));
                }
                effects.push(Effect::OsProgress(OsProgress::Clear));
                effects.push(Effect::SetDetails("Runtime installed!"));
                if let Some(path) = result.as_ref().and_then(|v| v.as_str()) {
                    effects.push(Effect::PersistRuntimePath(PathBuf::from(path)));
                }
                effects.push(Effect::DisconnectWorker);
                effects.extend(self.begin_content());
                effects
            }
            // Content flow: download (and any extraction) is done.
            (
                LaunchState::ValidatingFiles | LaunchState::Downloading | LaunchState::Extracting,
                Phase::Download | Phase::Extract,
            ) => {
                self.state = LaunchState::PreparingLaunch;
                let mut effects = self.leave_extract();
                if let Some(percent) = self.tracker.complete(phase) {
                    effects.push(Effect::SetProgress(percent));
                }
                effects.push(Effect::OsProgress(OsProgress::Clear));
                effects.push(Effect::SetDetails("Preparing to launch.."));
                effects
            }
            _ => Vec::new(),
        }
    }

    fn on_runtime_scanned(&mut self, result: Option<serde_json::Value>) -> Vec<Effect> {
        if self.state != LaunchState::CheckingRuntime {
            return Vec::new();
        }
        match result.as_ref().and_then(|v| v.as_str()) {
            Some(path) => {
                let mut effects = vec![
                    Effect::PersistRuntimePath(PathBuf::from(path)),
                    Effect::DisconnectWorker,
                ];
                effects.extend(self.begin_content());
                effects
            }
            None => {
                self.state = LaunchState::AwaitingRuntimeChoice;
                vec![Effect::AwaitRuntimeChoice]
            }
        }
    }

    fn on_runtime_enqueued(&mut self, result: Option<serde_json::Value>) -> Vec<Effect> {
        if self.state != LaunchState::DownloadingRuntime {
            return Vec::new();
        }
        if result.as_ref().and_then(|v| v.as_bool()) == Some(true) {
            vec![
                Effect::SetDetails("Downloading runtime.."),
                Effect::SendWorker(WorkerRequest::ProcessDownloadQueue),
            ]
        } else {
            // Enqueue failed, usually upstream page-format drift.
            self.fail(FailureKind::RuntimeAcquisitionFailed)
        }
    }

    fn on_validated_everything(&mut self, result: Option<serde_json::Value>) -> Vec<Effect> {
        if self.state == LaunchState::Spawning || self.state == LaunchState::Running {
            return Vec::new();
        }
        let outcome = result
            .and_then(|v| serde_json::from_value::<ValidationOutcome>(v).ok())
            .unwrap_or_default();
        // Both metadata payloads are required; a silently missing one is a
        // validation failure even without an error envelope.
        if !outcome.is_complete() {
            return self.fail(FailureKind::ValidationFailed);
        }
        self.state = LaunchState::Spawning;
        let mut effects = self.leave_extract();
        if let Some(percent) = self.tracker.snap_to(100.0) {
            effects.push(Effect::SetProgress(percent));
        }
        effects.push(Effect::SetDetails("Launching game.."));
        effects.push(Effect::DisconnectWorker);
        effects.push(Effect::SpawnGame(outcome));
        effects
    }

    fn on_worker_exited(&mut self, exit: WorkerExit) -> Vec<Effect> {
        if !self.worker_driven() {
            return Vec::new();
        }
        // A worker that goes away mid-flow is a failure even when it exited
        // cleanly; the pipeline cannot advance without it.
        let kind = classify_worker_exit(exit.code).unwrap_or(FailureKind::Unclassified);
        self.fail(kind)
    }

    fn on_install_accepted(&mut self) -> Vec<Effect> {
        if self.state != LaunchState::AwaitingRuntimeChoice {
            return Vec::new();
        }
        self.state = LaunchState::DownloadingRuntime;
        vec![
            Effect::SetDetails("Preparing runtime download.."),
            Effect::SendWorker(WorkerRequest::AcquireRuntime),
        ]
    }

    fn on_manual_install(&mut self) -> Vec<Effect> {
        if self.state != LaunchState::AwaitingRuntimeChoice {
            return Vec::new();
        }
        // The attempt is abandoned; a later launch starts over from Idle.
        self.state = LaunchState::Idle;
        vec![Effect::DisconnectWorker]
    }

    fn on_aborted(&mut self) -> Vec<Effect> {
        if matches!(self.state, LaunchState::Running) {
            return Vec::new();
        }
        self.state = LaunchState::Terminated;
        let mut effects = self.leave_extract();
        effects.push(Effect::DisconnectWorker);
        effects.push(Effect::OsProgress(OsProgress::Clear));
        effects
    }

    fn on_game_spawned(&mut self) -> Vec<Effect> {
        if self.state != LaunchState::Spawning {
            return Vec::new();
        }
        self.state = LaunchState::Running;
        vec![
            Effect::SetDetails("Your game is now launching. Enjoy!"),
            Effect::ScheduleLinger,
        ]
    }

    fn on_game_output(&mut self, output: ProcessEvent) -> Vec<Effect> {
        if self.state != LaunchState::Running {
            return Vec::new();
        }
        match output {
            ProcessEvent::Ready => {
                self.ready_seen = true;
                self.notify_ready_if_due()
            }
            ProcessEvent::Joined => vec![Effect::NotifyJoined],
            ProcessEvent::Left => vec![Effect::NotifyLeft],
            ProcessEvent::Fatal(kind) => self.fail(FailureKind::ProcessFatalSignature(kind)),
        }
    }

    fn on_game_exited(&mut self, code: Option<i32>) -> Vec<Effect> {
        if !matches!(self.state, LaunchState::Spawning | LaunchState::Running) {
            return Vec::new();
        }
        if !self.ready_seen && code != Some(0) {
            // Died before ever reaching a running window.
            return self.fail(FailureKind::ProcessSpawnFailed);
        }
        self.state = LaunchState::Terminated;
        let mut effects = self.leave_extract();
        effects.push(Effect::Finished(code));
        effects
    }

    fn on_linger_elapsed(&mut self) -> Vec<Effect> {
        self.linger_done = true;
        self.notify_ready_if_due()
    }

    /// Readiness is announced once, after both the ready marker and the
    /// minimum linger.
    fn notify_ready_if_due(&mut self) -> Vec<Effect> {
        if self.ready_seen && self.linger_done && !self.ready_notified {
            self.ready_notified = true;
            vec![Effect::NotifyReady]
        } else {
            Vec::new()
        }
    }

    /// States in which the worker process must stay alive for the session
    /// to advance.
    fn worker_driven(&self) -> bool {
        matches!(
            self.state,
            LaunchState::CheckingRuntime
                | LaunchState::AwaitingRuntimeChoice
                | LaunchState::DownloadingRuntime
                | LaunchState::ExtractingRuntime
                | LaunchState::ValidatingDistribution
                | LaunchState::ValidatingVersion
                | LaunchState::ValidatingAssets
                | LaunchState::ValidatingLibraries
                | LaunchState::ValidatingFiles
                | LaunchState::Downloading
                | LaunchState::Extracting
                | LaunchState::PreparingLaunch
        )
    }

    fn begin_content(&mut self) -> Vec<Effect> {
        self.state = LaunchState::ValidatingDistribution;
        self.tracker = ProgressTracker::new(CONTENT_WEIGHTS);
        vec![
            Effect::BeginContentFlow,
            Effect::SetDetails("Loading server information.."),
            Effect::SetProgress(0.0),
        ]
    }

    fn enter_extract(&mut self, details: &'static str) -> Vec<Effect> {
        if self.in_extract {
            return Vec::new();
        }
        self.in_extract = true;
        vec![
            Effect::EnterPhase(Phase::Extract),
            Effect::OsProgress(OsProgress::Indeterminate),
            Effect::SetDetails(details),
        ]
    }

    fn leave_extract(&mut self) -> Vec<Effect> {
        if !self.in_extract {
            return Vec::new();
        }
        self.in_extract = false;
        vec![Effect::LeavePhase(Phase::Extract)]
    }

    fn fail(&mut self, kind: FailureKind) -> Vec<Effect> {
        self.state = LaunchState::Terminated;
        self.failure = Some(kind);
        let mut effects = self.leave_extract();
        effects.push(Effect::DisconnectWorker);
        effects.push(Effect::OsProgress(OsProgress::Clear));
        effects.push(Effect::Fail(kind));
        effects
    }
}
