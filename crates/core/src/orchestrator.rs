//! The launch orchestrator.
//!
//! Drives one launch attempt end to end: resolves the distribution entry and
//! account, spawns worker channels, feeds every input (worker messages, UI
//! operations, game output, timers) through the state machine and interprets
//! the resulting [`Effect`]s. All policy lives in the machine; this module is
//! the I/O shell around it.

use launch_protocol::{Event, FailureKind, LaunchState, Op, WorkerCommand};
use serde_json::json;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::collaborators::{
    Account, AccountStore, DistributionEntry, DistributionProvider, GameProcessBuilder,
};
use crate::config::LauncherConfig;
use crate::failure::remediation;
use crate::monitor::{self, CrashWatcher, GameSignal, OutputClassifier};
use crate::session::{Effect, LaunchSession, SessionEvent, WorkerRequest};
use crate::worker::{ChannelMessage, WorkerChannel, WorkerChannelFactory, WorkerExit, WorkerSpec};

/// Errors that reject a launch attempt before it starts.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("No account is selected")]
    NoAccountSelected,

    #[error("No distribution entry is selected")]
    NoEntrySelected,

    #[error("Selected entry '{0}' is not in the distribution index")]
    UnknownEntry(String),

    #[error("The distribution index is unavailable and no cached copy exists")]
    DistributionUnavailable,

    #[error(transparent)]
    Channel(#[from] crate::worker::ChannelError),
}

/// How one launch attempt ended.
#[derive(Debug, Clone, Copy)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub state: LaunchState,
    pub failure: Option<FailureKind>,
    pub game_exit: Option<i32>,
}

/// Drives launch attempts against a fixed set of collaborators.
///
/// One attempt at a time: `launch` takes `&mut self` and runs the session to
/// its terminal state before returning, so a second session can never
/// overlap the first.
pub struct LaunchOrchestrator {
    config: LauncherConfig,
    distribution: Arc<dyn DistributionProvider>,
    accounts: Arc<dyn AccountStore>,
    builder: Arc<dyn GameProcessBuilder>,
    channels: Arc<dyn WorkerChannelFactory>,
    events: mpsc::UnboundedSender<Event>,
}

impl LaunchOrchestrator {
    pub fn new(
        config: LauncherConfig,
        distribution: Arc<dyn DistributionProvider>,
        accounts: Arc<dyn AccountStore>,
        builder: Arc<dyn GameProcessBuilder>,
        channels: Arc<dyn WorkerChannelFactory>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            config,
            distribution,
            accounts,
            builder,
            channels,
            events,
        }
    }

    /// Run one launch attempt to its terminal state.
    ///
    /// `ops` carries user operations (runtime choice, abort) that arrive
    /// while the attempt is in flight.
    pub async fn launch(
        &mut self,
        ops: &mut mpsc::UnboundedReceiver<Op>,
    ) -> Result<SessionSummary, LaunchError> {
        let account = self
            .accounts
            .selected_account()
            .ok_or(LaunchError::NoAccountSelected)?;
        let entry_id = self
            .config
            .selected_entry
            .clone()
            .ok_or(LaunchError::NoEntrySelected)?;

        let index = match self.distribution.pull_remote_if_outdated().await {
            Ok(index) => index,
            Err(error) => {
                tracing::warn!("remote distribution pull failed, using cache: {}", error);
                self.distribution
                    .get_distribution()
                    .ok_or(LaunchError::DistributionUnavailable)?
            }
        };
        let entry = index
            .entry(&entry_id)
            .cloned()
            .ok_or(LaunchError::UnknownEntry(entry_id))?;

        tracing::info!(entry = %entry.id, account = %account.display_name, "starting launch attempt");

        let mut attempt = Attempt::new(
            self.config.clone(),
            entry,
            account,
            Arc::clone(&self.builder),
            Arc::clone(&self.channels),
            self.events.clone(),
        );
        let summary = attempt.run(ops).await?;

        // Keep the resolved runtime for future attempts.
        if let Some(path) = attempt.resolved_runtime() {
            self.config.runtime_executable = Some(path);
        }

        Ok(summary)
    }
}

/// One resolved input for the attempt's event loop.
enum Input {
    Worker(Option<ChannelMessage>),
    Op(Option<Op>),
    Game(Option<GameSignal>),
    Crash(Option<PathBuf>),
    Timer(Option<SessionEvent>),
}

/// All mutable state of one in-flight attempt.
struct Attempt {
    config: LauncherConfig,
    entry: DistributionEntry,
    account: Account,
    builder: Arc<dyn GameProcessBuilder>,
    channels: Arc<dyn WorkerChannelFactory>,
    events: mpsc::UnboundedSender<Event>,
    session: LaunchSession,
    worker: Option<Box<dyn WorkerChannel>>,
    game: Option<mpsc::UnboundedReceiver<GameSignal>>,
    game_task: Option<JoinHandle<()>>,
    crash: Option<mpsc::UnboundedReceiver<PathBuf>>,
    crash_watcher: Option<CrashWatcher>,
    timer_tx: mpsc::UnboundedSender<SessionEvent>,
    timer_rx: mpsc::UnboundedReceiver<SessionEvent>,
    last_state: LaunchState,
    game_exit: Option<i32>,
}

impl Attempt {
    fn new(
        config: LauncherConfig,
        entry: DistributionEntry,
        account: Account,
        builder: Arc<dyn GameProcessBuilder>,
        channels: Arc<dyn WorkerChannelFactory>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let session = LaunchSession::new();
        let last_state = session.state();
        Self {
            config,
            entry,
            account,
            builder,
            channels,
            events,
            session,
            worker: None,
            game: None,
            game_task: None,
            crash: None,
            crash_watcher: None,
            timer_tx,
            timer_rx,
            last_state,
            game_exit: None,
        }
    }

    fn resolved_runtime(&self) -> Option<PathBuf> {
        self.session.runtime_path().map(PathBuf::from)
    }

    async fn run(
        &mut self,
        ops: &mut mpsc::UnboundedReceiver<Op>,
    ) -> Result<SessionSummary, LaunchError> {
        // The runtime scan worker is the only channel spawned up front; a
        // failure here rejects the attempt outright.
        self.worker = Some(self.channels.spawn(self.runtime_worker_spec())?);

        let effects = self.session.begin();
        self.publish_state();
        self.apply_all(effects).await;

        let mut ops = Some(ops);
        while self.session.state().is_active() {
            // Arms only produce a value; self stays free for the handling
            // below.
            let input = tokio::select! {
                message = Self::next_worker_message(&mut self.worker) => Input::Worker(message),
                op = Self::next_op(&mut ops) => Input::Op(op),
                signal = Self::next_signal(&mut self.game) => Input::Game(signal),
                path = Self::next_signal(&mut self.crash) => Input::Crash(path),
                timer = self.timer_rx.recv() => Input::Timer(timer),
            };

            let event = match input {
                Input::Worker(Some(ChannelMessage::Envelope(envelope))) => {
                    SessionEvent::Envelope(envelope)
                }
                Input::Worker(Some(ChannelMessage::Exited(exit))) => {
                    SessionEvent::WorkerExited(exit)
                }
                Input::Worker(None) => {
                    // Stream drained past the exit notice.
                    self.worker = None;
                    continue;
                }
                Input::Op(Some(Op::InstallRuntime)) => SessionEvent::RuntimeInstallAccepted,
                Input::Op(Some(Op::InstallManually)) => SessionEvent::ManualInstallChosen,
                Input::Op(Some(Op::Abort)) => SessionEvent::Aborted,
                Input::Op(None) => {
                    // A closed op channel means the UI went away: abandon
                    // once, then park the drained arm. A running game is
                    // not aborted, so the loop must not keep re-selecting
                    // this branch.
                    ops = None;
                    SessionEvent::Aborted
                }
                Input::Op(Some(Op::Launch)) => {
                    tracing::warn!("launch requested while a session is active, ignoring");
                    continue;
                }
                Input::Game(Some(GameSignal::Output(output))) => SessionEvent::GameOutput(output),
                Input::Game(Some(GameSignal::Exited(code))) => SessionEvent::GameExited(code),
                Input::Game(None) => {
                    self.game = None;
                    continue;
                }
                Input::Crash(Some(path)) => {
                    self.emit(Event::CrashReportDetected {
                        session_id: self.session.id(),
                        path,
                        detected_at: chrono::Utc::now(),
                    });
                    continue;
                }
                Input::Crash(None) => {
                    self.crash = None;
                    continue;
                }
                Input::Timer(Some(event)) => event,
                Input::Timer(None) => continue,
            };

            self.dispatch(event).await;
        }

        self.teardown();

        Ok(SessionSummary {
            session_id: self.session.id(),
            state: self.session.state(),
            failure: self.session.failure(),
            game_exit: self.game_exit,
        })
    }

    async fn next_worker_message(
        worker: &mut Option<Box<dyn WorkerChannel>>,
    ) -> Option<ChannelMessage> {
        match worker.as_mut() {
            Some(channel) => channel.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn next_signal<T>(rx: &mut Option<mpsc::UnboundedReceiver<T>>) -> Option<T> {
        match rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn next_op(ops: &mut Option<&mut mpsc::UnboundedReceiver<Op>>) -> Option<Op> {
        match ops.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Feed one event through the machine and interpret the effects. An
    /// effect may itself surface a follow-up event (a failed send, a spawn
    /// result); those are processed in order before new inputs.
    async fn dispatch(&mut self, event: SessionEvent) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let effects = self.session.handle(event);
            self.publish_state();
            for effect in effects {
                if let Some(follow_up) = self.apply(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    async fn apply_all(&mut self, effects: Vec<Effect>) {
        let mut pending = VecDeque::new();
        for effect in effects {
            if let Some(follow_up) = self.apply(effect).await {
                pending.push_back(follow_up);
            }
        }
        while let Some(event) = pending.pop_front() {
            self.dispatch(event).await;
        }
    }

    async fn apply(&mut self, effect: Effect) -> Option<SessionEvent> {
        let session_id = self.session.id();
        match effect {
            Effect::SendWorker(request) => {
                for command in self.commands_for(request) {
                    if let Err(error) = self.send_worker(&command).await {
                        tracing::error!("worker send failed: {}", error);
                        return Some(SessionEvent::WorkerExited(WorkerExit { code: None }));
                    }
                }
                None
            }
            Effect::DisconnectWorker => {
                if let Some(worker) = self.worker.as_mut() {
                    worker.disconnect().await;
                }
                None
            }
            Effect::BeginContentFlow => {
                match self.channels.spawn(self.content_worker_spec()) {
                    Ok(channel) => {
                        self.worker = Some(channel);
                        let command = WorkerCommand::execute(
                            "validateEverything",
                            vec![json!(self.entry.id)],
                        );
                        if let Err(error) = self.send_worker(&command).await {
                            tracing::error!("worker send failed: {}", error);
                            return Some(SessionEvent::WorkerExited(WorkerExit { code: None }));
                        }
                        None
                    }
                    Err(error) => {
                        tracing::error!("content worker spawn failed: {}", error);
                        Some(SessionEvent::WorkerExited(WorkerExit { code: None }))
                    }
                }
            }
            Effect::SetDetails(text) => {
                self.emit(Event::Details {
                    session_id,
                    text: text.to_string(),
                });
                None
            }
            Effect::SetProgress(percent) => {
                self.emit(Event::Progress {
                    session_id,
                    percent,
                });
                None
            }
            Effect::OsProgress(progress) => {
                self.emit(Event::OsProgress {
                    session_id,
                    progress,
                });
                None
            }
            Effect::EnterPhase(phase) => {
                self.emit(Event::PhaseEntered { session_id, phase });
                None
            }
            Effect::LeavePhase(phase) => {
                self.emit(Event::PhaseLeft { session_id, phase });
                None
            }
            Effect::AwaitRuntimeChoice => {
                self.emit(Event::RuntimeChoiceRequired { session_id });
                None
            }
            Effect::PersistRuntimePath(path) => {
                tracing::info!("runtime resolved: {}", path.display());
                self.config.runtime_executable = Some(path);
                None
            }
            Effect::SpawnGame(outcome) => Some(self.spawn_game(&outcome).await),
            Effect::ScheduleLinger => {
                self.session.arm_linger(self.timer_tx.clone());
                None
            }
            Effect::NotifyReady => {
                self.emit(Event::GameReady { session_id });
                None
            }
            Effect::NotifyJoined => {
                self.emit(Event::GameSessionJoined { session_id });
                None
            }
            Effect::NotifyLeft => {
                self.emit(Event::GameSessionLeft { session_id });
                None
            }
            Effect::Fail(kind) => {
                self.emit(Event::LaunchFailed {
                    session_id,
                    kind,
                    remediation: remediation(kind).to_string(),
                });
                None
            }
            Effect::Finished(code) => {
                self.game_exit = code;
                self.emit(Event::GameExited { session_id, code });
                None
            }
        }
    }

    async fn spawn_game(&mut self, outcome: &launch_protocol::ValidationOutcome) -> SessionEvent {
        let Some(runtime_path) = self.session.runtime_path().map(PathBuf::from) else {
            tracing::error!("no runtime executable resolved before spawn");
            return SessionEvent::SpawnFailed;
        };
        let classifier = match OutputClassifier::new(&self.account.display_name) {
            Ok(classifier) => classifier,
            Err(error) => {
                tracing::error!("output classifier build failed: {}", error);
                return SessionEvent::SpawnFailed;
            }
        };

        let handle = match self
            .builder
            .build(&self.entry, &self.account, &runtime_path, outcome)
            .await
        {
            Ok(handle) => handle,
            Err(error) => {
                tracing::error!("game process build failed: {:#}", error);
                return SessionEvent::SpawnFailed;
            }
        };

        let (game_tx, game_rx) = mpsc::unbounded_channel();
        self.game_task = Some(monitor::supervise(handle, classifier, game_tx));
        self.game = Some(game_rx);
        self.watch_crash_reports();

        SessionEvent::GameSpawned
    }

    /// Arm the crash-report watch for the session's instance. A watch
    /// failure is logged, never fatal to the launch.
    fn watch_crash_reports(&mut self) {
        let dir = self.config.crash_report_directory(&self.entry.id);
        if let Err(error) = std::fs::create_dir_all(&dir) {
            tracing::warn!("cannot prepare crash-report directory: {}", error);
            return;
        }
        let (crash_tx, crash_rx) = mpsc::unbounded_channel();
        match monitor::watch_crash_reports(&dir, crash_tx) {
            Ok(watcher) => {
                self.crash_watcher = Some(watcher);
                self.crash = Some(crash_rx);
            }
            Err(error) => tracing::warn!("crash-report watch failed: {}", error),
        }
    }

    async fn send_worker(&mut self, command: &WorkerCommand) -> Result<(), crate::worker::ChannelError> {
        match self.worker.as_mut() {
            Some(worker) => worker.send(command).await,
            None => Err(crate::worker::ChannelError::Closed),
        }
    }

    fn commands_for(&self, request: WorkerRequest) -> Vec<WorkerCommand> {
        match request {
            WorkerRequest::ScanRuntime => vec![WorkerCommand::execute(
                "validateJava",
                vec![json!(self.config.data_directory)],
            )],
            WorkerRequest::AcquireRuntime => vec![
                WorkerCommand::change_context(
                    "ContentGuard",
                    vec![
                        json!(self.config.common_directory),
                        json!(self.config.runtime_executable),
                    ],
                ),
                WorkerCommand::execute(
                    "enqueueRuntime",
                    vec![json!(self.config.data_directory)],
                ),
            ],
            WorkerRequest::ProcessDownloadQueue => vec![WorkerCommand::execute(
                "processDownloadQueue",
                vec![json!([{ "id": "runtime", "limit": 1 }])],
            )],
        }
    }

    fn runtime_worker_spec(&self) -> WorkerSpec {
        WorkerSpec::new(
            self.config.worker_binary.clone(),
            vec![
                "runtime".to_string(),
                self.entry.client_version.clone(),
            ],
        )
        .with_env("LAUNCHKIT_DATA_DIR", &self.config.data_directory.to_string_lossy())
    }

    fn content_worker_spec(&self) -> WorkerSpec {
        let runtime = self
            .session
            .runtime_path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        WorkerSpec::new(
            self.config.worker_binary.clone(),
            vec![
                "content".to_string(),
                self.config.common_directory.to_string_lossy().into_owned(),
                runtime,
            ],
        )
        .with_env("LAUNCHKIT_DATA_DIR", &self.config.data_directory.to_string_lossy())
    }

    fn publish_state(&mut self) {
        let state = self.session.state();
        if state != self.last_state {
            self.last_state = state;
            self.emit(Event::StateChanged {
                session_id: self.session.id(),
                state,
            });
        }
    }

    /// Release every per-attempt resource: timers, the worker channel and
    /// both game-side listeners. Nothing outlives the session. Every
    /// terminal transition has already disconnected the live worker, so the
    /// channel is only dropped here.
    fn teardown(&mut self) {
        self.session.disarm_timers();
        self.worker = None;
        self.game = None;
        if let Some(task) = self.game_task.take() {
            task.abort();
        }
        self.crash = None;
        self.crash_watcher = None;
    }

    fn emit(&self, event: Event) {
        // A closed event channel only means no one is listening anymore.
        let _ = self.events.send(event);
    }
}
