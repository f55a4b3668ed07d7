//! End-to-end launch flow tests.
//!
//! The orchestrator is driven against scripted worker channels and mock
//! collaborators, so every flow runs without a real worker binary, network
//! or game process:
//! - the full happy path, system runtime through game exit
//! - the managed runtime install flow, including the user choice
//! - failure classification (network, validation, worker death, fatal
//!   output) and its exactly-once surfacing
//! - back-to-back attempts starting clean

mod common;

use common::assertions::*;
use common::fixtures::*;
use common::mocks::*;
use launch_core::collaborators::Account;
use launch_core::orchestrator::{LaunchError, LaunchOrchestrator};
use launch_core::worker::{ChannelMessage, MockChannelFactory, MockWorkerChannel, WorkerExit};
use launch_protocol::{
    Envelope, ErrorDetail, Event, FailureKind, FatalKind, LaunchState, Op, Phase, WorkerCommand,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn build_orchestrator(
    root: &Path,
    account: Option<Account>,
    provider: StaticDistributionProvider,
    builder: Arc<ScriptedGameBuilder>,
    factory: Arc<MockChannelFactory>,
) -> (LaunchOrchestrator, mpsc::UnboundedReceiver<Event>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let orchestrator = LaunchOrchestrator::new(
        test_config(root),
        Arc::new(provider),
        Arc::new(StaticAccountStore::new(account)),
        builder,
        factory,
        events_tx,
    );
    (orchestrator, events_rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream ended")
}

#[tokio::test]
async fn test_happy_path_with_system_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let (runtime_channel, runtime_handle) =
        MockWorkerChannel::scripted(runtime_found_script("/usr/bin/java"));
    factory.enqueue(runtime_channel);
    let (content_channel, content_handle) = MockWorkerChannel::scripted(content_happy_script());
    factory.enqueue(content_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(
        vec!["[12:00:01] [Client thread/INFO]: Sound engine started"],
        Some(0),
    ));
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        Arc::clone(&factory),
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let summary = orchestrator.launch(&mut ops_rx).await.unwrap();

    assert_eq!(summary.state, LaunchState::Terminated);
    assert!(summary.failure.is_none());
    assert_eq!(summary.game_exit, Some(0));

    let events = drain(&mut events_rx);
    assert_states_in_order(
        &events,
        &[
            LaunchState::CheckingRuntime,
            LaunchState::ValidatingDistribution,
            LaunchState::ValidatingVersion,
            LaunchState::ValidatingAssets,
            LaunchState::ValidatingLibraries,
            LaunchState::ValidatingFiles,
            LaunchState::Downloading,
            LaunchState::PreparingLaunch,
            LaunchState::Spawning,
            LaunchState::Running,
            LaunchState::Terminated,
        ],
    );
    assert!(failures(&events).is_empty());
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::GameExited { code: Some(0), .. })));

    // The download completion snapped the display to the phase end weight
    // and the scale stayed monotonic after the content flow reset.
    assert!(progress_values(&events).contains(&90.0));
    assert_progress_monotonic_after_reset(&events);

    // One worker per sub-flow, the content worker built with the resolved
    // runtime on its command line.
    let specs = factory.spawned_specs();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].args[0], "runtime");
    assert_eq!(specs[1].args[0], "content");
    assert_eq!(specs[1].args[2], "/usr/bin/java");

    assert_eq!(builder.builds(), 1);
    assert_eq!(builder.runtime_paths(), vec![PathBuf::from("/usr/bin/java")]);

    // Each channel was disconnected exactly once.
    assert_eq!(runtime_handle.disconnects(), 1);
    assert_eq!(content_handle.disconnects(), 1);
    assert!(matches!(
        runtime_handle.sent().as_slice(),
        [WorkerCommand::Execute { function, .. }] if function == "validateJava"
    ));
    assert!(matches!(
        content_handle.sent().as_slice(),
        [WorkerCommand::Execute { function, .. }] if function == "validateEverything"
    ));
}

#[tokio::test]
async fn test_managed_runtime_install_flow() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let (runtime_channel, runtime_handle) =
        MockWorkerChannel::scripted(runtime_missing_script());
    factory.enqueue(runtime_channel);
    let (content_channel, _content_handle) = MockWorkerChannel::scripted(content_happy_script());
    factory.enqueue(content_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(
        vec!["[12:00:01] [Client thread/INFO]: Sound engine started"],
        Some(0),
    ));
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        Arc::clone(&factory),
    );

    let (ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let attempt = tokio::spawn(async move {
        let summary = orchestrator.launch(&mut ops_rx).await;
        (orchestrator, summary)
    });

    // Wait for the choice prompt, accept the managed install.
    loop {
        if matches!(next_event(&mut events_rx).await, Event::RuntimeChoiceRequired { .. }) {
            break;
        }
    }
    ops_tx.send(Op::InstallRuntime).unwrap();

    // The worker must not answer before the acquire request went out.
    loop {
        if matches!(
            next_event(&mut events_rx).await,
            Event::StateChanged {
                state: LaunchState::DownloadingRuntime,
                ..
            }
        ) {
            break;
        }
    }

    // Script the rest of the runtime worker conversation.
    runtime_handle.push(ChannelMessage::Envelope(Envelope::result(
        launch_protocol::EnvelopeContext::EnqueueRuntime,
        json!(true),
    )));
    runtime_handle.push(ChannelMessage::Envelope(Envelope::progress(
        Phase::Download,
        512,
        1024,
    )));
    runtime_handle.push(ChannelMessage::Envelope(Envelope::complete(Phase::Download)));
    let mut installed = Envelope::complete(Phase::Runtime);
    installed.result = Some(json!("/managed/runtime/bin/java"));
    runtime_handle.push(ChannelMessage::Envelope(installed));

    let (_orchestrator, summary) = tokio::time::timeout(Duration::from_secs(5), attempt)
        .await
        .expect("attempt timed out")
        .expect("attempt task panicked");
    let summary = summary.unwrap();

    assert_eq!(summary.state, LaunchState::Terminated);
    assert!(summary.failure.is_none());

    // The runtime worker got the acquire/download conversation.
    let sent = runtime_handle.sent();
    assert!(sent
        .iter()
        .any(|c| matches!(c, WorkerCommand::ChangeContext { .. })));
    assert!(sent.iter().any(
        |c| matches!(c, WorkerCommand::Execute { function, .. } if function == "enqueueRuntime")
    ));
    assert!(sent.iter().any(
        |c| matches!(c, WorkerCommand::Execute { function, .. } if function == "processDownloadQueue")
    ));

    // The installed runtime flowed into the content worker and the game.
    let specs = factory.spawned_specs();
    assert_eq!(specs[1].args[2], "/managed/runtime/bin/java");
    assert_eq!(
        builder.runtime_paths(),
        vec![PathBuf::from("/managed/runtime/bin/java")]
    );

    // The gate above consumed the stream through DownloadingRuntime; the
    // rest of the managed install follows.
    let events = drain(&mut events_rx);
    assert_states_in_order(
        &events,
        &[
            LaunchState::ExtractingRuntime,
            LaunchState::ValidatingDistribution,
            LaunchState::Running,
            LaunchState::Terminated,
        ],
    );
}

#[tokio::test]
async fn test_manual_install_abandons_the_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let (runtime_channel, runtime_handle) =
        MockWorkerChannel::scripted(runtime_missing_script());
    factory.enqueue(runtime_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(Vec::new(), Some(0)));
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        Arc::clone(&factory),
    );

    let (ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let attempt = tokio::spawn(async move { orchestrator.launch(&mut ops_rx).await });

    loop {
        if matches!(next_event(&mut events_rx).await, Event::RuntimeChoiceRequired { .. }) {
            break;
        }
    }
    ops_tx.send(Op::InstallManually).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(5), attempt)
        .await
        .expect("attempt timed out")
        .expect("attempt task panicked")
        .unwrap();

    assert_eq!(summary.state, LaunchState::Idle);
    assert!(summary.failure.is_none());
    assert_eq!(builder.builds(), 0);
    assert_eq!(runtime_handle.disconnects(), 1);
}

#[tokio::test]
async fn test_download_network_error_terminates_with_one_disconnect() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let (runtime_channel, _runtime_handle) =
        MockWorkerChannel::scripted(runtime_found_script("/usr/bin/java"));
    factory.enqueue(runtime_channel);

    let mut script = content_validation_script();
    script.pop(); // no completion; the download dies instead
    script.push(ChannelMessage::Envelope(Envelope::error(
        Some(Phase::Download),
        ErrorDetail {
            code: Some("ENOENT".to_string()),
            message: "getaddrinfo ENOENT files.example.com".to_string(),
        },
    )));
    let (content_channel, content_handle) = MockWorkerChannel::scripted(script);
    factory.enqueue(content_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(Vec::new(), Some(0)));
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        Arc::clone(&factory),
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let summary = orchestrator.launch(&mut ops_rx).await.unwrap();

    assert_eq!(summary.state, LaunchState::Terminated);
    assert_eq!(summary.failure, Some(FailureKind::NetworkUnavailable));
    assert_eq!(builder.builds(), 0);

    let events = drain(&mut events_rx);
    assert_eq!(failures(&events), vec![FailureKind::NetworkUnavailable]);
    assert_eq!(content_handle.disconnects(), 1);
}

#[tokio::test]
async fn test_missing_version_data_never_reaches_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let (runtime_channel, _runtime_handle) =
        MockWorkerChannel::scripted(runtime_found_script("/usr/bin/java"));
    factory.enqueue(runtime_channel);

    let mut script = content_validation_script();
    script.push(ChannelMessage::Envelope(Envelope::result(
        launch_protocol::EnvelopeContext::ValidateEverything,
        json!({ "buildData": { "id": "nebula" } }),
    )));
    let (content_channel, _content_handle) = MockWorkerChannel::scripted(script);
    factory.enqueue(content_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(Vec::new(), Some(0)));
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        Arc::clone(&factory),
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let summary = orchestrator.launch(&mut ops_rx).await.unwrap();

    assert_eq!(summary.state, LaunchState::Terminated);
    assert_eq!(summary.failure, Some(FailureKind::ValidationFailed));
    assert_eq!(builder.builds(), 0);

    let events = drain(&mut events_rx);
    assert!(!states(&events).contains(&LaunchState::Spawning));
    assert_eq!(failures(&events), vec![FailureKind::ValidationFailed]);
}

#[tokio::test]
async fn test_fatal_output_kills_the_game_and_stops_classification() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let (runtime_channel, _runtime_handle) =
        MockWorkerChannel::scripted(runtime_found_script("/usr/bin/java"));
    factory.enqueue(runtime_channel);
    let (content_channel, _content_handle) = MockWorkerChannel::scripted(content_happy_script());
    factory.enqueue(content_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(
        vec![
            "Error: Could not find or load main class net.minecraft.launchwrapper.Launch",
            "[12:00:01] [Client thread/INFO]: Sound engine started",
        ],
        Some(1),
    ));
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        Arc::clone(&factory),
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let summary = orchestrator.launch(&mut ops_rx).await.unwrap();

    assert_eq!(summary.state, LaunchState::Terminated);
    assert_eq!(
        summary.failure,
        Some(FailureKind::ProcessFatalSignature(
            FatalKind::DependencyDownload
        ))
    );
    assert!(builder.killed());

    // The ready line after the fatal one was never classified.
    let events = drain(&mut events_rx);
    assert!(!events.iter().any(|e| matches!(e, Event::GameReady { .. })));
    assert_eq!(
        failures(&events),
        vec![FailureKind::ProcessFatalSignature(
            FatalKind::DependencyDownload
        )]
    );
}

#[tokio::test]
async fn test_worker_death_without_error_envelope_fails_once() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let (runtime_channel, _runtime_handle) =
        MockWorkerChannel::scripted(runtime_found_script("/usr/bin/java"));
    factory.enqueue(runtime_channel);

    let (content_channel, _content_handle) = MockWorkerChannel::scripted(vec![
        ChannelMessage::Envelope(Envelope::validate(Phase::Distribution)),
        ChannelMessage::Exited(WorkerExit { code: Some(3) }),
    ]);
    factory.enqueue(content_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(Vec::new(), Some(0)));
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        Arc::clone(&factory),
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let summary = orchestrator.launch(&mut ops_rx).await.unwrap();

    assert_eq!(summary.state, LaunchState::Terminated);
    assert_eq!(summary.failure, Some(FailureKind::Unclassified));
    assert_eq!(failures(&drain(&mut events_rx)), vec![FailureKind::Unclassified]);
}

#[tokio::test]
async fn test_back_to_back_attempts_start_clean() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());

    // First attempt: network failure mid-download.
    let (runtime_channel, _h1) = MockWorkerChannel::scripted(runtime_found_script("/usr/bin/java"));
    factory.enqueue(runtime_channel);
    let (content_channel, _h2) = MockWorkerChannel::scripted(vec![
        ChannelMessage::Envelope(Envelope::validate(Phase::Distribution)),
        ChannelMessage::Envelope(Envelope::error(
            Some(Phase::Download),
            ErrorDetail {
                code: Some("ECONNRESET".to_string()),
                message: "socket hang up".to_string(),
            },
        )),
    ]);
    factory.enqueue(content_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(
        vec!["[12:00:01] [Client thread/INFO]: Sound engine started"],
        Some(0),
    ));
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        Arc::clone(&factory),
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let first = orchestrator.launch(&mut ops_rx).await.unwrap();
    assert_eq!(first.failure, Some(FailureKind::NetworkUnavailable));
    drain(&mut events_rx);

    // Second attempt: fresh channels, clean run.
    let (runtime_channel, _h3) = MockWorkerChannel::scripted(runtime_found_script("/usr/bin/java"));
    factory.enqueue(runtime_channel);
    let (content_channel, _h4) = MockWorkerChannel::scripted(content_happy_script());
    factory.enqueue(content_channel);

    let second = orchestrator.launch(&mut ops_rx).await.unwrap();
    assert_eq!(second.state, LaunchState::Terminated);
    assert!(second.failure.is_none());
    assert_ne!(first.session_id, second.session_id);

    // The second attempt's stream starts from a fresh session.
    let events = drain(&mut events_rx);
    assert_states_in_order(
        &events,
        &[
            LaunchState::CheckingRuntime,
            LaunchState::Running,
            LaunchState::Terminated,
        ],
    );
    assert!(failures(&events).is_empty());
}

#[tokio::test]
async fn test_closed_ops_channel_abandons_the_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    // An empty script: the worker never answers, so only the op channel
    // closing can move the session.
    let (runtime_channel, runtime_handle) = MockWorkerChannel::scripted(Vec::new());
    factory.enqueue(runtime_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(Vec::new(), Some(0)));
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        factory,
    );

    let (ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    drop(ops_tx);

    // The drained op channel is abandonment, delivered once; the attempt
    // must settle rather than stall or loop on the closed receiver.
    let summary = tokio::time::timeout(Duration::from_secs(5), orchestrator.launch(&mut ops_rx))
        .await
        .expect("a closed op channel must settle the attempt")
        .unwrap();

    assert_eq!(summary.state, LaunchState::Terminated);
    assert!(summary.failure.is_none());
    assert_eq!(builder.builds(), 0);
    assert_eq!(runtime_handle.disconnects(), 1);
    assert!(failures(&drain(&mut events_rx)).is_empty());
}

#[tokio::test]
async fn test_launch_rejected_without_account() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let builder = Arc::new(ScriptedGameBuilder::new(Vec::new(), Some(0)));
    let (mut orchestrator, _events_rx) = build_orchestrator(
        dir.path(),
        None,
        StaticDistributionProvider::online(test_index()),
        builder,
        factory,
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let err = orchestrator.launch(&mut ops_rx).await.unwrap_err();
    assert!(matches!(err, LaunchError::NoAccountSelected));
}

#[tokio::test]
async fn test_remote_pull_failure_falls_back_to_cache() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let (runtime_channel, _runtime_handle) =
        MockWorkerChannel::scripted(runtime_found_script("/usr/bin/java"));
    factory.enqueue(runtime_channel);
    let (content_channel, _content_handle) = MockWorkerChannel::scripted(content_happy_script());
    factory.enqueue(content_channel);

    let builder = Arc::new(ScriptedGameBuilder::new(
        vec!["[12:00:01] [Client thread/INFO]: Sound engine started"],
        Some(0),
    ));
    let (mut orchestrator, _events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::cached_only(test_index()),
        builder,
        factory,
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let summary = orchestrator.launch(&mut ops_rx).await.unwrap();
    assert_eq!(summary.state, LaunchState::Terminated);
    assert!(summary.failure.is_none());
}

#[tokio::test]
async fn test_no_distribution_at_all_rejects_the_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let builder = Arc::new(ScriptedGameBuilder::new(Vec::new(), Some(0)));
    let (mut orchestrator, _events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::unavailable(),
        builder,
        factory,
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let err = orchestrator.launch(&mut ops_rx).await.unwrap_err();
    assert!(matches!(err, LaunchError::DistributionUnavailable));
}

#[tokio::test]
async fn test_failed_game_build_is_a_spawn_failure() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(MockChannelFactory::new());
    let (runtime_channel, _runtime_handle) =
        MockWorkerChannel::scripted(runtime_found_script("/usr/bin/java"));
    factory.enqueue(runtime_channel);
    let (content_channel, _content_handle) = MockWorkerChannel::scripted(content_happy_script());
    factory.enqueue(content_channel);

    let builder = Arc::new(ScriptedGameBuilder::failing());
    let (mut orchestrator, mut events_rx) = build_orchestrator(
        dir.path(),
        Some(test_account()),
        StaticDistributionProvider::online(test_index()),
        Arc::clone(&builder),
        factory,
    );

    let (_ops_tx, mut ops_rx) = mpsc::unbounded_channel();
    let summary = orchestrator.launch(&mut ops_rx).await.unwrap();

    assert_eq!(summary.state, LaunchState::Terminated);
    assert_eq!(summary.failure, Some(FailureKind::ProcessSpawnFailed));
    assert_eq!(builder.builds(), 1);
    assert_eq!(
        failures(&drain(&mut events_rx)),
        vec![FailureKind::ProcessSpawnFailed]
    );
}
