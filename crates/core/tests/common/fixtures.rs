//! Test fixtures: sample configurations and scripted worker message
//! sequences.

use launch_core::collaborators::{Account, DistributionEntry, DistributionIndex};
use launch_core::config::LauncherConfig;
use launch_core::worker::{ChannelMessage, WorkerExit};
use launch_protocol::{Envelope, EnvelopeContext, Phase};
use serde_json::json;
use std::path::Path;

/// A launcher configuration rooted in a temporary directory, with the
/// "nebula" entry and a test account selected.
pub fn test_config(root: &Path) -> LauncherConfig {
    LauncherConfig {
        data_directory: root.to_path_buf(),
        common_directory: root.join("common"),
        instance_directory: root.join("instances"),
        worker_binary: root.join("bin").join("launch-worker"),
        runtime_executable: None,
        selected_entry: Some("nebula".to_string()),
        account: None,
    }
}

pub fn test_account() -> Account {
    Account {
        display_name: "Steve".to_string(),
        uuid: "069a79f4-44e9-4726-a5be-fca90e38aaf5".to_string(),
    }
}

/// A distribution index with one launchable entry, "nebula".
pub fn test_index() -> DistributionIndex {
    DistributionIndex {
        entries: vec![DistributionEntry {
            id: "nebula".to_string(),
            name: "Nebula".to_string(),
            client_version: "1.12.2".to_string(),
        }],
    }
}

/// The runtime worker's messages when a system runtime is found.
pub fn runtime_found_script(path: &str) -> Vec<ChannelMessage> {
    vec![
        ChannelMessage::Envelope(Envelope::result(EnvelopeContext::ValidateJava, json!(path))),
        ChannelMessage::Exited(WorkerExit { code: Some(0) }),
    ]
}

/// The runtime worker's scan result when no runtime exists.
pub fn runtime_missing_script() -> Vec<ChannelMessage> {
    vec![ChannelMessage::Envelope(Envelope::result(
        EnvelopeContext::ValidateJava,
        json!(null),
    ))]
}

/// The content worker's full validation pass, through the download.
pub fn content_validation_script() -> Vec<ChannelMessage> {
    vec![
        ChannelMessage::Envelope(Envelope::validate(Phase::Distribution)),
        ChannelMessage::Envelope(Envelope::validate(Phase::Version)),
        ChannelMessage::Envelope(Envelope::progress(Phase::Assets, 500, 1000)),
        ChannelMessage::Envelope(Envelope::validate(Phase::Assets)),
        ChannelMessage::Envelope(Envelope::validate(Phase::Libraries)),
        ChannelMessage::Envelope(Envelope::validate(Phase::Files)),
        ChannelMessage::Envelope(Envelope::progress(Phase::Download, 400, 1000)),
        ChannelMessage::Envelope(Envelope::progress(Phase::Download, 900, 1000)),
        ChannelMessage::Envelope(Envelope::complete(Phase::Download)),
    ]
}

/// A complete, launchable `validateEverything` result.
pub fn validate_everything_ok() -> ChannelMessage {
    ChannelMessage::Envelope(Envelope::result(
        EnvelopeContext::ValidateEverything,
        json!({
            "versionData": { "id": "1.12.2" },
            "buildData": { "id": "nebula" }
        }),
    ))
}

/// A happy-path content worker script: validation, download, launchable
/// metadata, clean exit.
pub fn content_happy_script() -> Vec<ChannelMessage> {
    let mut script = content_validation_script();
    script.push(validate_everything_ok());
    script.push(ChannelMessage::Exited(WorkerExit { code: Some(0) }));
    script
}
