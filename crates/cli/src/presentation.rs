//! Terminal rendering of engine events.
//!
//! Consumes the orchestrator's event stream and turns it into terminal
//! output, including the dotted "Extracting" ticker that runs while the
//! extraction phase is active. Runtime choices are resolved by policy
//! instead of an interactive overlay.

use clap::ValueEnum;
use colored::Colorize;
use launch_protocol::{Event, Op, Phase};
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Cadence of the extraction ticker dots.
const TICK: Duration = Duration::from_millis(750);

/// How to resolve a runtime choice without an interactive overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuntimePolicy {
    /// Accept the managed runtime install.
    Install,
    /// Decline and abandon the attempt; the user installs a runtime.
    Manual,
}

/// Animated "Extracting..." line. Dropping it stops the animation.
struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    fn start(label: &'static str) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            let mut dots = 0usize;
            loop {
                interval.tick().await;
                dots = (dots + 1) % 4;
                print!("\r{}{}   ", label, ".".repeat(dots));
                let _ = std::io::stdout().flush();
            }
        });
        Self { handle }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Render events until the orchestrator closes the stream.
pub async fn run(
    mut events: mpsc::UnboundedReceiver<Event>,
    ops: mpsc::UnboundedSender<Op>,
    runtime_policy: RuntimePolicy,
) {
    let mut ticker: Option<Ticker> = None;

    while let Some(event) = events.recv().await {
        match event {
            Event::StateChanged { state, .. } => tracing::debug!(?state, "state changed"),
            Event::Details { text, .. } => println!("{}", text.dimmed()),
            Event::Progress { percent, .. } => {
                println!("{}", format!("{percent:>5.1}%").dimmed());
            }
            Event::PhaseEntered { phase: Phase::Extract, .. } => {
                ticker = Some(Ticker::start("Extracting"));
            }
            Event::PhaseLeft { phase: Phase::Extract, .. } => {
                ticker = None;
                println!();
            }
            Event::PhaseEntered { .. } | Event::PhaseLeft { .. } => {}
            Event::RuntimeChoiceRequired { .. } => match runtime_policy {
                RuntimePolicy::Install => {
                    println!(
                        "{}",
                        "No compatible runtime found; installing a managed copy.".yellow()
                    );
                    let _ = ops.send(Op::InstallRuntime);
                }
                RuntimePolicy::Manual => {
                    println!(
                        "{}",
                        "No compatible runtime found; install one manually and launch again."
                            .yellow()
                    );
                    let _ = ops.send(Op::InstallManually);
                }
            },
            Event::OsProgress { progress, .. } => tracing::trace!(?progress, "os progress"),
            Event::LaunchFailed { kind, remediation, .. } => {
                ticker = None;
                println!("{} {:?}", "Launch failed:".red().bold(), kind);
                println!("{}", remediation.red());
            }
            Event::CrashReportDetected { path, .. } => {
                println!("{} {}", "Crash report:".yellow().bold(), path.display());
            }
            Event::GameReady { .. } => println!("{}", "Game ready.".green().bold()),
            Event::GameSessionJoined { .. } => println!("{}", "Joined a session.".green()),
            Event::GameSessionLeft { .. } => println!("{}", "Left the session.".green()),
            Event::GameExited { code, .. } => match code {
                Some(0) => println!("{}", "Game exited.".dimmed()),
                Some(code) => {
                    println!("{}", format!("Game exited with code {code}.").yellow());
                }
                None => println!("{}", "Game exited.".yellow()),
            },
        }
    }
}
