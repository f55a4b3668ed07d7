//! Process-backed worker channel.
//!
//! The worker is spawned as a child process. Commands are written to its
//! stdin as JSON Lines; its stdout is read line-by-line, with lines that
//! parse as an [`Envelope`] entering the message stream and everything else
//! forwarded verbatim to the log sink. Stderr is always raw log lines.
//!
//! The exit notice is delivered on the same ordered stream, exactly once,
//! after all envelopes, whether the worker disconnected cleanly or crashed.

use async_trait::async_trait;
use launch_protocol::{Envelope, WorkerCommand};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::{mpsc, oneshot};

/// How long a disconnected worker gets to exit on its own before being
/// killed.
const DISCONNECT_GRACE: Duration = Duration::from_secs(3);

/// Errors from the worker channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to spawn worker '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to send command to worker: {0}")]
    Send(std::io::Error),

    #[error("Worker channel is closed")]
    Closed,
}

/// Terminal status of a worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    /// Exit code; `None` when the worker was killed by a signal.
    pub code: Option<i32>,
}

/// One unit of the ordered worker message stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    Envelope(Envelope),
    /// Fired exactly once, after the last envelope.
    Exited(WorkerExit),
}

/// How to start a worker for one sub-flow.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl WorkerSpec {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }
}

/// The duplex channel contract.
///
/// At most one live channel exists per session per sub-flow; starting a new
/// sub-flow while one is live is a caller error.
#[async_trait]
pub trait WorkerChannel: Send {
    /// Fire-and-forget command to the worker.
    async fn send(&mut self, command: &WorkerCommand) -> Result<(), ChannelError>;

    /// Next message on the ordered stream. `None` only after the exit
    /// notice has been delivered.
    async fn recv(&mut self) -> Option<ChannelMessage>;

    /// Signal graceful shutdown. Unconditional and idempotent; never fails,
    /// even if the worker already exited.
    async fn disconnect(&mut self);
}

/// Spawns worker channels. The indirection lets tests substitute scripted
/// channels for real processes.
pub trait WorkerChannelFactory: Send + Sync {
    fn spawn(&self, spec: WorkerSpec) -> Result<Box<dyn WorkerChannel>, ChannelError>;
}

/// [`WorkerChannel`] over a real child process.
#[derive(Debug)]
pub struct ProcessWorkerChannel {
    stdin: Option<ChildStdin>,
    rx: mpsc::Receiver<ChannelMessage>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ProcessWorkerChannel {
    /// Spawn the worker described by `spec` and wire up its streams.
    pub fn spawn(spec: WorkerSpec) -> Result<Self, ChannelError> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        for (key, value) in &spec.env {
            command.env(key, value);
        }
        command.stdin(Stdio::piped());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ChannelError::Spawn {
            program: spec.program.display().to_string(),
            source,
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        // Stderr is never protocol data; forward it to the log sink.
        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "worker", "{}", line);
                }
            });
        }

        // Stdout pump: envelopes enter the stream, anything else is a log
        // line the worker printed.
        let pump_tx = tx.clone();
        let pump = tokio::spawn(async move {
            let Some(stdout) = stdout else { return };
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Envelope>(trimmed) {
                    Ok(envelope) => {
                        if pump_tx.send(ChannelMessage::Envelope(envelope)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => tracing::debug!(target: "worker", "{}", line),
                }
            }
        });

        // Supervisor: owns the child, delivers the exit notice after the
        // pump has drained so envelope order is preserved.
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status.ok(),
                _ = shutdown_rx => {
                    match tokio::time::timeout(DISCONNECT_GRACE, child.wait()).await {
                        Ok(status) => status.ok(),
                        Err(_) => {
                            let _ = child.start_kill();
                            child.wait().await.ok()
                        }
                    }
                }
            };
            let _ = pump.await;
            let exit = WorkerExit {
                code: status.and_then(|s| s.code()),
            };
            let _ = tx.send(ChannelMessage::Exited(exit)).await;
        });

        Ok(Self {
            stdin,
            rx,
            shutdown: Some(shutdown_tx),
        })
    }
}

#[async_trait]
impl WorkerChannel for ProcessWorkerChannel {
    async fn send(&mut self, command: &WorkerCommand) -> Result<(), ChannelError> {
        let stdin = self.stdin.as_mut().ok_or(ChannelError::Closed)?;
        let mut line = serde_json::to_string(command).map_err(|e| {
            ChannelError::Send(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(ChannelError::Send)?;
        stdin.flush().await.map_err(ChannelError::Send)
    }

    async fn recv(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }

    async fn disconnect(&mut self) {
        // Closing stdin is the graceful signal; the supervisor escalates to
        // a kill if the worker lingers. Both halves are Option::take, so a
        // second disconnect is a no-op.
        self.stdin.take();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// [`WorkerChannelFactory`] spawning real worker processes.
pub struct ProcessChannelFactory;

impl WorkerChannelFactory for ProcessChannelFactory {
    fn spawn(&self, spec: WorkerSpec) -> Result<Box<dyn WorkerChannel>, ChannelError> {
        Ok(Box::new(ProcessWorkerChannel::spawn(spec)?))
    }
}
