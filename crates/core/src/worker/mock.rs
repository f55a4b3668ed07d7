//! Scripted worker channel for testing.
//!
//! A mock channel plays back a prepared message sequence and records every
//! command and disconnect it receives. The paired handle lets a test feed
//! further messages while the orchestrator is running.

use async_trait::async_trait;
use launch_protocol::WorkerCommand;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::worker::channel::{
    ChannelError, ChannelMessage, WorkerChannel, WorkerChannelFactory, WorkerSpec,
};

/// What the orchestrator did to a mock channel.
#[derive(Debug, Default)]
pub struct MockLog {
    pub sent: Vec<WorkerCommand>,
    pub disconnects: usize,
}

/// Test-side handle to a [`MockWorkerChannel`].
#[derive(Clone)]
pub struct MockWorkerHandle {
    tx: mpsc::UnboundedSender<ChannelMessage>,
    log: Arc<Mutex<MockLog>>,
}

impl MockWorkerHandle {
    /// Feed another message into the channel.
    pub fn push(&self, message: ChannelMessage) {
        let _ = self.tx.send(message);
    }

    /// Commands the orchestrator sent so far.
    pub fn sent(&self) -> Vec<WorkerCommand> {
        self.log.lock().unwrap().sent.clone()
    }

    /// How many times the channel was disconnected.
    pub fn disconnects(&self) -> usize {
        self.log.lock().unwrap().disconnects
    }
}

/// [`WorkerChannel`] that replays a script instead of talking to a process.
pub struct MockWorkerChannel {
    rx: mpsc::UnboundedReceiver<ChannelMessage>,
    log: Arc<Mutex<MockLog>>,
    disconnected: bool,
}

/// Create an empty mock channel plus its test-side handle.
pub fn mock_channel() -> (MockWorkerChannel, MockWorkerHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let log = Arc::new(Mutex::new(MockLog::default()));
    (
        MockWorkerChannel {
            rx,
            log: Arc::clone(&log),
            disconnected: false,
        },
        MockWorkerHandle { tx, log },
    )
}

impl MockWorkerChannel {
    /// A channel preloaded with `script`, delivered in order.
    pub fn scripted(script: Vec<ChannelMessage>) -> (Self, MockWorkerHandle) {
        let (channel, handle) = mock_channel();
        for message in script {
            handle.push(message);
        }
        (channel, handle)
    }
}

#[async_trait]
impl WorkerChannel for MockWorkerChannel {
    async fn send(&mut self, command: &WorkerCommand) -> Result<(), ChannelError> {
        if self.disconnected {
            return Err(ChannelError::Closed);
        }
        self.log.lock().unwrap().sent.push(command.clone());
        Ok(())
    }

    async fn recv(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }

    async fn disconnect(&mut self) {
        self.disconnected = true;
        self.log.lock().unwrap().disconnects += 1;
        self.rx.close();
    }
}

/// Factory handing out pre-built mock channels, one per `spawn` call.
#[derive(Default)]
pub struct MockChannelFactory {
    channels: Mutex<VecDeque<MockWorkerChannel>>,
    specs: Mutex<Vec<WorkerSpec>>,
}

impl MockChannelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a channel for the next `spawn`.
    pub fn enqueue(&self, channel: MockWorkerChannel) {
        self.channels.lock().unwrap().push_back(channel);
    }

    /// Specs the orchestrator asked to spawn.
    pub fn spawned_specs(&self) -> Vec<WorkerSpec> {
        self.specs.lock().unwrap().clone()
    }
}

impl WorkerChannelFactory for MockChannelFactory {
    fn spawn(&self, spec: WorkerSpec) -> Result<Box<dyn WorkerChannel>, ChannelError> {
        self.specs.lock().unwrap().push(spec);
        let channel = self
            .channels
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ChannelError::Closed)?;
        Ok(Box::new(channel))
    }
}
