//! Worker channel: the duplex, message-oriented link to the isolated
//! validation/download worker process.

pub mod channel;
pub mod mock;

pub use channel::{
    ChannelError, ChannelMessage, ProcessChannelFactory, ProcessWorkerChannel, WorkerChannel,
    WorkerChannelFactory, WorkerExit, WorkerSpec,
};
pub use mock::{mock_channel, MockChannelFactory, MockLog, MockWorkerChannel, MockWorkerHandle};
