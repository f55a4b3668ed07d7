//! # launch-core
//!
//! Launch orchestration engine for launchkit.
//!
//! This crate provides:
//! - Worker channel management (spawning and talking to the isolated
//!   validation/download worker)
//! - Progress aggregation across pipeline phases
//! - The launch state machine driving one attempt end to end
//! - Game process lifecycle supervision and crash detection
//! - Failure classification with user-facing remediation
//!
//! ## Modules
//!
//! - [`config`]: Launcher configuration loading
//! - [`worker`]: Worker channel trait and process-backed implementation
//! - [`progress`]: Phase weight tables and the progress aggregator
//! - [`session`]: Launch session state and the transition table
//! - [`monitor`]: Game output classification and crash-report watching
//! - [`failure`]: Failure classification and remediation text
//! - [`collaborators`]: Interfaces to external collaborators
//! - [`orchestrator`]: The engine tying all of the above together

pub mod collaborators;
pub mod config;
pub mod failure;
pub mod monitor;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod worker;
