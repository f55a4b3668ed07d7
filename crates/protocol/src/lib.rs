//! # launch-protocol
//!
//! Core protocol definitions and data models for launchkit.
//!
//! This crate defines all shared data structures used for:
//! - The worker wire protocol (envelopes in, commands out)
//! - Launch state and failure taxonomy shared between core and UI
//! - Inter-process communication between the renderer and the Core
//!
//! ## Modules
//!
//! - [`envelope`]: Worker envelope and command wire types
//! - [`launch_models`]: Launch states, phases and the failure taxonomy
//! - [`process_models`]: Game process output classification results
//! - [`ipc`]: Operations and Events for Core-renderer communication
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, uuid and chrono
//! - TypeScript generation: All types derive `TS` for the renderer
//! - Independent compilation: No dependencies on other launchkit crates

pub mod envelope;
pub mod ipc;
pub mod launch_models;
pub mod process_models;

// Re-export all public types for convenience
pub use envelope::*;
pub use ipc::*;
pub use launch_models::*;
pub use process_models::*;
