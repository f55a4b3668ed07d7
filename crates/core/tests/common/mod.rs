//! Common test utilities and helpers for the launch flow tests.
//!
//! This module provides shared functionality across the integration tests:
//! - Test fixtures (sample configs, distribution index, worker scripts)
//! - Custom assertions over the event stream
//! - Mock collaborators (distribution provider, account store, game builder)

pub mod assertions;
pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mocks::*;
