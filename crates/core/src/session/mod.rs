//! Launch session state and the transition table.

pub mod attempt;
pub mod machine;

pub use attempt::{LaunchSession, TimerGuard, MIN_LINGER};
pub use machine::{Effect, LaunchMachine, SessionEvent, WorkerRequest};
