//! Per-attempt session state.
//!
//! A [`LaunchSession`] owns everything mutable about one launch attempt: the
//! state machine, the resolved runtime path and the linger timer. It is
//! created fresh for every attempt and dropped at the end, so no state leaks
//! between attempts.

use chrono::{DateTime, Utc};
use launch_protocol::LaunchState;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::session::machine::{Effect, LaunchMachine, SessionEvent};

/// Floor between process spawn and loading-complete, so the loading UI never
/// flashes away instantly.
pub const MIN_LINGER: Duration = Duration::from_millis(5000);

/// A cancellable one-shot timer. Dropping the guard aborts the timer task,
/// so a transition that leaves the arming state cancels it implicitly.
pub struct TimerGuard {
    handle: JoinHandle<()>,
}

impl TimerGuard {
    /// Arm a timer that sends `event` on `tx` after `duration`.
    pub fn arm(
        duration: Duration,
        tx: mpsc::UnboundedSender<SessionEvent>,
        event: SessionEvent,
    ) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(event);
        });
        Self { handle }
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One launch attempt.
pub struct LaunchSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    machine: LaunchMachine,
    runtime_path: Option<PathBuf>,
    linger: Option<TimerGuard>,
}

impl Default for LaunchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            machine: LaunchMachine::new(),
            runtime_path: None,
            linger: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> LaunchState {
        self.machine.state()
    }

    pub fn failure(&self) -> Option<launch_protocol::FailureKind> {
        self.machine.failure()
    }

    /// The runtime executable resolved during this attempt, once known.
    pub fn runtime_path(&self) -> Option<&Path> {
        self.runtime_path.as_deref()
    }

    /// Start the attempt.
    pub fn begin(&mut self) -> Vec<Effect> {
        self.machine.begin()
    }

    /// Feed one event through the machine, capturing session-owned state
    /// (the resolved runtime path) on the way out.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let effects = self.machine.handle(event);
        for effect in &effects {
            if let Effect::PersistRuntimePath(path) = effect {
                self.runtime_path = Some(path.clone());
            }
        }
        effects
    }

    /// Arm the minimum-linger timer. Replacing a previous guard cancels it.
    pub fn arm_linger(&mut self, tx: mpsc::UnboundedSender<SessionEvent>) {
        self.linger = Some(TimerGuard::arm(MIN_LINGER, tx, SessionEvent::LingerElapsed));
    }

    /// Drop all timers; called when the session reaches a terminal state.
    pub fn disarm_timers(&mut self) {
        self.linger = None;
    }
}
