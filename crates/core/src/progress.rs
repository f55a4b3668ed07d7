//! Progress aggregation.
//!
//! Maps phase-scoped progress counters (file counts, byte totals) onto a
//! single 0-100 scale with static per-phase weighting. The aggregate shown
//! to the user never decreases within one launch attempt.

use launch_protocol::Phase;

/// The contribution window of one phase on the aggregate scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseWindow {
    pub start: f64,
    pub end: f64,
}

/// Static mapping from phase to its window on the aggregate scale.
///
/// Windows for a single flow are non-overlapping, monotonically increasing
/// in pipeline order, and cover exactly 0-100.
#[derive(Debug, Clone, Copy)]
pub struct PhaseWeights {
    table: &'static [(Phase, PhaseWindow)],
}

/// Weights for the content pipeline (validation, download, extraction).
pub const CONTENT_WEIGHTS: PhaseWeights = PhaseWeights {
    table: &[
        (Phase::Distribution, PhaseWindow { start: 0.0, end: 10.0 }),
        (Phase::Version, PhaseWindow { start: 10.0, end: 20.0 }),
        (Phase::Assets, PhaseWindow { start: 20.0, end: 40.0 }),
        (Phase::Libraries, PhaseWindow { start: 40.0, end: 50.0 }),
        (Phase::Files, PhaseWindow { start: 50.0, end: 55.0 }),
        (Phase::Download, PhaseWindow { start: 55.0, end: 90.0 }),
        (Phase::Extract, PhaseWindow { start: 90.0, end: 100.0 }),
    ],
};

/// Weights for the runtime-acquisition flow (download, extraction).
pub const RUNTIME_WEIGHTS: PhaseWeights = PhaseWeights {
    table: &[
        (Phase::Download, PhaseWindow { start: 0.0, end: 80.0 }),
        (Phase::Extract, PhaseWindow { start: 80.0, end: 100.0 }),
    ],
};

impl PhaseWeights {
    /// Look up the window for a phase. `None` means the phase does not
    /// contribute to this flow's aggregate.
    pub fn window(&self, phase: Phase) -> Option<PhaseWindow> {
        self.table
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, w)| *w)
    }
}

/// Pure aggregation formula.
///
/// `total == 0` is treated as phase-just-entered and yields the phase's
/// start weight. The result is clamped to `[0, 100]`.
pub fn aggregate(phase: Phase, value: u64, total: u64, weights: PhaseWeights) -> Option<f64> {
    let window = weights.window(phase)?;
    if total == 0 {
        return Some(window.start);
    }
    let fraction = value as f64 / total as f64;
    Some((window.start + fraction * (window.end - window.start)).clamp(0.0, 100.0))
}

/// Stateful wrapper enforcing the monotonicity law for one attempt.
///
/// Candidates below the last displayed percent are ignored, so an
/// out-of-order phase can never pull the display backwards.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    weights: PhaseWeights,
    last: f64,
}

impl ProgressTracker {
    pub fn new(weights: PhaseWeights) -> Self {
        Self { weights, last: 0.0 }
    }

    /// The last displayed percent.
    pub fn percent(&self) -> f64 {
        self.last
    }

    /// Feed a `progress` envelope. Returns the new display value, or `None`
    /// when the display should not change.
    pub fn update(&mut self, phase: Phase, value: u64, total: u64) -> Option<f64> {
        let candidate = aggregate(phase, value, total, self.weights)?;
        if candidate <= self.last {
            return None;
        }
        self.last = candidate;
        Some(candidate)
    }

    /// Feed a `complete` envelope: snap to exactly the phase's end weight,
    /// ignoring the last partial value.
    pub fn complete(&mut self, phase: Phase) -> Option<f64> {
        let window = self.weights.window(phase)?;
        if window.end <= self.last {
            return None;
        }
        self.last = window.end;
        Some(window.end)
    }

    /// Force the display to a value (used when entering Spawning).
    pub fn snap_to(&mut self, percent: f64) -> Option<f64> {
        let percent = percent.clamp(0.0, 100.0);
        if percent <= self.last {
            return None;
        }
        self.last = percent;
        Some(percent)
    }
}
