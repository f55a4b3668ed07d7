//! Custom assertion helpers over the orchestrator's event stream.

use launch_protocol::{Event, FailureKind, LaunchState};

/// The sequence of states the session passed through.
pub fn states(events: &[Event]) -> Vec<LaunchState> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::StateChanged { state, .. } => Some(*state),
            _ => None,
        })
        .collect()
}

/// Assert the session passed through `expected` states, in order (other
/// states may appear in between).
pub fn assert_states_in_order(events: &[Event], expected: &[LaunchState]) {
    let seen = states(events);
    let mut remaining = expected.iter();
    let mut next = remaining.next();
    for state in &seen {
        if Some(state) == next {
            next = remaining.next();
        }
    }
    assert!(
        next.is_none(),
        "expected states {:?} in order, saw {:?}",
        expected,
        seen
    );
}

/// The failure kinds surfaced on the stream.
pub fn failures(events: &[Event]) -> Vec<FailureKind> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::LaunchFailed { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

/// All progress percentages, in emission order.
pub fn progress_values(events: &[Event]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

/// Assert the displayed progress never decreased after the content flow
/// reset its scale to zero.
pub fn assert_progress_monotonic_after_reset(events: &[Event]) {
    let values = progress_values(events);
    let Some(reset) = values.iter().rposition(|v| *v == 0.0) else {
        return;
    };
    for pair in values[reset..].windows(2) {
        assert!(
            pair[1] >= pair[0],
            "progress decreased: {:?}",
            &values[reset..]
        );
    }
}
