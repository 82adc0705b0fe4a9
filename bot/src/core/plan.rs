//! Next-step decision from an observed counter.

/// What the Advancer should do this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// No counter observed; skip posting this cycle.
    Skip,
    /// `next` would exceed the ceiling; the run is over.
    Halt { next: Option<u64>, ceiling: u64 },
    /// Post `next`.
    Post { next: u64 },
}

/// Decide the next step from the maximum observed counter.
///
/// `next = max + 1`; posting `next == ceiling` is allowed. An overflowing
/// `max + 1` counts as exceeding the ceiling and is reported as `next: None`.
pub fn plan_next(observed: Option<u64>, ceiling: u64) -> NextStep {
    let Some(max) = observed else {
        return NextStep::Skip;
    };
    match max.checked_add(1) {
        Some(next) if next <= ceiling => NextStep::Post { next },
        next => NextStep::Halt { next, ceiling },
    }
}
