//! Shared deterministic types for cycle reporting.
//!
//! These types describe what happened in one cycle. They hold no handles to
//! remote or local state and render to the record-log message format.

use std::fmt;

/// Result of one State Reader pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Highest counter found in the window, `None` when nothing matched.
    pub max: Option<u64>,
    /// Number of comment bodies scanned.
    pub scanned: usize,
    /// Set when the window could not be fetched; the cycle then counts as
    /// "no match" and the next cycle retries.
    pub fetch_error: Option<String>,
}

impl Observation {
    pub fn unavailable(reason: String) -> Self {
        Self {
            max: None,
            scanned: 0,
            fetch_error: Some(reason),
        }
    }
}

/// Outcome of one cycle, as written to the record log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The window held no template match (or could not be fetched).
    NoMatch {
        window: u32,
        fetch_error: Option<String>,
    },
    /// `next` exceeds the ceiling; the run terminates without posting.
    CeilingReached { next: Option<u64>, ceiling: u64 },
    /// The platform accepted the new comment.
    Posted { value: u64, message: String },
    /// The platform rejected the comment, or the request never completed
    /// (`code: None`).
    PostFailed {
        value: u64,
        code: Option<i64>,
        message: String,
    },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::NoMatch {
                window,
                fetch_error,
            } => {
                write!(
                    f,
                    "no target format found in the latest {window} comments; skipping this cycle"
                )?;
                if let Some(reason) = fetch_error {
                    write!(f, " (fetch failed: {reason})")?;
                }
                Ok(())
            }
            CycleOutcome::CeilingReached {
                next: Some(next),
                ceiling,
            } => write!(
                f,
                "ceiling reached: next value {next} exceeds ceiling {ceiling}; run complete"
            ),
            CycleOutcome::CeilingReached {
                next: None,
                ceiling,
            } => write!(
                f,
                "ceiling reached: next value overflows, ceiling {ceiling}; run complete"
            ),
            CycleOutcome::Posted { value, message } => {
                write!(f, "post succeeded | counter: {value} | text: {message}")
            }
            CycleOutcome::PostFailed {
                value,
                code,
                message,
            } => {
                let code = code.map_or_else(|| "transport".to_string(), |code| code.to_string());
                write!(
                    f,
                    "post failed | counter: {value} | code: {code} | message: {message}"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_carries_code_and_message() {
        let line = CycleOutcome::PostFailed {
            value: 8,
            code: Some(-101),
            message: "account not logged in".to_string(),
        }
        .to_string();
        assert!(line.contains("code: -101"));
        assert!(line.contains("account not logged in"));
    }

    #[test]
    fn transport_failure_has_no_code() {
        let line = CycleOutcome::PostFailed {
            value: 8,
            code: None,
            message: "connection reset".to_string(),
        }
        .to_string();
        assert!(line.contains("code: transport"));
    }

    #[test]
    fn no_match_mentions_fetch_error() {
        let line = CycleOutcome::NoMatch {
            window: 10,
            fetch_error: Some("timeout".to_string()),
        }
        .to_string();
        assert!(line.starts_with("no target format found"));
        assert!(line.contains("fetch failed: timeout"));
    }
}
