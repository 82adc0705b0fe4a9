//! Advancer: turns an observation into at most one new comment.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::plan::{NextStep, plan_next};
use crate::core::template::CommentTemplate;
use crate::core::types::{CycleOutcome, Observation};
use crate::core::video::VideoRef;
use crate::io::api::CommentApi;
use crate::io::record::RecordLog;

pub struct Advancer<'a, A: CommentApi> {
    api: &'a A,
    template: &'a CommentTemplate,
    ceiling: u64,
    window: u32,
    record: &'a RecordLog,
}

/// Outcome of a cycle plus the record line written for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub record_line: String,
}

impl<'a, A: CommentApi> Advancer<'a, A> {
    pub fn new(
        api: &'a A,
        template: &'a CommentTemplate,
        ceiling: u64,
        window: u32,
        record: &'a RecordLog,
    ) -> Self {
        Self {
            api,
            template,
            ceiling,
            window,
            record,
        }
    }

    /// Decide and carry out this cycle's action, then record the outcome.
    ///
    /// Only record-log write failures are returned as errors; every remote
    /// failure is an outcome.
    #[instrument(skip_all, fields(aid = video.aid, max = ?observation.max))]
    pub fn advance(&self, video: &VideoRef, observation: &Observation) -> Result<CycleReport> {
        let outcome = match plan_next(observation.max, self.ceiling) {
            NextStep::Skip => CycleOutcome::NoMatch {
                window: self.window,
                fetch_error: observation.fetch_error.clone(),
            },
            NextStep::Halt { next, ceiling } => CycleOutcome::CeilingReached { next, ceiling },
            NextStep::Post { next } => self.post(video.aid, next),
        };
        let record_line = self.record.append(&outcome.to_string())?;
        Ok(CycleReport {
            outcome,
            record_line,
        })
    }

    fn post(&self, aid: u64, next: u64) -> CycleOutcome {
        let message = self.template.render(next);
        match self.api.post_comment(aid, &message) {
            Ok(answer) if answer.is_success() => {
                info!(next, "comment posted");
                CycleOutcome::Posted {
                    value: next,
                    message,
                }
            }
            Ok(answer) => {
                warn!(next, code = answer.code, message = %answer.message, "comment rejected");
                CycleOutcome::PostFailed {
                    value: next,
                    code: Some(answer.code),
                    message: answer.message,
                }
            }
            Err(err) => {
                warn!(next, error = %format!("{err:#}"), "comment submission failed");
                CycleOutcome::PostFailed {
                    value: next,
                    code: None,
                    message: format!("{err:#}"),
                }
            }
        }
    }
}
