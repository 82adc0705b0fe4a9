//! State Reader: reconstructs the counter from the newest comments.
//!
//! Nothing is cached between cycles; every call re-reads the platform, so a
//! restarted bot resumes from whatever the comment section currently shows.

use tracing::{debug, instrument, warn};

use crate::core::template::CommentTemplate;
use crate::core::types::Observation;
use crate::io::api::CommentApi;

pub struct StateReader<'a, A: CommentApi> {
    api: &'a A,
    template: &'a CommentTemplate,
    window: u32,
}

impl<'a, A: CommentApi> StateReader<'a, A> {
    pub fn new(api: &'a A, template: &'a CommentTemplate, window: u32) -> Self {
        Self {
            api,
            template,
            window,
        }
    }

    /// Highest counter among the newest `window` comments on `aid`.
    ///
    /// Fetch or decode failures do not propagate: they yield an observation
    /// with no max so the schedule carries on and retries next cycle.
    #[instrument(skip_all, fields(aid = aid, window = self.window))]
    pub fn observe(&self, aid: u64) -> Observation {
        let comments = match self.api.latest_comments(aid, self.window) {
            Ok(comments) => comments,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "comment window unavailable");
                return Observation::unavailable(format!("{err:#}"));
            }
        };
        let max = self
            .template
            .max_counter(comments.iter().map(String::as_str));
        debug!(scanned = comments.len(), max = ?max, "comment window scanned");
        Observation {
            max,
            scanned: comments.len(),
            fetch_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedApi, fixture_template};

    #[test]
    fn finds_max_in_window() {
        let template = fixture_template();
        let api = ScriptedApi::new().with_comments(Ok(vec![
            template.render(12),
            "nice video".to_string(),
            template.render(14),
            template.render(13),
        ]));
        let observation = StateReader::new(&api, &template, 10).observe(7);
        assert_eq!(observation.max, Some(14));
        assert_eq!(observation.scanned, 4);
        assert_eq!(observation.fetch_error, None);
        assert_eq!(api.listing_requests(), vec![(7, 10)]);
    }

    #[test]
    fn fetch_failure_reads_as_no_match() {
        let template = fixture_template();
        let api = ScriptedApi::new().with_comments(Err("connection reset".to_string()));
        let observation = StateReader::new(&api, &template, 10).observe(7);
        assert_eq!(observation.max, None);
        assert_eq!(observation.scanned, 0);
        assert!(
            observation
                .fetch_error
                .as_deref()
                .is_some_and(|e| e.contains("connection reset"))
        );
    }

    #[test]
    fn empty_window_reads_as_no_match() {
        let template = fixture_template();
        let api = ScriptedApi::new().with_comments(Ok(Vec::new()));
        let observation = StateReader::new(&api, &template, 10).observe(7);
        assert_eq!(observation.max, None);
        assert_eq!(observation.fetch_error, None);
    }
}
