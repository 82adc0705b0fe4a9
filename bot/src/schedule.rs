//! Cycle schedule for `countbot run`.
//!
//! Repeats State Reader -> Advancer with a pause in between until the ceiling
//! is reached, the stop signal is raised, or an optional cycle limit is hit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info};

use crate::advancer::{Advancer, CycleReport};
use crate::core::types::CycleOutcome;
use crate::core::video::VideoRef;
use crate::io::api::CommentApi;
use crate::reader::StateReader;

/// Longest uninterrupted sleep inside [`ThreadPacer::pause`].
const PAUSE_SLICE: Duration = Duration::from_secs(1);

/// Shared stop flag, checked between cycles and while pausing.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Waits out the interval between cycles.
pub trait Pacer {
    /// Wait for `interval`, returning early once `stop` is raised.
    fn pause(&self, interval: Duration, stop: &StopSignal);
}

/// Pacer backed by `std::thread::sleep`, waking every second to check `stop`.
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, interval: Duration, stop: &StopSignal) {
        let deadline = Instant::now() + interval;
        while !stop.is_raised() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            std::thread::sleep(remaining.min(PAUSE_SLICE));
        }
    }
}

/// Reason why `run_schedule` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleStop {
    /// The next counter would exceed the ceiling.
    CeilingReached { next: Option<u64>, ceiling: u64 },
    /// The stop signal was raised.
    Interrupted,
    /// The caller's cycle limit was reached.
    CycleLimit { max_cycles: u32 },
}

/// Summary of a schedule invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub cycles: u32,
    pub stop: ScheduleStop,
}

/// Everything one cycle needs, fixed for the whole run.
pub struct Schedule<'a, A: CommentApi, P: Pacer> {
    pub video: &'a VideoRef,
    pub reader: StateReader<'a, A>,
    pub advancer: Advancer<'a, A>,
    pub pacer: &'a P,
    pub interval: Duration,
    /// Stop after this many cycles (no trailing pause). `None` runs until the
    /// ceiling or the stop signal.
    pub max_cycles: Option<u32>,
}

/// Run cycles until the ceiling, the stop signal, or the cycle limit.
///
/// Stops immediately on record-log errors; remote failures are outcomes and
/// never end the schedule.
pub fn run_schedule<A, P, F>(
    schedule: &Schedule<'_, A, P>,
    stop: &StopSignal,
    mut on_cycle: F,
) -> Result<ScheduleOutcome>
where
    A: CommentApi,
    P: Pacer,
    F: FnMut(&CycleReport),
{
    let mut cycles = 0u32;
    loop {
        if stop.is_raised() {
            info!(cycles, "stop requested");
            return Ok(ScheduleOutcome {
                cycles,
                stop: ScheduleStop::Interrupted,
            });
        }

        let observation = schedule.reader.observe(schedule.video.aid);
        let report = schedule.advancer.advance(schedule.video, &observation)?;
        cycles += 1;
        on_cycle(&report);

        if let CycleOutcome::CeilingReached { next, ceiling } = report.outcome {
            return Ok(ScheduleOutcome {
                cycles,
                stop: ScheduleStop::CeilingReached { next, ceiling },
            });
        }
        if let Some(max_cycles) = schedule.max_cycles.filter(|max| cycles >= *max) {
            return Ok(ScheduleOutcome {
                cycles,
                stop: ScheduleStop::CycleLimit { max_cycles },
            });
        }

        debug!(cycles, interval_secs = schedule.interval.as_secs(), "pausing");
        schedule.pacer.pause(schedule.interval, stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::api::PostResponse;
    use crate::io::record::RecordLog;
    use crate::test_support::{
        BoardApi, RecordingPacer, ScriptedApi, fixture_template, fixture_video,
    };

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn stops_at_ceiling_after_posting_up_to_it() {
        let temp = tempfile::tempdir().expect("tempdir");
        let record = RecordLog::new(temp.path().join("record.txt"));
        let template = fixture_template();
        let video = fixture_video();
        let board = BoardApi::new(video.clone(), vec![template.render(8)]);
        let pacer = RecordingPacer::default();

        let schedule = Schedule {
            video: &video,
            reader: StateReader::new(&board, &template, 10),
            advancer: Advancer::new(&board, &template, 10, 10, &record),
            pacer: &pacer,
            interval: HOUR,
            max_cycles: None,
        };
        let outcome = run_schedule(&schedule, &StopSignal::new(), |_| {}).expect("schedule");

        assert_eq!(outcome.cycles, 3);
        assert_eq!(
            outcome.stop,
            ScheduleStop::CeilingReached {
                next: Some(11),
                ceiling: 10
            }
        );
        assert_eq!(board.posted_values(&template), vec![9, 10]);
        // No pause after the terminal cycle.
        assert_eq!(pacer.pauses(), vec![HOUR, HOUR]);
    }

    #[test]
    fn cycle_limit_skips_trailing_pause() {
        let temp = tempfile::tempdir().expect("tempdir");
        let record = RecordLog::new(temp.path().join("record.txt"));
        let template = fixture_template();
        let video = fixture_video();
        let api = ScriptedApi::new()
            .with_comments(Ok(vec!["unrelated".to_string()]))
            .with_comments(Ok(vec!["still unrelated".to_string()]));
        let pacer = RecordingPacer::default();

        let schedule = Schedule {
            video: &video,
            reader: StateReader::new(&api, &template, 10),
            advancer: Advancer::new(&api, &template, 1000, 10, &record),
            pacer: &pacer,
            interval: HOUR,
            max_cycles: Some(2),
        };
        let mut seen = Vec::new();
        let outcome = run_schedule(&schedule, &StopSignal::new(), |report| {
            seen.push(report.outcome.clone());
        })
        .expect("schedule");

        assert_eq!(outcome.stop, ScheduleStop::CycleLimit { max_cycles: 2 });
        assert_eq!(seen.len(), 2);
        assert!(
            seen.iter()
                .all(|o| matches!(o, CycleOutcome::NoMatch { .. }))
        );
        assert_eq!(pacer.pauses(), vec![HOUR]);
        assert!(api.posted().is_empty());
    }

    #[test]
    fn raised_signal_stops_before_next_cycle() {
        let temp = tempfile::tempdir().expect("tempdir");
        let record = RecordLog::new(temp.path().join("record.txt"));
        let template = fixture_template();
        let video = fixture_video();
        let api = ScriptedApi::new()
            .with_comments(Ok(vec![template.render(1)]))
            .with_post(Ok(PostResponse {
                code: 0,
                message: "0".to_string(),
            }));
        let stop = StopSignal::new();
        let pacer = RecordingPacer::raising(stop.clone());

        let schedule = Schedule {
            video: &video,
            reader: StateReader::new(&api, &template, 10),
            advancer: Advancer::new(&api, &template, 1000, 10, &record),
            pacer: &pacer,
            interval: HOUR,
            max_cycles: None,
        };
        let outcome = run_schedule(&schedule, &stop, |_| {}).expect("schedule");

        assert_eq!(outcome.cycles, 1);
        assert_eq!(outcome.stop, ScheduleStop::Interrupted);
        assert_eq!(api.listing_requests().len(), 1);
    }

    #[test]
    fn already_raised_signal_runs_no_cycle() {
        let temp = tempfile::tempdir().expect("tempdir");
        let record = RecordLog::new(temp.path().join("record.txt"));
        let template = fixture_template();
        let video = fixture_video();
        let api = ScriptedApi::new();
        let pacer = RecordingPacer::default();
        let stop = StopSignal::new();
        stop.raise();

        let schedule = Schedule {
            video: &video,
            reader: StateReader::new(&api, &template, 10),
            advancer: Advancer::new(&api, &template, 1000, 10, &record),
            pacer: &pacer,
            interval: HOUR,
            max_cycles: None,
        };
        let outcome = run_schedule(&schedule, &stop, |_| {}).expect("schedule");

        assert_eq!(outcome.cycles, 0);
        assert!(api.listing_requests().is_empty());
        assert!(!record.path().exists());
    }

    #[test]
    fn thread_pacer_returns_early_when_stopped() {
        let stop = StopSignal::new();
        stop.raise();
        let started = Instant::now();
        ThreadPacer.pause(HOUR, &stop);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn thread_pacer_waits_short_interval() {
        let started = Instant::now();
        ThreadPacer.pause(Duration::from_millis(20), &StopSignal::new());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
