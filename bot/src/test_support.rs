//! Test-only doubles for the comment platform and pacing.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::template::CommentTemplate;
use crate::core::video::{Bvid, VideoRef};
use crate::io::api::{CommentApi, PostResponse, SUCCESS_CODE};
use crate::io::config::{BotConfig, Credentials, DEFAULT_CONFIG_PATH, write_config};
use crate::io::record::RecordLog;
use crate::schedule::{Pacer, StopSignal};

/// Scripted result: `Err` strings become `anyhow` errors when replayed.
pub type Scripted<T> = std::result::Result<T, String>;

/// The campaign's video, as the platform would resolve it.
pub fn fixture_video() -> VideoRef {
    VideoRef {
        bvid: Bvid::parse("BV1Y26wBcERw").expect("fixture bvid"),
        aid: 170001,
        title: "山海风流".to_string(),
    }
}

/// Campaign-shaped template: full-width punctuation and a `/` in the suffix.
pub fn fixture_template() -> CommentTemplate {
    CommentTemplate::new("唤炽心无双，（", "/1000）乐鸣东方！").expect("fixture template")
}

/// Valid config with placeholder credentials and the given record path.
pub fn fixture_config(record_path: &Path) -> BotConfig {
    BotConfig {
        record_path: record_path.to_path_buf(),
        credentials: Credentials {
            sessdata: "test-sessdata".to_string(),
            bili_jct: "test-jct".to_string(),
        },
        ..BotConfig::default()
    }
}

/// Temporary directory holding a config file and a record log.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join(DEFAULT_CONFIG_PATH)
    }

    pub fn record_path(&self) -> PathBuf {
        self.path().join("comment_record.txt")
    }

    pub fn record(&self) -> RecordLog {
        RecordLog::new(self.record_path())
    }

    /// Valid config pointing at this workspace's record log.
    pub fn config(&self) -> BotConfig {
        fixture_config(&self.record_path())
    }

    pub fn write_config(&self, cfg: &BotConfig) -> Result<()> {
        write_config(&self.config_path(), cfg)
    }

    /// Record log lines, empty if nothing was recorded yet.
    pub fn record_lines(&self) -> Result<Vec<String>> {
        let path = self.record_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(contents.lines().map(str::to_string).collect())
    }
}

/// API double that replays queued responses in order and records requests.
#[derive(Default)]
pub struct ScriptedApi {
    videos: RefCell<VecDeque<Scripted<VideoRef>>>,
    comments: RefCell<VecDeque<Scripted<Vec<String>>>>,
    posts: RefCell<VecDeque<Scripted<PostResponse>>>,
    listing_requests: RefCell<Vec<(u64, u32)>>,
    posted: RefCell<Vec<(u64, String)>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(self, video: Scripted<VideoRef>) -> Self {
        self.videos.borrow_mut().push_back(video);
        self
    }

    pub fn with_comments(self, comments: Scripted<Vec<String>>) -> Self {
        self.comments.borrow_mut().push_back(comments);
        self
    }

    pub fn with_post(self, post: Scripted<PostResponse>) -> Self {
        self.posts.borrow_mut().push_back(post);
        self
    }

    /// `(aid, window)` of every listing request, in order.
    pub fn listing_requests(&self) -> Vec<(u64, u32)> {
        self.listing_requests.borrow().clone()
    }

    /// `(aid, message)` of every submission attempt, in order.
    pub fn posted(&self) -> Vec<(u64, String)> {
        self.posted.borrow().clone()
    }
}

fn replay<T>(queue: &RefCell<VecDeque<Scripted<T>>>, what: &str) -> Result<T> {
    match queue.borrow_mut().pop_front() {
        Some(Ok(value)) => Ok(value),
        Some(Err(message)) => Err(anyhow!(message)),
        None => Err(anyhow!("no scripted {what} left")),
    }
}

impl CommentApi for ScriptedApi {
    fn resolve_video(&self, _bvid: &Bvid) -> Result<VideoRef> {
        replay(&self.videos, "video")
    }

    fn latest_comments(&self, aid: u64, window: u32) -> Result<Vec<String>> {
        self.listing_requests.borrow_mut().push((aid, window));
        replay(&self.comments, "comments")
    }

    fn post_comment(&self, aid: u64, message: &str) -> Result<PostResponse> {
        self.posted.borrow_mut().push((aid, message.to_string()));
        replay(&self.posts, "post")
    }
}

/// In-memory comment section: accepted posts show up in later listings.
pub struct BoardApi {
    video: VideoRef,
    /// Newest first, like the platform's time-ordered listing.
    comments: RefCell<Vec<String>>,
    /// Codes to answer the next submissions with; empty means accept.
    rejections: RefCell<VecDeque<PostResponse>>,
    accepted: RefCell<Vec<String>>,
    attempts: Cell<usize>,
}

impl BoardApi {
    /// `existing` is given oldest first.
    pub fn new(video: VideoRef, existing: Vec<String>) -> Self {
        let mut comments = existing;
        comments.reverse();
        Self {
            video,
            comments: RefCell::new(comments),
            rejections: RefCell::new(VecDeque::new()),
            accepted: RefCell::new(Vec::new()),
            attempts: Cell::new(0),
        }
    }

    /// Reject the next submission with `code` and `message`.
    pub fn reject_next(&self, code: i64, message: &str) {
        self.rejections.borrow_mut().push_back(PostResponse {
            code,
            message: message.to_string(),
        });
    }

    /// Another client posting to the same section.
    pub fn push_foreign(&self, message: &str) {
        self.comments.borrow_mut().insert(0, message.to_string());
    }

    /// Counter values this board accepted from the bot, in posting order.
    pub fn posted_values(&self, template: &CommentTemplate) -> Vec<u64> {
        self.accepted
            .borrow()
            .iter()
            .filter_map(|body| template.extract(body))
            .collect()
    }

    /// Every submission attempt, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }
}

impl CommentApi for BoardApi {
    fn resolve_video(&self, bvid: &Bvid) -> Result<VideoRef> {
        if *bvid != self.video.bvid {
            return Err(anyhow!("video lookup for {bvid} rejected: code -404"));
        }
        Ok(self.video.clone())
    }

    fn latest_comments(&self, aid: u64, window: u32) -> Result<Vec<String>> {
        if aid != self.video.aid {
            return Err(anyhow!("unknown aid {aid}"));
        }
        let comments = self.comments.borrow();
        Ok(comments.iter().take(window as usize).cloned().collect())
    }

    fn post_comment(&self, aid: u64, message: &str) -> Result<PostResponse> {
        if aid != self.video.aid {
            return Err(anyhow!("unknown aid {aid}"));
        }
        self.attempts.set(self.attempts.get() + 1);
        if let Some(rejection) = self.rejections.borrow_mut().pop_front() {
            return Ok(rejection);
        }
        self.comments.borrow_mut().insert(0, message.to_string());
        self.accepted.borrow_mut().push(message.to_string());
        Ok(PostResponse {
            code: SUCCESS_CODE,
            message: "0".to_string(),
        })
    }
}

/// Pacer that records requested intervals instead of sleeping.
#[derive(Default)]
pub struct RecordingPacer {
    pauses: RefCell<Vec<Duration>>,
    raise_on_pause: Option<StopSignal>,
}

impl RecordingPacer {
    /// Raise `stop` on the first pause, simulating an interrupt mid-sleep.
    pub fn raising(stop: StopSignal) -> Self {
        Self {
            pauses: RefCell::new(Vec::new()),
            raise_on_pause: Some(stop),
        }
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.borrow().clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, interval: Duration, _stop: &StopSignal) {
        self.pauses.borrow_mut().push(interval);
        if let Some(stop) = &self.raise_on_pause {
            stop.raise();
        }
    }
}
