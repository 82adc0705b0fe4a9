//! Bot configuration stored in `countbot.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::template::CommentTemplate;
use crate::core::video::Bvid;

pub const DEFAULT_CONFIG_PATH: &str = "countbot.toml";
pub const SESSDATA_ENV: &str = "COUNTBOT_SESSDATA";
pub const BILI_JCT_ENV: &str = "COUNTBOT_BILI_JCT";

/// Largest page size the comment listing accepts.
pub const MAX_WINDOW_SIZE: u32 = 49;
/// One year.
pub const MAX_INTERVAL_HOURS: f64 = 24.0 * 365.0;

/// Bot configuration (TOML).
///
/// Fixed at process start. Missing fields default to the values the bot was
/// first deployed with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    /// Public video identifier whose comment section carries the counter.
    pub bvid: String,

    /// Pause between cycles, in hours. Fractions are allowed (`0.5` = 30 min).
    pub interval_hours: f64,

    /// Highest counter value the bot will post.
    pub ceiling: u64,

    /// Number of newest comments scanned per cycle.
    pub window_size: u32,

    /// Append-only outcome log.
    pub record_path: PathBuf,

    pub template: TemplateConfig,
    pub credentials: Credentials,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TemplateConfig {
    pub prefix: String,
    pub suffix: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            prefix: "唤炽心无双，（".to_string(),
            suffix: "/1000）秋同所向，一弦一调唤知己，山海风流鸣笙簧，乐鸣东方！".to_string(),
        }
    }
}

/// Session cookies. Acquiring and refreshing them happens outside the bot.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Credentials {
    /// `SESSDATA` cookie.
    pub sessdata: String,
    /// `bili_jct` cookie, doubling as the csrf token on writes.
    pub bili_jct: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("sessdata", &redact(&self.sessdata))
            .field("bili_jct", &redact(&self.bili_jct))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<empty>" } else { "<redacted>" }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bilibili.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bvid: "BV1Y26wBcERw".to_string(),
            interval_hours: 24.0,
            ceiling: 1000,
            window_size: 10,
            record_path: PathBuf::from("comment_record.txt"),
            template: TemplateConfig::default(),
            credentials: Credentials::default(),
            api: ApiConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn validate(&self) -> Result<()> {
        Bvid::parse(&self.bvid).context("bvid")?;
        if !self.interval_hours.is_finite()
            || self.interval_hours <= 0.0
            || self.interval_hours > MAX_INTERVAL_HOURS
        {
            return Err(anyhow!(
                "interval_hours must be > 0 and at most {MAX_INTERVAL_HOURS}"
            ));
        }
        if self.ceiling == 0 {
            return Err(anyhow!("ceiling must be > 0"));
        }
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(anyhow!("window_size must be within 1..={MAX_WINDOW_SIZE}"));
        }
        if self.template.prefix.is_empty() && self.template.suffix.is_empty() {
            return Err(anyhow!("template.prefix and template.suffix cannot both be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(anyhow!("api.timeout_secs must be > 0"));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(anyhow!("api.base_url must be set"));
        }
        Ok(())
    }

    /// Posting needs both cookies; read-only commands do not.
    pub fn require_credentials(&self) -> Result<()> {
        if self.credentials.sessdata.trim().is_empty() {
            return Err(anyhow!(
                "credentials.sessdata is empty (set it in the config or {SESSDATA_ENV})"
            ));
        }
        if self.credentials.bili_jct.trim().is_empty() {
            return Err(anyhow!(
                "credentials.bili_jct is empty (set it in the config or {BILI_JCT_ENV})"
            ));
        }
        Ok(())
    }

    /// Replace credentials with values from `lookup` where present and non-empty.
    pub fn apply_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(SESSDATA_ENV).filter(|v| !v.is_empty()) {
            self.credentials.sessdata = value;
        }
        if let Some(value) = lookup(BILI_JCT_ENV).filter(|v| !v.is_empty()) {
            self.credentials.bili_jct = value;
        }
        self
    }

    pub fn bvid(&self) -> Result<Bvid> {
        Bvid::parse(&self.bvid)
    }

    pub fn comment_template(&self) -> Result<CommentTemplate> {
        CommentTemplate::new(&self.template.prefix, &self.template.suffix)
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.interval_hours * 3600.0)
    }
}

/// Load config from a TOML file and apply environment credential overrides.
///
/// Unlike state files, a missing config is an error: there is no sensible
/// default target video.
pub fn load_config(path: &Path) -> Result<BotConfig> {
    let contents = fs::read_to_string(path).with_context(|| {
        format!(
            "read {} (run `countbot init` to create one)",
            path.display()
        )
    })?;
    let cfg: BotConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    let cfg = cfg.apply_env_overrides(|key| std::env::var(key).ok());
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BotConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
