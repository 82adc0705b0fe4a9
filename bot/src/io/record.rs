//! Append-only outcome record (`comment_record.txt`).
//!
//! One line per cycle outcome, `[YYYY-MM-DD HH:MM:SS] <message>` in local
//! time. The file is created on first write and never truncated or rotated.
//! This is product output, separate from `tracing` diagnostics.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct RecordLog {
    path: PathBuf,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `message` stamped with the current local time; returns the line written.
    pub fn append(&self, message: &str) -> Result<String> {
        self.append_at(&Local::now(), message)
    }

    pub fn append_at<Tz>(&self, at: &DateTime<Tz>, message: &str) -> Result<String>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let line = format_entry(at, message);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create record dir {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open record {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("append record {}", self.path.display()))?;
        Ok(line)
    }
}

/// Render one record line (without trailing newline).
pub fn format_entry<Tz>(at: &DateTime<Tz>, message: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("[{}] {}", at.format(TIMESTAMP_FORMAT), message)
}
