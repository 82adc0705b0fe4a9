//! Counter template: literal prefix and suffix around an integer slot.

use anyhow::{Context, Result, bail};
use regex::Regex;

/// Literal text bracketing the counter, compiled into a matcher once.
///
/// Prefix and suffix are escaped before compilation, so characters such as
/// `(`, `?` or `/` in the template are matched as plain text.
#[derive(Debug, Clone)]
pub struct CommentTemplate {
    prefix: String,
    suffix: String,
    pattern: Regex,
}

impl CommentTemplate {
    pub fn new(prefix: &str, suffix: &str) -> Result<Self> {
        if prefix.is_empty() && suffix.is_empty() {
            bail!("template prefix and suffix cannot both be empty");
        }
        let source = format!(
            "{}([0-9０-９]+){}",
            regex::escape(prefix),
            regex::escape(suffix)
        );
        let pattern = Regex::new(&source).context("compile comment template")?;
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            pattern,
        })
    }

    /// Comment text carrying `value` in the counter slot.
    pub fn render(&self, value: u64) -> String {
        format!("{}{}{}", self.prefix, value, self.suffix)
    }

    /// Counter value of the first template match in `body`, if any.
    ///
    /// Full-width digits (as typed by CJK input methods) count like ASCII
    /// ones, also mixed. A match whose digits do not fit in `u64` yields `None`.
    pub fn extract(&self, body: &str) -> Option<u64> {
        let captures = self.pattern.captures(body)?;
        let digits: String = captures
            .get(1)?
            .as_str()
            .chars()
            .map(ascii_digit)
            .collect();
        digits.parse().ok()
    }

    /// Highest counter among `bodies`, or `None` when nothing matches.
    ///
    /// The maximum is taken rather than the newest match: the window can hold
    /// duplicates and out-of-order posts.
    pub fn max_counter<'a, I>(&self, bodies: I) -> Option<u64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        bodies
            .into_iter()
            .filter_map(|body| self.extract(body))
            .max()
    }
}

/// Fold a full-width digit (`０`..=`９`) to its ASCII form.
fn ascii_digit(c: char) -> char {
    match c {
        '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
        _ => c,
    }
}
