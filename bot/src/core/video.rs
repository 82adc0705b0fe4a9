//! Public video identifier syntax.

use std::fmt;

use anyhow::{Result, bail};

const BVID_PREFIX: &str = "BV";
const BVID_BODY_LEN: usize = 10;

/// A syntactically valid public video identifier (`BV` + 10 alphanumerics).
///
/// Syntax is all that is checked here; whether the video exists is only known
/// once the platform answers the lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bvid(String);

impl Bvid {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let Some(body) = trimmed.strip_prefix(BVID_PREFIX) else {
            bail!("video id {trimmed:?} must start with {BVID_PREFIX}");
        };
        if body.len() != BVID_BODY_LEN || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            bail!(
                "video id {trimmed:?} must be {BVID_PREFIX} followed by {BVID_BODY_LEN} ascii letters or digits"
            );
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bvid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A video resolved against the platform. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub bvid: Bvid,
    /// Platform-assigned numeric id (`aid`), used by the comment endpoints.
    pub aid: u64,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_id() {
        let bvid = Bvid::parse("BV1Y26wBcERw").expect("parse");
        assert_eq!(bvid.as_str(), "BV1Y26wBcERw");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let bvid = Bvid::parse("  BV1Y26wBcERw\n").expect("parse");
        assert_eq!(bvid.to_string(), "BV1Y26wBcERw");
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = Bvid::parse("av170001").expect_err("missing prefix");
        assert!(err.to_string().contains("must start with BV"));
    }

    #[test]
    fn rejects_wrong_length_or_symbols() {
        assert!(Bvid::parse("BV1Y26wBcER").is_err());
        assert!(Bvid::parse("BV1Y26wBcERww").is_err());
        assert!(Bvid::parse("BV1Y26wB-ERw").is_err());
    }
}
