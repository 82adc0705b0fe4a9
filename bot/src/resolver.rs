//! Resolver: public video id to numeric id and title.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::video::{Bvid, VideoRef};
use crate::io::api::CommentApi;

/// Resolve `bvid` once at startup.
///
/// Any failure here is fatal for the run: without the numeric id there is no
/// comment section to read or write.
#[instrument(skip_all, fields(bvid = %bvid))]
pub fn resolve_video<A: CommentApi>(api: &A, bvid: &Bvid) -> Result<VideoRef> {
    let video = api
        .resolve_video(bvid)
        .with_context(|| format!("resolve video {bvid}"))?;
    info!(aid = video.aid, title = %video.title, "video resolved");
    Ok(video)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedApi, fixture_video};

    #[test]
    fn returns_resolved_video() {
        let video = fixture_video();
        let api = ScriptedApi::new().with_video(Ok(video.clone()));
        let resolved = resolve_video(&api, &video.bvid).expect("resolve");
        assert_eq!(resolved, video);
    }

    #[test]
    fn remote_rejection_is_fatal() {
        let video = fixture_video();
        let api = ScriptedApi::new().with_video(Err("code -404 (not found)".to_string()));
        let err = resolve_video(&api, &video.bvid).expect_err("rejected");
        let text = format!("{err:#}");
        assert!(text.contains("resolve video BV1Y26wBcERw"));
        assert!(text.contains("-404"));
    }
}
