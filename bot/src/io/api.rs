//! Comment platform client.
//!
//! The [`CommentApi`] trait decouples the cycle logic from HTTP. Production
//! uses [`BiliClient`]; tests use scripted or in-memory doubles from
//! `test_support`.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client, Request, Response};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::core::video::{Bvid, VideoRef};
use crate::io::config::{ApiConfig, Credentials};

/// Platform code for an accepted request.
pub const SUCCESS_CODE: i64 = 0;

/// Comment section type for videos.
const VIDEO_SUBJECT_TYPE: &str = "1";
/// Listing order: newest first.
const SORT_BY_TIME: &str = "0";
/// Submission platform flag for the web client.
const WEB_PLATFORM: &str = "1";

/// Platform answer to a comment submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    pub code: i64,
    pub message: String,
}

impl PostResponse {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// Abstraction over the three remote operations the bot performs.
pub trait CommentApi {
    /// Map a public video id to its numeric id and title.
    fn resolve_video(&self, bvid: &Bvid) -> Result<VideoRef>;

    /// Bodies of the newest `window` comments on `aid`, newest first.
    fn latest_comments(&self, aid: u64, window: u32) -> Result<Vec<String>>;

    /// Submit `message` as a new top-level comment on `aid`.
    ///
    /// `Ok` carries whatever code the platform answered with; `Err` means no
    /// answer was obtained.
    fn post_comment(&self, aid: u64, message: &str) -> Result<PostResponse>;
}

/// Standard response wrapper: `{ "code": .., "message": .., "data": .. }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ViewData {
    aid: u64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ReplyPage {
    #[serde(default)]
    replies: Option<Vec<Reply>>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    content: ReplyContent,
}

#[derive(Debug, Deserialize)]
struct ReplyContent {
    message: String,
}

/// Decode a video lookup response body.
pub fn parse_view(bvid: &Bvid, body: &str) -> Result<VideoRef> {
    let envelope: Envelope<ViewData> =
        serde_json::from_str(body).context("parse video lookup response")?;
    if envelope.code != SUCCESS_CODE {
        return Err(anyhow!(
            "video lookup for {bvid} rejected: code {} ({})",
            envelope.code,
            envelope.message
        ));
    }
    let data = envelope
        .data
        .ok_or_else(|| anyhow!("video lookup for {bvid} returned no data"))?;
    Ok(VideoRef {
        bvid: bvid.clone(),
        aid: data.aid,
        title: data.title,
    })
}

/// Decode a comment listing response body into comment texts, in listing order.
pub fn parse_replies(body: &str) -> Result<Vec<String>> {
    let envelope: Envelope<ReplyPage> =
        serde_json::from_str(body).context("parse comment listing response")?;
    if envelope.code != SUCCESS_CODE {
        return Err(anyhow!(
            "comment listing rejected: code {} ({})",
            envelope.code,
            envelope.message
        ));
    }
    let replies = envelope
        .data
        .and_then(|page| page.replies)
        .unwrap_or_default();
    Ok(replies
        .into_iter()
        .map(|reply| reply.content.message)
        .collect())
}

/// Decode a comment submission response body.
pub fn parse_post(body: &str) -> Result<PostResponse> {
    let envelope: Envelope<serde_json::Value> =
        serde_json::from_str(body).context("parse comment submission response")?;
    Ok(PostResponse {
        code: envelope.code,
        message: envelope.message,
    })
}

/// Headers attached to every request: browser user agent plus session cookies.
pub fn default_headers(api: &ApiConfig, credentials: &Credentials) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&api.user_agent).context("user agent header")?,
    );
    let cookie = format!(
        "SESSDATA={}; bili_jct={}",
        credentials.sessdata, credentials.bili_jct
    );
    let mut cookie = HeaderValue::from_str(&cookie).context("cookie header")?;
    cookie.set_sensitive(true);
    headers.insert(COOKIE, cookie);
    Ok(headers)
}

/// Blocking HTTP client for the platform's web API.
///
/// Requests are built separately from being sent so their shape can be
/// checked without a network.
pub struct BiliClient {
    http: Client,
    base_url: String,
    csrf: String,
}

impl BiliClient {
    pub fn new(api: &ApiConfig, credentials: &Credentials) -> Result<Self> {
        let http = Client::builder()
            .default_headers(default_headers(api, credentials)?)
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            csrf: credentials.bili_jct.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /x/web-interface/view?bvid=..`
    pub fn view_request(&self, bvid: &Bvid) -> Result<Request> {
        self.http
            .get(self.url("/x/web-interface/view"))
            .query(&[("bvid", bvid.as_str())])
            .build()
            .context("build video lookup request")
    }

    /// `GET /x/v2/reply`: newest `window` top-level comments on `aid`.
    pub fn listing_request(&self, aid: u64, window: u32) -> Result<Request> {
        let oid = aid.to_string();
        let ps = window.to_string();
        self.http
            .get(self.url("/x/v2/reply"))
            .query(&[
                ("type", VIDEO_SUBJECT_TYPE),
                ("oid", oid.as_str()),
                ("sort", SORT_BY_TIME),
                ("ps", ps.as_str()),
                ("pn", "1"),
            ])
            .build()
            .context("build comment listing request")
    }

    /// `POST /x/v2/reply/add` with a form body carrying the csrf token.
    pub fn post_request(&self, aid: u64, message: &str) -> Result<Request> {
        let oid = aid.to_string();
        self.http
            .post(self.url("/x/v2/reply/add"))
            .form(&[
                ("type", VIDEO_SUBJECT_TYPE),
                ("oid", oid.as_str()),
                ("message", message),
                ("plat", WEB_PLATFORM),
                ("csrf", self.csrf.as_str()),
            ])
            .build()
            .context("build comment submission request")
    }

    fn execute_text(&self, request: Request) -> Result<String> {
        let label = format!("{} {}", request.method(), request.url().path());
        let response = self
            .http
            .execute(request)
            .with_context(|| label.clone())?;
        read_body(response, &label)
    }
}

fn read_body(response: Response, label: &str) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .with_context(|| format!("read body of {label}"))?;
    if !status.is_success() {
        warn!(%status, label, "non-success http status");
        return Err(anyhow!("{label} answered http {status}"));
    }
    Ok(body)
}

impl CommentApi for BiliClient {
    #[instrument(skip_all, fields(bvid = %bvid))]
    fn resolve_video(&self, bvid: &Bvid) -> Result<VideoRef> {
        let body = self.execute_text(self.view_request(bvid)?)?;
        let video = parse_view(bvid, &body)?;
        debug!(aid = video.aid, title = %video.title, "video resolved");
        Ok(video)
    }

    #[instrument(skip_all, fields(aid = aid, window = window))]
    fn latest_comments(&self, aid: u64, window: u32) -> Result<Vec<String>> {
        let body = self.execute_text(self.listing_request(aid, window)?)?;
        let comments = parse_replies(&body)?;
        debug!(count = comments.len(), "comments fetched");
        Ok(comments)
    }

    #[instrument(skip_all, fields(aid = aid))]
    fn post_comment(&self, aid: u64, message: &str) -> Result<PostResponse> {
        let body = self.execute_text(self.post_request(aid, message)?)?;
        let answer = parse_post(&body)?;
        debug!(code = answer.code, "comment submitted");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use reqwest::header::CONTENT_TYPE;
    use std::borrow::Cow;

    fn bvid() -> Bvid {
        Bvid::parse("BV1Y26wBcERw").expect("bvid")
    }

    #[test]
    fn parse_view_reads_aid_and_title() {
        let body = r#"{"code":0,"message":"0","ttl":1,"data":{"aid":170001,"bvid":"BV1Y26wBcERw","title":"山海"}}"#;
        let video = parse_view(&bvid(), body).expect("view");
        assert_eq!(video.aid, 170001);
        assert_eq!(video.title, "山海");
        assert_eq!(video.bvid, bvid());
    }

    #[test]
    fn parse_view_surfaces_rejection() {
        let body = r#"{"code":-404,"message":"啥都木有","ttl":1}"#;
        let err = parse_view(&bvid(), body).expect_err("rejected");
        let text = err.to_string();
        assert!(text.contains("-404"));
        assert!(text.contains("啥都木有"));
    }

    #[test]
    fn parse_replies_keeps_listing_order() {
        let body = r#"{"code":0,"message":"0","data":{"replies":[
            {"rpid":2,"content":{"message":"newest"}},
            {"rpid":1,"content":{"message":"older"}}
        ]}}"#;
        let comments = parse_replies(body).expect("replies");
        assert_eq!(comments, vec!["newest", "older"]);
    }

    #[test]
    fn parse_replies_treats_null_as_empty() {
        let body = r#"{"code":0,"message":"0","data":{"replies":null}}"#;
        assert!(parse_replies(body).expect("replies").is_empty());
        let body = r#"{"code":0,"message":"0","data":{}}"#;
        assert!(parse_replies(body).expect("replies").is_empty());
    }

    #[test]
    fn parse_replies_rejects_error_code_and_garbage() {
        assert!(parse_replies(r#"{"code":-400,"message":"bad request"}"#).is_err());
        assert!(parse_replies("<html>gateway timeout</html>").is_err());
    }

    #[test]
    fn parse_post_keeps_code_and_message() {
        let ok = parse_post(r#"{"code":0,"message":"0","data":{"rpid":99}}"#).expect("post");
        assert!(ok.is_success());

        let rejected = parse_post(r#"{"code":12015,"message":"需要评论验证码"}"#).expect("post");
        assert!(!rejected.is_success());
        assert_eq!(rejected.code, 12015);
        assert_eq!(rejected.message, "需要评论验证码");
    }

    #[test]
    fn envelope_message_is_optional() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"code":0}"#).expect("envelope");
        assert_eq!(envelope.code, 0);
        assert!(envelope.message.is_empty());
    }

    fn credentials() -> Credentials {
        Credentials {
            sessdata: "sess-token".to_string(),
            bili_jct: "csrf-token".to_string(),
        }
    }

    fn client() -> BiliClient {
        BiliClient::new(&ApiConfig::default(), &credentials()).expect("client")
    }

    fn pairs<'a, I>(pairs: I) -> Vec<(String, String)>
    where
        I: Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>,
    {
        pairs
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn form_pairs(request: &Request) -> Vec<(String, String)> {
        let body = request
            .body()
            .and_then(|body| body.as_bytes())
            .expect("buffered form body");
        pairs(url::form_urlencoded::parse(body))
    }

    fn expected(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn client_builds_with_blank_credentials() {
        let client =
            BiliClient::new(&ApiConfig::default(), &Credentials::default()).expect("client");
        assert_eq!(client.url("/x/v2/reply"), "https://api.bilibili.com/x/v2/reply");
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let api = ApiConfig {
            base_url: "http://127.0.0.1:9000/".to_string(),
            ..ApiConfig::default()
        };
        let client = BiliClient::new(&api, &credentials()).expect("client");
        let request = client.view_request(&bvid()).expect("request");
        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:9000/x/web-interface/view?bvid=BV1Y26wBcERw"
        );
    }

    #[test]
    fn listing_request_orders_by_time_with_window_page_size() {
        let request = client().listing_request(170001, 10).expect("request");
        assert_eq!(*request.method(), Method::GET);
        assert_eq!(request.url().path(), "/x/v2/reply");
        assert_eq!(
            pairs(request.url().query_pairs()),
            expected(&[
                ("type", "1"),
                ("oid", "170001"),
                ("sort", "0"),
                ("ps", "10"),
                ("pn", "1"),
            ])
        );
    }

    #[test]
    fn post_request_carries_platform_flag_and_csrf() {
        let message = "唤炽心无双，（8/1000）乐鸣东方！";
        let request = client().post_request(170001, message).expect("request");
        assert_eq!(*request.method(), Method::POST);
        assert_eq!(request.url().path(), "/x/v2/reply/add");
        assert_eq!(
            request.headers().get(CONTENT_TYPE).expect("content type"),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            form_pairs(&request),
            expected(&[
                ("type", "1"),
                ("oid", "170001"),
                ("message", message),
                ("plat", "1"),
                ("csrf", "csrf-token"),
            ])
        );
    }

    #[test]
    fn default_headers_carry_user_agent_and_cookies() {
        let api = ApiConfig::default();
        let headers = default_headers(&api, &credentials()).expect("headers");
        assert_eq!(
            headers.get(USER_AGENT).expect("user agent"),
            api.user_agent.as_str()
        );
        let cookie = headers.get(COOKIE).expect("cookie");
        assert_eq!(cookie, "SESSDATA=sess-token; bili_jct=csrf-token");
        assert!(cookie.is_sensitive());
    }
}
