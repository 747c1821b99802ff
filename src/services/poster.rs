// src/services/poster.rs

//! `bbs.cgi` form poster.
//!
//! A post is a GET of the request URL (to pick up the board's session
//! cookie) followed by a form POST. Success is recognised by the
//! `<meta http-equiv="Refresh" content="1;URL=/test/read.cgi/<bbs>/<number>/...">`
//! the board answers with.

use std::sync::LazyLock;

use async_trait::async_trait;
use encoding_rs::SHIFT_JIS;
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, REFERER};
use scraper::{Html, Selector};
use url::{Url, form_urlencoded};

use crate::error::{AppError, Result};
use crate::models::{PostedThread, ThreadInfo};
use crate::services::ThreadPoster;
use crate::utils::http::decode_body;
use crate::utils::origin_with_path;

/// Where the board redirected after a successful post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Thread path up to the last `/`, e.g. `/test/read.cgi/eq/1704093000/`
    pub path: String,
    pub number: String,
}

/// Posts to a 2ch-compatible board.
#[derive(Clone)]
pub struct BoardPoster {
    client: reqwest::Client,
    request_url: Url,
}

impl BoardPoster {
    pub fn new(client: reqwest::Client, request_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            request_url: Url::parse(request_url)?,
        })
    }

    async fn submit(&self, thread: &ThreadInfo) -> Result<Redirect> {
        // Session cookie.
        self.client
            .get(self.request_url.clone())
            .send()
            .await
            .map_err(|e| AppError::post(format!("cookie request failed: {e}")))?;

        let body = encode_form(thread);
        let response = self
            .client
            .post(self.request_url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(REFERER, self.request_url.as_str())
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::post(format!("POST failed: {e}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::post(format!("reading board response failed: {e}")))?;
        if !status.is_success() {
            return Err(AppError::post(format!("board answered HTTP {status}")));
        }

        let html = decode_body(&bytes, thread.shift_jis);
        parse_redirect(&html, &thread.bbs).ok_or_else(|| {
            AppError::post("board response carries no thread redirect; post was probably rejected")
        })
    }
}

#[async_trait]
impl ThreadPoster for BoardPoster {
    async fn create_thread(&self, thread: &ThreadInfo) -> Result<PostedThread> {
        let create = ThreadInfo {
            key: None,
            ..thread.clone()
        };
        let redirect = self.submit(&create).await?;
        let url = origin_with_path(&self.request_url, &redirect.path);
        log::info!("Created thread {} ({})", redirect.number, url);
        Ok(PostedThread {
            url,
            number: redirect.number,
        })
    }

    async fn write_thread(&self, thread: &ThreadInfo) -> Result<()> {
        if thread.is_create() {
            return Err(AppError::post("reply without a thread number"));
        }
        let redirect = self.submit(thread).await?;
        log::info!("Wrote to thread {}", redirect.number);
        Ok(())
    }
}

/// `application/x-www-form-urlencoded` body in the board's charset.
///
/// Replies carry an empty subject and the `key` field; new threads omit `key`.
pub fn encode_form(thread: &ThreadInfo) -> String {
    let time = thread.time.to_string();
    let subject = if thread.is_create() { thread.subject.as_str() } else { "" };
    let mut fields = vec![
        ("subject", subject),
        ("FROM", thread.from.as_str()),
        ("mail", thread.mail.as_str()),
        ("MESSAGE", thread.body.as_str()),
        ("bbs", thread.bbs.as_str()),
        ("time", time.as_str()),
    ];
    if let Some(key) = thread.key.as_deref().filter(|k| !k.is_empty()) {
        fields.push(("key", key));
    }

    fields
        .into_iter()
        .map(|(name, value)| {
            let encoded: String = if thread.shift_jis {
                let (bytes, _, _) = SHIFT_JIS.encode(value);
                form_urlencoded::byte_serialize(&bytes).collect()
            } else {
                form_urlencoded::byte_serialize(value.as_bytes()).collect()
            };
            format!("{name}={encoded}")
        })
        .collect::<Vec<_>>()
        .join("&")
}

static REFRESH_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)URL=(.*)").expect("refresh url regex"));
static THREAD_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+/)[^/]+").expect("thread dir regex"));

/// Thread path and number from the board's Refresh redirect.
pub fn parse_redirect(html: &str, bbs: &str) -> Option<Redirect> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("meta[http-equiv]").ok()?;
    let content = document
        .select(&selector)
        .filter(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        })
        .find_map(|m| m.value().attr("content"))?;

    let target = REFRESH_URL
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(content);

    let number_re = Regex::new(&format!("/{}/([^/]+)/", regex::escape(bbs))).ok()?;

    let path = THREAD_DIR.captures(target)?.get(1)?.as_str().to_string();
    let number = number_re.captures(target)?.get(1)?.as_str().to_string();
    if path.is_empty() || number.is_empty() {
        return None;
    }
    Some(Redirect { path, number })
}
