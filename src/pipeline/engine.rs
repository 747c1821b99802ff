// src/pipeline/engine.rs

//! Thread lifecycle.
//!
//! An occurrence report either opens a thread, is appended to the thread
//! already discussing the same site, or retires that thread when it is no
//! longer usable and opens a replacement. Warnings always open a thread.
//!
//! The board post always happens before the log is touched, so a record never
//! describes content that was not posted. A store failure after a successful
//! post is reported but not rolled back.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{
    AlertEvent, Config, DedupRecord, FeedSource, InfoEvent, SiteKey, SiteKeyPolicy, ThreadInfo,
    ThreadPage,
};
use crate::render::Renderer;
use crate::services::{ThreadInspector, ThreadPoster};
use crate::storage::{AlertLog, InfoLog};
use crate::utils::time::format_board;

/// What a handled event did to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new thread, no prior record
    Created { url: String },
    /// Reply to a live thread
    Appended { url: String },
    /// Old thread retired, replacement created
    Replaced { retired: String, url: String },
    /// Already posted; nothing done
    AlreadySeen,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { url } => write!(f, "created {url}"),
            Self::Appended { url } => write!(f, "appended to {url}"),
            Self::Replaced { retired, url } => write!(f, "retired {retired}, created {url}"),
            Self::AlreadySeen => f.write_str("already posted"),
        }
    }
}

/// Why a recorded thread can no longer take replies.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Retired {
    Gone,
    Renamed(String),
    Full(u32),
}

/// Occurrence-report lifecycle.
pub struct InfoEngine {
    log: InfoLog,
    poster: Arc<dyn ThreadPoster>,
    inspector: Arc<dyn ThreadInspector>,
    renderer: Renderer,
    site_key: SiteKeyPolicy,
    max_replies: Option<u32>,
    change_title: bool,
}

impl InfoEngine {
    pub fn new(
        log: InfoLog,
        poster: Arc<dyn ThreadPoster>,
        inspector: Arc<dyn ThreadInspector>,
        config: &Config,
    ) -> Self {
        // A reply limit is meaningless without a selector to read the count.
        let max_replies = config
            .thread
            .max_replies
            .filter(|_| config.thread.reply_selector.is_some());
        Self {
            log,
            poster,
            inspector,
            renderer: Renderer::new(&config.thread),
            site_key: config.earthquake.site_key,
            max_replies,
            change_title: config.thread.change_title,
        }
    }

    /// Whether this exact report was already posted.
    ///
    /// JMA re-issues the same event id with a newer report time when details
    /// change; only an identical pair counts as seen.
    pub async fn is_seen(&self, event: &InfoEvent) -> Result<bool> {
        match event.source {
            FeedSource::Jma => self.log.has_seen_report(&event.id, &event.report_time).await,
            FeedSource::P2p => self.log.has_seen_id(&event.id).await,
        }
    }

    pub async fn handle(&self, event: &InfoEvent, now: DateTime<Utc>) -> Result<Outcome> {
        if self.is_seen(event).await? {
            return Ok(Outcome::AlreadySeen);
        }

        let post = self.renderer.info(event, now.timestamp());
        let key = SiteKey::for_event(event, self.site_key);

        let Some(record) = self.log.find_by_site_key(&key).await? else {
            let record = self.create(event, &post).await?;
            let url = record.url.clone();
            self.log.append_record(record).await?;
            return Ok(Outcome::Created { url });
        };

        match self.check(&record).await? {
            None => self.append(event, post, &record).await,
            Some(reason) => {
                log::info!("Retiring thread {} ({:?})", record.url, reason);
                let replacement = self.create(event, &post).await?;
                let url = replacement.url.clone();
                self.log.remove_records(|r| r.same_thread(&record)).await?;
                self.log.append_record(replacement).await?;
                Ok(Outcome::Replaced {
                    retired: record.url,
                    url,
                })
            }
        }
    }

    /// `None` when the thread can take a reply.
    async fn check(&self, record: &DedupRecord) -> Result<Option<Retired>> {
        let page = self.inspector.inspect(&record.url).await.map_err(|e| {
            AppError::post(format!("liveness of {} is inconclusive: {e}", record.url))
        })?;

        let (title, last_reply) = match page {
            ThreadPage::Gone => return Ok(Some(Retired::Gone)),
            ThreadPage::Live { title, last_reply } => (title, last_reply),
        };
        if title != record.title {
            return Ok(Some(Retired::Renamed(title)));
        }
        if let (Some(limit), Some(last)) = (self.max_replies, last_reply) {
            if last >= limit {
                return Ok(Some(Retired::Full(last)));
            }
        }
        Ok(None)
    }

    async fn append(
        &self,
        event: &InfoEvent,
        post: ThreadInfo,
        record: &DedupRecord,
    ) -> Result<Outcome> {
        if record.thread.is_empty() {
            return Err(AppError::post(format!(
                "record for {} has no thread number",
                record.url
            )));
        }

        let mut reply = post.into_reply(record.thread.as_str());
        if self.change_title {
            reply = reply.with_title_change();
        }
        self.poster.write_thread(&reply).await?;

        let title = if self.change_title {
            self.live_title(&record.url)
                .await
                .filter(|t| *t != record.title)
        } else {
            None
        };

        let date = format_board(&event.occurred_at);
        self.log
            .update_records(
                |r| r.same_thread(record),
                |r| {
                    if !r.has_id(&event.id) {
                        r.ids.push(event.id.clone());
                    }
                    r.date = date.clone();
                    r.report_time = event.report_time.clone();
                    if !event.hypocentre.name.is_empty() {
                        r.hypocentre = event.hypocentre.name.clone();
                    }
                    if let Some(title) = &title {
                        r.title = title.clone();
                    }
                },
            )
            .await?;

        Ok(Outcome::Appended {
            url: record.url.clone(),
        })
    }

    /// Post a new thread and describe it as a record.
    async fn create(&self, event: &InfoEvent, post: &ThreadInfo) -> Result<DedupRecord> {
        let posted = self.poster.create_thread(post).await?;
        let title = match self.live_title(&posted.url).await {
            Some(title) => title,
            None => post.subject.clone(),
        };
        Ok(DedupRecord {
            ids: vec![event.id.clone()],
            hypocentre: event.hypocentre.name.clone(),
            prefs: event.max_int_prefs.clone(),
            title,
            url: posted.url,
            thread: posted.number,
            date: format_board(&event.occurred_at),
            report_time: event.report_time.clone(),
        })
    }

    /// Title as the board shows it now, if the page can be read.
    async fn live_title(&self, url: &str) -> Option<String> {
        match self.inspector.inspect(url).await {
            Ok(ThreadPage::Live { title, .. }) => Some(title),
            Ok(ThreadPage::Gone) => {
                log::warn!("Thread {} not readable yet", url);
                None
            }
            Err(e) => {
                log::warn!("Could not read title of {}: {}", url, e);
                None
            }
        }
    }
}

/// Early-warning lifecycle: one thread per warning id.
pub struct AlertEngine {
    log: AlertLog,
    poster: Arc<dyn ThreadPoster>,
    renderer: Renderer,
}

impl AlertEngine {
    pub fn new(log: AlertLog, poster: Arc<dyn ThreadPoster>, config: &Config) -> Self {
        Self {
            log,
            poster,
            renderer: Renderer::new(&config.thread),
        }
    }

    pub async fn handle(&self, event: &AlertEvent, now: DateTime<Utc>) -> Result<Outcome> {
        if self.log.has_seen_id(&event.id).await? {
            return Ok(Outcome::AlreadySeen);
        }
        let post = self.renderer.alert(event, now.timestamp());
        let posted = self.poster.create_thread(&post).await?;
        self.log.record_id(&event.id).await?;
        Ok(Outcome::Created { url: posted.url })
    }
}
