// src/pipeline/cycle.rs

//! One poll of one feed: fetch, normalize, hand to the engine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, ValidationError};
use crate::feeds::p2p::{CODE_ALERT, CODE_INFO};
use crate::feeds::{self, Event, Gates, Payload, jma};
use crate::models::{AlertEvent, InfoEvent, InfoSource};
use crate::pipeline::engine::{AlertEngine, InfoEngine, Outcome};
use crate::services::ImageLookup;
use crate::utils::http::Fetch;

/// A feed poll that can be run repeatedly.
#[async_trait]
pub trait Cycle: Send + Sync {
    /// Short label for log lines.
    fn name(&self) -> &'static str;

    async fn run(&self, now: DateTime<Utc>) -> Result<Outcome>;
}

/// Early warnings from P2P.
pub struct AlertCycle {
    fetcher: Arc<dyn Fetch>,
    url: String,
    gates: Gates,
    engine: AlertEngine,
}

impl AlertCycle {
    pub fn new(fetcher: Arc<dyn Fetch>, url: impl Into<String>, gates: Gates, engine: AlertEngine) -> Self {
        Self {
            fetcher,
            url: url.into(),
            gates,
            engine,
        }
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<AlertEvent> {
        let body = self.fetcher.get_text(&self.url).await?;
        let payload = Payload::P2p {
            body: &body,
            url: &self.url,
        };
        match feeds::normalize(payload, &self.gates, now)? {
            Event::Alert(event) => Ok(event),
            Event::Info(_) => Err(ValidationError::UnexpectedCode(CODE_INFO).into()),
        }
    }
}

#[async_trait]
impl Cycle for AlertCycle {
    fn name(&self) -> &'static str {
        "alert"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<Outcome> {
        let event = self.fetch(now).await?;
        log::debug!("Warning {} passed the gates", event.id);
        self.engine.handle(&event, now).await
    }
}

/// Occurrence reports from JMA or P2P.
pub struct InfoCycle {
    fetcher: Arc<dyn Fetch>,
    source: InfoSource,
    url: String,
    gates: Gates,
    image: Option<ImageLookup>,
    engine: InfoEngine,
}

impl InfoCycle {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        source: InfoSource,
        url: impl Into<String>,
        gates: Gates,
        engine: InfoEngine,
    ) -> Self {
        Self {
            fetcher,
            source,
            url: url.into(),
            gates,
            image: None,
            engine,
        }
    }

    /// Attach severity maps found by `lookup`.
    pub fn with_image(self, lookup: ImageLookup) -> Self {
        Self {
            image: Some(lookup),
            ..self
        }
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<InfoEvent> {
        let event = match self.source {
            InfoSource::Jma => {
                let (url, body) = jma::fetch_latest_report(self.fetcher.as_ref(), &self.url).await?;
                let payload = Payload::JmaReport {
                    body: &body,
                    url: &url,
                };
                feeds::normalize(payload, &self.gates, now)?
            }
            InfoSource::P2p => {
                let body = self.fetcher.get_text(&self.url).await?;
                let payload = Payload::P2p {
                    body: &body,
                    url: &self.url,
                };
                feeds::normalize(payload, &self.gates, now)?
            }
        };
        match event {
            Event::Info(event) => Ok(event),
            Event::Alert(_) => Err(ValidationError::UnexpectedCode(CODE_ALERT).into()),
        }
    }

    async fn attach_image(&self, event: InfoEvent) -> InfoEvent {
        let Some(lookup) = &self.image else {
            return event;
        };
        match lookup.find(&event.occurred_at).await {
            Ok(Some(url)) => event.with_severity_image(url),
            Ok(None) => event,
            Err(e) => {
                log::warn!("Severity map lookup failed: {}", e);
                event
            }
        }
    }
}

#[async_trait]
impl Cycle for InfoCycle {
    fn name(&self) -> &'static str {
        "info"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<Outcome> {
        let event = self.fetch(now).await?;
        // Skip the image scrape for reports that are only being re-delivered.
        if self.engine.is_seen(&event).await? {
            return Ok(Outcome::AlreadySeen);
        }
        let event = self.attach_image(event).await;
        self.engine.handle(&event, now).await
    }
}
