// src/services/image.rs

//! Severity map lookup.
//!
//! An external list page shows one row per earthquake. The row whose date
//! cell reads the event time (in `image.date_format`) links to a detail page,
//! whose image is the severity map attached to the thread body.

use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::ImageConfig;
use crate::utils::http::Fetch;
use crate::utils::resolve;

pub struct ImageLookup {
    fetcher: Arc<dyn Fetch>,
    config: ImageConfig,
}

impl ImageLookup {
    pub fn new(fetcher: Arc<dyn Fetch>, config: ImageConfig) -> Self {
        Self { fetcher, config }
    }

    /// Absolute image URL for an earthquake that occurred at `occurred_at`.
    pub async fn find(&self, occurred_at: &DateTime<FixedOffset>) -> Result<Option<String>> {
        let mut wanted = String::new();
        write!(wanted, "{}", occurred_at.format(&self.config.date_format)).map_err(|_| {
            AppError::config(format!(
                "image.date_format {:?} is not a valid format",
                self.config.date_format
            ))
        })?;

        let list = self.fetcher.get_text(&self.config.url).await?;
        let Some(href) = find_detail_link(&list, &self.config, &wanted)? else {
            log::debug!("No severity map listed for {}", wanted);
            return Ok(None);
        };

        let base = if self.config.base_url.is_empty() {
            &self.config.url
        } else {
            &self.config.base_url
        };
        let detail_url = resolve(base, &href)
            .ok_or_else(|| AppError::config(format!("image base URL {base:?} is invalid")))?;

        let detail = self.fetcher.get_text(&detail_url).await?;
        let Some(src) = find_image(&detail, &self.config.img_selector)? else {
            return Ok(None);
        };
        Ok(resolve(&detail_url, &src))
    }
}

/// `href` of the first row whose date cell equals `wanted`.
pub fn find_detail_link(html: &str, config: &ImageConfig, wanted: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let rows = parse_selector(&config.row_selector)?;
    let date = parse_selector(&config.date_selector)?;
    let link = parse_selector(&config.link_selector)?;

    for row in document.select(&rows) {
        let matches = row
            .select(&date)
            .next()
            .is_some_and(|cell| cell.text().collect::<String>().trim() == wanted);
        if !matches {
            continue;
        }
        return Ok(row
            .select(&link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string));
    }
    Ok(None)
}

/// `src` of the first element matching `selector`.
pub fn find_image(html: &str, selector: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let img = parse_selector(selector)?;
    Ok(document
        .select(&img)
        .next()
        .and_then(|e| e.value().attr("src"))
        .map(str::to_string))
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
