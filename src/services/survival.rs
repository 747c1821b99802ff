// src/services/survival.rs

//! Thread liveness by page scrape.
//!
//! Boards often answer 200 for threads that have fallen off, so the page title
//! is what decides liveness; the engine compares it with the stored title.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{ThreadConfig, ThreadPage};
use crate::services::ThreadInspector;
use crate::utils::http::Fetch;

/// Reads thread title and newest reply number with CSS selectors.
pub struct PageInspector {
    fetcher: Arc<dyn Fetch>,
    title_selector: String,
    reply_selector: Option<String>,
    shift_jis: bool,
}

impl PageInspector {
    /// Build from config; selectors are checked up front.
    pub fn new(fetcher: Arc<dyn Fetch>, config: &ThreadConfig) -> Result<Self> {
        parse_selector(&config.title_selector)?;
        if let Some(sel) = &config.reply_selector {
            parse_selector(sel)?;
        }
        Ok(Self {
            fetcher,
            title_selector: config.title_selector.clone(),
            reply_selector: config.reply_selector.clone(),
            shift_jis: config.shift_jis,
        })
    }
}

#[async_trait]
impl ThreadInspector for PageInspector {
    async fn inspect(&self, url: &str) -> Result<ThreadPage> {
        let page = self.fetcher.get_page(url, self.shift_jis).await?;
        match page.status {
            404 | 410 => return Ok(ThreadPage::Gone),
            s if !(200..300).contains(&s) => {
                return Err(AppError::Status {
                    url: url.to_string(),
                    status: s,
                });
            }
            _ => {}
        }
        read_thread_page(&page.body, &self.title_selector, self.reply_selector.as_deref())
    }
}

/// Title and newest reply number of a thread page.
pub fn read_thread_page(
    html: &str,
    title_selector: &str,
    reply_selector: Option<&str>,
) -> Result<ThreadPage> {
    let document = Html::parse_document(html);

    let title_sel = parse_selector(title_selector)?;
    let Some(title) = document
        .select(&title_sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
    else {
        return Ok(ThreadPage::Gone);
    };

    let last_reply = match reply_selector {
        Some(sel) => {
            let reply_sel = parse_selector(sel)?;
            document
                .select(&reply_sel)
                .last()
                .and_then(|e| leading_number(&e.text().collect::<String>()))
        }
        None => None,
    };

    Ok(ThreadPage::Live { title, last_reply })
}

fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
