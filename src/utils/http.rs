// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::SHIFT_JIS;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Create a configured asynchronous HTTP client.
///
/// The cookie store carries the board's session cookie from the priming GET
/// to the POST.
pub fn create_async_client(config: &Config) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_store(true)
        .build()?;
    Ok(client)
}

/// Decode a response body, optionally from Shift_JIS.
pub fn decode_body(bytes: &[u8], shift_jis: bool) -> String {
    if shift_jis {
        let (text, _, _) = SHIFT_JIS.decode(bytes);
        text.into_owned()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// A fetched page with its status.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// GET access used by the feed adapters and the thread inspector.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` and return whatever status came back.
    async fn get_page(&self, url: &str, shift_jis: bool) -> Result<Page>;

    /// GET `url` as UTF-8 text; non-success statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String> {
        let page = self.get_page(url, false).await?;
        if !page.is_success() {
            return Err(AppError::Status {
                url: url.to_string(),
                status: page.status,
            });
        }
        Ok(page.body)
    }
}

#[async_trait]
impl Fetch for reqwest::Client {
    async fn get_page(&self, url: &str, shift_jis: bool) -> Result<Page> {
        log::debug!("GET {}", url);
        let response = self.get(url).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        Ok(Page {
            status,
            body: decode_body(&bytes, shift_jis),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_shift_jis() {
        let (bytes, _, _) = SHIFT_JIS.encode("地震速報");
        assert_eq!(decode_body(&bytes, true), "地震速報");
        assert_eq!(decode_body("地震".as_bytes(), false), "地震");
    }

    #[test]
    fn test_client_builds() {
        assert!(create_async_client(&Config::default()).is_ok());
    }
}
