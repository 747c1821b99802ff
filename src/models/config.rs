// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SiteKeyPolicy;
use crate::models::scale;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Feed sources, thresholds and log files
    #[serde(default)]
    pub earthquake: EarthquakeConfig,

    /// Optional severity map lookup
    #[serde(default)]
    pub image: ImageConfig,

    /// Board endpoint and posting behaviour
    #[serde(default)]
    pub thread: ThreadConfig,

    /// Seconds between poll cycles
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Run a single cycle per feed and exit
    #[serde(default)]
    pub oneshot: bool,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from a JSON or TOML file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        Ok(config)
    }

    /// Replace out-of-range values with their defaults, logging each change.
    pub fn normalize(mut self) -> Self {
        for (name, value) in [
            ("earthquake.alert_scale", &mut self.earthquake.alert_scale),
            ("earthquake.info_scale", &mut self.earthquake.info_scale),
        ] {
            if scale::checked_threshold(*value).is_none() {
                log::warn!(
                    "{} = {} is not a valid intensity, using {}",
                    name,
                    value,
                    defaults::scale()
                );
                *value = defaults::scale();
            }
        }
        if !(defaults::MIN_INTERVAL..=defaults::MAX_INTERVAL).contains(&self.interval_secs) {
            log::warn!(
                "interval_secs = {} is outside {}..={}, using {}",
                self.interval_secs,
                defaults::MIN_INTERVAL,
                defaults::MAX_INTERVAL,
                defaults::interval()
            );
            self.interval_secs = defaults::interval();
        }
        self
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let eq = &self.earthquake;
        if !eq.alert && !eq.info {
            return Err(AppError::config(
                "neither earthquake.alert nor earthquake.info is enabled",
            ));
        }
        if eq.alert && eq.alert_url.trim().is_empty() {
            return Err(AppError::config("earthquake.alert_url is empty"));
        }
        if eq.info && eq.info_url().trim().is_empty() {
            return Err(AppError::config("info feed URL is empty"));
        }
        if self.thread.request_url.trim().is_empty() {
            return Err(AppError::config("thread.request_url is empty"));
        }
        if self.thread.bbs.trim().is_empty() {
            return Err(AppError::config("thread.bbs is empty"));
        }
        if self.thread.title_selector.trim().is_empty() {
            return Err(AppError::config("thread.title_selector is empty"));
        }
        if self.thread.max_replies.is_some() && self.thread.reply_selector.is_none() {
            return Err(AppError::config(
                "thread.max_replies requires thread.reply_selector",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::config("timeout_secs must be > 0"));
        }
        if self.image.enabled {
            let img = &self.image;
            for (name, value) in [
                ("image.url", &img.url),
                ("image.date_format", &img.date_format),
                ("image.row_selector", &img.row_selector),
                ("image.date_selector", &img.date_selector),
                ("image.link_selector", &img.link_selector),
                ("image.img_selector", &img.img_selector),
            ] {
                if value.trim().is_empty() {
                    return Err(AppError::config(format!("{name} is empty")));
                }
            }
        }
        Ok(())
    }

    /// Create missing log files with empty content.
    pub fn prepare_logs(&self) -> Result<()> {
        if self.earthquake.alert {
            create_if_missing(&self.earthquake.alert_log, "")?;
        }
        if self.earthquake.info {
            create_if_missing(&self.earthquake.info_log, "[]")?;
        }
        Ok(())
    }
}

fn create_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    log::info!("Created log file {}", path.display());
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            earthquake: EarthquakeConfig::default(),
            image: ImageConfig::default(),
            thread: ThreadConfig::default(),
            interval_secs: defaults::interval(),
            oneshot: false,
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Where occurrence reports come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoSource {
    #[default]
    Jma,
    P2p,
}

/// Feed sources, gating thresholds and log files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarthquakeConfig {
    /// Source of occurrence reports
    #[serde(default)]
    pub info_source: InfoSource,

    /// Post early warnings
    #[serde(default)]
    pub alert: bool,

    /// Post occurrence reports
    #[serde(default)]
    pub info: bool,

    /// P2P early warning endpoint
    #[serde(default = "defaults::alert_url")]
    pub alert_url: String,

    /// JMA Atom listing
    #[serde(default = "defaults::jma_url")]
    pub jma_url: String,

    /// P2P occurrence endpoint
    #[serde(default = "defaults::p2p_info_url")]
    pub p2p_info_url: String,

    /// Newline-delimited list of posted warning ids
    #[serde(default = "defaults::alert_log")]
    pub alert_log: PathBuf,

    /// JSON array of thread records
    #[serde(default = "defaults::info_log")]
    pub info_log: PathBuf,

    /// Minimum forecast intensity for warnings (×10)
    #[serde(default = "defaults::scale")]
    pub alert_scale: i32,

    /// Minimum observed intensity for reports (×10)
    #[serde(default = "defaults::scale")]
    pub info_scale: i32,

    /// Key used to find an existing thread
    #[serde(default)]
    pub site_key: SiteKeyPolicy,
}

impl EarthquakeConfig {
    pub fn info_url(&self) -> &str {
        match self.info_source {
            InfoSource::Jma => &self.jma_url,
            InfoSource::P2p => &self.p2p_info_url,
        }
    }
}

impl Default for EarthquakeConfig {
    fn default() -> Self {
        Self {
            info_source: InfoSource::default(),
            alert: false,
            info: false,
            alert_url: defaults::alert_url(),
            jma_url: defaults::jma_url(),
            p2p_info_url: defaults::p2p_info_url(),
            alert_log: defaults::alert_log(),
            info_log: defaults::info_log(),
            alert_scale: defaults::scale(),
            info_scale: defaults::scale(),
            site_key: SiteKeyPolicy::default(),
        }
    }
}

/// Severity map lookup on an external site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub enabled: bool,

    /// List page of recent earthquakes
    #[serde(default)]
    pub url: String,

    /// Base for relative links; defaults to `url`
    #[serde(default)]
    pub base_url: String,

    /// chrono format matching the list's date cells
    #[serde(default)]
    pub date_format: String,

    /// One element per earthquake on the list page
    #[serde(default)]
    pub row_selector: String,

    /// Date cell within a row
    #[serde(default)]
    pub date_selector: String,

    /// Detail link (`href`) within a row
    #[serde(default)]
    pub link_selector: String,

    /// Image (`src`) on the detail page
    #[serde(default)]
    pub img_selector: String,
}

/// Board endpoint and posting behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadConfig {
    /// `bbs.cgi` endpoint
    #[serde(default)]
    pub request_url: String,

    /// Poster name
    #[serde(default = "defaults::from")]
    pub from: String,

    #[serde(default)]
    pub mail: String,

    /// Board id
    #[serde(default)]
    pub bbs: String,

    /// Board speaks Shift_JIS
    #[serde(default = "defaults::enabled")]
    pub shift_jis: bool,

    /// Put the arrival time in warning subjects
    #[serde(default = "defaults::enabled")]
    pub subject_time: bool,

    /// Selector of the thread title on a thread page
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// Selector whose last match holds the newest reply number
    #[serde(default)]
    pub reply_selector: Option<String>,

    /// Replies after which a thread counts as full
    #[serde(default)]
    pub max_replies: Option<u32>,

    /// Prefix appends with `!chtt` to retitle the thread
    #[serde(default)]
    pub change_title: bool,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            request_url: String::new(),
            from: defaults::from(),
            mail: String::new(),
            bbs: String::new(),
            shift_jis: defaults::enabled(),
            subject_time: defaults::enabled(),
            title_selector: defaults::title_selector(),
            reply_selector: None,
            max_replies: None,
            change_title: false,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub const MIN_INTERVAL: u64 = 5;
    pub const MAX_INTERVAL: u64 = 60;

    pub fn interval() -> u64 {
        10
    }
    pub fn timeout() -> u64 {
        3
    }
    pub fn user_agent() -> String {
        concat!("eqboard/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn scale() -> i32 {
        50
    }
    pub fn enabled() -> bool {
        true
    }
    pub fn from() -> String {
        "佐藤".into()
    }
    pub fn title_selector() -> String {
        "title".into()
    }
    pub fn alert_url() -> String {
        "https://api.p2pquake.net/v2/history?codes=556&limit=1".into()
    }
    pub fn p2p_info_url() -> String {
        "https://api.p2pquake.net/v2/history?codes=551&limit=1".into()
    }
    pub fn jma_url() -> String {
        "https://www.data.jma.go.jp/developer/xml/feed/eqvol.xml".into()
    }
    pub fn alert_log() -> PathBuf {
        PathBuf::from("/tmp/eqalert.log")
    }
    pub fn info_log() -> PathBuf {
        PathBuf::from("/tmp/eqinfo.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid() -> Config {
        let mut c = Config::default();
        c.earthquake.info = true;
        c.thread.request_url = "https://bbs.example/test/bbs.cgi".into();
        c.thread.bbs = "eq".into();
        c
    }

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.interval_secs, 10);
        assert_eq!(c.timeout_secs, 3);
        assert_eq!(c.earthquake.alert_scale, 50);
        assert!(c.thread.shift_jis);
        assert_eq!(c.earthquake.site_key, SiteKeyPolicy::Prefectures);
    }

    #[test]
    fn test_normalize_clamps() {
        let mut c = valid();
        c.earthquake.alert_scale = 35;
        c.earthquake.info_scale = 45;
        c.interval_secs = 1;
        let c = c.normalize();
        assert_eq!(c.earthquake.alert_scale, 50);
        assert_eq!(c.earthquake.info_scale, 45);
        assert_eq!(c.interval_secs, 10);
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let mut c = valid();
        c.thread.bbs.clear();
        assert!(c.validate().is_err());

        let mut c = valid();
        c.thread.max_replies = Some(1000);
        assert!(c.validate().is_err());

        let mut c = valid();
        c.image.enabled = true;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = TempDir::new().unwrap();

        let json = dir.path().join("eqboard.json");
        fs::write(
            &json,
            r#"{"earthquake":{"info":true,"info_source":"p2p","info_scale":30},
               "thread":{"request_url":"https://b/test/bbs.cgi","bbs":"eq","shift_jis":false}}"#,
        )
        .unwrap();
        let c = Config::load(&json).unwrap();
        assert_eq!(c.earthquake.info_source, InfoSource::P2p);
        assert_eq!(c.earthquake.info_scale, 30);
        assert!(c.earthquake.info_url().contains("codes=551"));
        assert!(!c.thread.shift_jis);

        let toml_path = dir.path().join("eqboard.toml");
        fs::write(
            &toml_path,
            "interval_secs = 20\n[earthquake]\nalert = true\nsite_key = \"hypocentre\"\n",
        )
        .unwrap();
        let c = Config::load(&toml_path).unwrap();
        assert_eq!(c.interval_secs, 20);
        assert!(c.earthquake.alert);
        assert_eq!(c.earthquake.site_key, SiteKeyPolicy::Hypocentre);
    }

    #[test]
    fn test_prepare_logs() {
        let dir = TempDir::new().unwrap();
        let mut c = valid();
        c.earthquake.alert = true;
        c.earthquake.alert_log = dir.path().join("logs/alert.log");
        c.earthquake.info_log = dir.path().join("logs/info.json");
        c.prepare_logs().unwrap();
        assert_eq!(fs::read_to_string(&c.earthquake.alert_log).unwrap(), "");
        assert_eq!(fs::read_to_string(&c.earthquake.info_log).unwrap(), "[]");

        fs::write(&c.earthquake.info_log, "[{}]").unwrap();
        c.prepare_logs().unwrap();
        assert_eq!(fs::read_to_string(&c.earthquake.info_log).unwrap(), "[{}]");
    }
}
