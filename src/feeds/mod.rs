// src/feeds/mod.rs

//! Feed adapters: raw upstream payloads in, canonical events out.
//!
//! Both adapters apply the same two gates before an event leaves this module:
//!
//! - **Freshness**: `now - timestamp` must lie in `0..=30s` for warnings and
//!   `0..=600s` for occurrence reports.
//! - **Severity**: at least one area/point must reach the configured scale.
//!
//! The JMA feed needs two fetches (Atom listing, then the report it points
//! to); see [`jma::locate_report`].

pub mod jma;
pub mod p2p;

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::{Result, ValidationError};
use crate::models::{AlertEvent, Config, InfoEvent};
use crate::utils::time;

/// Maximum age of an early warning.
pub const ALERT_WINDOW_SECS: i64 = 30;

/// Maximum age of an occurrence report.
pub const INFO_WINDOW_SECS: i64 = 600;

/// Severity thresholds applied by the adapters.
#[derive(Debug, Clone, Copy)]
pub struct Gates {
    pub alert_scale: i32,
    pub info_scale: i32,
}

impl From<&Config> for Gates {
    fn from(config: &Config) -> Self {
        Self {
            alert_scale: config.earthquake.alert_scale,
            info_scale: config.earthquake.info_scale,
        }
    }
}

/// A raw payload and the adapter that understands it.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// P2P history array and the endpoint it came from
    P2p { body: &'a str, url: &'a str },
    /// Second-stage JMA report and the URL it came from
    JmaReport { body: &'a str, url: &'a str },
}

/// A normalized event.
#[derive(Debug, Clone)]
pub enum Event {
    Alert(AlertEvent),
    Info(InfoEvent),
}

/// Decode, gate and canonicalise one payload.
pub fn normalize(payload: Payload<'_>, gates: &Gates, now: DateTime<Utc>) -> Result<Event> {
    match payload {
        Payload::P2p { body, url } => p2p::parse(body, url, gates, now),
        Payload::JmaReport { body, url } => jma::parse_report(body, url, gates, now).map(Event::Info),
    }
}

/// Reject timestamps outside `0..=window_secs` seconds before `now`.
pub fn check_fresh(
    now: DateTime<Utc>,
    t: &DateTime<FixedOffset>,
    window_secs: i64,
) -> std::result::Result<(), ValidationError> {
    let age_secs = time::age_secs(now, t);
    if (0..=window_secs).contains(&age_secs) {
        Ok(())
    } else {
        Err(ValidationError::Stale {
            age_secs,
            window_secs,
        })
    }
}

/// Reject events whose strongest value is below `threshold`.
pub fn check_severity(max_scale: i32, threshold: i32) -> std::result::Result<(), ValidationError> {
    if max_scale >= threshold {
        Ok(())
    } else {
        Err(ValidationError::BelowThreshold {
            max_scale,
            threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_freshness_window_edges() {
        let t = time::parse_p2p("2024/01/01 16:10:00").unwrap();
        let at = |s| Utc.with_ymd_and_hms(2024, 1, 1, 7, 10, 0).unwrap() + chrono::Duration::seconds(s);

        assert!(check_fresh(at(0), &t, ALERT_WINDOW_SECS).is_ok());
        assert!(check_fresh(at(30), &t, ALERT_WINDOW_SECS).is_ok());
        assert_eq!(
            check_fresh(at(31), &t, ALERT_WINDOW_SECS),
            Err(ValidationError::Stale {
                age_secs: 31,
                window_secs: 30
            })
        );
        assert!(check_fresh(at(-1), &t, ALERT_WINDOW_SECS).is_err());
        assert!(check_fresh(at(600), &t, INFO_WINDOW_SECS).is_ok());
        assert!(check_fresh(at(601), &t, INFO_WINDOW_SECS).is_err());
    }

    #[test]
    fn test_severity_gate() {
        assert!(check_severity(50, 50).is_ok());
        assert!(check_severity(99, 70).is_ok());
        assert!(check_severity(45, 50).is_err());
        assert!(check_severity(-1, 10).is_err());
    }
}
