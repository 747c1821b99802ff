// src/utils/time.rs

//! Timestamp parsing for both feeds.
//!
//! P2P sends `yyyy/MM/dd HH:mm:ss[.fff]` in Japan Standard Time without an
//! offset; JMA sends RFC 3339. Both end up as `DateTime<FixedOffset>`.

use chrono::{DateTime, FixedOffset, Utc};

/// Format used by P2P and by the occurrence log's `date` field.
pub const BOARD_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Parse a P2P timestamp as JST.
pub fn parse_p2p(text: &str) -> Option<DateTime<FixedOffset>> {
    let with_offset = format!("{} +0900", text.trim());
    DateTime::parse_from_str(&with_offset, "%Y/%m/%d %H:%M:%S%.f %z").ok()
}

/// Parse a JMA (RFC 3339) timestamp.
pub fn parse_jma(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text.trim()).ok()
}

/// `yyyy/MM/dd HH:mm:ss` in the timestamp's own offset.
pub fn format_board(t: &DateTime<FixedOffset>) -> String {
    t.format(BOARD_FORMAT).to_string()
}

/// Whole seconds from `t` to `now`; negative when `t` is in the future.
pub fn age_secs(now: DateTime<Utc>, t: &DateTime<FixedOffset>) -> i64 {
    (now - t.with_timezone(&Utc)).num_seconds()
}
