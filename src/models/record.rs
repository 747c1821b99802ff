// src/models/record.rs

//! Persistent association between an affected site and its board thread.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::InfoEvent;

/// How occurrence events are keyed against existing threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKeyPolicy {
    /// Most-affected prefecture set
    #[default]
    Prefectures,
    /// Bare epicentre name (legacy schema)
    Hypocentre,
}

/// Dedup key derived from an occurrence event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteKey {
    Prefectures(BTreeSet<String>),
    Hypocentre(String),
}

impl SiteKey {
    pub fn for_event(event: &InfoEvent, policy: SiteKeyPolicy) -> Self {
        match policy {
            SiteKeyPolicy::Prefectures => Self::Prefectures(event.max_int_prefs.clone()),
            SiteKeyPolicy::Hypocentre => Self::Hypocentre(event.hypocentre.name.clone()),
        }
    }

    /// Whether a stored record discusses the same site. Empty keys never match.
    pub fn matches(&self, record: &DedupRecord) -> bool {
        match self {
            Self::Prefectures(prefs) => !prefs.is_disjoint(&record.prefs),
            Self::Hypocentre(name) => !name.is_empty() && *name == record.hypocentre,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Prefectures(prefs) => prefs.is_empty(),
            Self::Hypocentre(name) => name.is_empty(),
        }
    }
}

/// One entry of the occurrence log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupRecord {
    /// Every event id posted into this thread
    #[serde(rename = "id", default)]
    pub ids: Vec<String>,

    #[serde(default)]
    pub hypocentre: String,

    /// Stored as a comma-joined string
    #[serde(default, with = "comma_set")]
    pub prefs: BTreeSet<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    /// Thread number used as the board's write key
    #[serde(default)]
    pub thread: String,

    /// Event time of the last post, `yyyy/MM/dd HH:mm:ss`
    #[serde(default)]
    pub date: String,

    /// Upstream report timestamp of the last post
    #[serde(rename = "reportdatetime", default)]
    pub report_time: String,
}

impl DedupRecord {
    pub fn has_id(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    /// Same thread identity as `other`.
    pub fn same_thread(&self, other: &DedupRecord) -> bool {
        self.url == other.url && self.thread == other.thread
    }
}

mod comma_set {
    use std::collections::BTreeSet;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(set: &BTreeSet<String>, s: S) -> Result<S::Ok, S::Error> {
        let joined = set.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        s.serialize_str(&joined)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<String>, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(prefs: &[&str], hypo: &str) -> DedupRecord {
        DedupRecord {
            ids: vec!["a".into()],
            hypocentre: hypo.into(),
            prefs: prefs.iter().map(|p| p.to_string()).collect(),
            title: "t".into(),
            url: "https://bbs.example/test/read.cgi/eq/1/".into(),
            thread: "1".into(),
            date: "2024/01/01 00:00:00".into(),
            report_time: String::new(),
        }
    }

    #[test]
    fn test_prefs_stored_as_comma_string() {
        let r = record(&["東京都", "千葉県"], "東京湾");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["prefs"], "千葉県,東京都");
        assert_eq!(json["id"][0], "a");
        assert_eq!(json["reportdatetime"], "");

        let back: DedupRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_legacy_record_without_prefs() {
        let raw = r#"{"id":["x"],"hypocentre":"能登半島沖","title":"t","url":"u","thread":"9","date":"d"}"#;
        let r: DedupRecord = serde_json::from_str(raw).unwrap();
        assert!(r.prefs.is_empty());
        assert!(r.report_time.is_empty());
        assert!(SiteKey::Hypocentre("能登半島沖".into()).matches(&r));
        assert!(!SiteKey::Prefectures(["石川県".to_string()].into()).matches(&r));
    }

    #[test]
    fn test_prefecture_overlap_matches() {
        let r = record(&["東京都", "千葉県"], "");
        assert!(SiteKey::Prefectures(["千葉県".to_string()].into()).matches(&r));
        assert!(!SiteKey::Prefectures(BTreeSet::new()).matches(&r));
        assert!(!SiteKey::Hypocentre(String::new()).matches(&r));
    }
}
