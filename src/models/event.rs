// src/models/event.rs

//! Canonical earthquake events produced by the feed adapters.
//!
//! Events are plain values. The adapters build them once per poll cycle with
//! their lists already sorted and the most-affected prefecture set derived.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::models::scale::{self, UNKNOWN};

/// Which upstream produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Jma,
    P2p,
}

/// Arrival state of an early-warning area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    /// Main shock not yet arrived (`10`)
    NotYetArrived,
    /// Main shock already arrived (`11`)
    Arrived,
    /// Arrival time could not be estimated (`19`)
    NoEta,
    Unknown,
}

impl AreaKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "10" => Self::NotYetArrived,
            "11" => Self::Arrived,
            "19" => Self::NoEta,
            _ => Self::Unknown,
        }
    }
}

/// A forecast region of an early warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub kind: AreaKind,
    pub name: String,
    pub arrival_time: Option<DateTime<FixedOffset>>,
    pub scale_from: i32,
    pub scale_to: i32,
}

/// An observation point of an occurred earthquake.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub address: String,
    pub prefecture: String,
    pub scale: i32,
    pub is_area: bool,
}

/// Hypocentre description shared by both event kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hypocentre {
    /// Empty while the epicentre is still being determined
    pub name: String,
    pub depth_km: Option<i32>,
    pub magnitude: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Domestic tsunami assessment attached to occurrence reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DomesticTsunami {
    None,
    Unknown,
    Checking,
    NonEffective,
    Watch,
    Warning,
    #[serde(other)]
    Other,
}

impl DomesticTsunami {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::None => Some("なし"),
            Self::Unknown => Some("不明"),
            Self::Checking => Some("調査中"),
            Self::NonEffective => Some("若干の海面変動が予想されるが、被害の心配なし"),
            Self::Watch => Some("津波注意報"),
            Self::Warning => Some("津波予報(種類不明)"),
            Self::Other => None,
        }
    }
}

/// Foreign tsunami assessment attached to occurrence reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ForeignTsunami {
    None,
    Unknown,
    Checking,
    NonEffectiveNearby,
    WarningNearby,
    WarningPacific,
    WarningPacificWide,
    WarningIndian,
    WarningIndianWide,
    Potential,
    #[serde(other)]
    Other,
}

impl ForeignTsunami {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::None => Some("なし"),
            Self::Unknown => Some("不明"),
            Self::Checking => Some("調査中"),
            Self::NonEffectiveNearby => {
                Some("震源の近傍で小さな津波の可能性があるが、被害の心配なし")
            }
            Self::WarningNearby => Some("震源の近傍で津波の可能性がある"),
            Self::WarningPacific => Some("太平洋で津波の可能性がある"),
            Self::WarningPacificWide => Some("太平洋の広域で津波の可能性がある"),
            Self::WarningIndian => Some("インド洋で津波の可能性がある"),
            Self::WarningIndianWide => Some("インド洋の広域で津波の可能性がある"),
            Self::Potential => Some("一般にこの規模では津波の可能性がある"),
            Self::Other => None,
        }
    }
}

/// Early warning (P2P code 556).
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub id: String,
    pub hypocentre: Hypocentre,
    pub origin_time: Option<DateTime<FixedOffset>>,
    pub arrival_time: Option<DateTime<FixedOffset>>,
    pub issued_at: DateTime<FixedOffset>,
    pub source_url: String,
    pub headline: String,
    pub areas: Vec<Area>,
}

impl AlertEvent {
    /// Highest forecast upper bound, counting "or greater" as maximal.
    pub fn max_scale_to(&self) -> i32 {
        self.areas.iter().map(|a| a.scale_to).max().unwrap_or(UNKNOWN)
    }

    pub fn has_arrived_areas(&self) -> bool {
        self.areas.iter().any(|a| a.kind == AreaKind::Arrived)
    }
}

/// Occurred earthquake (P2P code 551 or JMA VXSE51/53).
#[derive(Debug, Clone, PartialEq)]
pub struct InfoEvent {
    pub id: String,
    pub source: FeedSource,
    pub headline: String,
    pub hypocentre: Hypocentre,
    pub occurred_at: DateTime<FixedOffset>,
    pub max_scale: i32,
    pub domestic_tsunami: Option<DomesticTsunami>,
    pub foreign_tsunami: Option<ForeignTsunami>,
    pub points: Vec<Point>,
    /// Upstream report timestamp, verbatim
    pub report_time: String,
    pub max_int_prefs: BTreeSet<String>,
    pub severity_image: Option<String>,
    pub comment: String,
    pub source_url: String,
}

impl InfoEvent {
    /// Attach the severity map image found for this event.
    pub fn with_severity_image(self, url: impl Into<String>) -> Self {
        Self {
            severity_image: Some(url.into()),
            ..self
        }
    }

    /// Name used in subjects: epicentre, else the first most-affected prefecture.
    pub fn display_name(&self) -> &str {
        if !self.hypocentre.name.is_empty() {
            return &self.hypocentre.name;
        }
        self.max_int_prefs
            .iter()
            .next()
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Stable sort of observation points, most severe first.
pub fn sort_points(points: &mut [Point]) {
    points.sort_by(|a, b| scale::cmp_point_scale(a.scale, b.scale));
}

/// Stable sort of forecast areas by lower bound, then upper bound.
pub fn sort_areas(areas: &mut [Area]) {
    areas.sort_by(|a, b| {
        scale::cmp_point_scale(a.scale_from, b.scale_from)
            .then_with(|| scale::cmp_area_upper(a.scale_to, b.scale_to))
    });
}

/// Prefectures of every point at the global maximum scale.
pub fn max_int_prefs(points: &[Point]) -> BTreeSet<String> {
    let Some(max) = points.iter().map(|p| p.scale).max() else {
        return BTreeSet::new();
    };
    points
        .iter()
        .filter(|p| p.scale == max && !p.prefecture.is_empty())
        .map(|p| p.prefecture.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(pref: &str, addr: &str, scale: i32) -> Point {
        Point {
            address: addr.into(),
            prefecture: pref.into(),
            scale,
            is_area: false,
        }
    }

    fn area(name: &str, from: i32, to: i32) -> Area {
        Area {
            kind: AreaKind::NotYetArrived,
            name: name.into(),
            arrival_time: None,
            scale_from: from,
            scale_to: to,
        }
    }

    #[test]
    fn test_sort_points_is_stable_and_idempotent() {
        let mut points = vec![
            point("A", "a1", -1),
            point("B", "b1", 30),
            point("C", "c1", 50),
            point("D", "d1", 30),
        ];
        sort_points(&mut points);
        let names: Vec<_> = points.iter().map(|p| p.address.as_str()).collect();
        assert_eq!(names, vec!["c1", "b1", "d1", "a1"]);

        let before = points.clone();
        sort_points(&mut points);
        assert_eq!(points, before);
    }

    #[test]
    fn test_sort_areas_pushes_sentinels_last() {
        let mut areas = vec![
            area("unknown", -1, -1),
            area("open", 50, 99),
            area("range", 50, 55),
            area("low", 40, 45),
        ];
        sort_areas(&mut areas);
        let names: Vec<_> = areas.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["range", "open", "low", "unknown"]);
    }

    #[test]
    fn test_max_int_prefs_deduplicates() {
        let points = vec![
            point("東京都", "千代田区", 50),
            point("東京都", "新宿区", 50),
            point("神奈川県", "横浜市", 50),
            point("千葉県", "千葉市", 40),
        ];
        let prefs = max_int_prefs(&points);
        assert_eq!(prefs.len(), 2);
        assert!(prefs.contains("東京都"));
        assert!(prefs.contains("神奈川県"));
        assert!(max_int_prefs(&[]).is_empty());
    }

    #[test]
    fn test_tsunami_labels() {
        let d: DomesticTsunami = serde_json::from_str("\"Watch\"").unwrap();
        assert_eq!(d.label(), Some("津波注意報"));
        let f: ForeignTsunami = serde_json::from_str("\"SomethingNew\"").unwrap();
        assert_eq!(f, ForeignTsunami::Other);
        assert_eq!(f.label(), None);
    }
}
