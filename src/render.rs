// src/render.rs

//! Thread subject and body text.
//!
//! Pure formatting: label lookups, region lists capped at seven lines, and
//! the fixed phrases boards expect. No decisions beyond that.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Timelike};

use crate::models::scale::{OR_GREATER, UNKNOWN, scale_label};
use crate::models::{AlertEvent, Area, FeedSource, Hypocentre, InfoEvent, ThreadConfig, ThreadInfo};
use crate::utils::time::format_board;

/// Regions listed before the "other regions" line.
pub const MAX_REGIONS: usize = 7;

const OTHER_REGIONS: &str = "その他の地域";

/// Poster identity and board options applied to every rendered post.
#[derive(Debug, Clone)]
pub struct Renderer {
    from: String,
    mail: String,
    bbs: String,
    shift_jis: bool,
    subject_time: bool,
}

impl Renderer {
    pub fn new(config: &ThreadConfig) -> Self {
        Self {
            from: config.from.clone(),
            mail: config.mail.clone(),
            bbs: config.bbs.clone(),
            shift_jis: config.shift_jis,
            subject_time: config.subject_time,
        }
    }

    /// New-thread post for an early warning.
    pub fn alert(&self, event: &AlertEvent, epoch: i64) -> ThreadInfo {
        let (subject, body) = alert_text(event, self.subject_time);
        self.thread(subject, body, epoch)
    }

    /// New-thread post for an occurrence report; turn into a reply with
    /// [`ThreadInfo::into_reply`].
    pub fn info(&self, event: &InfoEvent, epoch: i64) -> ThreadInfo {
        let (subject, body) = info_text(event);
        self.thread(subject, body, epoch)
    }

    fn thread(&self, subject: String, body: String, epoch: i64) -> ThreadInfo {
        ThreadInfo {
            subject,
            body,
            from: self.from.clone(),
            mail: self.mail.clone(),
            bbs: self.bbs.clone(),
            time: epoch,
            key: None,
            shift_jis: self.shift_jis,
        }
    }
}

/// Subject and body for an early warning.
pub fn alert_text(event: &AlertEvent, subject_time: bool) -> (String, String) {
    let h = &event.hypocentre;
    let mut subject = String::from("【緊急地震速報】");
    if !h.name.is_empty() {
        let _ = write!(subject, "{} ", h.name);
    }
    if let Some(m) = h.magnitude {
        let _ = write!(subject, "M{m} ");
    }
    if subject_time {
        if let Some(t) = event.arrival_time {
            let _ = write!(subject, "発現時刻 {} ", t.format("%H:%M:%S"));
        }
    }
    subject.push_str("強い揺れに警戒");

    let mut body = String::new();
    push_epicentre(&mut body, &h.name);
    push_magnitude(&mut body, h.magnitude);
    let _ = writeln!(body, "震源の深さ : {}\n", depth_text(h));
    push_coordinates(&mut body, h);
    body.push('\n');

    match event.origin_time {
        Some(t) => {
            let _ = writeln!(body, "地震発生時刻 : {}", format_board(&t));
        }
        None => body.push('\n'),
    }
    match event.arrival_time {
        Some(t) => {
            let _ = writeln!(body, "地震発現(到達)時刻 : {}\n", format_board(&t));
        }
        None => body.push('\n'),
    }

    if !event.areas.is_empty() {
        body.push_str("地震が予想される地域\n");
    }
    for area in event.areas.iter().take(MAX_REGIONS) {
        let _ = writeln!(body, "{}", area_line(area));
    }
    if event.areas.len() > MAX_REGIONS {
        let _ = writeln!(body, "{OTHER_REGIONS}");
    }
    if event.has_arrived_areas() {
        body.push_str("\n既に地震が到達していると予想されます\n");
    }

    (subject, body)
}

/// Subject and body for an occurrence report.
pub fn info_text(event: &InfoEvent) -> (String, String) {
    let h = &event.hypocentre;
    let name = event.display_name();
    let max_scale = Some(scale_label(event.max_scale))
        .filter(|label| *label != "不明")
        .map(|label| format!("震度{label}"));
    let magnitude = h.magnitude.map(|m| format!("M{m}"));

    let subject_parts: Vec<&str> = [Some(name), max_scale.as_deref(), magnitude.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect();
    let subject = format!("【地震】{}", subject_parts.join(" "));

    let mut body = String::new();
    push_epicentre(&mut body, name);
    match &max_scale {
        Some(s) => {
            let _ = writeln!(body, "最大{s}");
        }
        None => body.push_str("最大震度情報なし\n"),
    }
    push_magnitude(&mut body, h.magnitude);
    let _ = writeln!(body, "震源の深さ : {}", depth_text(h));
    let _ = writeln!(body, "地震発生時刻 : {}\n", occurrence_time(&event.occurred_at));
    push_coordinates(&mut body, h);
    body.push('\n');

    if !event.points.is_empty() {
        body.push_str("発生した地震の地域\n");
    }
    for point in event.points.iter().take(MAX_REGIONS) {
        let _ = writeln!(
            body,
            "{}{} : 震度 {}",
            point.prefecture,
            point.address,
            scale_label(point.scale)
        );
    }
    if event.points.len() > MAX_REGIONS {
        let _ = writeln!(body, "{OTHER_REGIONS}");
    }

    if let Some(label) = event.domestic_tsunami.and_then(|t| t.label()) {
        let _ = writeln!(body, "\n国内への津波の有無\n{label}");
    }
    if let Some(label) = event.foreign_tsunami.and_then(|t| t.label()) {
        let _ = writeln!(body, "\n海外への津波の有無\n{label}");
    }
    if !event.comment.is_empty() {
        let _ = writeln!(body, "\n{}", event.comment);
    }
    if let Some(image) = &event.severity_image {
        let _ = writeln!(body, "\n震度分布図\n{image}");
    }
    if h.name.is_empty() {
        body.push_str("\n今後の情報に注意してください\n");
    }
    if event.source == FeedSource::Jma {
        let _ = write!(
            body,
            "\n参照元 : Atomフィード (高頻度フィード)\n{}",
            event.source_url
        );
    }

    (subject, body)
}

fn push_epicentre(body: &mut String, name: &str) {
    if name.is_empty() {
        body.push_str("震源地 : 不明\n");
    } else {
        let _ = writeln!(body, "震源地 : {name}");
    }
}

fn push_magnitude(body: &mut String, magnitude: Option<f64>) {
    match magnitude {
        Some(m) => {
            let _ = writeln!(body, "M{m}");
        }
        None => body.push_str("マグニチュードの情報なし\n"),
    }
}

fn push_coordinates(body: &mut String, h: &Hypocentre) {
    match h.latitude {
        Some(lat) => {
            let _ = writeln!(body, "北緯 : {lat:.1}度");
        }
        None => body.push_str("緯度 : 情報なし\n"),
    }
    match h.longitude {
        Some(lon) => {
            let _ = write!(body, "東経 : {lon:.1}度");
        }
        None => body.push_str("経度 : 情報なし"),
    }
    body.push('\n');
}

fn depth_text(h: &Hypocentre) -> String {
    match h.depth_km {
        Some(0) => "ごく浅い".to_string(),
        Some(d) => format!("{d}[km]"),
        None => "情報なし".to_string(),
    }
}

/// `2024年1月1日 16時10分頃`, or with seconds when they are not zero.
pub fn occurrence_time(t: &DateTime<FixedOffset>) -> String {
    if t.second() == 0 {
        t.format("%Y年%-m月%-d日 %-H時%-M分頃").to_string()
    } else {
        t.format("%Y年%-m月%-d日 %-H時%-M分%-S秒").to_string()
    }
}

fn area_line(area: &Area) -> String {
    let from = scale_label(area.scale_from);
    if area.scale_to == OR_GREATER {
        format!("{} : 震度 {}{}", area.name, from, scale_label(OR_GREATER))
    } else if area.scale_from == area.scale_to {
        format!("{} : 震度 {}", area.name, from)
    } else {
        let to = if area.scale_to == UNKNOWN {
            ""
        } else {
            scale_label(area.scale_to)
        };
        format!("{} : 震度 {} 〜 {}", area.name, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaKind, DomesticTsunami, Point};
    use std::collections::BTreeSet;

    fn jst(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn area(name: &str, kind: AreaKind, from: i32, to: i32) -> Area {
        Area {
            kind,
            name: name.into(),
            arrival_time: None,
            scale_from: from,
            scale_to: to,
        }
    }

    fn alert() -> AlertEvent {
        AlertEvent {
            id: "a1".into(),
            hypocentre: Hypocentre {
                name: "石川県能登地方".into(),
                depth_km: Some(10),
                magnitude: Some(7.4),
                latitude: Some(37.5),
                longitude: Some(137.2),
            },
            origin_time: Some(jst("2024-01-01T16:10:00+09:00")),
            arrival_time: Some(jst("2024-01-01T16:10:09+09:00")),
            issued_at: jst("2024-01-01T16:10:05+09:00"),
            source_url: String::new(),
            headline: String::new(),
            areas: vec![
                area("石川県能登", AreaKind::Arrived, 60, 99),
                area("新潟県上越", AreaKind::NotYetArrived, 50, 55),
                area("富山県東部", AreaKind::NotYetArrived, 50, 50),
            ],
        }
    }

    fn info(points: usize) -> InfoEvent {
        InfoEvent {
            id: "i1".into(),
            source: FeedSource::P2p,
            headline: String::new(),
            hypocentre: Hypocentre {
                name: String::new(),
                depth_km: Some(0),
                magnitude: None,
                latitude: None,
                longitude: None,
            },
            occurred_at: jst("2024-01-01T16:10:00+09:00"),
            max_scale: 45,
            domestic_tsunami: Some(DomesticTsunami::Checking),
            foreign_tsunami: None,
            points: (0..points)
                .map(|i| Point {
                    address: format!("市{i}"),
                    prefecture: "東京都".into(),
                    scale: 45,
                    is_area: false,
                })
                .collect(),
            report_time: String::new(),
            max_int_prefs: BTreeSet::from(["東京都".to_string()]),
            severity_image: None,
            comment: String::new(),
            source_url: String::new(),
        }
    }

    #[test]
    fn test_alert_text() {
        let (subject, body) = alert_text(&alert(), true);
        assert_eq!(
            subject,
            "【緊急地震速報】石川県能登地方 M7.4 発現時刻 16:10:09 強い揺れに警戒"
        );
        assert!(body.starts_with("震源地 : 石川県能登地方\nM7.4\n震源の深さ : 10[km]\n\n"));
        assert!(body.contains("北緯 : 37.5度\n東経 : 137.2度\n"));
        assert!(body.contains("地震発生時刻 : 2024/01/01 16:10:00\n"));
        assert!(body.contains("石川県能登 : 震度 6強以上\n"));
        assert!(body.contains("新潟県上越 : 震度 5強 〜 6弱\n"));
        assert!(body.contains("富山県東部 : 震度 5強\n"));
        assert!(body.ends_with("\n既に地震が到達していると予想されます\n"));

        let (subject, _) = alert_text(&alert(), false);
        assert!(!subject.contains("発現時刻"));
    }

    #[test]
    fn test_info_text_caps_regions() {
        let (subject, body) = info_text(&info(9));
        assert_eq!(subject, "【地震】東京都 震度5弱");
        assert!(body.starts_with("震源地 : 東京都\n最大震度5弱\nマグニチュードの情報なし\n震源の深さ : ごく浅い\n"));
        assert!(body.contains("地震発生時刻 : 2024年1月1日 16時10分頃\n\n"));
        assert!(body.contains("緯度 : 情報なし\n経度 : 情報なし\n\n"));
        assert_eq!(body.matches(" : 震度 5弱").count(), MAX_REGIONS);
        assert!(body.contains("その他の地域\n"));
        assert!(body.contains("\n国内への津波の有無\n調査中\n"));
        assert!(body.ends_with("\n今後の情報に注意してください\n"));
    }

    #[test]
    fn test_info_text_jma_reference() {
        let mut event = info(1);
        event.source = FeedSource::Jma;
        event.source_url = "https://www.data.jma.go.jp/x.xml".into();
        event.hypocentre.name = "東京湾".into();
        event.hypocentre.magnitude = Some(4.0);
        let event = event.with_severity_image("https://maps.example/1.png");

        let (subject, body) = info_text(&event);
        assert_eq!(subject, "【地震】東京湾 震度5弱 M4");
        assert!(!body.contains("その他の地域"));
        assert!(body.contains("\n震度分布図\nhttps://maps.example/1.png\n"));
        assert!(!body.contains("今後の情報に注意してください"));
        assert!(body.ends_with("\n参照元 : Atomフィード (高頻度フィード)\nhttps://www.data.jma.go.jp/x.xml"));
    }

    #[test]
    fn test_occurrence_time_with_seconds() {
        assert_eq!(
            occurrence_time(&jst("2024-03-05T09:07:42+09:00")),
            "2024年3月5日 9時7分42秒"
        );
    }

    #[test]
    fn test_renderer_sets_board_fields() {
        let config = ThreadConfig {
            bbs: "eq".into(),
            ..ThreadConfig::default()
        };
        let post = Renderer::new(&config).info(&info(1), 1704093000);
        assert_eq!(post.bbs, "eq");
        assert_eq!(post.from, "佐藤");
        assert_eq!(post.time, 1704093000);
        assert!(post.is_create());
    }
}
