// src/feeds/p2p.rs

//! P2P earthquake history adapter (codes 556 and 551).
//!
//! The endpoint is queried with `limit=1`, so only the first array element is
//! considered.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{AppError, Result, ValidationError};
use crate::feeds::{ALERT_WINDOW_SECS, Event, Gates, INFO_WINDOW_SECS, check_fresh, check_severity};
use crate::models::event::{max_int_prefs, sort_areas, sort_points};
use crate::models::scale::UNKNOWN;
use crate::models::{
    AlertEvent, Area, AreaKind, DomesticTsunami, FeedSource, ForeignTsunami, Hypocentre,
    InfoEvent, Point,
};
use crate::utils::time;

/// Early warning (警報).
pub const CODE_ALERT: i64 = 556;

/// Earthquake information (地震情報).
pub const CODE_INFO: i64 = 551;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    code: i64,
    #[serde(default, alias = "_id")]
    id: Option<String>,
    #[serde(default)]
    issue: Option<RawIssue>,
    #[serde(default)]
    cancelled: bool,
    #[serde(default)]
    earthquake: Option<RawEarthquake>,
    #[serde(default)]
    areas: Vec<RawArea>,
    #[serde(default)]
    points: Vec<RawPoint>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default)]
    time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEarthquake {
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    origin_time: Option<String>,
    #[serde(default)]
    arrival_time: Option<String>,
    #[serde(default)]
    hypocenter: Option<RawHypocenter>,
    #[serde(default)]
    max_scale: Option<f64>,
    #[serde(default)]
    domestic_tsunami: Option<DomesticTsunami>,
    #[serde(default)]
    foreign_tsunami: Option<ForeignTsunami>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHypocenter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    depth: Option<f64>,
    #[serde(default)]
    magnitude: Option<f64>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArea {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    kind_code: Option<String>,
    #[serde(default)]
    arrival_time: Option<String>,
    #[serde(default)]
    scale_from: Option<f64>,
    #[serde(default)]
    scale_to: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPoint {
    #[serde(default)]
    pref: Option<String>,
    #[serde(default)]
    addr: Option<String>,
    #[serde(default)]
    scale: Option<f64>,
    #[serde(default)]
    is_area: bool,
}

/// Parse the newest report of a P2P history response.
pub fn parse(body: &str, url: &str, gates: &Gates, now: DateTime<Utc>) -> Result<Event> {
    let reports: Vec<RawReport> =
        serde_json::from_str(body).map_err(|e| AppError::parse("p2p", e))?;
    let report = reports
        .into_iter()
        .next()
        .ok_or(ValidationError::NoReport)?;

    match report.code {
        CODE_ALERT => parse_alert(report, url, gates, now).map(Event::Alert),
        CODE_INFO => parse_info(report, url, gates, now).map(Event::Info),
        other => Err(ValidationError::UnexpectedCode(other).into()),
    }
}

fn parse_alert(
    report: RawReport,
    url: &str,
    gates: &Gates,
    now: DateTime<Utc>,
) -> Result<AlertEvent> {
    let id = required_id(&report)?;
    if report.cancelled {
        return Err(ValidationError::Cancelled.into());
    }

    let issued_raw = report
        .issue
        .as_ref()
        .and_then(|i| i.time.as_deref())
        .ok_or_else(|| AppError::missing("issue.time"))?;
    let issued_at = time::parse_p2p(issued_raw)
        .ok_or_else(|| AppError::parse("p2p", format!("bad issue.time {issued_raw:?}")))?;
    check_fresh(now, &issued_at, ALERT_WINDOW_SECS)?;

    let mut areas: Vec<Area> = report
        .areas
        .into_iter()
        .map(|a| Area {
            kind: AreaKind::from_code(a.kind_code.as_deref().unwrap_or_default()),
            name: a.name.unwrap_or_default(),
            arrival_time: a.arrival_time.as_deref().and_then(time::parse_p2p),
            scale_from: scale_or_unknown(a.scale_from),
            scale_to: scale_or_unknown(a.scale_to),
        })
        .collect();
    let max_to = areas.iter().map(|a| a.scale_to).max().unwrap_or(UNKNOWN);
    check_severity(max_to, gates.alert_scale)?;
    sort_areas(&mut areas);

    let earthquake = report.earthquake.unwrap_or_default();
    Ok(AlertEvent {
        id,
        hypocentre: hypocentre(earthquake.hypocenter),
        origin_time: earthquake.origin_time.as_deref().and_then(time::parse_p2p),
        arrival_time: earthquake.arrival_time.as_deref().and_then(time::parse_p2p),
        issued_at,
        source_url: url.to_string(),
        headline: String::new(),
        areas,
    })
}

fn parse_info(
    report: RawReport,
    url: &str,
    gates: &Gates,
    now: DateTime<Utc>,
) -> Result<InfoEvent> {
    let id = required_id(&report)?;
    let earthquake = report
        .earthquake
        .ok_or_else(|| AppError::missing("earthquake"))?;
    let time_raw = earthquake
        .time
        .as_deref()
        .ok_or_else(|| AppError::missing("earthquake.time"))?;
    let occurred_at = time::parse_p2p(time_raw)
        .ok_or_else(|| AppError::parse("p2p", format!("bad earthquake.time {time_raw:?}")))?;
    check_fresh(now, &occurred_at, INFO_WINDOW_SECS)?;

    let mut points: Vec<Point> = report
        .points
        .into_iter()
        .map(|p| Point {
            address: p.addr.unwrap_or_default(),
            prefecture: p.pref.unwrap_or_default(),
            scale: scale_or_unknown(p.scale),
            is_area: p.is_area,
        })
        .collect();
    let max_scale = scale_or_unknown(earthquake.max_scale);
    let strongest = points.iter().map(|p| p.scale).fold(max_scale, i32::max);
    check_severity(strongest, gates.info_scale)?;
    sort_points(&mut points);

    Ok(InfoEvent {
        id,
        source: FeedSource::P2p,
        headline: String::new(),
        hypocentre: hypocentre(earthquake.hypocenter),
        occurred_at,
        max_scale,
        domestic_tsunami: earthquake.domestic_tsunami,
        foreign_tsunami: earthquake.foreign_tsunami,
        max_int_prefs: max_int_prefs(&points),
        points,
        report_time: time_raw.to_string(),
        severity_image: None,
        comment: String::new(),
        source_url: url.to_string(),
    })
}

fn required_id(report: &RawReport) -> Result<String> {
    match report.id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(AppError::missing("id")),
    }
}

/// Scales sometimes arrive as floats; only the integer part is meaningful.
fn scale_or_unknown(value: Option<f64>) -> i32 {
    value.map(|v| v.floor() as i32).unwrap_or(UNKNOWN)
}

fn hypocentre(raw: Option<RawHypocenter>) -> Hypocentre {
    let raw = raw.unwrap_or_default();
    Hypocentre {
        name: raw.name.unwrap_or_default(),
        depth_km: raw.depth.filter(|d| *d >= 0.0).map(|d| d.trunc() as i32),
        magnitude: raw.magnitude.filter(|m| *m >= 0.0),
        latitude: raw.latitude.filter(|v| *v > -200.0),
        longitude: raw.longitude.filter(|v| *v > -200.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const URL: &str = "https://api.p2pquake.net/v2/history?codes=551&limit=1";

    fn gates() -> Gates {
        Gates {
            alert_scale: 50,
            info_scale: 30,
        }
    }

    /// 2024/01/01 16:10:00 JST plus `secs`.
    fn now_plus(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 7, 10, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn alert_json(scale_to: &str, cancelled: bool) -> String {
        format!(
            r#"[{{"code":556,"id":"eew-1","cancelled":{cancelled},
                "issue":{{"time":"2024/01/01 16:10:00"}},
                "earthquake":{{"originTime":"2024/01/01 16:09:50","arrivalTime":"2024/01/01 16:10:05",
                  "hypocenter":{{"name":"石川県能登地方","depth":10.0,"magnitude":7.4,"latitude":37.5,"longitude":137.2}}}},
                "areas":[
                  {{"name":"新潟県上越","kindCode":"10","scaleFrom":45.0,"scaleTo":{scale_to}}},
                  {{"name":"石川県能登","kindCode":"11","scaleFrom":60,"scaleTo":99}},
                  {{"name":"富山県東部","kindCode":"19","scaleFrom":-1,"scaleTo":-1}}
                ]}}]"#
        )
    }

    fn info_json(time: &str, points: &str) -> String {
        format!(
            r#"[{{"code":551,"id":"info-1",
                "earthquake":{{"time":"{time}","maxScale":50,
                  "domesticTsunami":"None","foreignTsunami":"Unknown",
                  "hypocenter":{{"name":"東京湾","depth":30,"magnitude":4.0,"latitude":-200,"longitude":-200}}}},
                "points":{points}}}]"#
        )
    }

    #[test]
    fn test_alert_is_sorted_and_kept() {
        let event = parse(&alert_json("50", false), URL, &gates(), now_plus(5)).unwrap();
        let Event::Alert(alert) = event else {
            panic!("expected alert");
        };
        assert_eq!(alert.id, "eew-1");
        let names: Vec<_> = alert.areas.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["石川県能登", "新潟県上越", "富山県東部"]);
        assert_eq!(alert.areas[1].scale_from, 45);
        assert!(alert.has_arrived_areas());
        assert_eq!(alert.hypocentre.depth_km, Some(10));
        assert_eq!(alert.hypocentre.magnitude, Some(7.4));
    }

    #[test]
    fn test_alert_below_threshold_is_discarded() {
        let body = r#"[{"code":556,"id":"eew-2","issue":{"time":"2024/01/01 16:10:00"},
            "areas":[{"name":"a","scaleFrom":30,"scaleTo":40},{"name":"b","scaleFrom":40,"scaleTo":40}]}]"#;
        let err = parse(body, URL, &gates(), now_plus(1)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::BelowThreshold {
                max_scale: 40,
                threshold: 50
            })
        ));
    }

    #[test]
    fn test_alert_staleness() {
        let err = parse(&alert_json("50", false), URL, &gates(), now_plus(31)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::Stale { .. })
        ));
        assert!(parse(&alert_json("50", false), URL, &gates(), now_plus(30)).is_ok());
    }

    #[test]
    fn test_cancelled_alert() {
        let err = parse(&alert_json("50", true), URL, &gates(), now_plus(1)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::Cancelled)
        ));
    }

    #[test]
    fn test_info_event() {
        let points = r#"[
            {"pref":"千葉県","addr":"千葉市","scale":30,"isArea":false},
            {"pref":"東京都","addr":"千代田区","scale":50,"isArea":false},
            {"pref":"東京都","addr":"新宿区","scale":50,"isArea":false},
            {"pref":"埼玉県","addr":"川口市","isArea":false}]"#;
        let body = info_json("2024/01/01 16:10:00", points);
        let event = parse(&body, URL, &gates(), now_plus(120)).unwrap();
        let Event::Info(info) = event else {
            panic!("expected info");
        };
        assert_eq!(info.source, FeedSource::P2p);
        assert_eq!(info.max_scale, 50);
        assert_eq!(info.points[0].prefecture, "東京都");
        assert_eq!(info.points.last().unwrap().scale, UNKNOWN);
        assert_eq!(
            info.max_int_prefs.iter().collect::<Vec<_>>(),
            vec!["東京都"]
        );
        assert_eq!(info.hypocentre.latitude, None);
        assert_eq!(info.hypocentre.magnitude, Some(4.0));
        assert_eq!(info.domestic_tsunami, Some(DomesticTsunami::None));
        assert_eq!(info.report_time, "2024/01/01 16:10:00");
    }

    #[test]
    fn test_info_staleness() {
        let body = info_json("2024/01/01 16:10:00", "[]");
        let err = parse(&body, URL, &gates(), now_plus(601)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::Stale { age_secs: 601, .. })
        ));
    }

    #[test]
    fn test_malformed_and_empty() {
        assert!(matches!(
            parse("{not json", URL, &gates(), now_plus(0)).unwrap_err(),
            AppError::Parse { .. }
        ));
        assert!(matches!(
            parse("[]", URL, &gates(), now_plus(0)).unwrap_err(),
            AppError::Validation(ValidationError::NoReport)
        ));
        assert!(matches!(
            parse(r#"[{"code":554}]"#, URL, &gates(), now_plus(0)).unwrap_err(),
            AppError::Validation(ValidationError::UnexpectedCode(554))
        ));
        assert!(matches!(
            parse(r#"[{"code":551,"earthquake":{}}]"#, URL, &gates(), now_plus(0)).unwrap_err(),
            AppError::Validation(ValidationError::RequiredFieldMissing(_))
        ));
    }
}
