// src/feeds/jma.rs

//! JMA XML adapter.
//!
//! The high-frequency Atom feed only lists reports. Getting an event takes two
//! hops: [`locate_report`] picks the newest entry of a wanted type from the
//! listing, then the report document at that entry's URL is fetched and handed
//! to [`parse_report`]. [`fetch_latest_report`] performs both hops.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use roxmltree::{Document, Node};

use crate::error::{AppError, Result, ValidationError};
use crate::feeds::{Gates, INFO_WINDOW_SECS, check_fresh, check_severity};
use crate::models::event::{max_int_prefs, sort_points};
use crate::models::scale::{UNKNOWN, jma_scale_code};
use crate::models::{FeedSource, Hypocentre, InfoEvent, Point};
use crate::utils::http::Fetch;
use crate::utils::time;

/// Report types carrying observed intensities: 震度速報 and 震源・震度に関する情報.
pub const REPORT_CODES: [&str; 2] = ["VXSE51", "VXSE53"];

/// Fixed remark attached by JMA to most reports.
const FIXED_COMMENT_TYPE: &str = "固定付加文";

/// Both hops: listing, then the newest matching report.
///
/// Returns the report URL together with its body.
pub async fn fetch_latest_report<F>(fetcher: &F, listing_url: &str) -> Result<(String, String)>
where
    F: Fetch + ?Sized,
{
    let listing = fetcher.get_text(listing_url).await?;
    let report_url = locate_report(&listing, &REPORT_CODES)?;
    log::debug!("JMA report located at {}", report_url);
    let body = fetcher.get_text(&report_url).await?;
    Ok((report_url, body))
}

/// First Atom entry whose id (or link) names one of `codes`.
pub fn locate_report(listing: &str, codes: &[&str]) -> Result<String> {
    let doc = Document::parse(listing).map_err(|e| AppError::parse("jma listing", e))?;
    let root = doc.root_element();
    if root.tag_name().name() != "feed" {
        return Err(AppError::parse(
            "jma listing",
            format!("root element is <{}>", root.tag_name().name()),
        ));
    }

    for entry in children(root, "entry") {
        let id = child_text(entry, "id").unwrap_or_default();
        let href = child(entry, "link")
            .and_then(|l| l.attribute("href"))
            .unwrap_or_default();
        let matches = |s: &str| codes.iter().any(|code| s.contains(*code));
        if matches(id) || matches(href) {
            let url = if href.is_empty() { id } else { href };
            return Ok(url.trim().to_string());
        }
    }
    Err(ValidationError::NoReport.into())
}

/// Parse a VXSE51/VXSE53 report into an occurrence event.
pub fn parse_report(body: &str, url: &str, gates: &Gates, now: DateTime<Utc>) -> Result<InfoEvent> {
    let doc = Document::parse(body).map_err(|e| AppError::parse("jma report", e))?;
    let root = doc.root_element();
    let head = child(root, "Head").ok_or_else(|| AppError::parse("jma report", "no <Head>"))?;
    let report_body =
        child(root, "Body").ok_or_else(|| AppError::parse("jma report", "no <Body>"))?;

    let id = child_text(head, "EventID")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::missing("Head/EventID"))?
        .to_string();
    let report_time = child_text(head, "ReportDateTime").unwrap_or_default().to_string();
    let headline = descend(head, &["Headline", "Text"])
        .and_then(|n| n.text())
        .unwrap_or_default()
        .trim()
        .to_string();

    let earthquake = child(report_body, "Earthquake");
    let time_raw = earthquake
        .and_then(|e| child_text(e, "OriginTime"))
        .filter(|s| !s.is_empty())
        .or_else(|| child_text(head, "TargetDateTime"))
        .ok_or_else(|| AppError::missing("OriginTime"))?;
    let occurred_at = time::parse_jma(time_raw)
        .ok_or_else(|| AppError::parse("jma report", format!("bad time {time_raw:?}")))?;
    check_fresh(now, &occurred_at, INFO_WINDOW_SECS)?;

    let observation = descend(report_body, &["Intensity", "Observation"])
        .ok_or_else(|| AppError::missing("Body/Intensity/Observation"))?;
    let max_scale = jma_scale_code(child_text(observation, "MaxInt").unwrap_or_default());
    check_severity(max_scale, gates.info_scale)?;

    let mut points = observation_points(observation);
    sort_points(&mut points);

    Ok(InfoEvent {
        id,
        source: FeedSource::Jma,
        headline,
        hypocentre: earthquake.map(hypocentre).unwrap_or_default(),
        occurred_at,
        max_scale,
        domestic_tsunami: None,
        foreign_tsunami: None,
        max_int_prefs: max_int_prefs(&points),
        points,
        report_time,
        severity_image: None,
        comment: comments(report_body),
        source_url: url.to_string(),
    })
}

/// One point per city, or per area when a report has no city breakdown.
fn observation_points(observation: Node<'_, '_>) -> Vec<Point> {
    let mut points = Vec::new();
    for pref in children(observation, "Pref") {
        let pref_name = child_text(pref, "Name").unwrap_or_default();
        for area in children(pref, "Area") {
            let area_scale = child_text(area, "MaxInt").map(jma_scale_code);
            let mut cities = children(area, "City").peekable();
            if cities.peek().is_none() {
                points.push(Point {
                    address: child_text(area, "Name").unwrap_or_default().to_string(),
                    prefecture: pref_name.to_string(),
                    scale: area_scale.unwrap_or(UNKNOWN),
                    is_area: true,
                });
                continue;
            }
            for city in cities {
                let scale = child_text(city, "MaxInt")
                    .map(jma_scale_code)
                    .or(area_scale)
                    .unwrap_or(UNKNOWN);
                points.push(Point {
                    address: child_text(city, "Name").unwrap_or_default().to_string(),
                    prefecture: pref_name.to_string(),
                    scale,
                    is_area: false,
                });
            }
        }
    }
    points
}

fn hypocentre(earthquake: Node<'_, '_>) -> Hypocentre {
    let area = descend(earthquake, &["Hypocenter", "Area"]);
    let name = area
        .and_then(|a| child_text(a, "Name"))
        .unwrap_or_default()
        .to_string();
    let (latitude, longitude, depth_km) = area
        .and_then(|a| child_text(a, "Coordinate"))
        .map(parse_coordinate)
        .unwrap_or((None, None, None));
    let magnitude = child_text(earthquake, "Magnitude")
        .and_then(|m| m.trim().parse::<f64>().ok())
        .filter(|m| m.is_finite());

    Hypocentre {
        name,
        depth_km,
        magnitude,
        latitude,
        longitude,
    }
}

static SIGNED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-][0-9]+(?:\.[0-9]+)?").expect("signed number regex"));

/// ISO 6709 `+37.5+137.2-10000/`: degrees, degrees, metres below sea level.
pub fn parse_coordinate(text: &str) -> (Option<f64>, Option<f64>, Option<i32>) {
    let parts: Vec<f64> = SIGNED_NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    match parts.as_slice() {
        [lat, lon, depth] => (Some(*lat), Some(*lon), Some((depth.abs() / 1000.0) as i32)),
        [lat, lon] => (Some(*lat), Some(*lon), None),
        _ => (None, None, None),
    }
}

fn comments(body: Node<'_, '_>) -> String {
    let Some(comments) = child(body, "Comments") else {
        return String::new();
    };
    let mut lines = Vec::new();
    if let Some(forecast) = child(comments, "ForecastComment") {
        if forecast.attribute("codeType") == Some(FIXED_COMMENT_TYPE) {
            if let Some(text) = child_text(forecast, "Text") {
                lines.push(text.trim().to_string());
            }
        }
    }
    if let Some(free) = child(comments, "FreeFormComment").and_then(|n| n.text()) {
        lines.push(free.trim().to_string());
    }
    lines.retain(|l| !l.is_empty());
    lines.join("\n")
}

// --- roxmltree helpers (namespace-agnostic, by local name) ---

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    children(node, name).next()
}

fn child_text<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Option<&'a str> {
    child(node, name).map(|n| n.text().unwrap_or_default())
}

fn descend<'a, 'input>(node: Node<'a, 'input>, path: &[&'static str]) -> Option<Node<'a, 'input>> {
    path.iter().try_fold(node, |n, name| child(n, *name))
}
