//! Post Timestamp Resolution
//!
//! A post's time signal comes either as a machine-readable `datetime`
//! attribute or as a localized label ("today", "вчера", "12.01.24").

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::RawNode;

const TODAY_LABELS: &[&str] = &["today", "сегодня"];
const YESTERDAY_LABELS: &[&str] = &["yesterday", "вчера"];

static DOTTED_DATE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4}|\d{2})\b").ok());

/// Resolve the publication instant of a post node, relative to `now` for labels.
pub fn resolve(node: &RawNode, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(instant) = node.datetime_attribute.as_deref().and_then(parse_datetime_attribute) {
        return Some(instant);
    }

    node.date_label
        .as_deref()
        .and_then(|label| parse_date_label(label, now))
}

pub fn parse_datetime_attribute(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Interpret a human-readable date label. Dates resolve to local midnight.
pub fn parse_date_label(label: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = label.trim().to_lowercase();
    let today = now.with_timezone(&Local).date_naive();

    if TODAY_LABELS.iter().any(|l| lower.contains(l)) {
        return local_midnight(today);
    }
    if YESTERDAY_LABELS.iter().any(|l| lower.contains(l)) {
        return today.pred_opt().and_then(local_midnight);
    }

    let caps = DOTTED_DATE.as_ref()?.captures(&lower)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year_raw = &caps[3];
    let mut year: i32 = year_raw.parse().ok()?;
    if year_raw.len() == 2 {
        year += 2000;
    }

    NaiveDate::from_ymd_opt(year, month, day).and_then(local_midnight)
}

pub fn local_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
