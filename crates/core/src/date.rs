//! Date parsing for the mixed-quality date strings found in studio exports.
//!
//! Two families arrive side by side: day-first `/`-delimited strings
//! (`15/03/2024, 10:30:00`) and ISO-like strings (`2024-03-15`,
//! `2024-03-15T10:30:00Z`). Payroll sheets additionally carry month labels
//! such as `Mar-2024`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y, %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y, %H:%M",
    "%d/%m/%Y %H:%M",
];

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// ISO forms with an offset that RFC 3339 rejects (no seconds, `+0530`).
/// A trailing `Z` is rewritten to `+0000` before these are tried.
const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M%z",
];

/// Parse a date in any of the supported formats.
///
/// Returns `None` for blank or unparseable input; callers decide whether
/// that excludes the record from a date-keyed grouping.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains('/') {
        return parse_day_first(s);
    }
    parse_iso(s).or_else(|| parse_month_label(s))
}

fn parse_day_first(s: &str) -> Option<NaiveDateTime> {
    for fmt in DAY_FIRST_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Some(dt) = parse_with_offset(s) {
        return Some(dt);
    }
    for fmt in ISO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    // Bare month key ("2024-03").
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Offset-carrying ISO strings; the wall-clock time is kept.
fn parse_with_offset(s: &str) -> Option<NaiveDateTime> {
    let normalized = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        Some(rest) => format!("{rest}+0000"),
        None => s.to_string(),
    };
    OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
        .map(|dt| dt.naive_local())
}

/// `Mar-2024`, `Mar 2024`, `March-2024`.
fn parse_month_label(s: &str) -> Option<NaiveDateTime> {
    let normalized = s.replace(' ', "-");
    NaiveDate::parse_from_str(&format!("01-{normalized}"), "%d-%b-%Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `"YYYY-MM"` bucket key for a timestamp.
pub fn month_key(dt: &NaiveDateTime) -> String {
    PeriodKey::from_datetime(dt).to_string()
}

/// `"YYYY"` bucket key for a timestamp.
pub fn year_key(dt: &NaiveDateTime) -> String {
    format!("{:04}", dt.year())
}

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    /// Same month one year earlier.
    pub fn previous_year(&self) -> Self {
        Self {
            year: self.year - 1,
            month: self.month,
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {s:?}"))?;
        let year: i32 = year.parse().map_err(|_| format!("bad year in {s:?}"))?;
        let month: u32 = month.parse().map_err(|_| format!("bad month in {s:?}"))?;
        PeriodKey::new(year, month).ok_or_else(|| format!("month out of range in {s:?}"))
    }
}
