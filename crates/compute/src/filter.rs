//! Pre-grouping filter predicate.
//!
//! A [`FilterConfig`] is the dashboard's shared filter state. It is applied
//! to the record array before any grouping happens. Empty lists and `None`
//! bounds mean "no constraint". A constraint on a dimension only applies to
//! record kinds that carry that dimension, so one filter can be shared by
//! every view.

use std::path::Path;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use studio_core::{Dimension, Measure, Record, Result, StudioError, UNKNOWN};

/// Inclusive date range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// True when any day of the calendar month holding `date` is in range.
    pub fn overlaps_month(&self, date: NaiveDate) -> bool {
        let Some(first) = date.with_day(1) else {
            return false;
        };
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(first);
        self.start.map_or(true, |s| last >= s) && self.end.map_or(true, |e| first <= e)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub date_range: Option<DateRange>,
    pub locations: Vec<String>,
    pub trainers: Vec<String>,
    pub conversion_status: Vec<String>,
    pub retention_status: Vec<String>,
    pub min_ltv: Option<f64>,
    pub max_ltv: Option<f64>,
}

impl FilterConfig {
    /// Load from a `.json` file, or YAML for any other extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let cfg: FilterConfig = if is_json {
            serde_json::from_str(&text)
                .map_err(|e| StudioError::InvalidConfig(format!("{}: {e}", path.display())))?
        } else {
            serde_yaml::from_str(&text)
                .map_err(|e| StudioError::InvalidConfig(format!("{}: {e}", path.display())))?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(DateRange {
            start: Some(s),
            end: Some(e),
        }) = self.date_range
        {
            if s > e {
                return Err(StudioError::InvalidConfig(format!(
                    "date range start {s} is after end {e}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_ltv, self.max_ltv) {
            if min > max {
                return Err(StudioError::InvalidConfig(format!(
                    "minLtv {min} is greater than maxLtv {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.date_range.map_or(true, |r| r.is_unbounded())
            && self.locations.is_empty()
            && self.trainers.is_empty()
            && self.conversion_status.is_empty()
            && self.retention_status.is_empty()
            && self.min_ltv.is_none()
            && self.max_ltv.is_none()
    }

    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        if let Some(range) = &self.date_range {
            if !range.is_unbounded() {
                // Undated records cannot be placed inside the range.
                let inside = match record.date() {
                    Some(dt) if record.kind().is_month_grained() => range.overlaps_month(dt.date()),
                    Some(dt) => range.contains(dt.date()),
                    None => false,
                };
                if !inside {
                    return false;
                }
            }
        }

        if !allows(&self.locations, record, Dimension::Location)
            || !allows(&self.trainers, record, Dimension::Trainer)
            || !allows(&self.conversion_status, record, Dimension::ConversionStatus)
            || !allows(&self.retention_status, record, Dimension::RetentionStatus)
        {
            return false;
        }

        if record.kind().has_ltv() {
            let ltv = record.measure(Measure::Ltv);
            let below = self.min_ltv.is_some_and(|min| ltv < min);
            let above = self.max_ltv.is_some_and(|max| ltv > max);
            if below || above {
                return false;
            }
        }

        true
    }

    /// Records that pass the predicate, in input order.
    pub fn apply<'a, R: Record>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|r| self.matches(*r)).collect()
    }
}

fn allows<R: Record + ?Sized>(allowed: &[String], record: &R, dim: Dimension) -> bool {
    if allowed.is_empty() || !record.kind().has_dimension(dim) {
        return true;
    }
    let value = record.dimension(dim).unwrap_or(UNKNOWN).trim();
    allowed.iter().any(|a| a.trim().eq_ignore_ascii_case(value))
}
