//! Group key extraction.
//!
//! A key is either one dimension (`"2024-03"`, `"Bandra West"`) or two
//! dimensions joined by a separator (`"Barre 57 - Priya Patel"`). Text
//! dimensions never fail: when the record's fallback chain comes up empty
//! the key is [`UNKNOWN`]. Date dimensions fail on malformed dates, which
//! drops the record from that grouping only.

use serde::{Deserialize, Serialize};

use studio_core::{month_key, year_key, Dimension, Record, UNKNOWN};

pub const DEFAULT_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupSpec {
    Field(Dimension),
    Composite {
        first: Dimension,
        second: Dimension,
        separator: String,
    },
}

impl GroupSpec {
    pub fn field(dim: Dimension) -> Self {
        GroupSpec::Field(dim)
    }

    /// Two dimensions joined with `" - "`.
    pub fn composite(first: Dimension, second: Dimension) -> Self {
        GroupSpec::Composite {
            first,
            second,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// True when any part of the key comes from the record's date.
    pub fn is_date_keyed(&self) -> bool {
        match self {
            GroupSpec::Field(d) => d.is_date(),
            GroupSpec::Composite { first, second, .. } => first.is_date() || second.is_date(),
        }
    }
}

/// Resolve one dimension of a record to its key component.
pub fn dimension_value<R: Record + ?Sized>(record: &R, dim: Dimension) -> Option<String> {
    match dim {
        Dimension::Month => record.date().map(|d| month_key(&d)),
        Dimension::Year => record.date().map(|d| year_key(&d)),
        _ => Some(record.dimension(dim).unwrap_or(UNKNOWN).to_string()),
    }
}

pub fn extract_key<R: Record + ?Sized>(record: &R, spec: &GroupSpec) -> Option<String> {
    match spec {
        GroupSpec::Field(dim) => dimension_value(record, *dim),
        GroupSpec::Composite {
            first,
            second,
            separator,
        } => {
            let a = dimension_value(record, *first)?;
            let b = dimension_value(record, *second)?;
            Some(format!("{a}{separator}{b}"))
        }
    }
}
