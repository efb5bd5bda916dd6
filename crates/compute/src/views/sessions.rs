use serde::{Deserialize, Serialize};

use studio_core::{Dimension, Measure, SessionRecord};

use crate::aggregate::group_tally;
use crate::derive::{average, percentage, round2};
use crate::key::GroupSpec;
use crate::rank::{sort_desc_by, sort_recent_first};

const SESSION_MEASURES: &[Measure] = &[
    Measure::Sessions,
    Measure::EmptySessions,
    Measure::Capacity,
    Measure::CheckedIn,
    Measure::Booked,
    Measure::LateCancelled,
    Measure::Revenue,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatsRow {
    pub key: String,
    pub sessions: u64,
    pub empty_sessions: u64,
    pub total_capacity: f64,
    pub total_checked_in: f64,
    pub total_booked: f64,
    pub total_late_cancelled: f64,
    pub total_revenue: f64,
    /// Checked-in over capacity, percent.
    pub fill_rate: f64,
    pub avg_attendance: f64,
    /// Late cancellations over bookings, percent.
    pub late_cancel_rate: f64,
    pub revenue_per_attendee: f64,
}

/// Attendance statistics grouped by `spec`. Date-keyed groupings come back
/// most recent first, all others by checked-in count descending.
pub fn session_stats_by<'a, I>(records: I, spec: &GroupSpec) -> Vec<SessionStatsRow>
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    let grouped = group_tally(records, spec, SESSION_MEASURES, &[]);

    let mut rows: Vec<SessionStatsRow> = grouped
        .into_iter()
        .map(|(key, t)| {
            let sessions = t.sum(Measure::Sessions);
            let capacity = t.sum(Measure::Capacity);
            let checked_in = t.sum(Measure::CheckedIn);
            let booked = t.sum(Measure::Booked);
            let late = t.sum(Measure::LateCancelled);
            let revenue = t.sum(Measure::Revenue);
            SessionStatsRow {
                key,
                sessions: sessions as u64,
                empty_sessions: t.sum(Measure::EmptySessions) as u64,
                total_capacity: capacity,
                total_checked_in: checked_in,
                total_booked: booked,
                total_late_cancelled: late,
                total_revenue: revenue,
                fill_rate: round2(percentage(checked_in, capacity)),
                avg_attendance: average(checked_in, sessions),
                late_cancel_rate: round2(percentage(late, booked)),
                revenue_per_attendee: average(revenue, checked_in),
            }
        })
        .collect();

    if spec.is_date_keyed() {
        sort_recent_first(&mut rows, |r| r.key.as_str());
    } else {
        sort_desc_by(&mut rows, |r| r.total_checked_in, |r| r.key.as_str());
    }
    rows
}

/// Class formats compared per trainer (`"Barre 57 - Priya Patel"`).
pub fn format_trainer_comparison<'a, I>(records: I) -> Vec<SessionStatsRow>
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    session_stats_by(
        records,
        &GroupSpec::composite(Dimension::ClassFormat, Dimension::Trainer),
    )
}
