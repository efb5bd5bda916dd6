//! Trainer comparisons built from monthly payroll rows.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use studio_core::{month_key, Dimension, Measure, PayrollRecord, Record};

use crate::aggregate::{group_fold, group_tally, Tally};
use crate::derive::{average, percentage, round2, with_period_deltas};
use crate::key::{extract_key, GroupSpec};
use crate::rank::{bottom_n, bottom_n_ascending, sort_desc_by, top_n};

const PAYROLL_MEASURES: &[Measure] = &[
    Measure::Sessions,
    Measure::EmptySessions,
    Measure::Customers,
    Measure::Revenue,
    Measure::NewCustomers,
    Measure::Converted,
    Measure::Retained,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerRow {
    pub trainer: String,
    /// Locations in first-seen order, comma separated.
    pub location: String,
    pub months: usize,
    pub total_sessions: f64,
    pub empty_sessions: f64,
    pub total_customers: f64,
    pub total_revenue: f64,
    pub avg_customers_per_session: f64,
    pub empty_session_rate: f64,
    /// Converted over new customers, percent.
    pub conversion_rate: f64,
    /// Retained over new customers, percent.
    pub retention_rate: f64,
    pub revenue_per_session: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerMonthRow {
    pub month: String,
    pub sessions: f64,
    pub customers: f64,
    pub revenue: f64,
    pub avg_customers_per_session: f64,
    pub mom_revenue_change: f64,
}

#[derive(Debug, Default)]
struct TrainerAcc {
    tally: Tally,
    locations: Vec<String>,
    months: BTreeSet<String>,
}

/// One row per trainer, total revenue descending.
pub fn trainer_comparison<'a, I>(records: I) -> Vec<TrainerRow>
where
    I: IntoIterator<Item = &'a PayrollRecord>,
{
    let trainer_spec = GroupSpec::field(Dimension::Trainer);
    let location_spec = GroupSpec::field(Dimension::Location);

    let grouped = group_fold(
        records,
        |p: &PayrollRecord| extract_key(p, &trainer_spec),
        |acc: &mut TrainerAcc, p: &PayrollRecord| {
            acc.tally.add(p, PAYROLL_MEASURES, &[]);
            if let Some(loc) = extract_key(p, &location_spec) {
                if !acc.locations.contains(&loc) {
                    acc.locations.push(loc);
                }
            }
            if let Some(dt) = p.date() {
                acc.months.insert(month_key(&dt));
            }
        },
    );

    let mut rows: Vec<TrainerRow> = grouped
        .into_iter()
        .map(|(trainer, acc)| {
            let t = &acc.tally;
            let sessions = t.sum(Measure::Sessions);
            let customers = t.sum(Measure::Customers);
            let revenue = t.sum(Measure::Revenue);
            let new_customers = t.sum(Measure::NewCustomers);
            TrainerRow {
                trainer,
                location: acc.locations.join(", "),
                months: acc.months.len(),
                total_sessions: sessions,
                empty_sessions: t.sum(Measure::EmptySessions),
                total_customers: customers,
                total_revenue: revenue,
                avg_customers_per_session: round2(average(customers, sessions)),
                empty_session_rate: round2(percentage(t.sum(Measure::EmptySessions), sessions)),
                conversion_rate: round2(percentage(t.sum(Measure::Converted), new_customers)),
                retention_rate: round2(percentage(t.sum(Measure::Retained), new_customers)),
                revenue_per_session: average(revenue, sessions),
            }
        })
        .collect();

    sort_desc_by(&mut rows, |r| r.total_revenue, |r| r.trainer.as_str());
    rows
}

pub fn top_trainers(ranked: &[TrainerRow], n: usize) -> Vec<TrainerRow> {
    top_n(ranked, n)
}

/// Tail of the revenue ranking.
pub fn bottom_trainers(ranked: &[TrainerRow], n: usize) -> Vec<TrainerRow> {
    bottom_n(ranked, n)
}

/// Lowest average class size first.
pub fn trainers_needing_improvement(ranked: &[TrainerRow], n: usize) -> Vec<TrainerRow> {
    bottom_n_ascending(ranked, "avgCustomersPerSession", n)
}

/// Month-by-month figures for one trainer, most recent first.
pub fn trainer_monthly<'a, I>(records: I, trainer: &str) -> Vec<TrainerMonthRow>
where
    I: IntoIterator<Item = &'a PayrollRecord>,
{
    let wanted = trainer.trim();
    let mine = records.into_iter().filter(|p| {
        p.dimension(Dimension::Trainer)
            .is_some_and(|t| t.eq_ignore_ascii_case(wanted))
    });

    let grouped = group_tally(
        mine,
        &GroupSpec::field(Dimension::Month),
        &[Measure::Sessions, Measure::Customers, Measure::Revenue],
        &[],
    );

    let rows: Vec<TrainerMonthRow> = grouped
        .into_iter()
        .map(|(month, t)| {
            let sessions = t.sum(Measure::Sessions);
            let customers = t.sum(Measure::Customers);
            TrainerMonthRow {
                month,
                sessions,
                customers,
                revenue: t.sum(Measure::Revenue),
                avg_customers_per_session: round2(average(customers, sessions)),
                mom_revenue_change: 0.0,
            }
        })
        .collect();

    with_period_deltas(rows, |r| r.month.as_str(), |r| r.revenue)
        .into_iter()
        .map(|(mut row, mom, _)| {
            row.mom_revenue_change = round2(mom);
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payroll(
        name: &str,
        loc: &str,
        month: &str,
        sessions: f64,
        empty: f64,
        customers: f64,
        paid: f64,
    ) -> PayrollRecord {
        PayrollRecord {
            teacher_name: Some(name.to_string()),
            location: Some(loc.to_string()),
            month_year: Some(month.to_string()),
            total_sessions: Some(sessions),
            empty_sessions: Some(empty),
            total_customers: Some(customers),
            total_paid: Some(paid),
            new_customers: Some(10.0),
            converted_customers: Some(4.0),
            retained_customers: Some(2.0),
            ..Default::default()
        }
    }

    fn sample() -> Vec<PayrollRecord> {
        vec![
            payroll("Priya", "Bandra West", "Jan-2024", 20.0, 2.0, 200.0, 50000.0),
            payroll("Priya", "Kemps Corner", "Feb-2024", 20.0, 0.0, 240.0, 60000.0),
            payroll("Anisha", "Bandra West", "Jan-2024", 10.0, 5.0, 40.0, 20000.0),
            payroll("Rohan", "Kemps Corner", "Feb-2024", 16.0, 0.0, 192.0, 30000.0),
        ]
    }

    #[test]
    fn comparison_totals_and_rates() {
        let rows = trainer_comparison(&sample());
        let names: Vec<&str> = rows.iter().map(|r| r.trainer.as_str()).collect();
        assert_eq!(names, vec!["Priya", "Rohan", "Anisha"]);

        let priya = &rows[0];
        assert_eq!(priya.months, 2);
        assert_eq!(priya.location, "Bandra West, Kemps Corner");
        assert_eq!(priya.total_sessions, 40.0);
        assert_eq!(priya.avg_customers_per_session, 11.0);
        assert_eq!(priya.empty_session_rate, 5.0);
        assert_eq!(priya.conversion_rate, 40.0);
        assert_eq!(priya.retention_rate, 20.0);
        assert_eq!(priya.revenue_per_session, 2750.0);
    }

    #[test]
    fn bottom_is_tail_but_improvement_is_resorted() {
        let ranked = trainer_comparison(&sample());
        assert_eq!(top_trainers(&ranked, 1)[0].trainer, "Priya");

        let bottom: Vec<String> =
            bottom_trainers(&ranked, 2).into_iter().map(|r| r.trainer).collect();
        assert_eq!(bottom, vec!["Rohan", "Anisha"]);

        // Anisha averages 4 per class, Priya 11, Rohan 12.
        let weak: Vec<String> = trainers_needing_improvement(&ranked, 2)
            .into_iter()
            .map(|r| r.trainer)
            .collect();
        assert_eq!(weak, vec!["Anisha", "Priya"]);
    }

    #[test]
    fn monthly_for_one_trainer() {
        let rows = trainer_monthly(&sample(), "priya");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month, "2024-02");
        assert_eq!(rows[0].mom_revenue_change, 20.0);
        assert_eq!(rows[1].mom_revenue_change, 0.0);
    }
}
