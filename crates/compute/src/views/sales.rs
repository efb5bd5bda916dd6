use serde::{Deserialize, Serialize};

use studio_core::{Dimension, Identity, Measure, SaleRecord};

use crate::aggregate::group_tally;
use crate::derive::{average, percentage, round2, with_period_deltas};
use crate::key::GroupSpec;
use crate::rank::sort_desc_by;

const SALE_MEASURES: &[Measure] = &[Measure::Revenue, Measure::Vat];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySalesRow {
    pub month: String,
    pub transactions: u64,
    pub unique_members: usize,
    pub total_revenue: f64,
    pub total_vat: f64,
    pub avg_transaction_value: f64,
    pub avg_spend_per_member: f64,
    pub mom_change: f64,
    pub yoy_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesBreakdownRow {
    pub key: String,
    pub transactions: u64,
    pub unique_members: usize,
    pub total_revenue: f64,
    pub avg_transaction_value: f64,
    pub revenue_share: f64,
}

/// Revenue per month with MoM/YoY revenue change, most recent first.
/// Sales with malformed payment dates are left out.
pub fn monthly_sales<'a, I>(records: I) -> Vec<MonthlySalesRow>
where
    I: IntoIterator<Item = &'a SaleRecord>,
{
    let grouped = group_tally(
        records,
        &GroupSpec::field(Dimension::Month),
        SALE_MEASURES,
        &[Identity::Member],
    );

    let rows: Vec<MonthlySalesRow> = grouped
        .into_iter()
        .map(|(month, t)| {
            let revenue = t.sum(Measure::Revenue);
            let members = t.unique(Identity::Member);
            MonthlySalesRow {
                month,
                transactions: t.count,
                unique_members: members,
                total_revenue: revenue,
                total_vat: t.sum(Measure::Vat),
                avg_transaction_value: average(revenue, t.count as f64),
                avg_spend_per_member: average(revenue, members as f64),
                mom_change: 0.0,
                yoy_change: 0.0,
            }
        })
        .collect();

    with_period_deltas(rows, |r| r.month.as_str(), |r| r.total_revenue)
        .into_iter()
        .map(|(mut row, mom, yoy)| {
            row.mom_change = round2(mom);
            row.yoy_change = round2(yoy);
            row
        })
        .collect()
}

/// Revenue broken down by a text dimension, revenue descending.
pub fn sales_by<'a, I>(records: I, dim: Dimension) -> Vec<SalesBreakdownRow>
where
    I: IntoIterator<Item = &'a SaleRecord>,
{
    let grouped = group_tally(records, &GroupSpec::field(dim), SALE_MEASURES, &[Identity::Member]);
    let total: f64 = grouped.iter().map(|(_, t)| t.sum(Measure::Revenue)).sum();

    let mut rows: Vec<SalesBreakdownRow> = grouped
        .into_iter()
        .map(|(key, t)| {
            let revenue = t.sum(Measure::Revenue);
            SalesBreakdownRow {
                key,
                transactions: t.count,
                unique_members: t.unique(Identity::Member),
                total_revenue: revenue,
                avg_transaction_value: average(revenue, t.count as f64),
                revenue_share: round2(percentage(revenue, total)),
            }
        })
        .collect();

    sort_desc_by(&mut rows, |r| r.total_revenue, |r| r.key.as_str());
    rows
}
