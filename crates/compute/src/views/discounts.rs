use serde::{Deserialize, Serialize};

use studio_core::{Measure, Record, SaleRecord};

use crate::aggregate::group_fold;
use crate::derive::{average, percentage, round2};
use crate::key::{extract_key, GroupSpec};
use crate::rank::{sort_desc_by, sort_recent_first};

#[derive(Debug, Default)]
struct DiscountAcc {
    transactions: u64,
    discounted: u64,
    total_discount: f64,
    total_revenue: f64,
}

impl DiscountAcc {
    fn add(&mut self, sale: &SaleRecord) {
        let discount = sale.measure(Measure::Discount);
        self.transactions += 1;
        self.total_revenue += sale.measure(Measure::Revenue);
        if discount > 0.0 {
            self.discounted += 1;
            self.total_discount += discount;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRow {
    pub key: String,
    pub transactions: u64,
    pub discounted_transactions: u64,
    pub total_discount: f64,
    pub total_revenue: f64,
    /// Mean discount across discounted transactions only.
    pub avg_discount: f64,
    /// Discount as a share of list value (revenue + discount).
    pub discount_rate: f64,
    /// Share of transactions that carried any discount.
    pub discount_penetration: f64,
}

/// Discount summary grouped by `spec`. Date-keyed groupings come back most
/// recent first, all others by total discount descending.
pub fn discount_summary_by<'a, I>(records: I, spec: &GroupSpec) -> Vec<DiscountRow>
where
    I: IntoIterator<Item = &'a SaleRecord>,
{
    let grouped = group_fold(
        records,
        |s: &SaleRecord| extract_key(s, spec),
        |acc: &mut DiscountAcc, s: &SaleRecord| acc.add(s),
    );

    let mut rows: Vec<DiscountRow> = grouped
        .into_iter()
        .map(|(key, a)| DiscountRow {
            key,
            transactions: a.transactions,
            discounted_transactions: a.discounted,
            total_discount: a.total_discount,
            total_revenue: a.total_revenue,
            avg_discount: average(a.total_discount, a.discounted as f64),
            discount_rate: round2(percentage(a.total_discount, a.total_revenue + a.total_discount)),
            discount_penetration: round2(percentage(a.discounted as f64, a.transactions as f64)),
        })
        .collect();

    if spec.is_date_keyed() {
        sort_recent_first(&mut rows, |r| r.key.as_str());
    } else {
        sort_desc_by(&mut rows, |r| r.total_discount, |r| r.key.as_str());
    }
    rows
}
