use serde::{Deserialize, Serialize};

use studio_core::{ClientRecord, Identity, Measure};

use crate::aggregate::group_tally;
use crate::derive::{average, percentage, round2};
use crate::key::GroupSpec;
use crate::rank::{sort_desc_by, sort_recent_first};

const CLIENT_MEASURES: &[Measure] = &[
    Measure::NewCustomers,
    Measure::Converted,
    Measure::Retained,
    Measure::Ltv,
    Measure::Visits,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConversionRow {
    pub key: String,
    pub total_clients: u64,
    pub unique_members: usize,
    pub new_members: u64,
    pub converted: u64,
    pub retained: u64,
    /// Converted over new members, percent.
    pub conversion_rate: f64,
    /// Retained over converted, percent.
    pub retention_rate: f64,
    pub total_ltv: f64,
    pub avg_ltv: f64,
    pub avg_visits_post_trial: f64,
}

/// New-client conversion and retention grouped by `spec`. Date-keyed
/// groupings come back most recent first, all others by client count.
pub fn client_conversion_by<'a, I>(records: I, spec: &GroupSpec) -> Vec<ClientConversionRow>
where
    I: IntoIterator<Item = &'a ClientRecord>,
{
    let grouped = group_tally(records, spec, CLIENT_MEASURES, &[Identity::Member]);

    let mut rows: Vec<ClientConversionRow> = grouped
        .into_iter()
        .map(|(key, t)| {
            let new_members = t.sum(Measure::NewCustomers);
            let converted = t.sum(Measure::Converted);
            let retained = t.sum(Measure::Retained);
            let ltv = t.sum(Measure::Ltv);
            ClientConversionRow {
                key,
                total_clients: t.count,
                unique_members: t.unique(Identity::Member),
                new_members: new_members as u64,
                converted: converted as u64,
                retained: retained as u64,
                conversion_rate: round2(percentage(converted, new_members)),
                retention_rate: round2(percentage(retained, converted)),
                total_ltv: ltv,
                avg_ltv: average(ltv, t.count as f64),
                avg_visits_post_trial: average(t.sum(Measure::Visits), t.count as f64),
            }
        })
        .collect();

    if spec.is_date_keyed() {
        sort_recent_first(&mut rows, |r| r.key.as_str());
    } else {
        sort_desc_by(&mut rows, |r| r.total_clients as f64, |r| r.key.as_str());
    }
    rows
}
