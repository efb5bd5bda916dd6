use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use studio_core::{Dimension, LeadRecord, Measure};

use crate::aggregate::group_tally;
use crate::derive::{average, percentage, round2};
use crate::key::GroupSpec;
use crate::rank::sort_desc_by;

/// Denominator of a lead conversion rate. Views disagree on which one to
/// use, so each view picks its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionBasis {
    #[default]
    TotalLeads,
    TrialsCompleted,
}

impl fmt::Display for ConversionBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionBasis::TotalLeads => write!(f, "total-leads"),
            ConversionBasis::TrialsCompleted => write!(f, "trials-completed"),
        }
    }
}

impl FromStr for ConversionBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "total-leads" | "leads" => Ok(ConversionBasis::TotalLeads),
            "trials-completed" | "trials" => Ok(ConversionBasis::TrialsCompleted),
            other => Err(format!("unknown conversion basis: {other}")),
        }
    }
}

const LEAD_MEASURES: &[Measure] = &[
    Measure::Converted,
    Measure::TrialsCompleted,
    Measure::Ltv,
    Measure::Visits,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFunnelRow {
    pub key: String,
    pub leads: u64,
    pub trials_completed: u64,
    pub converted: u64,
    pub basis: ConversionBasis,
    pub conversion_rate: f64,
    /// Trials completed over leads, percent.
    pub trial_rate: f64,
    pub total_ltv: f64,
    /// LTV per converted lead.
    pub avg_ltv: f64,
    pub avg_visits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStageRow {
    pub stage: String,
    pub leads: u64,
    pub share: f64,
}

/// Lead funnel grouped by `spec` (source, associate, center ...), leads descending.
pub fn lead_funnel_by<'a, I>(
    records: I,
    spec: &GroupSpec,
    basis: ConversionBasis,
) -> Vec<LeadFunnelRow>
where
    I: IntoIterator<Item = &'a LeadRecord>,
{
    let grouped = group_tally(records, spec, LEAD_MEASURES, &[]);

    let mut rows: Vec<LeadFunnelRow> = grouped
        .into_iter()
        .map(|(key, t)| {
            let leads = t.count as f64;
            let converted = t.sum(Measure::Converted);
            let trials = t.sum(Measure::TrialsCompleted);
            let ltv = t.sum(Measure::Ltv);
            let denominator = match basis {
                ConversionBasis::TotalLeads => leads,
                ConversionBasis::TrialsCompleted => trials,
            };
            LeadFunnelRow {
                key,
                leads: t.count,
                trials_completed: trials as u64,
                converted: converted as u64,
                basis,
                conversion_rate: round2(percentage(converted, denominator)),
                trial_rate: round2(percentage(trials, leads)),
                total_ltv: ltv,
                avg_ltv: average(ltv, converted),
                avg_visits: average(t.sum(Measure::Visits), leads),
            }
        })
        .collect();

    sort_desc_by(&mut rows, |r| r.leads as f64, |r| r.key.as_str());
    rows
}

/// Lead count per pipeline stage, largest stage first.
pub fn lead_stage_funnel<'a, I>(records: I) -> Vec<LeadStageRow>
where
    I: IntoIterator<Item = &'a LeadRecord>,
{
    let grouped = group_tally(records, &GroupSpec::field(Dimension::Stage), &[], &[]);
    let total: u64 = grouped.iter().map(|(_, t)| t.count).sum();

    let mut rows: Vec<LeadStageRow> = grouped
        .into_iter()
        .map(|(stage, t)| LeadStageRow {
            stage,
            leads: t.count,
            share: round2(percentage(t.count as f64, total as f64)),
        })
        .collect();

    sort_desc_by(&mut rows, |r| r.leads as f64, |r| r.stage.as_str());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(source: &str, stage: &str, converted: bool, trial: Option<&str>) -> LeadRecord {
        LeadRecord {
            source: Some(source.to_string()),
            stage: Some(stage.to_string()),
            conversion_status: Some(if converted { "Converted" } else { "Pending" }.to_string()),
            trial_status: trial.map(String::from),
            ltv: converted.then_some(3000.0),
            ..Default::default()
        }
    }

    fn instagram_batch() -> Vec<LeadRecord> {
        (0..10)
            .map(|i| lead("Instagram", "Trial Booked", i < 3, (i < 5).then_some("Trial Completed")))
            .collect()
    }

    #[test]
    fn instagram_conversion_over_total_leads() {
        let rows = lead_funnel_by(
            &instagram_batch(),
            &GroupSpec::field(Dimension::Source),
            ConversionBasis::TotalLeads,
        );
        assert_eq!(rows[0].key, "Instagram");
        assert_eq!(rows[0].leads, 10);
        assert_eq!(rows[0].converted, 3);
        assert_eq!(rows[0].conversion_rate, 30.0);
        assert_eq!(rows[0].trial_rate, 50.0);
        assert_eq!(rows[0].avg_ltv, 3000.0);
    }

    #[test]
    fn same_leads_over_completed_trials() {
        let rows = lead_funnel_by(
            &instagram_batch(),
            &GroupSpec::field(Dimension::Source),
            ConversionBasis::TrialsCompleted,
        );
        assert_eq!(rows[0].trials_completed, 5);
        assert_eq!(rows[0].conversion_rate, 60.0);
    }

    #[test]
    fn no_trials_means_zero_not_nan() {
        let leads = vec![lead("Walk-in", "New", true, None)];
        let rows = lead_funnel_by(
            &leads,
            &GroupSpec::field(Dimension::Source),
            ConversionBasis::TrialsCompleted,
        );
        assert_eq!(rows[0].conversion_rate, 0.0);
    }

    #[test]
    fn stage_funnel_order() {
        let mut leads = instagram_batch();
        leads.push(lead("Website", "Converted", true, None));
        leads.push(lead("Website", "Converted", true, None));
        let rows = lead_stage_funnel(&leads);
        assert_eq!(rows[0].stage, "Trial Booked");
        assert_eq!(rows[0].leads, 10);
        assert_eq!(rows[1].stage, "Converted");
        assert_eq!(rows[1].share, 16.67);
    }

    #[test]
    fn basis_parsing() {
        assert_eq!(
            "trials-completed".parse::<ConversionBasis>().unwrap(),
            ConversionBasis::TrialsCompleted
        );
        assert_eq!("Total-Leads".parse::<ConversionBasis>().unwrap(), ConversionBasis::TotalLeads);
        assert!("members".parse::<ConversionBasis>().is_err());
    }
}
