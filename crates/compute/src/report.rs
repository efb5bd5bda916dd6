//! Report engine: filter, run one view, wrap its rows with run metadata.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use studio_core::config::ReportConfig;
use studio_core::{
    CancellationRecord, ClientRecord, Dimension, LeadRecord, PayrollRecord, Record, RecordKind,
    Result, SaleRecord, SessionRecord, StudioError,
};

use crate::dataset::Dataset;
use crate::filter::FilterConfig;
use crate::key::GroupSpec;
use crate::views::cancellations::{late_cancellations_by, repeat_cancellers};
use crate::views::conversion::client_conversion_by;
use crate::views::discounts::discount_summary_by;
use crate::views::leads::{lead_funnel_by, lead_stage_funnel, ConversionBasis};
use crate::views::sales::{monthly_sales, sales_by};
use crate::views::sessions::{format_trainer_comparison, session_stats_by};
use crate::views::trainers::{
    bottom_trainers, top_trainers, trainer_comparison, trainer_monthly,
    trainers_needing_improvement,
};

/// Every view the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    MonthlySales,
    SalesByProduct,
    SalesByCategory,
    SalesByLocation,
    SalesByPaymentMethod,
    SalesBySeller,
    MonthlyDiscounts,
    DiscountsByProduct,
    DiscountsByLocation,
    MonthlySessions,
    SessionsByTrainer,
    SessionsByLocation,
    SessionsByFormat,
    FormatTrainerComparison,
    MonthlyLateCancellations,
    LateCancellationsByLocation,
    LateCancellationsByClass,
    LateCancellationsByTrainer,
    RepeatCancellers,
    MonthlyConversion,
    ConversionByLocation,
    ConversionByTrainer,
    LeadsBySource,
    LeadsByAssociate,
    LeadsByLocation,
    LeadStages,
    TrainerLeaderboard,
    TopTrainers,
    BottomTrainers,
    TrainersNeedingImprovement,
    TrainerMonthly,
}

impl ViewKind {
    pub const ALL: &'static [ViewKind] = &[
        ViewKind::MonthlySales,
        ViewKind::SalesByProduct,
        ViewKind::SalesByCategory,
        ViewKind::SalesByLocation,
        ViewKind::SalesByPaymentMethod,
        ViewKind::SalesBySeller,
        ViewKind::MonthlyDiscounts,
        ViewKind::DiscountsByProduct,
        ViewKind::DiscountsByLocation,
        ViewKind::MonthlySessions,
        ViewKind::SessionsByTrainer,
        ViewKind::SessionsByLocation,
        ViewKind::SessionsByFormat,
        ViewKind::FormatTrainerComparison,
        ViewKind::MonthlyLateCancellations,
        ViewKind::LateCancellationsByLocation,
        ViewKind::LateCancellationsByClass,
        ViewKind::LateCancellationsByTrainer,
        ViewKind::RepeatCancellers,
        ViewKind::MonthlyConversion,
        ViewKind::ConversionByLocation,
        ViewKind::ConversionByTrainer,
        ViewKind::LeadsBySource,
        ViewKind::LeadsByAssociate,
        ViewKind::LeadsByLocation,
        ViewKind::LeadStages,
        ViewKind::TrainerLeaderboard,
        ViewKind::TopTrainers,
        ViewKind::BottomTrainers,
        ViewKind::TrainersNeedingImprovement,
        ViewKind::TrainerMonthly,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ViewKind::MonthlySales => "monthly-sales",
            ViewKind::SalesByProduct => "sales-by-product",
            ViewKind::SalesByCategory => "sales-by-category",
            ViewKind::SalesByLocation => "sales-by-location",
            ViewKind::SalesByPaymentMethod => "sales-by-payment-method",
            ViewKind::SalesBySeller => "sales-by-seller",
            ViewKind::MonthlyDiscounts => "monthly-discounts",
            ViewKind::DiscountsByProduct => "discounts-by-product",
            ViewKind::DiscountsByLocation => "discounts-by-location",
            ViewKind::MonthlySessions => "monthly-sessions",
            ViewKind::SessionsByTrainer => "sessions-by-trainer",
            ViewKind::SessionsByLocation => "sessions-by-location",
            ViewKind::SessionsByFormat => "sessions-by-format",
            ViewKind::FormatTrainerComparison => "format-trainer-comparison",
            ViewKind::MonthlyLateCancellations => "monthly-late-cancellations",
            ViewKind::LateCancellationsByLocation => "late-cancellations-by-location",
            ViewKind::LateCancellationsByClass => "late-cancellations-by-class",
            ViewKind::LateCancellationsByTrainer => "late-cancellations-by-trainer",
            ViewKind::RepeatCancellers => "repeat-cancellers",
            ViewKind::MonthlyConversion => "monthly-conversion",
            ViewKind::ConversionByLocation => "conversion-by-location",
            ViewKind::ConversionByTrainer => "conversion-by-trainer",
            ViewKind::LeadsBySource => "leads-by-source",
            ViewKind::LeadsByAssociate => "leads-by-associate",
            ViewKind::LeadsByLocation => "leads-by-location",
            ViewKind::LeadStages => "lead-stages",
            ViewKind::TrainerLeaderboard => "trainer-leaderboard",
            ViewKind::TopTrainers => "top-trainers",
            ViewKind::BottomTrainers => "bottom-trainers",
            ViewKind::TrainersNeedingImprovement => "trainers-needing-improvement",
            ViewKind::TrainerMonthly => "trainer-monthly",
        }
    }

    /// The record set this view reads.
    pub fn record_kind(&self) -> RecordKind {
        use ViewKind::*;
        match self {
            MonthlySales | SalesByProduct | SalesByCategory | SalesByLocation
            | SalesByPaymentMethod | SalesBySeller | MonthlyDiscounts | DiscountsByProduct
            | DiscountsByLocation => RecordKind::Sale,
            MonthlySessions | SessionsByTrainer | SessionsByLocation | SessionsByFormat
            | FormatTrainerComparison => RecordKind::Session,
            MonthlyLateCancellations
            | LateCancellationsByLocation
            | LateCancellationsByClass
            | LateCancellationsByTrainer
            | RepeatCancellers => RecordKind::Cancellation,
            MonthlyConversion | ConversionByLocation | ConversionByTrainer => RecordKind::Client,
            LeadsBySource | LeadsByAssociate | LeadsByLocation | LeadStages => RecordKind::Lead,
            TrainerLeaderboard | TopTrainers | BottomTrainers | TrainersNeedingImprovement
            | TrainerMonthly => RecordKind::Payroll,
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewKind {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ViewKind::ALL
            .iter()
            .copied()
            .find(|v| v.name() == wanted)
            .ok_or_else(|| StudioError::UnknownView(s.to_string()))
    }
}

/// Per-run knobs that are not filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOptions {
    pub top_n: usize,
    pub basis: ConversionBasis,
    pub repeat_min: usize,
    /// Required by `trainer-monthly`.
    pub trainer: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default()).unwrap_or(Self {
            top_n: 10,
            basis: ConversionBasis::TotalLeads,
            repeat_min: 3,
            trainer: None,
        })
    }
}

impl ReportOptions {
    pub fn from_config(cfg: &ReportConfig) -> Result<Self> {
        let basis = cfg
            .lead_conversion_basis
            .parse::<ConversionBasis>()
            .map_err(StudioError::InvalidConfig)?;
        Ok(Self {
            top_n: cfg.top_n,
            basis,
            repeat_min: cfg.repeat_canceller_min,
            trainer: None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub view: ViewKind,
    pub record_kind: RecordKind,
    pub input_records: usize,
    pub filtered_records: usize,
    pub rows: usize,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub rows: Vec<Value>,
}

/// Stateless: every run builds and drops its own accumulators.
pub struct ReportEngine;

impl ReportEngine {
    pub fn run(
        dataset: &Dataset,
        view: ViewKind,
        filter: &FilterConfig,
        opts: &ReportOptions,
    ) -> Result<Report> {
        let start = Instant::now();

        let (input_records, filtered_records, rows) = match view.record_kind() {
            RecordKind::Sale => run_on(&dataset.sales, filter, |r| sales_view(view, r)),
            RecordKind::Session => run_on(&dataset.sessions, filter, |r| session_view(view, r)),
            RecordKind::Cancellation => {
                run_on(&dataset.cancellations, filter, |r| cancellation_view(view, r, opts))
            }
            RecordKind::Client => run_on(&dataset.clients, filter, |r| client_view(view, r)),
            RecordKind::Lead => run_on(&dataset.leads, filter, |r| lead_view(view, r, opts)),
            RecordKind::Payroll => {
                run_on(&dataset.payroll, filter, |r| payroll_view(view, r, opts))
            }
        }?;

        let elapsed = start.elapsed();
        info!(
            view = %view,
            input = input_records,
            filtered = filtered_records,
            rows = rows.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "report generated"
        );

        Ok(Report {
            meta: ReportMeta {
                view,
                record_kind: view.record_kind(),
                input_records,
                filtered_records,
                rows: rows.len(),
                generated_at: Utc::now(),
                elapsed_ms: elapsed.as_millis() as u64,
            },
            rows,
        })
    }
}

fn run_on<'a, R, F>(
    records: &'a [R],
    filter: &FilterConfig,
    view: F,
) -> Result<(usize, usize, Vec<Value>)>
where
    R: Record,
    F: FnOnce(Vec<&'a R>) -> Result<Vec<Value>>,
{
    let filtered = filter.apply(records);
    let kept = filtered.len();
    if kept < records.len() {
        debug!(dropped = records.len() - kept, "records excluded by filter");
    }
    Ok((records.len(), kept, view(filtered)?))
}

fn to_values<T: Serialize>(rows: Vec<T>) -> Result<Vec<Value>> {
    rows.iter()
        .map(|r| serde_json::to_value(r).map_err(StudioError::from))
        .collect()
}

fn wrong_kind(view: ViewKind, kind: RecordKind) -> StudioError {
    StudioError::UnknownView(format!("{view} does not read {kind} records"))
}

fn sales_view(view: ViewKind, records: Vec<&SaleRecord>) -> Result<Vec<Value>> {
    match view {
        ViewKind::MonthlySales => to_values(monthly_sales(records)),
        ViewKind::SalesByProduct => to_values(sales_by(records, Dimension::Product)),
        ViewKind::SalesByCategory => to_values(sales_by(records, Dimension::Category)),
        ViewKind::SalesByLocation => to_values(sales_by(records, Dimension::Location)),
        ViewKind::SalesByPaymentMethod => to_values(sales_by(records, Dimension::PaymentMethod)),
        ViewKind::SalesBySeller => to_values(sales_by(records, Dimension::SoldBy)),
        ViewKind::MonthlyDiscounts => to_values(discount_summary_by(
            records,
            &GroupSpec::field(Dimension::Month),
        )),
        ViewKind::DiscountsByProduct => to_values(discount_summary_by(
            records,
            &GroupSpec::field(Dimension::Product),
        )),
        ViewKind::DiscountsByLocation => to_values(discount_summary_by(
            records,
            &GroupSpec::field(Dimension::Location),
        )),
        other => Err(wrong_kind(other, RecordKind::Sale)),
    }
}

fn session_view(view: ViewKind, records: Vec<&SessionRecord>) -> Result<Vec<Value>> {
    let spec = match view {
        ViewKind::MonthlySessions => GroupSpec::field(Dimension::Month),
        ViewKind::SessionsByTrainer => GroupSpec::field(Dimension::Trainer),
        ViewKind::SessionsByLocation => GroupSpec::field(Dimension::Location),
        ViewKind::SessionsByFormat => GroupSpec::field(Dimension::ClassFormat),
        ViewKind::FormatTrainerComparison => return to_values(format_trainer_comparison(records)),
        other => return Err(wrong_kind(other, RecordKind::Session)),
    };
    to_values(session_stats_by(records, &spec))
}

fn cancellation_view(
    view: ViewKind,
    records: Vec<&CancellationRecord>,
    opts: &ReportOptions,
) -> Result<Vec<Value>> {
    let spec = match view {
        ViewKind::MonthlyLateCancellations => GroupSpec::field(Dimension::Month),
        ViewKind::LateCancellationsByLocation => GroupSpec::field(Dimension::Location),
        ViewKind::LateCancellationsByClass => GroupSpec::field(Dimension::ClassFormat),
        ViewKind::LateCancellationsByTrainer => GroupSpec::field(Dimension::Trainer),
        ViewKind::RepeatCancellers => return to_values(repeat_cancellers(records, opts.repeat_min)),
        other => return Err(wrong_kind(other, RecordKind::Cancellation)),
    };
    to_values(late_cancellations_by(records, &spec))
}

fn client_view(view: ViewKind, records: Vec<&ClientRecord>) -> Result<Vec<Value>> {
    let spec = match view {
        ViewKind::MonthlyConversion => GroupSpec::field(Dimension::Month),
        ViewKind::ConversionByLocation => GroupSpec::field(Dimension::Location),
        ViewKind::ConversionByTrainer => GroupSpec::field(Dimension::Trainer),
        other => return Err(wrong_kind(other, RecordKind::Client)),
    };
    to_values(client_conversion_by(records, &spec))
}

fn lead_view(
    view: ViewKind,
    records: Vec<&LeadRecord>,
    opts: &ReportOptions,
) -> Result<Vec<Value>> {
    let spec = match view {
        ViewKind::LeadsBySource => GroupSpec::field(Dimension::Source),
        ViewKind::LeadsByAssociate => GroupSpec::field(Dimension::Associate),
        ViewKind::LeadsByLocation => GroupSpec::field(Dimension::Location),
        ViewKind::LeadStages => return to_values(lead_stage_funnel(records)),
        other => return Err(wrong_kind(other, RecordKind::Lead)),
    };
    to_values(lead_funnel_by(records, &spec, opts.basis))
}

fn payroll_view(
    view: ViewKind,
    records: Vec<&PayrollRecord>,
    opts: &ReportOptions,
) -> Result<Vec<Value>> {
    if view == ViewKind::TrainerMonthly {
        let trainer = opts.trainer.as_deref().ok_or_else(|| {
            StudioError::InvalidInput("trainer-monthly needs a trainer name".to_string())
        })?;
        return to_values(trainer_monthly(records, trainer));
    }

    let ranked = trainer_comparison(records);
    match view {
        ViewKind::TrainerLeaderboard => to_values(ranked),
        ViewKind::TopTrainers => to_values(top_trainers(&ranked, opts.top_n)),
        ViewKind::BottomTrainers => to_values(bottom_trainers(&ranked, opts.top_n)),
        ViewKind::TrainersNeedingImprovement => {
            to_values(trainers_needing_improvement(&ranked, opts.top_n))
        }
        other => Err(wrong_kind(other, RecordKind::Payroll)),
    }
}
