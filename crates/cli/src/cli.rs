use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use studio_compute::{ConversionBasis, ViewKind};

/// Studio analytics reports.
///
/// Loads the JSON record exports, applies the shared filter, and prints one
/// view as JSON on stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "studio-report", version, about)]
pub struct CliArgs {
    /// View to produce, e.g. monthly-sales or leads-by-source
    #[arg(long, value_parser = parse_view, required_unless_present = "list_views")]
    pub view: Option<ViewKind>,

    /// List every view name and exit
    #[arg(long)]
    pub list_views: bool,

    /// Directory holding the per-kind JSON exports (overrides DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Single file of kind-tagged records, used instead of --data-dir
    #[arg(long, conflicts_with = "data_dir")]
    pub records: Option<PathBuf>,

    /// Filter file (.json, or YAML otherwise). Flags below are merged on top.
    #[arg(long, env = "STUDIO_FILTER")]
    pub filter: Option<PathBuf>,

    /// Inclusive start date, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Inclusive end date, YYYY-MM-DD
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Keep only these locations (repeatable)
    #[arg(long = "location")]
    pub locations: Vec<String>,

    /// Keep only these trainers (repeatable)
    #[arg(long = "trainer")]
    pub trainers: Vec<String>,

    /// Keep only these conversion statuses (repeatable)
    #[arg(long)]
    pub conversion_status: Vec<String>,

    /// Keep only these retention statuses (repeatable)
    #[arg(long)]
    pub retention_status: Vec<String>,

    #[arg(long)]
    pub min_ltv: Option<f64>,

    #[arg(long)]
    pub max_ltv: Option<f64>,

    /// Rows kept by top/bottom views (overrides REPORT_TOP_N)
    #[arg(long)]
    pub top: Option<usize>,

    /// Lead conversion denominator: total-leads or trials-completed
    #[arg(long, value_parser = parse_basis)]
    pub basis: Option<ConversionBasis>,

    /// Minimum late cancellations for repeat-cancellers
    #[arg(long)]
    pub repeat_min: Option<usize>,

    /// Trainer for the trainer-monthly view
    #[arg(long)]
    pub trainer_name: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

fn parse_view(s: &str) -> Result<ViewKind, String> {
    s.parse::<ViewKind>().map_err(|e| e.to_string())
}

fn parse_basis(s: &str) -> Result<ConversionBasis, String> {
    s.parse::<ConversionBasis>()
}
