//! End-to-end report runs against the sample exports in `data/sample/`.

use serde_json::Value;

use studio_compute::{
    ConversionBasis, Dataset, FilterConfig, Report, ReportEngine, ReportOptions, ViewKind,
};
use studio_core::config::DataConfig;

/// Integration tests run from the crate directory, so go up two levels.
fn data_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

fn sample() -> Dataset {
    Dataset::load_dir(&data_dir().join("sample"), &DataConfig::default())
        .unwrap_or_else(|e| panic!("failed to load sample data: {e}"))
}

fn filter(name: &str) -> FilterConfig {
    let path = data_dir().join("filters").join(name);
    FilterConfig::from_file(&path)
        .unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display()))
}

fn run(ds: &Dataset, view: ViewKind, filter: &FilterConfig, opts: &ReportOptions) -> Report {
    ReportEngine::run(ds, view, filter, opts).unwrap_or_else(|e| panic!("{view}: {e}"))
}

fn run_plain(ds: &Dataset, view: ViewKind) -> Report {
    run(ds, view, &FilterConfig::default(), &ReportOptions::default())
}

fn row<'a>(report: &'a Report, field: &str, value: &str) -> &'a Value {
    report
        .rows
        .iter()
        .find(|r| r[field] == value)
        .unwrap_or_else(|| panic!("no row with {field} = {value}"))
}

fn column_sum(report: &Report, field: &str) -> f64 {
    report.rows.iter().map(|r| r[field].as_f64().unwrap()).sum()
}

// ── Sales ───────────────────────────────────────────────────

#[test]
fn monthly_sales_deltas_and_malformed_dates() {
    let ds = sample();
    let report = run_plain(&ds, ViewKind::MonthlySales);

    assert_eq!(report.meta.input_records, 6);
    let months: Vec<&str> = report.rows.iter().map(|r| r["month"].as_str().unwrap()).collect();
    assert_eq!(months, vec!["2024-02", "2024-01", "2023-02"]);

    let jan = &report.rows[1];
    assert_eq!(jan["transactions"], 3);
    assert_eq!(jan["totalRevenue"], 300.0);
    assert_eq!(jan["uniqueMembers"], 2);
    assert_eq!(jan["momChange"], -25.0);
    assert_eq!(jan["yoyChange"], 0.0);

    let feb = &report.rows[0];
    assert_eq!(feb["momChange"], 100.0);
    assert_eq!(feb["yoyChange"], 50.0);

    // The undated 50 is left out of every month.
    assert_eq!(column_sum(&report, "totalRevenue"), 1300.0);
}

#[test]
fn text_groupings_preserve_total_revenue() {
    let ds = sample();
    for view in [
        ViewKind::SalesByLocation,
        ViewKind::SalesByProduct,
        ViewKind::SalesByCategory,
        ViewKind::SalesByPaymentMethod,
        ViewKind::SalesBySeller,
    ] {
        let report = run_plain(&ds, view);
        assert_eq!(column_sum(&report, "totalRevenue"), 1350.0, "{view}");
        assert_eq!(column_sum(&report, "transactions"), 6.0, "{view}");
    }
}

#[test]
fn product_falls_back_to_payment_item_then_unknown() {
    let ds = sample();
    let by_product = run_plain(&ds, ViewKind::SalesByProduct);
    assert_eq!(row(&by_product, "key", "Annual Membership")["totalRevenue"], 600.0);
    assert_eq!(by_product.rows[0]["key"], "Single Class");

    let by_seller = run_plain(&ds, ViewKind::SalesBySeller);
    assert_eq!(row(&by_seller, "key", "Unknown")["transactions"], 2);
}

#[test]
fn discounts_by_product() {
    let ds = sample();
    let report = run_plain(&ds, ViewKind::DiscountsByProduct);
    let single = row(&report, "key", "Single Class");
    assert_eq!(single["totalDiscount"], 50.0);
    assert_eq!(single["discountedTransactions"], 1);
}

// ── Sessions and cancellations ──────────────────────────────

#[test]
fn sessions_by_trainer_fill_rates() {
    let ds = sample();
    let report = run_plain(&ds, ViewKind::SessionsByTrainer);
    let priya = row(&report, "key", "Priya");
    assert_eq!(priya["sessions"], 2);
    assert_eq!(priya["fillRate"], 75.0);
    let rohan = row(&report, "key", "Rohan");
    assert_eq!(rohan["emptySessions"], 1);
    assert_eq!(rohan["fillRate"], 37.5);
}

#[test]
fn class_format_fallback_chain() {
    let ds = sample();
    let report = run_plain(&ds, ViewKind::SessionsByFormat);
    assert_eq!(row(&report, "key", "Barre 57")["sessions"], 2);
    assert_eq!(row(&report, "key", "Cycle")["sessions"], 1);
    assert_eq!(row(&report, "key", "Unknown")["sessions"], 1);
}

#[test]
fn repeat_cancellers_from_sample() {
    let ds = sample();
    let report = run_plain(&ds, ViewKind::RepeatCancellers);
    assert_eq!(report.rows.len(), 1);
    let asha = &report.rows[0];
    assert_eq!(asha["member"], "301");
    assert_eq!(asha["cancellations"], 3);
    assert_eq!(asha["distinctClasses"], 2);
    assert_eq!(asha["mostRecent"], "2024-02-01");

    let opts = ReportOptions {
        repeat_min: 1,
        ..Default::default()
    };
    let everyone = run(&ds, ViewKind::RepeatCancellers, &FilterConfig::default(), &opts);
    assert_eq!(everyone.rows.len(), 2);
}

// ── Leads and clients ───────────────────────────────────────

#[test]
fn lead_conversion_basis_changes_denominator() {
    let ds = sample();
    let by_leads = run_plain(&ds, ViewKind::LeadsBySource);
    let instagram = row(&by_leads, "key", "Instagram");
    assert_eq!(instagram["leads"], 3);
    assert_eq!(instagram["conversionRate"], 33.33);

    let opts = ReportOptions {
        basis: ConversionBasis::TrialsCompleted,
        ..Default::default()
    };
    let by_trials = run(&ds, ViewKind::LeadsBySource, &FilterConfig::default(), &opts);
    let instagram = row(&by_trials, "key", "Instagram");
    assert_eq!(instagram["trialsCompleted"], 2);
    assert_eq!(instagram["conversionRate"], 50.0);
    assert_eq!(instagram["basis"], "trials-completed");
}

#[test]
fn client_location_falls_back_to_home_location() {
    let ds = sample();
    let report = run_plain(&ds, ViewKind::ConversionByLocation);
    assert_eq!(report.rows.len(), 2);

    let kemps = row(&report, "key", "Kemps Corner");
    assert_eq!(kemps["totalClients"], 2);
    assert_eq!(kemps["conversionRate"], 100.0);
    assert_eq!(kemps["retentionRate"], 50.0);

    let bandra = row(&report, "key", "Bandra West");
    assert_eq!(bandra["conversionRate"], 50.0);
    assert_eq!(bandra["retentionRate"], 100.0);
}

// ── Payroll ─────────────────────────────────────────────────

#[test]
fn trainer_leaderboard_and_slices() {
    let ds = sample();
    let board = run_plain(&ds, ViewKind::TrainerLeaderboard);
    let names: Vec<&str> = board.rows.iter().map(|r| r["trainer"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Priya", "rohan@example.com", "Anisha"]);

    // Zero new customers must not produce NaN or infinity.
    let rohan = row(&board, "trainer", "rohan@example.com");
    assert_eq!(rohan["conversionRate"], 0.0);

    let opts = ReportOptions {
        top_n: 1,
        ..Default::default()
    };
    let top = run(&ds, ViewKind::TopTrainers, &FilterConfig::default(), &opts);
    assert_eq!(top.rows.len(), 1);
    assert_eq!(top.rows[0]["trainer"], "Priya");

    let weak = run(&ds, ViewKind::TrainersNeedingImprovement, &FilterConfig::default(), &opts);
    assert_eq!(weak.rows[0]["trainer"], "Anisha");
}

#[test]
fn trainer_monthly_for_named_trainer() {
    let ds = sample();
    let opts = ReportOptions {
        trainer: Some("Priya".to_string()),
        ..Default::default()
    };
    let report = run(&ds, ViewKind::TrainerMonthly, &FilterConfig::default(), &opts);
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0]["month"], "2024-02");
    assert_eq!(report.rows[0]["momRevenueChange"], 20.0);
}

// ── Filters ─────────────────────────────────────────────────

#[test]
fn yaml_filter_narrows_sales_and_payroll() {
    let ds = sample();
    let bandra = filter("bandra-west.yml");

    let sales = run(&ds, ViewKind::SalesByLocation, &bandra, &ReportOptions::default());
    assert_eq!(sales.meta.input_records, 6);
    assert_eq!(sales.meta.filtered_records, 2);
    assert_eq!(sales.rows.len(), 1);
    assert_eq!(sales.rows[0]["key"], "Bandra West");
    assert_eq!(sales.rows[0]["totalRevenue"], 100.0);

    let payroll = run(&ds, ViewKind::TrainerLeaderboard, &bandra, &ReportOptions::default());
    let names: Vec<&str> = payroll.rows.iter().map(|r| r["trainer"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Priya", "Anisha"]);
}

#[test]
fn json_filter_only_constrains_kinds_that_carry_the_field() {
    let ds = sample();
    let high_value = filter("high-value.json");

    let leads = run(&ds, ViewKind::LeadsBySource, &high_value, &ReportOptions::default());
    assert_eq!(leads.meta.filtered_records, 1);
    assert_eq!(leads.rows[0]["key"], "Instagram");

    let clients = run(&ds, ViewKind::ConversionByLocation, &high_value, &ReportOptions::default());
    assert_eq!(clients.meta.filtered_records, 2);

    // Sales carry neither LTV nor a conversion status.
    let sales = run(&ds, ViewKind::MonthlySales, &high_value, &ReportOptions::default());
    assert_eq!(sales.meta.filtered_records, 6);
}

// ── Properties ──────────────────────────────────────────────

#[test]
fn every_view_is_deterministic() {
    let ds = sample();
    let opts = ReportOptions {
        trainer: Some("Priya".to_string()),
        ..Default::default()
    };
    for view in ViewKind::ALL {
        let first = run(&ds, *view, &FilterConfig::default(), &opts);
        let second = run(&ds, *view, &FilterConfig::default(), &opts);
        assert_eq!(first.rows, second.rows, "{view}");
        assert_eq!(first.meta.rows, first.rows.len(), "{view}");
    }
}

#[test]
fn rates_are_always_finite() {
    let ds = sample();
    let opts = ReportOptions {
        trainer: Some("Rohan".to_string()),
        basis: ConversionBasis::TrialsCompleted,
        ..Default::default()
    };
    for view in ViewKind::ALL {
        let report = run(&ds, *view, &FilterConfig::default(), &opts);
        for r in &report.rows {
            // NaN and infinity would serialize as null.
            for (field, value) in r.as_object().unwrap() {
                let derived = field.ends_with("Rate")
                    || field.ends_with("Change")
                    || field.starts_with("avg");
                if derived {
                    assert!(value.as_f64().is_some_and(f64::is_finite), "{view}.{field} = {value}");
                }
            }
        }
    }
}

#[test]
fn tagged_file_feeds_the_same_views() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.json");
    std::fs::write(
        &path,
        r#"[
            {"kind": "lead", "source": "Instagram", "conversionStatus": "Converted"},
            {"kind": "lead", "source": "Instagram", "conversionStatus": "Lost"},
            {"kind": "sale", "paymentValue": 10}
        ]"#,
    )
    .unwrap();

    let ds = Dataset::load_tagged(&path).unwrap();
    let report = run_plain(&ds, ViewKind::LeadsBySource);
    assert_eq!(report.rows[0]["conversionRate"], 50.0);
    assert_eq!(report.meta.input_records, 2);
}
