mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use studio_compute::{Dataset, FilterConfig, ReportEngine, ReportOptions, ViewKind};
use studio_core::config::{load_dotenv, Config};

use crate::cli::CliArgs;

fn main() -> Result<()> {
    // Logs on stderr so stdout stays pure JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    if args.list_views {
        for v in ViewKind::ALL {
            println!("{v}\t{}", v.record_kind());
        }
        return Ok(());
    }
    let Some(view) = args.view else {
        bail!("--view is required");
    };

    load_dotenv();
    let config = Config::from_env();
    config.log_summary();

    let dataset = match &args.records {
        Some(path) => Dataset::load_tagged(path)
            .with_context(|| format!("failed to load records from {}", path.display()))?,
        None => {
            let dir = args.data_dir.clone().unwrap_or_else(|| config.data.data_dir.clone());
            Dataset::load_dir(&dir, &config.data)
                .with_context(|| format!("failed to load data from {}", dir.display()))?
        }
    };

    if dataset.is_empty() {
        warn!("no records loaded, every view will be empty");
    }

    let filter = build_filter(&args)?;
    if !filter.is_empty() {
        info!(?filter, "filter active");
    }

    let mut opts = ReportOptions::from_config(&config.report).context("invalid report config")?;
    if let Some(n) = args.top {
        opts.top_n = n;
    }
    if let Some(basis) = args.basis {
        opts.basis = basis;
    }
    if let Some(min) = args.repeat_min {
        opts.repeat_min = min;
    }
    opts.trainer = args.trainer_name.clone();

    let report = ReportEngine::run(&dataset, view, &filter, &opts)
        .with_context(|| format!("failed to build {view}"))?;

    let out = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");
    Ok(())
}

/// File filter first, then any flags layered on top.
fn build_filter(args: &CliArgs) -> Result<FilterConfig> {
    let mut filter = match &args.filter {
        Some(path) => FilterConfig::from_file(path)
            .with_context(|| format!("failed to load filter {}", path.display()))?,
        None => FilterConfig::default(),
    };

    if args.from.is_some() || args.to.is_some() {
        let mut range = filter.date_range.unwrap_or_default();
        if args.from.is_some() {
            range.start = args.from;
        }
        if args.to.is_some() {
            range.end = args.to;
        }
        filter.date_range = Some(range);
    }
    filter.locations.extend(args.locations.iter().cloned());
    filter.trainers.extend(args.trainers.iter().cloned());
    filter.conversion_status.extend(args.conversion_status.iter().cloned());
    filter.retention_status.extend(args.retention_status.iter().cloned());
    if args.min_ltv.is_some() {
        filter.min_ltv = args.min_ltv;
    }
    if args.max_ltv.is_some() {
        filter.max_ltv = args.max_ltv;
    }

    filter.validate().context("invalid filter")?;
    Ok(filter)
}
