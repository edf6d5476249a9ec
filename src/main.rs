//! CLI entry point for the accident analytics pipeline.
//!
//! Provides subcommands for running the ETL, listing filter options,
//! computing dashboard aggregates, and checking storage access.

use accident_analytics::config::{
    DEFAULT_INPUT, DEFAULT_OUTPUT, DashboardConfig, EtlConfig, RunMode,
};
use accident_analytics::dashboard::Dashboard;
use accident_analytics::etl::run_etl;
use accident_analytics::output::{append_report, print_json, print_pretty};
use accident_analytics::query::{FilterSpec, HourRange, SamplingOptions, Selection};
use accident_analytics::storage::StorageLocation;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "accident_analytics")]
#[command(about = "ETL and dashboard aggregates for US traffic accident data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw dataset and overwrite the Parquet table
    Etl {
        /// Raw CSV (optionally .gz), s3://bucket/key or local path
        #[arg(long, env = "ACCIDENTS_INPUT", default_value = DEFAULT_INPUT)]
        input: StorageLocation,

        /// Cleaned Parquet table, s3://bucket/key or local path
        #[arg(long, env = "ACCIDENTS_OUTPUT", default_value = DEFAULT_OUTPUT)]
        output: StorageLocation,

        /// `sample` continues on built-in rows when the input is unreadable
        #[arg(long, value_enum, env = "ACCIDENTS_MODE", default_value_t = RunMode::Production)]
        mode: RunMode,

        /// Optional CSV ledger to append the run report to
        #[arg(long)]
        report: Option<String>,
    },
    /// List filter choices for a year selection
    Options {
        #[arg(long, env = "ACCIDENTS_TABLE", default_value = DEFAULT_OUTPUT)]
        table: StorageLocation,

        /// Comma-separated years, e.g. 2021,2022
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,
    },
    /// Filter the cleaned table and print the dashboard aggregates
    Query {
        #[arg(long, env = "ACCIDENTS_TABLE", default_value = DEFAULT_OUTPUT)]
        table: StorageLocation,

        /// Comma-separated years (required to produce output)
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,

        /// Exact state label
        #[arg(long)]
        state: Option<String>,

        /// Comma-separated severities (default: all present)
        #[arg(long, value_delimiter = ',')]
        severity: Option<Vec<u8>>,

        #[arg(long, default_value_t = 0)]
        hour_from: u32,

        #[arg(long, default_value_t = 23)]
        hour_to: u32,

        /// Maximum points in the map sample
        #[arg(long, default_value_t = accident_analytics::query::sampling::MAP_SAMPLE_CAP)]
        sample_cap: usize,

        /// Seed for a reproducible map sample
        #[arg(long)]
        seed: Option<u64>,

        /// Seconds before the cached table is reloaded (0 = manual only)
        #[arg(long, env = "ACCIDENTS_CACHE_TTL_SECS")]
        cache_ttl_secs: Option<u64>,

        /// Print the full summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Verify that a storage location is reachable with current credentials
    CheckStorage {
        #[arg(value_name = "LOCATION", default_value = DEFAULT_OUTPUT)]
        location: StorageLocation,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/accident_analytics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("accident_analytics.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Etl {
            input,
            output,
            mode,
            report,
        } => {
            if mode == RunMode::Sample {
                warn!("Running in sample mode: unreadable input falls back to built-in rows");
            }
            let config = EtlConfig::new(input, output, mode);
            let etl_report = run_etl(&config).await?;

            if let Some(path) = report {
                append_report(&path, &etl_report)?;
                info!(path = %path, "Run report appended");
            }
            print_json(&etl_report)?;
        }
        Commands::Options { table, years } => {
            let config = DashboardConfig::new(table, None, SamplingOptions::default());
            let mut dashboard = Dashboard::open(&config).await;
            let years: BTreeSet<i32> = years.into_iter().collect();

            let options = dashboard.options(&years).await?;
            print_json(&options)?;
        }
        Commands::Query {
            table,
            years,
            state,
            severity,
            hour_from,
            hour_to,
            sample_cap,
            seed,
            cache_ttl_secs,
            json,
        } => {
            let sampling = SamplingOptions {
                cap: sample_cap,
                seed,
            };
            let config = DashboardConfig::new(table, cache_ttl_secs, sampling);

            let hours = HourRange::new(hour_from, hour_to)?;
            let mut spec = FilterSpec::new(years).with_hour_range(hours);
            if let Some(state) = state {
                spec = spec.with_state(state);
            }
            if let Some(severity) = severity {
                spec = spec.with_severities(severity);
            }

            let mut dashboard = Dashboard::open(&config).await;
            match dashboard.render(&spec).await? {
                Selection::Required => {
                    warn!("Please select one or more years with --years");
                }
                Selection::Ready(summary) => {
                    if json {
                        print_json(&summary)?;
                    } else {
                        print_pretty(&summary);
                    }
                }
            }
        }
        Commands::CheckStorage { location } => {
            check_storage(&location).await?;
        }
    }

    Ok(())
}

/// Probes the backend behind `location` and reports the outcome.
#[tracing::instrument(skip(location), fields(location = %location))]
async fn check_storage(location: &StorageLocation) -> Result<()> {
    let store = location.open_store().await;
    match store.probe().await {
        Ok(()) => {
            info!("Storage reachable");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Storage check failed; verify credentials and bucket access");
            Err(e.into())
        }
    }
}
