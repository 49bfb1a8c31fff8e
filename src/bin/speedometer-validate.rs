//! Speedometer validation runner
//!
//! Runs validation over a JSON snapshot of the datastore
//! (`{devices, tasks, measurements}`) and prints the results as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;

use speedometer_validation::dashboard::{
    build_timeseries, time_bucketed_report, timeseries_columns, top_errors, SummaryMetric,
};
use speedometer_validation::init_logger;
use speedometer_validation::logging::structured::LogContext;
use speedometer_validation::measurement::MeasurementRecord;
use speedometer_validation::pipeline::{
    handle_validation_request, MemoryNotifier, MemoryQueue, Presentation, RunRequest, RunResponse,
};
use speedometer_validation::storage::{MemoryStore, Snapshot};
use speedometer_validation::validation::{create_validator, MeasurementValidator};
use speedometer_validation::ValidationConfig;

#[derive(Parser)]
#[command(name = "speedometer-validate")]
#[command(about = "Validate Speedometer measurements and summarize the results")]
#[command(version)]
struct Cli {
    /// Configuration file path (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run validation over a window of a snapshot
    Run {
        /// Snapshot file path
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Window start (RFC 3339); defaults to yesterday 00:00 UTC
        #[arg(long)]
        start: Option<String>,

        /// Window end (RFC 3339); defaults to today 00:00 UTC
        #[arg(long)]
        end: Option<String>,

        /// Days to validate; days after the first are queued as jobs
        #[arg(long, default_value = "1")]
        iterations: u32,

        /// Maximum number of records to validate
        #[arg(long)]
        limit: Option<usize>,

        /// Print the plain-text report instead of JSON
        #[arg(long)]
        text: bool,

        /// Also print the dashboard projections
        #[arg(long)]
        dashboard: bool,
    },

    /// Validate a single measurement record
    Check {
        /// Measurement file path (JSON)
        #[arg(short, long)]
        measurement: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    match path {
        Some(path) => ValidationConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ValidationConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn run(
    config: &ValidationConfig,
    snapshot: &Path,
    start: Option<String>,
    end: Option<String>,
    iterations: u32,
    limit: Option<usize>,
    text: bool,
    dashboard: bool,
) -> Result<()> {
    let snapshot: Snapshot = read_json(snapshot)?;
    let store = MemoryStore::from_snapshot(snapshot);
    let queue = MemoryQueue::new();
    let notifier = MemoryNotifier::new();

    let request = RunRequest {
        start_time: start,
        end_time: end,
        iterations,
        record_limit: limit,
        presentation: Presentation::Report,
        is_background_worker: false,
    };

    let response =
        handle_validation_request(&request, &store, &queue, &notifier, config, Utc::now())
            .context("validation run failed")?;
    let RunResponse::Report(report) = response else {
        anyhow::bail!("unexpected response for a report request");
    };

    if text {
        print!("{}", report.render_text());
    }

    let mut output = json!({
        "report": report,
        "queued_jobs": queue.drain(),
    });

    if dashboard {
        output["dashboard"] = json!({
            "buckets": time_bucketed_report(&store, config.dashboard_entry_limit)?,
            "top_errors": top_errors(&store, config.dashboard_entry_limit, config.top_error_limit)?,
            "timeseries": {
                "columns": timeseries_columns(),
                "record_count": build_timeseries(&store, SummaryMetric::RecordCount, config.timeseries_point_limit)?,
                "error_count": build_timeseries(&store, SummaryMetric::ErrorCount, config.timeseries_point_limit)?,
            },
        });
    }

    if !text || dashboard {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

fn check(measurement: &Path) -> Result<()> {
    let record: MeasurementRecord = read_json(measurement)?;
    let validator = create_validator(&record)?;
    let ctx = LogContext::new("check").with_measurement(record.id.as_str());
    let outcome = validator.validate(&ctx);

    let output = json!({
        "id": record.id,
        "type": record.measurement_type,
        "validation_results": outcome,
        "details": validator.render_detail(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            snapshot,
            start,
            end,
            iterations,
            limit,
            text,
            dashboard,
        } => run(&config, &snapshot, start, end, iterations, limit, text, dashboard),
        Commands::Check { measurement } => check(&measurement),
    }
}
