//! Speedometer Validation - Measurement validation and summarization engine
//!
//! This crate checks the network measurements (ping, DNS lookup, traceroute,
//! HTTP fetch, UDP burst) reported by the Speedometer device fleet, tallies
//! per-type error statistics for a time window and persists the results for
//! the validation dashboards. The implementation prioritizes:
//!
//! 1. **Robustness** - One bad record never aborts a run
//! 2. **Logging** - Every decision point logged with run context
//! 3. **Bounded work** - Multi-day requests fan out into single-day jobs
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `measurement` - Stored measurement shape and typed field access
//! - `validation` - Per-type validators and the type dispatch
//! - `pipeline` - Validation run orchestrator, queue and report
//! - `storage` - Result models and the measurement-store boundary
//! - `dashboard` - Read-only projections of persisted results
//! - `config` - Run and dashboard settings
//! - `logging` - Structured logging with run context
//!
//! The Python bindings (feature `python`) expose the engine to a host
//! process that owns the production datastore.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod measurement;
pub mod pipeline;
pub mod storage;
pub mod validation;

pub use config::ValidationConfig;
pub use error::{Result, ValidationError};

/// Initialize the process-wide logger.
///
/// Safe to call repeatedly; `RUST_LOG` overrides the default `info` level.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

#[cfg(feature = "python")]
mod bindings {
    use chrono::Utc;
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use pyo3::types::PyDict;

    use crate::config::ValidationConfig;
    use crate::logging::structured::LogContext;
    use crate::measurement::{MeasurementId, MeasurementRecord};
    use crate::pipeline::{handle_validation_request, MemoryNotifier, MemoryQueue, RunRequest};
    use crate::storage::{MeasurementStore, MemoryStore, Snapshot};
    use crate::validation::{create_validator, MeasurementValidator};

    use super::init_logger;

    fn value_error(e: impl std::fmt::Display) -> PyErr {
        PyValueError::new_err(e.to_string())
    }

    fn parse_record(measurement: &str) -> PyResult<MeasurementRecord> {
        serde_json::from_str(measurement).map_err(value_error)
    }

    /// Validate a single measurement.
    ///
    /// # Arguments
    /// * `measurement` - JSON serialized measurement record
    ///
    /// # Returns
    /// Dict with `valid`, `error_types` and the rendered `details`
    #[pyfunction]
    fn validate_measurement(py: Python<'_>, measurement: String) -> PyResult<Py<PyAny>> {
        init_logger();

        let record = parse_record(&measurement)?;
        let validator = create_validator(&record).map_err(value_error)?;
        let ctx = LogContext::new("python").with_measurement(record.id.as_str());
        let outcome = validator.validate(&ctx);

        let result = PyDict::new(py);
        result.set_item("valid", outcome.is_valid())?;
        result.set_item("error_types", outcome.error_types().to_vec())?;
        result.set_item("details", validator.render_detail())?;
        Ok(result.into())
    }

    /// Key-sorted rendering of a measurement's values.
    #[pyfunction]
    fn render_detail(measurement: String) -> PyResult<String> {
        let record = parse_record(&measurement)?;
        let validator = create_validator(&record).map_err(value_error)?;
        Ok(validator.render_detail())
    }

    /// Run one validation request over a snapshot of the datastore.
    ///
    /// # Arguments
    /// * `snapshot` - JSON `{devices, tasks, measurements}`
    /// * `request` - JSON run request; defaults to yesterday's window
    /// * `config` - JSON validation config; defaults apply when omitted
    ///
    /// # Returns
    /// JSON with the response, the follow-up jobs to enqueue, the
    /// summaries and entries to persist, the measurements whose task
    /// reference was cleared and any notifications to deliver
    #[pyfunction]
    #[pyo3(signature = (snapshot, request=None, config=None))]
    fn run_validation(
        snapshot: String,
        request: Option<String>,
        config: Option<String>,
    ) -> PyResult<String> {
        init_logger();

        let snapshot: Snapshot = serde_json::from_str(&snapshot).map_err(value_error)?;
        let request: RunRequest = match request {
            Some(json) => serde_json::from_str(&json).map_err(value_error)?,
            None => RunRequest::default(),
        };
        let config = match config {
            Some(json) => ValidationConfig::from_json_str(&json).map_err(value_error)?,
            None => ValidationConfig::default(),
        };

        let tasked: Vec<MeasurementId> = snapshot
            .measurements
            .iter()
            .filter(|record| record.task.is_some())
            .map(|record| record.id.clone())
            .collect();
        let store = MemoryStore::from_snapshot(snapshot);
        let queue = MemoryQueue::new();
        let notifier = MemoryNotifier::new();

        let response =
            handle_validation_request(&request, &store, &queue, &notifier, &config, Utc::now())
                .map_err(value_error)?;

        let summaries = store.summaries(usize::MAX).map_err(value_error)?;
        let entries = store.entries(usize::MAX).map_err(value_error)?;
        let mut repaired = Vec::new();
        for id in tasked {
            let cleared = store
                .measurement(&id)
                .map_err(value_error)?
                .is_some_and(|record| record.task.is_none());
            if cleared {
                repaired.push(id);
            }
        }

        log::info!(
            "PYTHON_RUN_COMPLETE summaries={} entries={} jobs={}",
            summaries.len(),
            entries.len(),
            queue.len()
        );

        let output = serde_json::json!({
            "response": response,
            "jobs": queue.drain(),
            "summaries": summaries,
            "entries": entries,
            "repaired_measurements": repaired,
            "notifications": notifier.sent(),
        });
        serde_json::to_string(&output).map_err(value_error)
    }

    /// Python module definition
    #[pymodule]
    fn speedometer_validation(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(validate_measurement, m)?)?;
        m.add_function(wrap_pyfunction!(render_detail, m)?)?;
        m.add_function(wrap_pyfunction!(run_validation, m)?)?;
        Ok(())
    }
}
