//! Validation entry point.
//!
//! Parses request parameters into a run window, schedules follow-up days,
//! executes the run and selects the presentation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::error::{Result, ValidationError};
use crate::storage::MeasurementStore;
use crate::{log_error, log_info, log_warn};

use super::context::{RunContext, RunWindow};
use super::queue::TaskQueue;
use super::report::{Notification, Notifier, ValidationReport};
use super::run::ValidationRun;

/// How an interactive caller wants the results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    #[default]
    Report,
    Notification,
}

fn default_iterations() -> u32 {
    1
}

/// Parameters accepted by the validation entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// RFC 3339 start; defaults to yesterday 00:00 UTC.
    #[serde(default)]
    pub start_time: Option<String>,
    /// RFC 3339 end; defaults to today 00:00 UTC.
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default)]
    pub record_limit: Option<usize>,
    #[serde(default)]
    pub presentation: Presentation,
    /// Set when invoked by the task queue: no presentation, bare ack.
    #[serde(default)]
    pub is_background_worker: bool,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            start_time: None,
            end_time: None,
            iterations: default_iterations(),
            record_limit: None,
            presentation: Presentation::Report,
            is_background_worker: false,
        }
    }
}

impl RunRequest {
    pub fn window(&self, now: DateTime<Utc>) -> Result<RunWindow> {
        RunWindow::from_bounds(self.start_time.as_deref(), self.end_time.as_deref(), now)
    }
}

/// What the entry point hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "report", rename_all = "snake_case")]
pub enum RunResponse {
    /// Background invocation finished; invalid records are data, not failure.
    Acknowledged,
    Report(ValidationReport),
    /// The report was rendered and delivered to the notifier.
    Notified(ValidationReport),
}

impl RunResponse {
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            RunResponse::Acknowledged => None,
            RunResponse::Report(report) | RunResponse::Notified(report) => Some(report),
        }
    }
}

/// Handle one validation request end to end.
///
/// # Errors
/// Window parsing failures, an `iterations` count above the configured
/// maximum, store query and persistence failures, and (for interactive
/// notification requests) delivery failures.
pub fn handle_validation_request(
    request: &RunRequest,
    store: &dyn MeasurementStore,
    queue: &dyn TaskQueue,
    notifier: &dyn Notifier,
    config: &ValidationConfig,
    now: DateTime<Utc>,
) -> Result<RunResponse> {
    let window = request.window(now)?;
    let ctx = RunContext::new(window, now);
    let log_ctx = ctx.log_context();

    if request.iterations > config.max_iterations {
        log_warn!(
            log_ctx,
            "REQUEST_REJECTED",
            iterations = request.iterations,
            max = config.max_iterations
        );
        return Err(ValidationError::TooManyIterations {
            requested: request.iterations,
            max: config.max_iterations,
        });
    }

    let mut run = ValidationRun::new(store, config, ctx).with_record_limit(request.record_limit);
    run.schedule_followups(queue, request.iterations);
    let report = run.execute()?;

    if request.is_background_worker {
        return Ok(RunResponse::Acknowledged);
    }

    match request.presentation {
        Presentation::Report => Ok(RunResponse::Report(report)),
        Presentation::Notification => {
            let notification = Notification::from_report(&report, config)?;
            notifier.send(&notification).map_err(|e| {
                log_error!(log_ctx, "NOTIFICATION_FAILED", error = e.to_string());
                ValidationError::Notification(e.to_string())
            })?;
            log_info!(
                log_ctx,
                "NOTIFICATION_SENT",
                recipient = notification.recipient
            );
            Ok(RunResponse::Notified(report))
        }
    }
}
