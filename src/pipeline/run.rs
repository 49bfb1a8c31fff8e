//! Validation run orchestrator.
//!
//! One run covers one window:
//! 1. Follow-up windows are handed to the task queue (multi-day requests)
//! 2. Records are streamed from the store in timestamp order
//! 3. Dangling device references skip the record, dangling task
//!    references are repaired
//! 4. Each record is counted and scored by its type's validator
//! 5. Summaries are persisted, then the entries that reference them
//! 6. A [`ValidationReport`] is returned for presentation

use std::collections::BTreeMap;

use crate::config::ValidationConfig;
use crate::error::{Result, ValidationError};
use crate::logging::structured::LogContext;
use crate::measurement::{DeviceInfo, MeasurementRecord, MeasurementType};
use crate::storage::{
    repair_task_reference, MeasurementQuery, MeasurementStore, PendingEntry, RecordStream,
    ValidationSummary,
};
use crate::validation::{create_validator, MeasurementValidator, Validator, ValidationOutcome};
use crate::{log_debug, log_error, log_info, log_warn};

use super::context::{RunContext, RunWindow};
use super::queue::{TaskQueue, ValidationJob};
use super::report::{TypeReport, ValidationReport};

/// Accumulated state for one measurement type.
#[derive(Debug)]
struct TypeAccumulator {
    summary: ValidationSummary,
    pending: Vec<PendingEntry>,
    details: Vec<String>,
}

impl TypeAccumulator {
    fn new(summary: ValidationSummary) -> Self {
        Self {
            summary,
            pending: Vec::new(),
            details: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct RunCounters {
    skipped: u64,
    repaired: u64,
}

/// Detail text for one scored record.
pub fn detail_text(
    record: &MeasurementRecord,
    device: &DeviceInfo,
    validator: &Validator,
    outcome: &ValidationOutcome,
) -> String {
    format!(
        "Errors: {}\nTime: {}\nDevice: {}\nDetails:\n{}",
        outcome.error_types().join(", "),
        record.timestamp.to_rfc3339(),
        device.id,
        validator.render_detail().trim_end()
    )
}

/// A single validation pass over one window.
///
/// The run owns its accumulation state; the store and queue are shared
/// collaborators that synchronize themselves.
pub struct ValidationRun<'a> {
    store: &'a dyn MeasurementStore,
    config: &'a ValidationConfig,
    ctx: RunContext,
    record_limit: Option<usize>,
    unscheduled: Vec<RunWindow>,
}

impl<'a> ValidationRun<'a> {
    pub fn new(
        store: &'a dyn MeasurementStore,
        config: &'a ValidationConfig,
        ctx: RunContext,
    ) -> Self {
        Self {
            store,
            config,
            ctx,
            record_limit: None,
            unscheduled: Vec::new(),
        }
    }

    /// Cap the number of records streamed.
    pub fn with_record_limit(mut self, limit: Option<usize>) -> Self {
        self.record_limit = limit;
        self
    }

    /// Enqueue `iterations - 1` single-day follow-up jobs, each shifted by
    /// one more day than the last. Returns the number enqueued.
    ///
    /// Enqueue failures are logged and listed in the report; the current
    /// window is still processed. Fan-out stops at the first day that
    /// cannot be represented.
    pub fn schedule_followups(&mut self, queue: &dyn TaskQueue, iterations: u32) -> usize {
        if iterations <= 1 {
            return 0;
        }

        let log_ctx = self.ctx.log_context();
        log_info!(log_ctx, "RUN_FANOUT", iterations = iterations);

        let mut enqueued = 0;
        for day in 1..iterations {
            let window = match self.ctx.window.shifted_days(i64::from(day)) {
                Ok(window) => window,
                Err(e) => {
                    log_warn!(log_ctx, "RUN_FANOUT_TRUNCATED", day = day, error = e.to_string());
                    break;
                }
            };
            match queue.enqueue(ValidationJob::for_window(window)) {
                Ok(()) => {
                    enqueued += 1;
                    log_debug!(
                        log_ctx,
                        "JOB_ENQUEUED",
                        start = window.start.to_rfc3339(),
                        end = window.end.to_rfc3339()
                    );
                }
                Err(e) => {
                    log_warn!(
                        log_ctx,
                        "JOB_ENQUEUE_FAILED",
                        start = window.start.to_rfc3339(),
                        error = e.to_string()
                    );
                    self.unscheduled.push(window);
                }
            }
        }
        enqueued
    }

    /// Stream, score and persist the window.
    ///
    /// # Errors
    /// `Query` when the store cannot be read and `Persistence` when a
    /// summary or entry cannot be written. Summaries persisted before the
    /// failure are kept.
    pub fn execute(self) -> Result<ValidationReport> {
        let log_ctx = self.ctx.log_context();
        let window = self.ctx.window;

        log_info!(
            log_ctx,
            "RUN_START",
            started_at = self.ctx.started_at.to_rfc3339(),
            start = window.start.to_rfc3339(),
            end = window.end.to_rfc3339(),
            limit = self.record_limit
        );

        let mut types: BTreeMap<MeasurementType, TypeAccumulator> = MeasurementType::VALIDATED
            .iter()
            .map(|kind| (kind.clone(), TypeAccumulator::new(ValidationSummary::new(kind.clone()))))
            .collect();
        let mut counters = RunCounters::default();

        let query = MeasurementQuery::window(window.start, window.end).with_limit(self.record_limit);
        let stream = RecordStream::new(self.store, query, self.config.page_size);
        for item in stream {
            let record = item.map_err(|e| {
                log_error!(log_ctx, "RUN_QUERY_FAILED", error = e.to_string());
                ValidationError::Query(e)
            })?;
            self.observe(record, &log_ctx, &mut types, &mut counters);
        }

        let mut per_type = BTreeMap::new();
        let mut entries_persisted = 0;
        for (kind, acc) in types {
            let summary_id = if acc.summary.record_count > 0 {
                let id = self.store.persist_summary(&acc.summary).map_err(|source| {
                    log_error!(
                        log_ctx,
                        "SUMMARY_PERSIST_FAILED",
                        measurement_type = kind.as_str(),
                        error = source.to_string()
                    );
                    ValidationError::Persistence {
                        what: "summary",
                        source,
                    }
                })?;

                for pending in acc.pending {
                    let entry = pending.attach(id);
                    self.store.persist_entry(&entry).map_err(|source| {
                        log_error!(
                            log_ctx,
                            "ENTRY_PERSIST_FAILED",
                            measurement = entry.measurement.to_string(),
                            error = source.to_string()
                        );
                        ValidationError::Persistence {
                            what: "entry",
                            source,
                        }
                    })?;
                    entries_persisted += 1;
                }

                log_info!(
                    log_ctx,
                    "SUMMARY_PERSISTED",
                    measurement_type = kind.as_str(),
                    summary = id.to_string(),
                    records = acc.summary.record_count,
                    invalid = acc.summary.error_count
                );
                Some(id)
            } else {
                None
            };

            let summary = acc.summary;
            per_type.insert(
                kind.as_str().to_string(),
                TypeReport {
                    unknown_type: summary.is_unknown_type(),
                    measurement_type: summary.measurement_type,
                    summary_id,
                    record_count: summary.record_count,
                    error_count: summary.error_count,
                    per_error_category_counts: summary.per_error_type_counts,
                    details: acc.details,
                },
            );
        }

        let report = ValidationReport {
            run_id: self.ctx.run_id.clone(),
            window_start: window.start,
            window_end: window.end,
            per_type,
            skipped_records: counters.skipped,
            repaired_references: counters.repaired,
            entries_persisted,
            unscheduled_windows: self.unscheduled,
        };

        log_info!(
            log_ctx,
            "RUN_COMPLETE",
            records = report.total_records(),
            invalid = report.total_errors(),
            skipped = report.skipped_records,
            entries = report.entries_persisted
        );

        Ok(report)
    }

    fn observe(
        &self,
        mut record: MeasurementRecord,
        log_ctx: &LogContext,
        types: &mut BTreeMap<MeasurementType, TypeAccumulator>,
        counters: &mut RunCounters,
    ) {
        let ctx = log_ctx.with_measurement(record.id.as_str());

        let device = match self.store.device(&record.device) {
            Ok(Some(device)) => device,
            Ok(None) => {
                log_warn!(
                    ctx,
                    "RECORD_SKIPPED",
                    reason = "device_missing",
                    device = record.device.as_str()
                );
                counters.skipped += 1;
                return;
            }
            Err(e) => {
                log_warn!(
                    ctx,
                    "RECORD_SKIPPED",
                    reason = "device_lookup_failed",
                    error = e.to_string()
                );
                counters.skipped += 1;
                return;
            }
        };

        match repair_task_reference(self.store, &mut record) {
            Ok(true) => {
                counters.repaired += 1;
                log_info!(ctx, "TASK_REFERENCE_REPAIRED");
            }
            Ok(false) => {}
            Err(e) => {
                log_warn!(ctx, "TASK_REFERENCE_REPAIR_FAILED", error = e.to_string());
            }
        }

        let window = self.ctx.window;
        let acc = types
            .entry(record.measurement_type.clone())
            .or_insert_with(|| {
                log_info!(
                    ctx,
                    "UNKNOWN_TYPE_SEEN",
                    measurement_type = record.measurement_type.as_str()
                );
                TypeAccumulator::new(ValidationSummary::unknown(record.measurement_type.clone()))
            });
        acc.summary.stamp_window(window.start, window.end);
        acc.summary.record_count += 1;

        let validator = match create_validator(&record) {
            Ok(validator) => validator,
            Err(e) => {
                log_debug!(ctx, "VALIDATOR_MISSING", error = e.to_string());
                return;
            }
        };

        let outcome = validator.validate(&ctx);
        if outcome.is_valid() {
            if self.config.print_all_values {
                acc.details
                    .push(detail_text(&record, &device, &validator, &outcome));
            }
            return;
        }

        acc.summary.record_invalid(outcome.error_types());
        if self.config.print_invalid_detail || self.config.print_all_values {
            acc.details
                .push(detail_text(&record, &device, &validator, &outcome));
        }
        log_debug!(
            ctx,
            "RECORD_INVALID",
            errors = outcome.error_types().join(",")
        );
        acc.pending
            .push(PendingEntry::new(record.id, outcome.into_error_types()));
    }
}
