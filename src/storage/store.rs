//! Measurement store interface.
//!
//! The validation run reads measurements by time window, resolves the
//! device and task each one points at, and appends its results. All
//! methods take `&self`; implementations synchronize internally.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::measurement::{
    DeviceId, DeviceInfo, MeasurementId, MeasurementRecord, MeasurementType, TaskId, TaskInfo,
};

use super::models::{EntryId, Stored, SummaryId, ValidationEntry, ValidationSummary};

/// Errors raised by a store implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Filter for a measurement scan. Results are always ordered by timestamp,
/// ascending, over the half-open range `[start, end)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementQuery {
    pub measurement_type: Option<MeasurementType>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl MeasurementQuery {
    pub fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, measurement_type: MeasurementType) -> Self {
        self.measurement_type = Some(measurement_type);
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Whether a record passes the type and time filters.
    pub fn matches(&self, record: &MeasurementRecord) -> bool {
        if let Some(kind) = &self.measurement_type {
            if &record.measurement_type != kind {
                return false;
            }
        }
        if let Some(start) = self.start {
            if record.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if record.timestamp >= end {
                return false;
            }
        }
        true
    }
}

/// One page of a measurement scan.
#[derive(Debug, Clone, Default)]
pub struct MeasurementPage {
    pub records: Vec<MeasurementRecord>,
    /// Continuation token for the next page, `None` when exhausted.
    pub cursor: Option<String>,
}

/// Datastore operations needed by validation runs and dashboards.
pub trait MeasurementStore {
    /// Fetch one page of measurements matching `query`.
    fn query(
        &self,
        query: &MeasurementQuery,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<MeasurementPage, StoreError>;

    fn measurement(&self, id: &MeasurementId) -> Result<Option<MeasurementRecord>, StoreError>;

    /// Resolve a device reference; `None` when the device was deleted.
    fn device(&self, id: &DeviceId) -> Result<Option<DeviceInfo>, StoreError>;

    /// Resolve a task reference; `None` when the task was deleted.
    fn task(&self, id: &TaskId) -> Result<Option<TaskInfo>, StoreError>;

    fn persist_measurement(&self, record: &MeasurementRecord) -> Result<(), StoreError>;

    fn persist_summary(&self, summary: &ValidationSummary) -> Result<SummaryId, StoreError>;

    fn persist_entry(&self, entry: &ValidationEntry) -> Result<EntryId, StoreError>;

    fn summary(&self, id: &SummaryId) -> Result<Option<ValidationSummary>, StoreError>;

    /// Summaries ordered by `window_start`, ascending.
    fn summaries(
        &self,
        limit: usize,
    ) -> Result<Vec<Stored<SummaryId, ValidationSummary>>, StoreError>;

    /// Entries in persistence order.
    fn entries(&self, limit: usize) -> Result<Vec<Stored<EntryId, ValidationEntry>>, StoreError>;
}

/// Clear a task reference that no longer resolves and persist the fix.
///
/// Returns whether a repair was made. The in-memory record is corrected
/// even when persisting the fix fails; the error is still returned so the
/// caller can log it.
pub fn repair_task_reference(
    store: &dyn MeasurementStore,
    record: &mut MeasurementRecord,
) -> Result<bool, StoreError> {
    let task_id = match &record.task {
        Some(id) => id.clone(),
        None => return Ok(false),
    };

    if store.task(&task_id)?.is_some() {
        return Ok(false);
    }

    log::info!(
        "TASK_REFERENCE_DANGLING measurement={} task={}",
        record.id,
        task_id
    );
    record.task = None;
    store.persist_measurement(record)?;
    Ok(true)
}

/// Streams every record of a query, following continuation tokens.
pub struct RecordStream<'a> {
    store: &'a dyn MeasurementStore,
    query: MeasurementQuery,
    page_size: usize,
    cursor: Option<String>,
    buffer: VecDeque<MeasurementRecord>,
    yielded: usize,
    exhausted: bool,
}

impl<'a> RecordStream<'a> {
    pub fn new(store: &'a dyn MeasurementStore, query: MeasurementQuery, page_size: usize) -> Self {
        Self {
            store,
            query,
            page_size: page_size.max(1),
            cursor: None,
            buffer: VecDeque::new(),
            yielded: 0,
            exhausted: false,
        }
    }

    fn limit_reached(&self) -> bool {
        self.query.limit.map_or(false, |limit| self.yielded >= limit)
    }

    fn fetch_page(&mut self) -> Result<(), StoreError> {
        let page = self
            .store
            .query(&self.query, self.page_size, self.cursor.as_deref())?;
        self.buffer.extend(page.records);
        self.exhausted = page.cursor.is_none();
        self.cursor = page.cursor;
        Ok(())
    }
}

impl Iterator for RecordStream<'_> {
    type Item = Result<MeasurementRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit_reached() {
            return None;
        }

        while self.buffer.is_empty() {
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }

        let record = self.buffer.pop_front()?;
        self.yielded += 1;
        Some(Ok(record))
    }
}
