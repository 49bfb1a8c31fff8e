//! In-memory measurement store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::measurement::{
    DeviceId, DeviceInfo, MeasurementId, MeasurementRecord, TaskId, TaskInfo,
};

use super::models::{EntryId, Stored, SummaryId, ValidationEntry, ValidationSummary};
use super::store::{MeasurementPage, MeasurementQuery, MeasurementStore, StoreError};

/// Serialized contents of a store, as loaded by the CLI and the bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
    #[serde(default)]
    pub tasks: Vec<TaskInfo>,
    #[serde(default)]
    pub measurements: Vec<MeasurementRecord>,
}

#[derive(Debug, Default)]
struct Tables {
    measurements: BTreeMap<MeasurementId, MeasurementRecord>,
    devices: HashMap<DeviceId, DeviceInfo>,
    tasks: HashMap<TaskId, TaskInfo>,
    summaries: Vec<Stored<SummaryId, ValidationSummary>>,
    entries: Vec<Stored<EntryId, ValidationEntry>>,
}

/// Thread-safe store holding everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        for device in snapshot.devices {
            store.insert_device(device);
        }
        for task in snapshot.tasks {
            store.insert_task(task);
        }
        for record in snapshot.measurements {
            store.insert_measurement(record);
        }
        store
    }

    pub fn insert_device(&self, device: DeviceInfo) {
        self.tables.write().devices.insert(device.id.clone(), device);
    }

    pub fn insert_task(&self, task: TaskInfo) {
        self.tables.write().tasks.insert(task.id.clone(), task);
    }

    pub fn insert_measurement(&self, record: MeasurementRecord) {
        self.tables
            .write()
            .measurements
            .insert(record.id.clone(), record);
    }

    pub fn measurement_count(&self) -> usize {
        self.tables.read().measurements.len()
    }

    pub fn summary_count(&self) -> usize {
        self.tables.read().summaries.len()
    }

    pub fn entry_count(&self) -> usize {
        self.tables.read().entries.len()
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<usize, StoreError> {
    match cursor {
        None => Ok(0),
        Some(token) => token
            .parse()
            .map_err(|_| StoreError::Backend(format!("invalid cursor {:?}", token))),
    }
}

impl MeasurementStore for MemoryStore {
    fn query(
        &self,
        query: &MeasurementQuery,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<MeasurementPage, StoreError> {
        let offset = parse_cursor(cursor)?;
        let tables = self.tables.read();

        let mut matching: Vec<&MeasurementRecord> = tables
            .measurements
            .values()
            .filter(|record| query.matches(record))
            .collect();
        matching.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        let cap = query
            .limit
            .map_or(matching.len(), |limit| limit.min(matching.len()));
        let start = offset.min(cap);
        let end = start.saturating_add(page_size.max(1)).min(cap);

        Ok(MeasurementPage {
            records: matching[start..end].iter().map(|r| (*r).clone()).collect(),
            cursor: (end < cap).then(|| end.to_string()),
        })
    }

    fn measurement(&self, id: &MeasurementId) -> Result<Option<MeasurementRecord>, StoreError> {
        Ok(self.tables.read().measurements.get(id).cloned())
    }

    fn device(&self, id: &DeviceId) -> Result<Option<DeviceInfo>, StoreError> {
        Ok(self.tables.read().devices.get(id).cloned())
    }

    fn task(&self, id: &TaskId) -> Result<Option<TaskInfo>, StoreError> {
        Ok(self.tables.read().tasks.get(id).cloned())
    }

    fn persist_measurement(&self, record: &MeasurementRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        match tables.measurements.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id.to_string())),
        }
    }

    fn persist_summary(&self, summary: &ValidationSummary) -> Result<SummaryId, StoreError> {
        let id = SummaryId::generate();
        self.tables.write().summaries.push(Stored {
            id,
            value: summary.clone(),
        });
        Ok(id)
    }

    fn persist_entry(&self, entry: &ValidationEntry) -> Result<EntryId, StoreError> {
        let mut tables = self.tables.write();
        if !tables.summaries.iter().any(|s| s.id == entry.summary) {
            return Err(StoreError::NotFound(entry.summary.to_string()));
        }
        let id = EntryId::generate();
        tables.entries.push(Stored {
            id,
            value: entry.clone(),
        });
        Ok(id)
    }

    fn summary(&self, id: &SummaryId) -> Result<Option<ValidationSummary>, StoreError> {
        Ok(self
            .tables
            .read()
            .summaries
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.value.clone()))
    }

    fn summaries(
        &self,
        limit: usize,
    ) -> Result<Vec<Stored<SummaryId, ValidationSummary>>, StoreError> {
        let tables = self.tables.read();
        let mut summaries: Vec<_> = tables.summaries.iter().cloned().collect();
        // stable: summaries of the same window keep persistence order
        summaries.sort_by_key(|s| s.value.window_start);
        summaries.truncate(limit);
        Ok(summaries)
    }

    fn entries(&self, limit: usize) -> Result<Vec<Stored<EntryId, ValidationEntry>>, StoreError> {
        Ok(self
            .tables
            .read()
            .entries
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }
}
