//! Time-bucketed index of invalid records.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::measurement::{DeviceId, MeasurementId};
use crate::storage::{MeasurementStore, SummaryId, ValidationEntry, ValidationSummary};

/// Link from a bucket to one invalid measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailLink {
    pub measurement_id: MeasurementId,
    pub device_id: DeviceId,
}

/// Invalid records of one type within one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCell {
    /// Error count of the summaries behind this cell.
    pub count: u64,
    pub details: Vec<DetailLink>,
}

/// All cells sharing a summary window start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub window_start: DateTime<Utc>,
    /// Keyed by measurement type tag.
    pub types: BTreeMap<String, BucketCell>,
}

/// Group entries by their summary's window start, then by type.
///
/// Buckets are sorted ascending by time. Entries whose summary or
/// measurement can no longer be resolved are left out.
pub fn build_time_bucketed_report(
    store: &dyn MeasurementStore,
    entries: &[ValidationEntry],
) -> Result<Vec<TimeBucket>> {
    let mut summaries: HashMap<SummaryId, Option<ValidationSummary>> = HashMap::new();
    let mut buckets: BTreeMap<DateTime<Utc>, BTreeMap<String, BucketCell>> = BTreeMap::new();
    let mut counted: BTreeSet<SummaryId> = BTreeSet::new();

    for entry in entries {
        let summary = match summaries.get(&entry.summary) {
            Some(cached) => cached.clone(),
            None => {
                let found = store.summary(&entry.summary).map_err(ValidationError::Query)?;
                summaries.insert(entry.summary, found.clone());
                found
            }
        };
        let Some(summary) = summary else {
            log::debug!("DASHBOARD_ENTRY_ORPHANED summary={}", entry.summary);
            continue;
        };
        let Some(window_start) = summary.window_start else {
            continue;
        };
        let Some(record) = store
            .measurement(&entry.measurement)
            .map_err(ValidationError::Query)?
        else {
            log::debug!("DASHBOARD_MEASUREMENT_MISSING measurement={}", entry.measurement);
            continue;
        };

        let cell = buckets
            .entry(window_start)
            .or_default()
            .entry(summary.measurement_type.as_str().to_string())
            .or_default();
        if counted.insert(entry.summary) {
            cell.count += summary.error_count;
        }
        cell.details.push(DetailLink {
            measurement_id: record.id,
            device_id: record.device,
        });
    }

    Ok(buckets
        .into_iter()
        .map(|(window_start, types)| TimeBucket { window_start, types })
        .collect())
}

/// Bucket the first `limit` persisted entries.
pub fn time_bucketed_report(store: &dyn MeasurementStore, limit: usize) -> Result<Vec<TimeBucket>> {
    let entries: Vec<ValidationEntry> = store
        .entries(limit)
        .map_err(ValidationError::Query)?
        .into_iter()
        .map(|stored| stored.value)
        .collect();
    build_time_bucketed_report(store, &entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{MeasurementRecord, MeasurementType};
    use crate::storage::{MemoryStore, PendingEntry};
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 3, d, 0, 0, 0).unwrap()
    }

    fn record(id: &str, device: &str) -> MeasurementRecord {
        MeasurementRecord {
            id: MeasurementId::from(id),
            measurement_type: MeasurementType::Ping,
            timestamp: day(21),
            success: true,
            parameters: BTreeMap::new(),
            values: BTreeMap::new(),
            device: DeviceId::from(device),
            task: None,
        }
    }

    fn persist(
        store: &MemoryStore,
        kind: MeasurementType,
        start: DateTime<Utc>,
        invalid: &[&str],
    ) {
        let mut summary = ValidationSummary::new(kind);
        summary.stamp_window(start, start + Duration::days(1));
        summary.record_count = invalid.len() as u64 + 1;
        for _ in invalid {
            summary.record_invalid(&["address_not_valid".to_string()]);
        }
        let id = store.persist_summary(&summary).unwrap();
        for measurement in invalid {
            let entry = PendingEntry::new(MeasurementId::from(*measurement), vec![]).attach(id);
            store.persist_entry(&entry).unwrap();
        }
    }

    #[test]
    fn test_buckets_sorted_and_grouped() {
        let store = MemoryStore::new();
        for (id, device) in [("m-1", "dev-1"), ("m-2", "dev-2"), ("m-3", "dev-1")] {
            store.insert_measurement(record(id, device));
        }
        persist(&store, MeasurementType::Ping, day(21), &["m-1", "m-2"]);
        persist(&store, MeasurementType::Http, day(20), &["m-3"]);

        let buckets = time_bucketed_report(&store, 100).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].window_start, day(20));
        assert_eq!(buckets[0].types["http"].count, 1);

        let ping = &buckets[1].types["ping"];
        assert_eq!(ping.count, 2);
        assert_eq!(
            ping.details,
            vec![
                DetailLink {
                    measurement_id: MeasurementId::from("m-1"),
                    device_id: DeviceId::from("dev-1"),
                },
                DetailLink {
                    measurement_id: MeasurementId::from("m-2"),
                    device_id: DeviceId::from("dev-2"),
                },
            ]
        );
    }

    #[test]
    fn test_repeated_runs_add_counts() {
        let store = MemoryStore::new();
        store.insert_measurement(record("m-1", "dev-1"));
        persist(&store, MeasurementType::Ping, day(21), &["m-1"]);
        persist(&store, MeasurementType::Ping, day(21), &["m-1"]);

        let buckets = time_bucketed_report(&store, 100).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].types["ping"].count, 2);
        assert_eq!(buckets[0].types["ping"].details.len(), 2);
    }

    #[test]
    fn test_missing_measurement_is_left_out() {
        let store = MemoryStore::new();
        persist(&store, MeasurementType::Ping, day(21), &["gone"]);
        assert!(time_bucketed_report(&store, 100).unwrap().is_empty());
    }
}
