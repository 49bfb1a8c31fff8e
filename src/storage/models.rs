//! Models for persisted validation results.
//!
//! A run produces one summary per measurement type it saw and one entry per
//! invalid record. Neither is mutated after it is persisted; a later run
//! over the same window writes a fresh batch.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::measurement::{MeasurementId, MeasurementType};

/// Marker stored on summaries for types outside the validated vocabulary.
pub const UNKNOWN_TYPE_MARKER: &str = "UnknownType";

/// Identity assigned to a summary when it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryId(pub Uuid);

/// Identity assigned to an entry when it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub Uuid);

impl SummaryId {
    pub fn generate() -> Self {
        SummaryId(Uuid::new_v4())
    }
}

impl EntryId {
    pub fn generate() -> Self {
        EntryId(Uuid::new_v4())
    }
}

impl fmt::Display for SummaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validation results for one measurement type over one run window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub measurement_type: MeasurementType,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub record_count: u64,
    pub error_count: u64,
    pub per_error_type_counts: BTreeMap<String, u64>,
    /// Set to [`UNKNOWN_TYPE_MARKER`] for types without a validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationSummary {
    pub fn new(measurement_type: MeasurementType) -> Self {
        Self {
            measurement_type,
            window_start: None,
            window_end: None,
            record_count: 0,
            error_count: 0,
            per_error_type_counts: BTreeMap::new(),
            error: None,
        }
    }

    pub fn unknown(measurement_type: MeasurementType) -> Self {
        Self {
            error: Some(UNKNOWN_TYPE_MARKER.to_string()),
            ..Self::new(measurement_type)
        }
    }

    pub fn is_unknown_type(&self) -> bool {
        self.error.as_deref() == Some(UNKNOWN_TYPE_MARKER)
    }

    /// Stamp the window on the first record seen; later calls are no-ops.
    pub fn stamp_window(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        if self.window_start.is_none() {
            self.window_start = Some(start);
            self.window_end = Some(end);
        }
    }

    /// Count one invalid record and each of its error tags.
    pub fn record_invalid(&mut self, error_types: &[String]) {
        self.error_count += 1;
        for tag in error_types {
            *self.per_error_type_counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    /// Per-error counts in the `error:count` list form used by the datastore.
    pub fn per_error_count_list(&self) -> Vec<String> {
        self.per_error_type_counts
            .iter()
            .map(|(error, count)| format!("{}:{}", error, count))
            .collect()
    }

    /// Parse the `error:count` list form. Malformed items are dropped.
    pub fn parse_per_error_count_list(items: &[String]) -> BTreeMap<String, u64> {
        items
            .iter()
            .filter_map(|item| {
                let (error, count) = item.rsplit_once(':')?;
                Some((error.to_string(), count.parse().ok()?))
            })
            .collect()
    }
}

/// An invalid record found during a run, before its summary is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub measurement: MeasurementId,
    pub error_types: Vec<String>,
}

impl PendingEntry {
    pub fn new(measurement: MeasurementId, error_types: Vec<String>) -> Self {
        Self {
            measurement,
            error_types,
        }
    }

    /// Link to the persisted summary of the same run and type.
    pub fn attach(self, summary: SummaryId) -> ValidationEntry {
        ValidationEntry {
            summary,
            measurement: self.measurement,
            error_types: self.error_types,
        }
    }
}

/// Details of one invalid measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub summary: SummaryId,
    pub measurement: MeasurementId,
    pub error_types: Vec<String>,
}

/// A persisted value together with its store identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<I, T> {
    pub id: I,
    #[serde(flatten)]
    pub value: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_stamped_once() {
        let mut summary = ValidationSummary::new(MeasurementType::Ping);
        let first = Utc.with_ymd_and_hms(2012, 3, 20, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2012, 3, 22, 0, 0, 0).unwrap();

        summary.stamp_window(first, later);
        summary.stamp_window(later, later);
        assert_eq!(summary.window_start, Some(first));
        assert_eq!(summary.window_end, Some(later));
    }

    #[test]
    fn test_record_invalid_tallies_tags() {
        let mut summary = ValidationSummary::new(MeasurementType::Traceroute);
        summary.record_invalid(&["missing_hop".to_string(), "missing_hop".to_string()]);
        summary.record_invalid(&["too_many_hops".to_string()]);

        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.per_error_type_counts["missing_hop"], 2);
        assert_eq!(summary.per_error_type_counts["too_many_hops"], 1);
    }

    #[test]
    fn test_per_error_count_list_round_trip() {
        let mut summary = ValidationSummary::new(MeasurementType::Ping);
        summary.record_invalid(&["pkt_loss_invalid".to_string()]);
        summary.record_invalid(&["pkt_loss_invalid".to_string(), "address_not_valid".to_string()]);

        let list = summary.per_error_count_list();
        assert_eq!(list, vec!["address_not_valid:1", "pkt_loss_invalid:2"]);

        let mut with_garbage = list.clone();
        with_garbage.push("no-count".to_string());
        assert_eq!(
            ValidationSummary::parse_per_error_count_list(&with_garbage),
            summary.per_error_type_counts
        );
    }

    #[test]
    fn test_unknown_marker() {
        let summary = ValidationSummary::unknown(MeasurementType::Rrc);
        assert!(summary.is_unknown_type());
        assert!(!ValidationSummary::new(MeasurementType::Rrc).is_unknown_type());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["error"], UNKNOWN_TYPE_MARKER);
        assert_eq!(json["measurement_type"], "rrc");
    }

    #[test]
    fn test_pending_entry_attach() {
        let id = SummaryId::generate();
        let entry = PendingEntry::new(MeasurementId::from("m-9"), vec!["x".to_string()]).attach(id);
        assert_eq!(entry.summary, id);
        assert_eq!(entry.measurement, MeasurementId::from("m-9"));
    }
}
