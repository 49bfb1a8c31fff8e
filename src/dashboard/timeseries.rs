//! Summary counts over time, one column per validated type.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::measurement::MeasurementType;
use crate::storage::{MeasurementStore, ValidationSummary};

/// Which summary counter to plot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMetric {
    #[default]
    RecordCount,
    ErrorCount,
}

impl SummaryMetric {
    pub fn read(&self, summary: &ValidationSummary) -> u64 {
        match self {
            SummaryMetric::RecordCount => summary.record_count,
            SummaryMetric::ErrorCount => summary.error_count,
        }
    }
}

impl fmt::Display for SummaryMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryMetric::RecordCount => f.write_str("record_count"),
            SummaryMetric::ErrorCount => f.write_str("error_count"),
        }
    }
}

impl FromStr for SummaryMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "record_count" => Ok(SummaryMetric::RecordCount),
            "error_count" => Ok(SummaryMetric::ErrorCount),
            other => Err(format!("unknown summary metric: {}", other)),
        }
    }
}

/// One point in time; `values` follows [`timeseries_columns`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeseriesRow {
    pub timestamp_ms: i64,
    pub values: Vec<u64>,
}

/// Column labels matching [`TimeseriesRow::values`].
pub fn timeseries_columns() -> Vec<String> {
    MeasurementType::VALIDATED
        .iter()
        .map(|kind| kind.as_str().to_string())
        .collect()
}

/// Build rows from the first `limit` summaries in window order.
///
/// Summaries never stamped with a window are ignored. Several summaries
/// for the same window and type (repeated runs) are added together.
pub fn build_timeseries(
    store: &dyn MeasurementStore,
    metric: SummaryMetric,
    limit: usize,
) -> Result<Vec<TimeseriesRow>> {
    let summaries = store.summaries(limit).map_err(ValidationError::Query)?;

    let mut points: BTreeMap<DateTime<Utc>, BTreeMap<MeasurementType, u64>> = BTreeMap::new();
    for stored in &summaries {
        let summary = &stored.value;
        let Some(start) = summary.window_start else {
            continue;
        };
        *points
            .entry(start)
            .or_default()
            .entry(summary.measurement_type.clone())
            .or_insert(0) += metric.read(summary);
    }

    Ok(points
        .into_iter()
        .map(|(start, counts)| TimeseriesRow {
            timestamp_ms: start.timestamp_millis(),
            values: MeasurementType::VALIDATED
                .iter()
                .map(|kind| counts.get(kind).copied().unwrap_or(0))
                .collect(),
        })
        .collect())
}
