//! Most common device-reported errors.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::measurement::unquote;
use crate::storage::{MeasurementStore, ValidationEntry};

/// Lines of a reported error kept for grouping.
pub const ERROR_EXCERPT_LINES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCount {
    pub error: String,
    pub count: u64,
}

/// First lines of an error report, which identify it well enough to group.
pub fn error_excerpt(error: &str) -> String {
    error
        .lines()
        .take(ERROR_EXCERPT_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tally the `error` values of failed measurements behind `entries`.
///
/// Returns at most `n` categories, most frequent first; ties are broken by
/// the error text so the ranking is stable.
pub fn top_error_categories(
    store: &dyn MeasurementStore,
    entries: &[ValidationEntry],
    n: usize,
) -> Result<Vec<ErrorCount>> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for entry in entries {
        let Some(record) = store
            .measurement(&entry.measurement)
            .map_err(ValidationError::Query)?
        else {
            continue;
        };
        if record.success {
            continue;
        }
        if let Some(error) = record.value("error") {
            *counts.entry(error_excerpt(unquote(error))).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<ErrorCount> = counts
        .into_iter()
        .map(|(error, count)| ErrorCount { error, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.error.cmp(&b.error)));
    ranked.truncate(n);
    Ok(ranked)
}

/// Rank the first `limit` persisted entries.
///
/// A measurement flagged by several runs is counted once.
pub fn top_errors(store: &dyn MeasurementStore, limit: usize, n: usize) -> Result<Vec<ErrorCount>> {
    let mut seen = HashSet::new();
    let entries: Vec<ValidationEntry> = store
        .entries(limit)
        .map_err(ValidationError::Query)?
        .into_iter()
        .map(|stored| stored.value)
        .filter(|entry| seen.insert(entry.measurement.clone()))
        .collect();
    top_error_categories(store, &entries, n)
}
