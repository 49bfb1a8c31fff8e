//! Validation configuration.
//!
//! Loaded from JSON; every field has a default so a partial document (or
//! none at all) is accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Records fetched per store page.
pub const DEFAULT_PAGE_SIZE: usize = 500;
/// Entries scanned by the dashboard projections.
pub const DEFAULT_DASHBOARD_ENTRY_LIMIT: usize = 1000;
/// Summaries scanned by the validation time series.
pub const DEFAULT_TIMESERIES_POINT_LIMIT: usize = 100;
/// Days a single request may fan out to.
pub const DEFAULT_MAX_ITERATIONS: u32 = 366;
/// Length of the top-error ranking.
pub const DEFAULT_TOP_ERROR_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub page_size: usize,
    /// Upper bound on a request's `iterations`.
    pub max_iterations: u32,
    /// Include detail text for every invalid record in the report.
    pub print_invalid_detail: bool,
    /// Include detail text for valid records too.
    pub print_all_values: bool,
    pub dashboard_entry_limit: usize,
    pub timeseries_point_limit: usize,
    pub top_error_limit: usize,
    pub notification_sender: Option<String>,
    pub notification_recipient: Option<String>,
    pub notification_subject: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            print_invalid_detail: true,
            print_all_values: false,
            dashboard_entry_limit: DEFAULT_DASHBOARD_ENTRY_LIMIT,
            timeseries_point_limit: DEFAULT_TIMESERIES_POINT_LIMIT,
            top_error_limit: DEFAULT_TOP_ERROR_LIMIT,
            notification_sender: None,
            notification_recipient: None,
            notification_subject: "Daily validation results".to_string(),
        }
    }
}

impl ValidationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
