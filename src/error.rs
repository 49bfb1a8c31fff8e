//! Crate error type.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::storage::StoreError;

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Errors surfaced by validator dispatch and validation runs.
///
/// Malformed measurement fields and dangling references are not errors at
/// this level: they degrade into error-category tags or skipped records.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported measurement type: {0}")]
    UnsupportedMeasurementType(String),

    #[error("invalid timestamp {value:?}: {source}")]
    InvalidTime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid run window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("run window shifted by {days} days is out of range")]
    WindowOutOfRange { days: i64 },

    #[error("{requested} iterations requested, at most {max} allowed")]
    TooManyIterations { requested: u32, max: u32 },

    #[error("measurement query failed: {0}")]
    Query(#[source] StoreError),

    #[error("failed to persist {what}: {source}")]
    Persistence {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
}
