//! Run context management.
//!
//! Provides the run window and logging context for one validation run.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ValidationError};
use crate::logging::structured::LogContext;

/// Half-open time range `[start, end)` covered by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RunWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(ValidationError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Yesterday, from 00:00 UTC up to today 00:00 UTC.
    pub fn yesterday(now: DateTime<Utc>) -> Self {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            start: today - Duration::days(1),
            end: today,
        }
    }

    /// Build a window from optional ISO-8601 bounds, defaulting each
    /// missing bound to the matching bound of [`RunWindow::yesterday`].
    pub fn from_bounds(
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let default = Self::yesterday(now);
        let start = match start.filter(|s| !s.trim().is_empty()) {
            Some(value) => parse_time(value)?,
            None => default.start,
        };
        let end = match end.filter(|s| !s.trim().is_empty()) {
            Some(value) => parse_time(value)?,
            None => default.end,
        };
        Self::new(start, end)
    }

    /// The same window moved by whole days.
    ///
    /// # Errors
    /// `WindowOutOfRange` when either bound leaves the representable range.
    pub fn shifted_days(&self, days: i64) -> Result<Self> {
        let shift = Duration::try_days(days).ok_or(ValidationError::WindowOutOfRange { days })?;
        let start = self.start.checked_add_signed(shift);
        let end = self.end.checked_add_signed(shift);
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(ValidationError::WindowOutOfRange { days }),
        }
    }
}

/// Parse an ISO-8601 / RFC 3339 timestamp into UTC.
pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| ValidationError::InvalidTime {
            value: value.to_string(),
            source,
        })
}

/// Context for one validation run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub window: RunWindow,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(window: RunWindow, started_at: DateTime<Utc>) -> Self {
        let run_id = format!("run-{}", &Uuid::new_v4().to_string()[..8]);
        Self {
            run_id,
            window,
            started_at,
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.run_id)
    }
}
