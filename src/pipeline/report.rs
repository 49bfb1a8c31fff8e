//! Run results for presentation.
//!
//! A run produces one [`ValidationReport`]. The caller either returns it
//! directly or renders it into a [`Notification`].

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ValidationConfig;
use crate::error::{Result, ValidationError};
use crate::measurement::MeasurementType;
use crate::storage::SummaryId;

use super::context::RunWindow;

/// Results for one measurement type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeReport {
    pub measurement_type: MeasurementType,
    /// Identity of the persisted summary, if one was written.
    pub summary_id: Option<SummaryId>,
    pub record_count: u64,
    pub error_count: u64,
    pub per_error_category_counts: BTreeMap<String, u64>,
    /// True when no validator exists for this type.
    pub unknown_type: bool,
    /// Rendered detail of failing records (and valid ones when configured).
    pub details: Vec<String>,
}

/// Structured result of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Keyed by measurement type tag.
    pub per_type: BTreeMap<String, TypeReport>,
    /// Records dropped because their device no longer exists.
    pub skipped_records: u64,
    /// Records whose dangling task reference was cleared.
    pub repaired_references: u64,
    pub entries_persisted: usize,
    /// Follow-up windows that could not be enqueued.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unscheduled_windows: Vec<RunWindow>,
}

impl ValidationReport {
    pub fn type_report(&self, kind: &MeasurementType) -> Option<&TypeReport> {
        self.per_type.get(kind.as_str())
    }

    pub fn total_records(&self) -> u64 {
        self.per_type.values().map(|t| t.record_count).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.per_type.values().map(|t| t.error_count).sum()
    }

    /// Plain-text rendering grouped by measurement type.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Validation results for {} to {} ({})",
            self.window_start.to_rfc3339(),
            self.window_end.to_rfc3339(),
            self.run_id
        );
        let _ = writeln!(
            out,
            "{} records, {} invalid, {} skipped, {} task references repaired",
            self.total_records(),
            self.total_errors(),
            self.skipped_records,
            self.repaired_references
        );

        for (tag, report) in &self.per_type {
            out.push('\n');
            let suffix = if report.unknown_type {
                " (no validator)"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "{}{}: {} records, {} invalid",
                tag, suffix, report.record_count, report.error_count
            );
            for (category, count) in &report.per_error_category_counts {
                let _ = writeln!(out, "  {}: {}", category, count);
            }
            for detail in &report.details {
                out.push('\n');
                for line in detail.lines() {
                    let _ = writeln!(out, "    {}", line);
                }
            }
        }

        out
    }
}

/// Report delivery failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct NotifyError(pub String);

/// A rendered report addressed to the configured recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn from_report(report: &ValidationReport, config: &ValidationConfig) -> Result<Self> {
        let sender = config
            .notification_sender
            .clone()
            .ok_or_else(|| ValidationError::Notification("no sender configured".to_string()))?;
        let recipient = config
            .notification_recipient
            .clone()
            .ok_or_else(|| ValidationError::Notification("no recipient configured".to_string()))?;

        Ok(Self {
            sender,
            recipient,
            subject: config.notification_subject.clone(),
            body: report.render_text(),
        })
    }
}

/// Delivers notifications (mail in production).
pub trait Notifier {
    fn send(&self, notification: &Notification) -> std::result::Result<(), NotifyError>;
}

/// Notifier that records every notification it is asked to send.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, notification: &Notification) -> std::result::Result<(), NotifyError> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report() -> ValidationReport {
        let mut per_type = BTreeMap::new();
        per_type.insert(
            "ping".to_string(),
            TypeReport {
                measurement_type: MeasurementType::Ping,
                summary_id: None,
                record_count: 3,
                error_count: 1,
                per_error_category_counts: BTreeMap::from([("rtt_range_invalid".to_string(), 1)]),
                unknown_type: false,
                details: vec!["Errors: rtt_range_invalid\nDevice: dev-1".to_string()],
            },
        );
        per_type.insert(
            "rrc".to_string(),
            TypeReport {
                measurement_type: MeasurementType::Rrc,
                summary_id: None,
                record_count: 1,
                error_count: 0,
                per_error_category_counts: BTreeMap::new(),
                unknown_type: true,
                details: Vec::new(),
            },
        );

        ValidationReport {
            run_id: "run-test".to_string(),
            window_start: Utc.with_ymd_and_hms(2012, 3, 21, 0, 0, 0).unwrap(),
            window_end: Utc.with_ymd_and_hms(2012, 3, 22, 0, 0, 0).unwrap(),
            per_type,
            skipped_records: 2,
            repaired_references: 0,
            entries_persisted: 1,
            unscheduled_windows: Vec::new(),
        }
    }

    #[test]
    fn test_totals() {
        let report = report();
        assert_eq!(report.total_records(), 4);
        assert_eq!(report.total_errors(), 1);
        assert!(report.type_report(&MeasurementType::Ping).is_some());
        assert!(report.type_report(&MeasurementType::Http).is_none());
    }

    #[test]
    fn test_render_text_groups_by_type() {
        let text = report().render_text();
        assert!(text.starts_with("Validation results for 2012-03-21T00:00:00+00:00"));
        assert!(text.contains("4 records, 1 invalid, 2 skipped"));
        assert!(text.contains("ping: 3 records, 1 invalid\n  rtt_range_invalid: 1\n"));
        assert!(text.contains("    Device: dev-1\n"));
        assert!(text.contains("rrc (no validator): 1 records, 0 invalid"));
    }

    #[test]
    fn test_notification_requires_addresses() {
        let config = ValidationConfig::default();
        assert!(matches!(
            Notification::from_report(&report(), &config),
            Err(ValidationError::Notification(_))
        ));

        let config = ValidationConfig {
            notification_sender: Some("validation@example.com".to_string()),
            notification_recipient: Some("ops@example.com".to_string()),
            ..ValidationConfig::default()
        };
        let notification = Notification::from_report(&report(), &config).unwrap();
        assert_eq!(notification.subject, "Daily validation results");
        assert_eq!(notification.body, report().render_text());
    }
}
