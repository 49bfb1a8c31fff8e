//! Validation outcome and error-category tags.

use serde::Serialize;

use crate::logging::structured::LogContext;
use crate::measurement::{FieldError, Fields};

pub const ADDRESS_NOT_VALID: &str = "address_not_valid";
pub const MEAN_RTT_VALUE_INVALID: &str = "mean_rtt_value_invalid";
pub const RTT_RANGE_INVALID: &str = "rtt_range_invalid";
pub const PKT_LOSS_INVALID: &str = "pkt_loss_invalid";
pub const STDDEV_RTT_INVALID: &str = "stddev_rtt_invalid";
pub const MAX_RTT_TOO_LARGE: &str = "max_rtt_too_large";
pub const PACKETS_SENT_INVALID: &str = "packets_sent_invalid";
pub const LOOKUP_DURATION_INVALID: &str = "lookup_duration_invalid";
pub const NON_HTTP_URL: &str = "non_http_url";
pub const HTTP_CODE_INVALID: &str = "http_code_invalid";
pub const ZERO_LENGTH_BODY: &str = "zero_length_body";
pub const HEADER_LENGTH_MISMATCH: &str = "header_length_mismatch";
pub const FETCH_TIME_INVALID: &str = "fetch_time_invalid";
pub const MISSING_HOP: &str = "missing_hop";
pub const TOO_MANY_HOPS: &str = "too_many_hops";
pub const LATENCY_NOT_VALID: &str = "latency_not_valid";

/// Tag for a required field that is absent.
pub fn missing_field(name: &str) -> String {
    format!("missing_field_{}", name)
}

/// Result of validating one measurement.
///
/// `valid` is true exactly when `error_types` is empty; both are only
/// changed through [`ValidationOutcome::fail`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    valid: bool,
    error_types: Vec<String>,
}

impl Default for ValidationOutcome {
    fn default() -> Self {
        Self {
            valid: true,
            error_types: Vec::new(),
        }
    }
}

impl ValidationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn error_types(&self) -> &[String] {
        &self.error_types
    }

    pub fn into_error_types(self) -> Vec<String> {
        self.error_types
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.error_types.iter().any(|t| t == tag)
    }

    /// Record an error tag.
    pub fn fail(&mut self, tag: impl Into<String>) {
        self.valid = false;
        self.error_types.push(tag.into());
    }

    /// Add a `missing_field_<name>` tag for every absent field.
    pub fn require(&mut self, fields: &Fields<'_>, names: &[&str]) {
        for name in names {
            if !fields.contains(name) {
                self.fail(missing_field(name));
            }
        }
    }

    /// Apply one rule.
    ///
    /// `Ok(false)` and a malformed input both add `tag`. A missing input
    /// skips the rule: absence is already reported by [`Self::require`].
    pub fn check(&mut self, tag: &str, rule: Result<bool, FieldError<'_>>, ctx: &LogContext) {
        match rule {
            Ok(true) => {}
            Ok(false) => self.fail(tag),
            Err(FieldError::Malformed(field)) => {
                log::debug!("{} RULE_INPUT_MALFORMED rule={} field={}", ctx, tag, field);
                self.fail(tag);
            }
            Err(FieldError::Missing(field)) => {
                log::debug!("{} RULE_SKIPPED rule={} field={}", ctx, tag, field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_outcome_starts_valid() {
        let outcome = ValidationOutcome::new();
        assert!(outcome.is_valid());
        assert!(outcome.error_types().is_empty());
    }

    #[test]
    fn test_fail_keeps_repeated_tags() {
        let mut outcome = ValidationOutcome::new();
        outcome.fail(MISSING_HOP);
        outcome.fail(MISSING_HOP);
        outcome.fail(ZERO_LENGTH_BODY);

        assert!(!outcome.is_valid());
        assert!(outcome.contains(ZERO_LENGTH_BODY));
        assert_eq!(
            outcome.error_types(),
            &[MISSING_HOP, MISSING_HOP, ZERO_LENGTH_BODY]
        );
    }

    #[test]
    fn test_check_rule_inputs() {
        let ctx = LogContext::new("test-run");
        let mut outcome = ValidationOutcome::new();

        outcome.check("a_invalid", Ok(true), &ctx);
        outcome.check("b_invalid", Err(FieldError::Missing("b")), &ctx);
        assert!(outcome.is_valid());

        outcome.check("c_invalid", Ok(false), &ctx);
        outcome.check("d_invalid", Err(FieldError::Malformed("d")), &ctx);
        assert_eq!(outcome.error_types(), &["c_invalid", "d_invalid"]);
    }

    #[test]
    fn test_require_reports_each_missing_field() {
        let mut values = BTreeMap::new();
        values.insert("code".to_string(), "200".to_string());
        let fields = Fields::new(&values);

        let mut outcome = ValidationOutcome::new();
        outcome.require(&fields, &["code", "url", "body"]);
        assert_eq!(
            outcome.error_types(),
            &["missing_field_url", "missing_field_body"]
        );
    }

    #[test]
    fn test_serializes_valid_flag() {
        let mut outcome = ValidationOutcome::new();
        outcome.fail(ADDRESS_NOT_VALID);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["error_types"][0], ADDRESS_NOT_VALID);
    }
}
