//! DNS lookup validation.

use std::collections::BTreeMap;

use crate::logging::structured::LogContext;
use crate::measurement::Fields;

use super::factory::MeasurementValidator;
use super::outcome::*;
use super::render_sorted;

/// Upper bound for a lookup, in milliseconds.
pub const MAX_DNS_LOOKUP_MS: f64 = 15_000.0;

const REQUIRED_FIELDS: &[&str] = &["address", "real_hostname", "time_ms"];

/// DNS lookup result: resolved address and lookup duration.
///
/// `real_hostname` is required to be present but its content is not checked.
#[derive(Debug, Clone)]
pub struct DnsLookup {
    values: BTreeMap<String, String>,
}

impl DnsLookup {
    pub fn new(_parameters: &BTreeMap<String, String>, values: &BTreeMap<String, String>) -> Self {
        Self {
            values: values.clone(),
        }
    }
}

impl MeasurementValidator for DnsLookup {
    fn validate(&self, ctx: &LogContext) -> ValidationOutcome {
        let fields = Fields::new(&self.values);
        let mut outcome = ValidationOutcome::new();

        outcome.require(&fields, REQUIRED_FIELDS);

        outcome.check(ADDRESS_NOT_VALID, fields.ip("address").map(|_| true), ctx);
        outcome.check(
            LOOKUP_DURATION_INVALID,
            fields
                .number("time_ms")
                .map(|ms| (0.0..=MAX_DNS_LOOKUP_MS).contains(&ms)),
            ctx,
        );

        outcome
    }

    fn render_detail(&self) -> String {
        render_sorted(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(pairs: &[(&str, &str)]) -> ValidationOutcome {
        let values = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DnsLookup::new(&BTreeMap::new(), &values).validate(&LogContext::new("test-run"))
    }

    #[test]
    fn test_valid_lookup() {
        let outcome = validate(&[
            ("address", "10.0.0.1"),
            ("real_hostname", "x"),
            ("time_ms", "20"),
        ]);
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_slow_lookup() {
        let outcome = validate(&[
            ("address", "10.0.0.1"),
            ("real_hostname", "x"),
            ("time_ms", "20000"),
        ]);
        assert!(!outcome.is_valid());
        assert!(outcome.contains(LOOKUP_DURATION_INVALID));
    }

    #[test]
    fn test_quoted_address_and_negative_time() {
        let outcome = validate(&[
            ("address", "\"2001:db8::1\""),
            ("real_hostname", "x"),
            ("time_ms", "-3"),
        ]);
        assert_eq!(outcome.error_types(), &[LOOKUP_DURATION_INVALID]);
    }

    #[test]
    fn test_hostname_content_not_checked() {
        let outcome = validate(&[
            ("address", "10.0.0.1"),
            ("real_hostname", ""),
            ("time_ms", "15000"),
        ]);
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_missing_fields() {
        let outcome = validate(&[("address", "resolver.local")]);
        assert_eq!(
            outcome.error_types(),
            &[
                "missing_field_real_hostname",
                "missing_field_time_ms",
                ADDRESS_NOT_VALID
            ]
        );
    }
}
